/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub state: &'static str,
    /// 1-based; 0 before the first round is drawn.
    pub round_index: u32,
    pub total_rounds: u32,
    /// 1-based position of the current question; 0 outside a question.
    pub question_in_round: usize,
    pub questions_per_round: usize,
    pub total_questions: usize,
    pub questions_answered: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub remaining_secs: Option<u64>,
}
