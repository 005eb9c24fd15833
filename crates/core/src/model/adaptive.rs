use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::FlashcardId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AdaptiveQuestionError {
    #[error("adaptive content returned no questions")]
    EmptyList,

    #[error("question {index} has no text")]
    EmptyQuestion { index: usize },

    #[error("question {index} has no options")]
    NoOptions { index: usize },

    #[error("question {index} has a blank correct answer")]
    EmptyCorrectAnswer { index: usize },

    #[error("question {index} options do not contain the correct answer")]
    MissingCorrectAnswer { index: usize },
}

/// One pre-built quiz question as delivered by the adaptive content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveQuestion {
    pub question: String,
    pub correct_answer: String,
    pub options: Vec<String>,
    pub original_flashcard_id: FlashcardId,
}

impl AdaptiveQuestion {
    /// Structural check only; the question's content is taken on trust.
    ///
    /// # Errors
    ///
    /// Returns `AdaptiveQuestionError` if the question text or correct answer
    /// is blank, there are no options, or no option matches the correct answer.
    pub fn validate(&self, index: usize) -> Result<(), AdaptiveQuestionError> {
        if self.question.trim().is_empty() {
            return Err(AdaptiveQuestionError::EmptyQuestion { index });
        }
        if self.options.is_empty() {
            return Err(AdaptiveQuestionError::NoOptions { index });
        }
        let correct = self.correct_answer.trim();
        if correct.is_empty() {
            return Err(AdaptiveQuestionError::EmptyCorrectAnswer { index });
        }
        if !self.options.iter().any(|opt| opt.trim() == correct) {
            return Err(AdaptiveQuestionError::MissingCorrectAnswer { index });
        }
        Ok(())
    }
}

/// Validates a whole question list.
///
/// # Errors
///
/// Returns `AdaptiveQuestionError::EmptyList` for an empty list, otherwise the
/// first per-question failure.
pub fn validate_questions(questions: &[AdaptiveQuestion]) -> Result<(), AdaptiveQuestionError> {
    if questions.is_empty() {
        return Err(AdaptiveQuestionError::EmptyList);
    }
    questions
        .iter()
        .enumerate()
        .try_for_each(|(index, q)| q.validate(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: &str, options: &[&str]) -> AdaptiveQuestion {
        AdaptiveQuestion {
            question: "Capital of France?".into(),
            correct_answer: correct.into(),
            options: options.iter().map(|s| (*s).to_owned()).collect(),
            original_flashcard_id: FlashcardId::new(1),
        }
    }

    #[test]
    fn deserializes_camel_case_payload() {
        let json = r#"{
            "question": "Capital of France?",
            "correctAnswer": "Paris",
            "options": ["Paris", "Rome"],
            "originalFlashcardId": 9
        }"#;
        let parsed: AdaptiveQuestion = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.original_flashcard_id, FlashcardId::new(9));
        assert!(parsed.validate(0).is_ok());
    }

    #[test]
    fn rejects_missing_correct_answer() {
        let q = question("Paris", &["Rome", "Berlin"]);
        assert_eq!(
            q.validate(2).unwrap_err(),
            AdaptiveQuestionError::MissingCorrectAnswer { index: 2 }
        );
    }

    #[test]
    fn rejects_blank_correct_answer_even_when_an_option_is_blank() {
        let q = question("   ", &["  ", "x", "y"]);
        assert_eq!(
            q.validate(0).unwrap_err(),
            AdaptiveQuestionError::EmptyCorrectAnswer { index: 0 }
        );
    }

    #[test]
    fn rejects_empty_options_and_lists() {
        assert_eq!(
            question("Paris", &[]).validate(0).unwrap_err(),
            AdaptiveQuestionError::NoOptions { index: 0 }
        );
        assert_eq!(
            validate_questions(&[]).unwrap_err(),
            AdaptiveQuestionError::EmptyList
        );
    }

    #[test]
    fn list_reports_first_bad_question() {
        let list = vec![
            question("Paris", &["Paris", "Rome"]),
            question("Paris", &["Rome"]),
        ];
        assert_eq!(
            validate_questions(&list).unwrap_err(),
            AdaptiveQuestionError::MissingCorrectAnswer { index: 1 }
        );
    }
}
