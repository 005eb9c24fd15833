use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use study_core::model::{AdaptiveQuestion, Flashcard};

/// Options shown for every flashcard question.
pub const OPTION_COUNT: usize = 4;

/// Number of different answer texts across `cards`.
#[must_use]
pub fn distinct_answers(cards: &[Flashcard]) -> usize {
    cards
        .iter()
        .map(Flashcard::answer)
        .collect::<HashSet<_>>()
        .len()
}

/// One multiple-choice entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOption {
    pub text: String,
    pub is_correct: bool,
}

/// Frozen multiple-choice set with exactly one correct entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSet(Vec<AnswerOption>);

impl OptionSet {
    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of the correct entry.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        self.0.iter().position(|opt| opt.is_correct)
    }

    /// Whether the option at `index` is the correct one; `None` when out of range.
    #[must_use]
    pub fn is_correct(&self, index: usize) -> Option<bool> {
        self.0.get(index).map(|opt| opt.is_correct)
    }

    /// Builds the set for a flashcard question: the active card's answer plus
    /// up to three other answers drawn from the rest of the deck, shuffled.
    ///
    /// Distractors are picked by text, so a card sharing the active answer (or
    /// one already drawn) is skipped.
    pub fn for_flashcard<R: Rng + ?Sized>(
        active: usize,
        cards: &[Flashcard],
        rng: &mut R,
    ) -> Self {
        let Some(card) = cards.get(active) else {
            return Self(Vec::new());
        };
        let mut others: Vec<&str> = cards
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != active)
            .map(|(_, other)| other.answer())
            .collect();
        others.as_mut_slice().shuffle(rng);

        let mut options = Vec::with_capacity(OPTION_COUNT);
        options.push(AnswerOption {
            text: card.answer().to_owned(),
            is_correct: true,
        });
        for text in others {
            if options.len() == OPTION_COUNT {
                break;
            }
            if options.iter().any(|opt: &AnswerOption| opt.text == text) {
                continue;
            }
            options.push(AnswerOption {
                text: text.to_owned(),
                is_correct: false,
            });
        }
        options.as_mut_slice().shuffle(rng);
        Self(options)
    }

    /// Uses the options supplied with an adaptive question in their given
    /// order. Blank and repeated entries are dropped; the first entry matching
    /// the correct answer is flagged.
    #[must_use]
    pub fn for_adaptive(question: &AdaptiveQuestion) -> Self {
        let correct = question.correct_answer.trim();
        let mut seen = Vec::<&str>::new();
        let mut flagged = false;
        let mut options = Vec::with_capacity(question.options.len());
        for text in question.options.iter().map(|opt| opt.trim()) {
            if text.is_empty() || seen.contains(&text) {
                continue;
            }
            seen.push(text);
            let is_correct = !flagged && text == correct;
            flagged |= is_correct;
            options.push(AnswerOption {
                text: text.to_owned(),
                is_correct,
            });
        }
        Self(options)
    }
}

/// Hands out option sets and freezes them per question.
///
/// Asking again for the question currently frozen returns the same set without
/// touching the random source.
#[derive(Debug, Default)]
pub struct OptionGenerator {
    frozen: Option<(u64, OptionSet)>,
}

impl OptionGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flashcard_options<R: Rng + ?Sized>(
        &mut self,
        question_seq: u64,
        active: usize,
        cards: &[Flashcard],
        rng: &mut R,
    ) -> OptionSet {
        self.freeze(question_seq, || OptionSet::for_flashcard(active, cards, rng))
    }

    pub fn adaptive_options(&mut self, question_seq: u64, question: &AdaptiveQuestion) -> OptionSet {
        self.freeze(question_seq, || OptionSet::for_adaptive(question))
    }

    fn freeze(&mut self, question_seq: u64, build: impl FnOnce() -> OptionSet) -> OptionSet {
        if let Some((seq, set)) = &self.frozen {
            if *seq == question_seq {
                return set.clone();
            }
        }
        let set = build();
        self.frozen = Some((question_seq, set.clone()));
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use study_core::model::FlashcardId;

    fn cards(n: u64) -> Vec<Flashcard> {
        (1..=n)
            .map(|i| Flashcard::new(FlashcardId::new(i), format!("Q{i}"), format!("A{i}")).unwrap())
            .collect()
    }

    #[test]
    fn flashcard_set_has_four_options_and_one_correct() {
        let deck = cards(10);
        let mut rng = StdRng::seed_from_u64(3);
        for active in 0..deck.len() {
            let set = OptionSet::for_flashcard(active, &deck, &mut rng);
            assert_eq!(set.len(), OPTION_COUNT);
            assert_eq!(set.options().iter().filter(|o| o.is_correct).count(), 1);
            let correct = set.correct_index().unwrap();
            assert_eq!(set.options()[correct].text, deck[active].answer());
            assert!(
                set.options()
                    .iter()
                    .filter(|o| !o.is_correct)
                    .all(|o| o.text != deck[active].answer())
            );
        }
    }

    #[test]
    fn minimum_deck_uses_every_other_card() {
        let deck = cards(4);
        let set = OptionSet::for_flashcard(0, &deck, &mut StdRng::seed_from_u64(9));
        let mut texts: Vec<_> = set.options().iter().map(|o| o.text.clone()).collect();
        texts.sort();
        assert_eq!(texts, vec!["A1", "A2", "A3", "A4"]);
    }

    fn cards_with_answers(answers: &[&str]) -> Vec<Flashcard> {
        answers
            .iter()
            .zip(1..)
            .map(|(answer, i)| {
                Flashcard::new(FlashcardId::new(i), format!("Q{i}"), *answer).unwrap()
            })
            .collect()
    }

    #[test]
    fn shared_answers_never_appear_twice() {
        let deck = cards_with_answers(&["Paris", "Paris", "Rome", "Oslo", "Bern"]);
        for seed in 0..20 {
            let set = OptionSet::for_flashcard(0, &deck, &mut StdRng::seed_from_u64(seed));
            let texts: HashSet<&str> = set.options().iter().map(|o| o.text.as_str()).collect();
            assert_eq!(set.len(), OPTION_COUNT);
            assert_eq!(texts.len(), OPTION_COUNT);
            assert_eq!(set.options().iter().filter(|o| o.is_correct).count(), 1);
            assert_eq!(set.options()[set.correct_index().unwrap()].text, "Paris");
        }
    }

    #[test]
    fn too_few_distinct_answers_shrink_the_set() {
        let deck = cards_with_answers(&["Paris", "Paris", "Rome", "Oslo"]);
        assert_eq!(distinct_answers(&deck), 3);
        let set = OptionSet::for_flashcard(0, &deck, &mut StdRng::seed_from_u64(1));
        let mut texts: Vec<_> = set.options().iter().map(|o| o.text.as_str()).collect();
        texts.sort_unstable();
        assert_eq!(texts, vec!["Oslo", "Paris", "Rome"]);
    }

    #[test]
    fn generator_freezes_set_for_the_same_question() {
        let deck = cards(8);
        let mut generator = OptionGenerator::new();
        let mut rng = StdRng::seed_from_u64(11);
        let first = generator.flashcard_options(1, 2, &deck, &mut rng);
        for _ in 0..5 {
            assert_eq!(generator.flashcard_options(1, 2, &deck, &mut rng), first);
        }
    }

    #[test]
    fn generator_builds_new_set_for_next_question() {
        let deck = cards(8);
        let mut generator = OptionGenerator::new();
        let mut rng = StdRng::seed_from_u64(11);
        let first = generator.flashcard_options(1, 2, &deck, &mut rng);
        let second = generator.flashcard_options(2, 5, &deck, &mut rng);
        let correct_text = |set: &OptionSet| set.options()[set.correct_index().unwrap()].text.clone();
        assert_eq!(correct_text(&first), "A3");
        assert_eq!(correct_text(&second), "A6");
    }

    #[test]
    fn adaptive_set_flags_correct_by_text_and_drops_duplicates() {
        let question = AdaptiveQuestion {
            question: "Capital of France?".into(),
            correct_answer: "Paris".into(),
            options: vec![
                "Lyon".into(),
                " Paris ".into(),
                "Lyon".into(),
                "".into(),
                "Nice".into(),
            ],
            original_flashcard_id: FlashcardId::new(1),
        };
        let set = OptionSet::for_adaptive(&question);
        let texts: Vec<_> = set.options().iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Lyon", "Paris", "Nice"]);
        assert_eq!(set.correct_index(), Some(1));
        assert_eq!(set.is_correct(1), Some(true));
        assert_eq!(set.is_correct(7), None);
    }
}
