use std::fmt;

use crate::models::{Item, MAX_HINTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Blank(char),
    Hidden(char),
    Shown(char),
}

/// Placeholder rendering of the answer: one cell per non-space character,
/// whitespace copied through as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerMask {
    cells: Vec<Cell>,
}

impl AnswerMask {
    /// Mask with every letter hidden.
    pub fn new(answer: &str) -> Self {
        let cells = answer
            .chars()
            .map(|ch| {
                if ch.is_whitespace() {
                    Cell::Blank(ch)
                } else {
                    Cell::Hidden(ch)
                }
            })
            .collect();
        Self { cells }
    }

    /// Reveal the leftmost hidden character, returning it.
    pub fn reveal_next(&mut self) -> Option<char> {
        self.cells.iter_mut().find_map(|cell| match *cell {
            Cell::Hidden(ch) => {
                *cell = Cell::Shown(ch);
                Some(ch)
            }
            _ => None,
        })
    }

    /// Characters still hidden.
    pub fn hidden(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| matches!(cell, Cell::Hidden(_)))
            .count()
    }
}

impl fmt::Display for AnswerMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.cells {
            let ch = match *cell {
                Cell::Blank(ch) | Cell::Shown(ch) => ch,
                Cell::Hidden(_) => '_',
            };
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

/// How a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// A player guessed the answer.
    Solved {
        /// Roster index of the winner.
        player: usize,
        /// Points credited.
        points: i32,
    },
    /// Nobody had attempts left.
    Exhausted,
}

/// State of the item currently being guessed.
#[derive(Debug, Clone)]
pub struct Round {
    item: Item,
    mask: AnswerMask,
    hint_index: usize,
    value: i32,
    outcome: Option<RoundOutcome>,
}

impl Round {
    pub(crate) fn new(item: Item, base_score: i32) -> Self {
        let mask = AnswerMask::new(item.answer());
        Self {
            item,
            mask,
            hint_index: 1,
            value: base_score,
            outcome: None,
        }
    }

    /// Item being guessed. Only show its answer once the round is over.
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Current mask.
    pub fn mask(&self) -> &AnswerMask {
        &self.mask
    }

    /// 1-based position of the hint on display.
    pub fn hint_index(&self) -> usize {
        self.hint_index
    }

    /// Text of the hint on display.
    pub fn current_hint(&self) -> &str {
        self.item.hint(self.hint_index).unwrap_or_default()
    }

    /// Points a correct guess is worth right now.
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Set once the round has ended.
    pub fn outcome(&self) -> Option<&RoundOutcome> {
        self.outcome.as_ref()
    }

    /// Whether the round has ended.
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub(crate) fn advance_hint(&mut self) -> bool {
        if self.hint_index < MAX_HINTS {
            self.hint_index += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn reveal_letter(&mut self, penalty: i32) -> Option<char> {
        let letter = self.mask.reveal_next()?;
        self.value = (self.value - penalty).max(0);
        Some(letter)
    }

    pub(crate) fn finish(&mut self, outcome: RoundOutcome) {
        self.outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_item;

    #[test]
    fn mask_hides_letters_and_keeps_spaces() {
        let mask = AnswerMask::new("ada lovelace");
        assert_eq!(mask.to_string(), "___ ________");
        assert_eq!(mask.hidden(), 11);
    }

    #[test]
    fn reveals_left_to_right_skipping_spaces() {
        let mut mask = AnswerMask::new("ab c");
        assert_eq!(mask.reveal_next(), Some('a'));
        assert_eq!(mask.reveal_next(), Some('b'));
        assert_eq!(mask.to_string(), "ab _");
        assert_eq!(mask.reveal_next(), Some('c'));
        assert_eq!(mask.reveal_next(), None);
        assert_eq!(mask.to_string(), "ab c");
    }

    #[test]
    fn letter_penalty_floors_at_zero() {
        let mut round = Round::new(sample_item("abcdefg"), 50);
        assert_eq!(round.reveal_letter(20), Some('a'));
        assert_eq!(round.reveal_letter(20), Some('b'));
        assert_eq!(round.reveal_letter(20), Some('c'));
        assert_eq!(round.value(), 0);
    }

    #[test]
    fn hint_index_stops_at_last_hint() {
        let mut round = Round::new(sample_item("x"), 100);
        assert_eq!(round.current_hint(), "x hint 1");
        for expected in 2..=MAX_HINTS {
            assert!(round.advance_hint());
            assert_eq!(round.hint_index(), expected);
        }
        assert!(!round.advance_hint());
        assert_eq!(round.current_hint(), "x hint 5");
    }
}
