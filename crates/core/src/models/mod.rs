//! Shared domain models.

use std::fmt;

use crate::error::{Error, Result};

/// Number of hint slots carried by every item.
pub const MAX_HINTS: usize = 5;
/// Longest answer accepted, in UTF-8 bytes.
pub const MAX_ANSWER_LEN: usize = 101;
/// Longest hint accepted, in UTF-8 bytes.
pub const MAX_HINT_LEN: usize = 199;
/// Longest category accepted, in UTF-8 bytes.
pub const MAX_CATEGORY_LEN: usize = 101;

/// Ordinal difficulty of an item, from 1 (easiest) to 5 (hardest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difficulty {
    /// Level 1.
    VeryEasy = 1,
    /// Level 2.
    Easy = 2,
    /// Level 3.
    Medium = 3,
    /// Level 4.
    Hard = 4,
    /// Level 5.
    VeryHard = 5,
}

impl Difficulty {
    /// All levels in ascending order.
    pub const ALL: [Difficulty; 5] = [
        Difficulty::VeryEasy,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::VeryHard,
    ];

    /// Numeric code used by the catalog and binary formats.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Label shown to players.
    pub fn display_name(self) -> &'static str {
        match self {
            Difficulty::VeryEasy => "Very easy",
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very hard",
        }
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Difficulty::VeryEasy),
            2 => Ok(Difficulty::Easy),
            3 => Ok(Difficulty::Medium),
            4 => Ok(Difficulty::Hard),
            5 => Ok(Difficulty::VeryHard),
            other => Err(Error::InvalidDifficulty(other)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Canonical form used whenever answers are compared: lowercase with every
/// whitespace character removed.
pub fn normalize_answer(input: &str) -> String {
    input
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A single guessable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    answer: String,
    hints: [String; MAX_HINTS],
    category: String,
    difficulty: Difficulty,
}

impl Item {
    /// Build an item, lowercasing the answer and checking every text field
    /// fits the on-disk layout.
    pub fn new(
        answer: &str,
        hints: [String; MAX_HINTS],
        category: &str,
        difficulty: Difficulty,
    ) -> Result<Self> {
        let answer = clean_answer(answer)?;
        for (index, hint) in hints.iter().enumerate() {
            check_len(&format!("hint {}", index + 1), hint, MAX_HINT_LEN)?;
        }
        let category = category.trim().to_string();
        check_len("category", &category, MAX_CATEGORY_LEN)?;

        Ok(Self {
            answer,
            hints,
            category,
            difficulty,
        })
    }

    /// Lowercased answer.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// All hint slots in order; unused slots are empty strings.
    pub fn hints(&self) -> &[String; MAX_HINTS] {
        &self.hints
    }

    /// Hint by 1-based position.
    pub fn hint(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|index| self.hints.get(index))
            .map(String::as_str)
    }

    /// Category label.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Difficulty level.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Whether `query` names this item once both sides are normalised.
    pub fn matches(&self, query: &str) -> bool {
        normalize_answer(&self.answer) == normalize_answer(query)
    }

    /// Apply a partial update. Fields left as `None` keep their value; the
    /// item is untouched if any supplied field is invalid.
    pub fn apply(&mut self, patch: ItemPatch) -> Result<()> {
        let answer = patch.answer.as_deref().map(clean_answer).transpose()?;
        let category = match patch.category {
            Some(category) => {
                let category = category.trim().to_string();
                check_len("category", &category, MAX_CATEGORY_LEN)?;
                Some(category)
            }
            None => None,
        };
        for (index, hint) in patch.hints.iter().enumerate() {
            if let Some(hint) = hint {
                check_len(&format!("hint {}", index + 1), hint, MAX_HINT_LEN)?;
            }
        }

        if let Some(answer) = answer {
            self.answer = answer;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(difficulty) = patch.difficulty {
            self.difficulty = difficulty;
        }
        for (slot, hint) in self.hints.iter_mut().zip(patch.hints) {
            if let Some(hint) = hint {
                *slot = hint;
            }
        }
        Ok(())
    }
}

/// Fields to replace on an existing item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    /// New answer.
    pub answer: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New difficulty.
    pub difficulty: Option<Difficulty>,
    /// Replacement hints by slot.
    pub hints: [Option<String>; MAX_HINTS],
}

impl ItemPatch {
    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.answer.is_none()
            && self.category.is_none()
            && self.difficulty.is_none()
            && self.hints.iter().all(Option::is_none)
    }
}

fn clean_answer(answer: &str) -> Result<String> {
    let answer = answer.trim().to_lowercase();
    if answer.is_empty() {
        return Err(Error::validation("answer cannot be empty"));
    }
    check_len("answer", &answer, MAX_ANSWER_LEN)?;
    Ok(answer)
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(Error::validation(format!(
            "{field} is too long ({} bytes, limit {max})",
            value.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_item(answer: &str) -> Item {
    let hints = [1, 2, 3, 4, 5].map(|n| format!("{answer} hint {n}"));
    Item::new(answer, hints, "computing", Difficulty::Medium).expect("valid sample item")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_is_lowercased_on_entry() {
        let item = sample_item("  Ada Lovelace ");
        assert_eq!(item.answer(), "ada lovelace");
    }

    #[test]
    fn matching_ignores_case_and_spaces() {
        let item = sample_item("ada lovelace");
        assert!(item.matches("Ada Lovelace"));
        assert!(item.matches("ada lovelace"));
        assert!(item.matches("adalovelace"));
        assert!(item.matches(" ADA\tLOVE lace "));
        assert!(!item.matches("ada"));
    }

    #[test]
    fn difficulty_codes_are_bounded() {
        assert_eq!(Difficulty::try_from(1).ok(), Some(Difficulty::VeryEasy));
        assert_eq!(Difficulty::try_from(5).ok(), Some(Difficulty::VeryHard));
        assert!(matches!(
            Difficulty::try_from(0),
            Err(Error::InvalidDifficulty(0))
        ));
        assert!(matches!(
            Difficulty::try_from(6),
            Err(Error::InvalidDifficulty(6))
        ));
    }

    #[test]
    fn rejects_oversized_fields() {
        let long = "x".repeat(MAX_ANSWER_LEN + 1);
        let hints: [String; MAX_HINTS] = Default::default();
        assert!(Item::new(&long, hints.clone(), "c", Difficulty::Easy).is_err());
        assert!(Item::new("", hints, "c", Difficulty::Easy).is_err());
    }

    #[test]
    fn partial_update_keeps_unsupplied_fields() {
        let mut item = sample_item("grace hopper");
        let mut patch = ItemPatch {
            difficulty: Some(Difficulty::VeryHard),
            ..ItemPatch::default()
        };
        patch.hints[2] = Some("cobol".to_string());
        item.apply(patch).unwrap();

        assert_eq!(item.answer(), "grace hopper");
        assert_eq!(item.category(), "computing");
        assert_eq!(item.difficulty(), Difficulty::VeryHard);
        assert_eq!(item.hint(3), Some("cobol"));
        assert_eq!(item.hint(1), Some("grace hopper hint 1"));
    }

    #[test]
    fn invalid_patch_leaves_item_untouched() {
        let mut item = sample_item("grace hopper");
        let before = item.clone();
        let patch = ItemPatch {
            answer: Some("Alan Turing".to_string()),
            category: Some("y".repeat(MAX_CATEGORY_LEN + 1)),
            ..ItemPatch::default()
        };
        assert!(item.apply(patch).is_err());
        assert_eq!(item, before);
    }
}
