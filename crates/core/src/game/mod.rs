//! Multiplayer guessing rounds: roster, turn rotation, hint economy and scoring.

mod round;
mod session;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use round::{AnswerMask, Round, RoundOutcome};
pub use session::{GameSession, SessionSummary, Standing, TurnEvent, TurnReport};

/// Longest player name accepted, in UTF-8 bytes.
pub const MAX_NAME_LEN: usize = 49;

/// Scoring constants for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Points a round is worth before any letter is revealed.
    pub base_score: i32,
    /// Deducted from the round value for each revealed letter.
    pub letter_penalty: i32,
    /// Deducted from a player's session score when they skip.
    pub skip_penalty: i32,
    /// Attempts each player gets per item.
    pub max_attempts: u32,
    /// Largest roster allowed.
    pub max_players: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            base_score: 100,
            letter_penalty: 20,
            skip_penalty: 30,
            max_attempts: 5,
            max_players: 4,
        }
    }
}

impl GameRules {
    /// Reject settings that would make a round unplayable.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::validation("max_attempts must be at least 1"));
        }
        if self.max_players == 0 {
            return Err(Error::validation("max_players must be at least 1"));
        }
        if self.base_score < 0 || self.letter_penalty < 0 || self.skip_penalty < 0 {
            return Err(Error::validation("scores and penalties cannot be negative"));
        }
        Ok(())
    }
}

/// A player's running state within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSession {
    name: String,
    score: i32,
    attempts: u32,
}

impl PlayerSession {
    fn new(name: String) -> Self {
        Self {
            name,
            score: 0,
            attempts: 0,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cumulative session score; penalties can push it below zero.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Attempts left on the current item.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_rules() {
        let rules = GameRules::default();
        assert_eq!(rules.base_score, 100);
        assert_eq!(rules.letter_penalty, 20);
        assert_eq!(rules.skip_penalty, 30);
        assert_eq!(rules.max_attempts, 5);
        assert_eq!(rules.max_players, 4);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let rules = GameRules {
            max_attempts: 0,
            ..GameRules::default()
        };
        assert!(matches!(rules.validate(), Err(Error::Validation(_))));
    }
}
