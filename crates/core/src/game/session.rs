use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, error, info};

use crate::{
    error::{Error, Result},
    models::Item,
    ranking::RankingLedger,
    store::{ItemSelector, ItemStore},
};

use super::{GameRules, PlayerSession, Round, RoundOutcome, MAX_NAME_LEN};

/// What a single action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// The guess matched; the round value went to the player.
    Correct {
        /// Who guessed.
        player: String,
        /// Points credited.
        points: i32,
    },
    /// The guess missed and cost an attempt.
    Incorrect {
        /// Who guessed.
        player: String,
        /// Attempts the player has left.
        attempts_left: u32,
        /// Whether the miss unlocked the next hint.
        hint_unlocked: bool,
    },
    /// A letter of the mask was uncovered.
    LetterRevealed {
        /// The uncovered character.
        letter: char,
        /// Round value after the penalty.
        round_value: i32,
        /// Attempts the player has left.
        attempts_left: u32,
    },
    /// Every letter was already visible; nothing changed.
    NothingToReveal,
    /// The next hint is now on display.
    HintAdvanced {
        /// 1-based position of the hint now shown.
        hint_index: usize,
    },
    /// All hints were already on display.
    NoMoreHints,
    /// The player paid the skip penalty and passed.
    Skipped {
        /// Who skipped.
        player: String,
        /// Points deducted.
        penalty: i32,
        /// Session score afterwards.
        score: i32,
    },
    /// The skip was not confirmed; the same player continues.
    SkipCancelled,
}

impl TurnEvent {
    /// Whether the event is a refusal rather than progress.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            TurnEvent::NothingToReveal | TurnEvent::NoMoreHints | TurnEvent::SkipCancelled
        )
    }
}

impl fmt::Display for TurnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnEvent::Correct { player, points } => {
                write!(f, "Correct, {player}! +{points} points")
            }
            TurnEvent::Incorrect {
                attempts_left,
                hint_unlocked,
                ..
            } => {
                write!(f, "Wrong guess. {attempts_left} attempts left")?;
                if *hint_unlocked {
                    write!(f, ", next hint unlocked")?;
                }
                Ok(())
            }
            TurnEvent::LetterRevealed {
                letter,
                round_value,
                attempts_left,
            } => write!(
                f,
                "Letter '{letter}' revealed. Round now worth {round_value}, {attempts_left} attempts left"
            ),
            TurnEvent::NothingToReveal => write!(f, "There are no letters left to reveal"),
            TurnEvent::HintAdvanced { hint_index } => write!(f, "Hint {hint_index} unlocked"),
            TurnEvent::NoMoreHints => write!(f, "No more hints"),
            TurnEvent::Skipped {
                player,
                penalty,
                score,
            } => write!(f, "{player} skipped (-{penalty}), total now {score}"),
            TurnEvent::SkipCancelled => write!(f, "Skip cancelled, your turn continues"),
        }
    }
}

/// Result of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// What happened.
    pub event: TurnEvent,
    /// Set when the action ended the round.
    pub round_end: Option<RoundOutcome>,
}

/// A player's result at the end of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// Player name.
    pub name: String,
    /// Final session score.
    pub score: i32,
    /// Ledger position reached, when the score was submitted and kept.
    pub rank: Option<usize>,
}

/// Recap of a finished session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// When the roster was formed.
    pub started_at: DateTime<Utc>,
    /// When the session was closed.
    pub finished_at: DateTime<Utc>,
    /// Rounds that reached an outcome.
    pub rounds_played: u32,
    /// Rounds someone guessed.
    pub rounds_solved: u32,
    /// Players ordered by final score, ties in roster order.
    pub standings: Vec<Standing>,
    /// Players with a positive score that did not reach the ledger.
    pub unsubmitted: Vec<String>,
    /// Why the ledger stopped accepting scores, if it did.
    pub submit_error: Option<String>,
}

/// A fixed roster playing consecutive rounds.
#[derive(Debug, Clone)]
pub struct GameSession {
    rules: GameRules,
    players: Vec<PlayerSession>,
    round: Option<Round>,
    active: usize,
    started_at: DateTime<Utc>,
    rounds_played: u32,
    rounds_solved: u32,
}

struct Turn<'a> {
    round: &'a mut Round,
    player: &'a mut PlayerSession,
    rules: &'a GameRules,
}

impl GameSession {
    /// Form a roster. Names are trimmed and must be non-blank; the roster
    /// size must lie within `1..=rules.max_players`.
    pub fn new<I, S>(names: I, rules: GameRules) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        rules.validate()?;
        let mut players = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(Error::validation("player names cannot be blank"));
            }
            if name.len() > MAX_NAME_LEN {
                return Err(Error::validation(format!(
                    "player name \"{name}\" is longer than {MAX_NAME_LEN} bytes"
                )));
            }
            players.push(PlayerSession::new(name.to_string()));
        }
        if players.is_empty() || players.len() > rules.max_players {
            return Err(Error::validation(format!(
                "a session needs between 1 and {} players",
                rules.max_players
            )));
        }

        info!("session started with {} players", players.len());
        Ok(Self {
            rules,
            players,
            round: None,
            active: 0,
            started_at: Utc::now(),
            rounds_played: 0,
            rounds_solved: 0,
        })
    }

    /// Scoring constants in force.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Roster in seating order.
    pub fn players(&self) -> &[PlayerSession] {
        &self.players
    }

    /// Current or most recent round.
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Whether a round is waiting for actions.
    pub fn in_round(&self) -> bool {
        self.round.as_ref().is_some_and(|round| !round.is_over())
    }

    /// Roster index of the player whose turn it is.
    pub fn active_index(&self) -> Option<usize> {
        self.in_round().then_some(self.active)
    }

    /// Player whose turn it is.
    pub fn active_player(&self) -> Option<&PlayerSession> {
        self.active_index().map(|index| &self.players[index])
    }

    /// Rounds that reached an outcome so far.
    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    /// Draw a random item from `store` and start a round with it.
    pub fn draw_round<R: Rng>(
        &mut self,
        store: &ItemStore,
        selector: &mut ItemSelector<R>,
    ) -> Result<&Round> {
        if self.in_round() {
            return Err(Error::validation("a round is already in progress"));
        }
        let item = selector.pick(store).ok_or(Error::EmptyStore)?.clone();
        self.start_round(item)
    }

    /// Start a round on `item`: fresh mask, base value, first hint, full
    /// attempts for everyone, first player to act.
    pub fn start_round(&mut self, item: Item) -> Result<&Round> {
        if self.in_round() {
            return Err(Error::validation("a round is already in progress"));
        }
        for player in &mut self.players {
            player.attempts = self.rules.max_attempts;
        }
        self.active = 0;
        debug!(answer = item.answer(), "round started");
        Ok(&*self.round.insert(Round::new(item, self.rules.base_score)))
    }

    /// Compare a guess with the answer, ignoring case and whitespace.
    pub fn guess(&mut self, input: &str) -> Result<TurnReport> {
        let active = self.active;
        let turn = self.turn()?;
        if turn.round.item().matches(input) {
            let points = turn.round.value();
            turn.player.score += points;
            let event = TurnEvent::Correct {
                player: turn.player.name.clone(),
                points,
            };
            let outcome = RoundOutcome::Solved {
                player: active,
                points,
            };
            turn.round.finish(outcome.clone());
            self.rounds_played += 1;
            self.rounds_solved += 1;
            info!("{event}");
            return Ok(TurnReport {
                event,
                round_end: Some(outcome),
            });
        }

        turn.player.attempts = turn.player.attempts.saturating_sub(1);
        let hint_unlocked = turn.round.advance_hint();
        let event = TurnEvent::Incorrect {
            player: turn.player.name.clone(),
            attempts_left: turn.player.attempts,
            hint_unlocked,
        };
        Ok(self.pass_turn(event))
    }

    /// Uncover the leftmost hidden letter at the cost of the letter penalty
    /// and one attempt. A no-op when nothing is hidden.
    pub fn reveal_letter(&mut self) -> Result<TurnReport> {
        let turn = self.turn()?;
        let Some(letter) = turn.round.reveal_letter(turn.rules.letter_penalty) else {
            return Ok(TurnReport {
                event: TurnEvent::NothingToReveal,
                round_end: None,
            });
        };
        turn.player.attempts = turn.player.attempts.saturating_sub(1);
        let event = TurnEvent::LetterRevealed {
            letter,
            round_value: turn.round.value(),
            attempts_left: turn.player.attempts,
        };
        Ok(self.pass_turn(event))
    }

    /// Show the next hint for free. The turn passes either way.
    pub fn next_hint(&mut self) -> Result<TurnReport> {
        let turn = self.turn()?;
        let event = if turn.round.advance_hint() {
            TurnEvent::HintAdvanced {
                hint_index: turn.round.hint_index(),
            }
        } else {
            TurnEvent::NoMoreHints
        };
        Ok(self.pass_turn(event))
    }

    /// Pass the turn for the skip penalty, taken from the session score.
    /// Without confirmation nothing changes.
    pub fn skip(&mut self, confirmed: bool) -> Result<TurnReport> {
        let turn = self.turn()?;
        if !confirmed {
            return Ok(TurnReport {
                event: TurnEvent::SkipCancelled,
                round_end: None,
            });
        }
        let penalty = turn.rules.skip_penalty;
        turn.player.score -= penalty;
        let event = TurnEvent::Skipped {
            player: turn.player.name.clone(),
            penalty,
            score: turn.player.score,
        };
        Ok(self.pass_turn(event))
    }

    /// Close the session, submitting every positive score to `ledger` in
    /// standings order. A round still in progress is abandoned. The first
    /// ledger failure stops further submissions; the standings are returned
    /// regardless, with the players left out listed in `unsubmitted`.
    pub fn finish(self, ledger: &RankingLedger) -> SessionSummary {
        let mut standings: Vec<Standing> = self
            .players
            .into_iter()
            .map(|player| Standing {
                name: player.name,
                score: player.score,
                rank: None,
            })
            .collect();
        standings.sort_by(|a, b| b.score.cmp(&a.score));

        let mut unsubmitted = Vec::new();
        let mut submit_error = None;
        for standing in standings.iter_mut().filter(|standing| standing.score > 0) {
            if submit_error.is_some() {
                unsubmitted.push(standing.name.clone());
                continue;
            }
            match ledger.submit(&standing.name, standing.score) {
                Ok(rank) => standing.rank = rank,
                Err(err) => {
                    error!("could not record {}: {err}", standing.name);
                    submit_error = Some(err.to_string());
                    unsubmitted.push(standing.name.clone());
                }
            }
        }

        info!(
            rounds = self.rounds_played,
            solved = self.rounds_solved,
            "session finished"
        );
        SessionSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            rounds_played: self.rounds_played,
            rounds_solved: self.rounds_solved,
            standings,
            unsubmitted,
            submit_error,
        }
    }

    fn turn(&mut self) -> Result<Turn<'_>> {
        let round = match self.round.as_mut() {
            Some(round) if !round.is_over() => round,
            _ => return Err(Error::validation("no round in progress")),
        };
        Ok(Turn {
            round,
            player: &mut self.players[self.active],
            rules: &self.rules,
        })
    }

    /// End the active player's turn: close the round if nobody has attempts
    /// left, otherwise hand over to the next player who still has some.
    fn pass_turn(&mut self, event: TurnEvent) -> TurnReport {
        debug!("{event}");
        let count = self.players.len();
        let next = (1..=count)
            .map(|step| (self.active + step) % count)
            .find(|&index| self.players[index].attempts > 0);

        let round_end = match next {
            Some(index) => {
                self.active = index;
                None
            }
            None => {
                if let Some(round) = self.round.as_mut() {
                    round.finish(RoundOutcome::Exhausted);
                }
                self.rounds_played += 1;
                info!("round exhausted, answer was {:?}", self.answer());
                Some(RoundOutcome::Exhausted)
            }
        };
        TurnReport { event, round_end }
    }

    fn answer(&self) -> Option<&str> {
        self.round.as_ref().map(|round| round.item().answer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_item;
    use tempfile::tempdir;

    fn session(names: &[&str]) -> GameSession {
        GameSession::new(names.iter().copied(), GameRules::default()).unwrap()
    }

    #[test]
    fn roster_size_is_bounded() {
        let rules = GameRules::default();
        assert!(GameSession::new(Vec::<String>::new(), rules.clone()).is_err());
        assert!(GameSession::new(["a", "b", "c", "d", "e"], rules.clone()).is_err());
        assert!(GameSession::new(["a", "  "], rules.clone()).is_err());
        let session = GameSession::new([" ada ", "grace"], rules).unwrap();
        assert_eq!(session.players()[0].name(), "ada");
        assert!(session.players().iter().all(|p| p.score() == 0));
    }

    #[test]
    fn actions_need_a_round() {
        let mut game = session(&["ada"]);
        assert!(matches!(game.guess("x"), Err(Error::Validation(_))));
        assert!(matches!(game.reveal_letter(), Err(Error::Validation(_))));
        assert!(game.active_player().is_none());
    }

    #[test]
    fn empty_store_stops_the_round() {
        let mut game = session(&["ada"]);
        let store = ItemStore::create().unwrap();
        let mut selector = ItemSelector::seeded(1);
        assert!(matches!(
            game.draw_round(&store, &mut selector),
            Err(Error::EmptyStore)
        ));
        assert!(!game.in_round());
    }

    #[test]
    fn miss_then_letter_then_hit_scores_eighty() {
        let mut game = session(&["ada"]);
        game.start_round(sample_item("grace hopper")).unwrap();

        let miss = game.guess("alan turing").unwrap();
        assert!(matches!(
            miss.event,
            TurnEvent::Incorrect {
                attempts_left: 4,
                hint_unlocked: true,
                ..
            }
        ));
        assert_eq!(game.round().unwrap().hint_index(), 2);

        let reveal = game.reveal_letter().unwrap();
        assert!(matches!(
            reveal.event,
            TurnEvent::LetterRevealed {
                letter: 'g',
                round_value: 80,
                attempts_left: 3
            }
        ));
        assert_eq!(game.round().unwrap().mask().to_string(), "g____ ______");

        let hit = game.guess("Grace Hopper").unwrap();
        assert_eq!(
            hit.round_end,
            Some(RoundOutcome::Solved {
                player: 0,
                points: 80
            })
        );
        assert_eq!(game.players()[0].score(), 80);
        assert_eq!(game.players()[0].attempts(), 3);
        assert!(!game.in_round());
    }

    #[test]
    fn skip_and_guess_are_independent() {
        let mut game = session(&["ada", "grace"]);
        game.start_round(sample_item("hedy lamarr")).unwrap();

        let skip = game.skip(true).unwrap();
        assert!(matches!(skip.event, TurnEvent::Skipped { score: -30, .. }));
        assert_eq!(game.players()[0].score(), -30);
        assert_eq!(game.active_index(), Some(1));
        assert_eq!(game.round().unwrap().value(), 100);

        game.guess("hedylamarr").unwrap();
        assert_eq!(game.players()[0].score(), -30);
        assert_eq!(game.players()[1].score(), 100);
    }

    #[test]
    fn unconfirmed_skip_keeps_the_turn() {
        let mut game = session(&["ada", "grace"]);
        game.start_round(sample_item("x")).unwrap();
        let report = game.skip(false).unwrap();
        assert_eq!(report.event, TurnEvent::SkipCancelled);
        assert_eq!(game.active_index(), Some(0));
        assert_eq!(game.players()[0].score(), 0);
    }

    #[test]
    fn nothing_to_reveal_costs_nothing() {
        let mut game = session(&["ada", "grace"]);
        game.start_round(sample_item("ab")).unwrap();
        game.reveal_letter().unwrap();
        game.reveal_letter().unwrap();
        assert_eq!(game.active_index(), Some(0));

        let report = game.reveal_letter().unwrap();
        assert_eq!(report.event, TurnEvent::NothingToReveal);
        assert_eq!(game.active_index(), Some(0));
        assert_eq!(game.players()[0].attempts(), 4);
        assert_eq!(game.round().unwrap().value(), 60);
    }

    #[test]
    fn next_hint_is_free_and_passes_the_turn() {
        let mut game = session(&["ada", "grace"]);
        game.start_round(sample_item("x")).unwrap();
        let report = game.next_hint().unwrap();
        assert_eq!(report.event, TurnEvent::HintAdvanced { hint_index: 2 });
        assert_eq!(game.players()[0].attempts(), 5);
        assert_eq!(game.round().unwrap().value(), 100);
        assert_eq!(game.active_index(), Some(1));

        for _ in 0..3 {
            game.next_hint().unwrap();
        }
        assert_eq!(game.next_hint().unwrap().event, TurnEvent::NoMoreHints);
    }

    #[test]
    fn players_without_attempts_are_skipped() {
        let rules = GameRules {
            max_attempts: 1,
            ..GameRules::default()
        };
        let mut game = GameSession::new(["ada", "grace", "hedy"], rules).unwrap();
        game.start_round(sample_item("answer")).unwrap();

        game.guess("wrong").unwrap();
        assert_eq!(game.active_index(), Some(1));
        game.skip(true).unwrap();
        assert_eq!(game.active_index(), Some(2));
        game.guess("wrong").unwrap();
        // Ada is out of attempts, so the turn goes straight back to Grace.
        assert_eq!(game.active_index(), Some(1));
    }

    #[test]
    fn round_ends_when_everyone_is_out_of_attempts() {
        let rules = GameRules {
            max_attempts: 2,
            ..GameRules::default()
        };
        let mut game = GameSession::new(["ada", "grace"], rules).unwrap();
        game.start_round(sample_item("answer")).unwrap();

        for _ in 0..3 {
            assert!(game.guess("nope").unwrap().round_end.is_none());
        }
        let last = game.guess("nope").unwrap();
        assert_eq!(last.round_end, Some(RoundOutcome::Exhausted));
        assert!(!game.in_round());
        assert_eq!(game.rounds_played(), 1);
        assert!(game.players().iter().all(|p| p.score() == 0));
    }

    #[test]
    fn new_round_resets_attempts_and_first_player() {
        let mut game = session(&["ada", "grace"]);
        game.start_round(sample_item("x")).unwrap();
        game.guess("y").unwrap();
        game.guess("x").unwrap();

        let round = game.start_round(sample_item("z")).unwrap();
        assert_eq!(round.value(), 100);
        assert_eq!(round.hint_index(), 1);
        assert_eq!(game.active_index(), Some(0));
        assert!(game.players().iter().all(|p| p.attempts() == 5));
        assert!(game.start_round(sample_item("w")).is_err());
    }

    #[test]
    fn finish_submits_only_positive_scores() {
        let dir = tempdir().unwrap();
        let ledger = RankingLedger::new(dir.path().join("ranking.bin"));

        let mut game = session(&["ada", "grace", "hedy"]);
        game.start_round(sample_item("x")).unwrap();
        game.skip(true).unwrap();
        game.guess("x").unwrap();

        let summary = game.finish(&ledger);
        assert!(summary.submit_error.is_none());
        assert_eq!(summary.rounds_played, 1);
        assert_eq!(summary.rounds_solved, 1);
        let names: Vec<_> = summary.standings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["grace", "hedy", "ada"]);
        assert_eq!(summary.standings[0].rank, Some(1));
        assert_eq!(summary.standings[1].rank, None);

        let stored = ledger.load().unwrap().entries;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "grace");
        assert_eq!(stored[0].score, 100);
    }

    #[test]
    fn ledger_failure_keeps_standings() {
        let dir = tempdir().unwrap();
        // A directory cannot be read as a ledger file.
        let ledger = RankingLedger::new(dir.path());

        let mut game = session(&["ada", "grace", "hedy"]);
        game.start_round(sample_item("x")).unwrap();
        game.guess("x").unwrap();
        game.start_round(sample_item("y")).unwrap();
        game.reveal_letter().unwrap();
        game.guess("y").unwrap();

        let summary = game.finish(&ledger);
        assert!(summary.submit_error.is_some());
        assert_eq!(summary.unsubmitted, vec!["ada", "grace"]);
        let scores: Vec<_> = summary
            .standings
            .iter()
            .map(|s| (s.name.as_str(), s.score, s.rank))
            .collect();
        assert_eq!(
            scores,
            vec![("ada", 100, None), ("grace", 80, None), ("hedy", 0, None)]
        );
    }
}
