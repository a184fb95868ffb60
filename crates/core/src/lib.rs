#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Perfil guessing game.
//!
//! This crate hosts the item store and its file formats, the multiplayer
//! round engine, the ranking ledger, configuration handling and the
//! command dispatcher used by the console front end.

pub mod command;
pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod ranking;
pub mod store;

pub use command::{Command, Response, Status, StatusLevel, Workspace};
pub use config::AppConfig;
pub use error::{Error, LoadWarning, Result, Severity};
pub use game::{GameRules, GameSession, SessionSummary, TurnEvent, TurnReport};
pub use models::{Difficulty, Item, ItemPatch};
pub use ranking::{RankingEntry, RankingLedger};
pub use store::{CatalogLoader, ItemSelector, ItemStore};
