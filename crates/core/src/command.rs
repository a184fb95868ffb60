//! Command dispatcher: owns the store, selector and ledger for one process
//! and turns each menu command into a categorised status.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use tracing::{error, info, warn};

use crate::{
    config::AppConfig,
    error::{Error, LoadWarning, Result, Severity},
    game::{GameSession, SessionSummary},
    models::{Item, ItemPatch},
    ranking::RankingLedger,
    store::{CatalogLoader, CatalogReport, CatalogStop, ItemSelector, ItemStore},
};

/// Category of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// The command did what was asked.
    Ok,
    /// The command was refused or only partly applied; the program goes on.
    Warning,
    /// The program cannot continue.
    Error,
}

impl StatusLevel {
    /// Tag printed in front of the message.
    pub fn tag(self) -> &'static str {
        match self {
            StatusLevel::Ok => "[OK]",
            StatusLevel::Warning => "[Warning]",
            StatusLevel::Error => "[Error]",
        }
    }
}

/// One line of feedback for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Category.
    pub level: StatusLevel,
    /// Human readable text.
    pub message: String,
}

impl Status {
    /// Successful outcome.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Ok, message)
    }

    /// Recoverable problem.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Warning, message)
    }

    /// Unrecoverable problem.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, message)
    }

    fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Whether the front end should stop.
    pub fn is_fatal(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.tag(), self.message)
    }
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        match err.severity() {
            Severity::Warning => Status::warning(err.to_string()),
            Severity::Fatal => Status::error(err.to_string()),
        }
    }
}

impl From<&LoadWarning> for Status {
    fn from(warning: &LoadWarning) -> Self {
        Status::warning(warning.to_string())
    }
}

/// Operations offered by the main menu.
#[derive(Debug, Clone)]
pub enum Command {
    /// Append a validated item.
    InsertItem(Item),
    /// Show every item.
    ListItems,
    /// Replace the supplied fields of the item matching `query`.
    UpdateItem {
        /// Answer to look up.
        query: String,
        /// Fields to replace.
        patch: ItemPatch,
    },
    /// Show the item matching the query.
    FindItem(String),
    /// Remove the item matching the query.
    DeleteItem(String),
    /// Append records from a delimited catalog file.
    ImportCatalog(PathBuf),
    /// Form a roster and play the first round.
    StartMultiplayerRound(Vec<String>),
    /// Show the ranking.
    ListRanking,
    /// Delete the ranking, only when confirmed.
    ResetRanking {
        /// Operator answered yes.
        confirmed: bool,
    },
    /// Persist the store before leaving.
    SaveAndExit,
}

/// What a command produced.
#[derive(Debug)]
pub struct Response {
    /// Outcome line.
    pub status: Status,
    /// Listing output, one entry per line.
    pub lines: Vec<String>,
    /// Session started by [`Command::StartMultiplayerRound`], with its
    /// first round in progress.
    pub session: Option<GameSession>,
    /// Recap produced by [`Workspace::finish_session`].
    pub summary: Option<SessionSummary>,
}

impl Response {
    fn status(status: Status) -> Self {
        Self {
            status,
            lines: Vec::new(),
            session: None,
            summary: None,
        }
    }

    fn listing(status: Status, lines: Vec<String>) -> Self {
        Self {
            lines,
            ..Self::status(status)
        }
    }
}

impl From<Error> for Response {
    fn from(err: Error) -> Self {
        if err.is_fatal() {
            error!("{err}");
        }
        Response::status(Status::from(&err))
    }
}

/// Everything one process works on.
#[derive(Debug)]
pub struct Workspace {
    config: AppConfig,
    store: ItemStore,
    selector: ItemSelector,
    ledger: RankingLedger,
    catalog: CatalogLoader,
}

impl Workspace {
    /// Load the store named by `config`, importing the catalog when the
    /// store starts out empty. Returns the startup notices to show.
    pub fn open(config: AppConfig) -> Result<(Self, Vec<Status>)> {
        Self::open_with(config, ItemSelector::from_entropy())
    }

    /// Like [`Workspace::open`] with a caller-provided selector.
    pub fn open_with(config: AppConfig, selector: ItemSelector) -> Result<(Self, Vec<Status>)> {
        let mut notices = Vec::new();
        let loaded = ItemStore::load(config.store_path(), config.initial_capacity)?;
        match &loaded.warning {
            Some(LoadWarning::Missing(_)) | None => {}
            Some(warning) => notices.push(Status::from(warning)),
        }

        let mut workspace = Self {
            store: loaded.store,
            selector,
            ledger: RankingLedger::new(config.ranking_path()),
            catalog: CatalogLoader::new(config.default_category.clone()),
            config,
        };

        let catalog = workspace.config.catalog_path();
        if workspace.store.is_empty() && catalog.is_file() {
            let report = workspace.catalog.load_file(&catalog, &mut workspace.store)?;
            notices.push(catalog_status(&catalog, &report));
        }
        info!("workspace ready with {} items", workspace.store.len());
        Ok((workspace, notices))
    }

    /// Settings in force.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Items currently loaded.
    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// Ledger the sessions submit to.
    pub fn ledger(&self) -> &RankingLedger {
        &self.ledger
    }

    /// Run one command.
    pub fn execute(&mut self, command: Command) -> Response {
        let result = match command {
            Command::InsertItem(item) => self.insert(item),
            Command::ListItems => Ok(self.list_items()),
            Command::UpdateItem { query, patch } => self.update(&query, patch),
            Command::FindItem(query) => Ok(self.find(&query)),
            Command::DeleteItem(query) => self.delete(&query),
            Command::ImportCatalog(path) => self.import(path),
            Command::StartMultiplayerRound(roster) => self.start_session(roster),
            Command::ListRanking => self.list_ranking(),
            Command::ResetRanking { confirmed } => self.reset_ranking(confirmed),
            Command::SaveAndExit => self.save(),
        };
        result.unwrap_or_else(Response::from)
    }

    /// Draw the next item for a session whose previous round has ended.
    pub fn next_round(&mut self, session: &mut GameSession) -> Status {
        match session.draw_round(&self.store, &mut self.selector) {
            Ok(_) => Status::ok(format!("round {} started", session.rounds_played() + 1)),
            Err(err) => Status::from(&err),
        }
    }

    /// Close a session, submitting its positive scores to the ledger. The
    /// standings are listed even when the ledger could not be written, in
    /// which case the status is an error naming the players left out.
    pub fn finish_session(&self, session: GameSession) -> Response {
        let summary = session.finish(&self.ledger);
        let lines = summary
            .standings
            .iter()
            .enumerate()
            .map(|(position, standing)| {
                let mut line =
                    format!("{}. {} - {} points", position + 1, standing.name, standing.score);
                if let Some(rank) = standing.rank {
                    line.push_str(&format!(" (ranking #{rank})"));
                }
                line
            })
            .collect();
        let status = match &summary.submit_error {
            Some(err) => Status::error(format!(
                "{err}; scores not recorded for {}",
                summary.unsubmitted.join(", ")
            )),
            None => Status::ok(format!(
                "session over after {} rounds, {} solved",
                summary.rounds_played, summary.rounds_solved
            )),
        };
        Response {
            summary: Some(summary),
            ..Response::listing(status, lines)
        }
    }

    fn insert(&mut self, item: Item) -> Result<Response> {
        let answer = item.answer().to_string();
        self.store.insert(item)?;
        Ok(Response::status(Status::ok(format!(
            "inserted \"{answer}\" ({} items, capacity {})",
            self.store.len(),
            self.store.capacity()
        ))))
    }

    fn list_items(&self) -> Response {
        if self.store.is_empty() {
            return Response::status(Status::warning("the store is empty"));
        }
        let mut lines = Vec::new();
        for (index, item) in self.store.list().iter().enumerate() {
            lines.extend(describe(index, item));
        }
        Response::listing(
            Status::ok(format!("{} items", self.store.len())),
            lines,
        )
    }

    fn find(&self, query: &str) -> Response {
        match self.store.find(query) {
            Some((index, item)) => Response::listing(
                Status::ok(format!("found \"{}\"", item.answer())),
                describe(index, item),
            ),
            None => Error::NotFound {
                query: query.trim().to_string(),
            }
            .into(),
        }
    }

    fn update(&mut self, query: &str, patch: ItemPatch) -> Result<Response> {
        if patch.is_empty() {
            return Ok(Response::status(Status::warning("nothing to update")));
        }
        let item = self.store.update(query, patch)?;
        Ok(Response::status(Status::ok(format!(
            "updated \"{}\"",
            item.answer()
        ))))
    }

    fn delete(&mut self, query: &str) -> Result<Response> {
        let item = self.store.delete(query)?;
        Ok(Response::status(Status::ok(format!(
            "deleted \"{}\" ({} items left)",
            item.answer(),
            self.store.len()
        ))))
    }

    fn import(&mut self, path: PathBuf) -> Result<Response> {
        let report = self.catalog.load_file(&path, &mut self.store)?;
        Ok(Response::status(catalog_status(&path, &report)))
    }

    fn start_session(&mut self, roster: Vec<String>) -> Result<Response> {
        let mut session = GameSession::new(roster, self.config.rules.clone())?;
        session.draw_round(&self.store, &mut self.selector)?;
        let status = Status::ok(format!(
            "session started with {} players",
            session.players().len()
        ));
        Ok(Response {
            session: Some(session),
            ..Response::status(status)
        })
    }

    fn list_ranking(&self) -> Result<Response> {
        let read = self.ledger.load()?;
        if read.entries.is_empty() {
            return Ok(Response::status(Status::warning("no records")));
        }
        let lines = read
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| format!("{}. {} - {}", position + 1, entry.name, entry.score))
            .collect();
        let status = match &read.warning {
            Some(warning) => Status::from(warning),
            None => Status::ok(format!("{} records", read.entries.len())),
        };
        Ok(Response::listing(status, lines))
    }

    fn reset_ranking(&self, confirmed: bool) -> Result<Response> {
        if !confirmed {
            return Ok(Response::status(Status::warning("ranking reset cancelled")));
        }
        let status = if self.ledger.reset()? {
            Status::ok("ranking cleared")
        } else {
            Status::ok("ranking was already empty")
        };
        Ok(Response::status(status))
    }

    fn save(&self) -> Result<Response> {
        let path = self.config.store_path();
        self.store.save(&path)?;
        Ok(Response::status(Status::ok(format!(
            "saved {} items to {}",
            self.store.len(),
            path.display()
        ))))
    }
}

fn catalog_status(path: &Path, report: &CatalogReport) -> Status {
    let message = format!("{}: {report}", path.display());
    match report.stop {
        CatalogStop::Malformed { .. } => Status::warning(message),
        CatalogStop::Exhausted | CatalogStop::CapacityReached => Status::ok(message),
    }
}

fn describe(index: usize, item: &Item) -> Vec<String> {
    let mut lines = vec![format!(
        "{}. {} | {} | {}",
        index + 1,
        item.answer(),
        item.category(),
        item.difficulty()
    )];
    for (position, hint) in item.hints().iter().enumerate() {
        if !hint.is_empty() {
            lines.push(format!("   hint {}: {hint}", position + 1));
        }
    }
    lines
}

/// Log a response status at the matching level.
pub fn trace_status(status: &Status) {
    match status.level {
        StatusLevel::Ok => info!("{}", status.message),
        StatusLevel::Warning => warn!("{}", status.message),
        StatusLevel::Error => error!("{}", status.message),
    }
}
