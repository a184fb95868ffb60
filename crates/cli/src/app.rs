use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use chrono::Local;
use crossterm::{
    cursor::MoveTo,
    execute,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use perfil_core::{
    command::trace_status,
    game::RoundOutcome,
    models::{Difficulty, Item, ItemPatch, MAX_HINTS},
    Command, GameSession, SessionSummary, Status, StatusLevel, TurnReport, Workspace,
};
use tracing::debug;

const MAIN_MENU: &[(&str, &str)] = &[
    ("1", "Insert item"),
    ("2", "List items"),
    ("3", "Update item"),
    ("4", "Find item"),
    ("5", "Delete item"),
    ("6", "Import catalog"),
    ("7", "Start multiplayer round"),
    ("8", "Show ranking"),
    ("9", "Reset ranking"),
    ("0", "Save and exit"),
];

/// Line-oriented terminal: prompts, re-prompts and status rendering.
pub struct Console<R, W> {
    input: R,
    output: W,
    styled: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// `styled` enables colours and screen clearing.
    pub fn new(input: R, output: W, styled: bool) -> Self {
        Self {
            input,
            output,
            styled,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.output, "{}", text.as_ref())?;
        Ok(())
    }

    fn heading(&mut self, text: &str) -> Result<()> {
        if self.styled {
            writeln!(self.output, "{}", text.bold().cyan())?;
        } else {
            writeln!(self.output, "{text}")?;
        }
        Ok(())
    }

    fn status(&mut self, status: &Status) -> Result<()> {
        trace_status(status);
        let tag = status.level.tag();
        if self.styled {
            let tag = match status.level {
                StatusLevel::Ok => tag.green(),
                StatusLevel::Warning => tag.yellow(),
                StatusLevel::Error => tag.red().bold(),
            };
            writeln!(self.output, "{tag} {}", status.message)?;
        } else {
            writeln!(self.output, "{status}")?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.styled {
            execute!(self.output, Clear(ClearType::All), MoveTo(0, 0))
                .context("failed to clear the screen")?;
        }
        Ok(())
    }

    fn prompt(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let mut buffer = String::new();
        if self.input.read_line(&mut buffer)? == 0 {
            bail!("input closed");
        }
        Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
    }

    fn prompt_non_blank(&mut self, label: &str) -> Result<String> {
        loop {
            let value = self.prompt(label)?;
            if !value.trim().is_empty() {
                return Ok(value.trim().to_string());
            }
            self.status(&Status::warning("a value is required"))?;
        }
    }

    fn choose_number(&mut self, label: &str, min: usize, max: usize) -> Result<usize> {
        loop {
            let raw = self.prompt(label)?;
            match raw.trim().parse::<usize>() {
                Ok(value) if (min..=max).contains(&value) => return Ok(value),
                _ => self.status(&Status::warning(format!(
                    "enter a number between {min} and {max}"
                )))?,
            }
        }
    }

    fn choose_difficulty(&mut self) -> Result<Difficulty> {
        for level in Difficulty::ALL {
            self.line(format!("  {} - {}", level.code(), level))?;
        }
        loop {
            let raw = self.prompt("Difficulty (1-5)")?;
            let Ok(code) = raw.trim().parse::<i64>() else {
                self.status(&Status::warning("enter the difficulty as a number"))?;
                continue;
            };
            match Difficulty::try_from(code) {
                Ok(level) => return Ok(level),
                Err(err) => self.status(&Status::from(&err))?,
            }
        }
    }

    fn confirm(&mut self, label: &str) -> Result<bool> {
        loop {
            let answer = self.prompt(&format!("{label} (y/n)"))?;
            match answer.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.status(&Status::warning("answer y or n"))?,
            }
        }
    }

    fn pause(&mut self) -> Result<()> {
        self.prompt("Press Enter to continue").map(|_| ())
    }
}

/// Menu-driven front end over a [`Workspace`].
pub struct PerfilApp<R, W> {
    workspace: Workspace,
    console: Console<R, W>,
}

impl<R: BufRead, W: Write> PerfilApp<R, W> {
    pub fn new(workspace: Workspace, console: Console<R, W>) -> Self {
        Self { workspace, console }
    }

    /// Show `notices`, then serve the main menu until the operator saves and
    /// exits. A fatal status ends the loop with an error.
    pub fn run(&mut self, notices: &[Status]) -> Result<()> {
        for notice in notices {
            self.console.status(notice)?;
        }

        loop {
            self.console.heading("=== Perfil ===")?;
            for (key, label) in MAIN_MENU {
                self.console.line(format!("{key}. {label}"))?;
            }
            let choice = self.console.choose_number("Option", 0, MAIN_MENU.len() - 1)?;
            debug!(choice, "menu");

            let command = match choice {
                1 => self.insert_item()?,
                2 => Some(Command::ListItems),
                3 => self.update_item()?,
                4 => Some(Command::FindItem(
                    self.console.prompt_non_blank("Answer to find")?,
                )),
                5 => Some(Command::DeleteItem(
                    self.console.prompt_non_blank("Answer to delete")?,
                )),
                6 => Some(Command::ImportCatalog(
                    self.console.prompt_non_blank("Catalog path")?.into(),
                )),
                7 => Some(Command::StartMultiplayerRound(self.read_roster()?)),
                8 => Some(Command::ListRanking),
                9 => Some(Command::ResetRanking {
                    confirmed: self.console.confirm("Delete every ranking entry?")?,
                }),
                _ => Some(Command::SaveAndExit),
            };
            let exiting = matches!(command, Some(Command::SaveAndExit));

            if let Some(command) = command {
                let response = self.workspace.execute(command);
                for line in &response.lines {
                    self.console.line(line)?;
                }
                self.console.status(&response.status)?;
                if response.status.is_fatal() {
                    bail!("{}", response.status.message);
                }
                if let Some(session) = response.session {
                    self.play(session)?;
                }
            }

            if exiting {
                return Ok(());
            }
            self.console.pause()?;
            self.console.clear()?;
        }
    }

    fn insert_item(&mut self) -> Result<Option<Command>> {
        let answer = self.console.prompt_non_blank("Answer")?;
        let mut hints: [String; MAX_HINTS] = Default::default();
        for (index, hint) in hints.iter_mut().enumerate() {
            *hint = self.console.prompt(&format!("Hint {}", index + 1))?.trim().to_string();
        }
        let category = self.console.prompt("Category")?;
        let difficulty = self.console.choose_difficulty()?;

        match Item::new(&answer, hints, &category, difficulty) {
            Ok(item) => Ok(Some(Command::InsertItem(item))),
            Err(err) => {
                self.console.status(&Status::from(&err))?;
                Ok(None)
            }
        }
    }

    fn update_item(&mut self) -> Result<Option<Command>> {
        let query = self.console.prompt_non_blank("Answer to update")?;
        if self.workspace.store().find(&query).is_none() {
            return Ok(Some(Command::FindItem(query)));
        }
        self.console.line("Leave a field blank to keep its value.")?;

        let mut patch = ItemPatch {
            answer: self.optional("New answer")?,
            category: self.optional("New category")?,
            ..ItemPatch::default()
        };
        for (index, slot) in patch.hints.iter_mut().enumerate() {
            *slot = self.optional(&format!("New hint {}", index + 1))?;
        }
        if self.console.confirm("Change the difficulty?")? {
            patch.difficulty = Some(self.console.choose_difficulty()?);
        }
        Ok(Some(Command::UpdateItem { query, patch }))
    }

    fn optional(&mut self, label: &str) -> Result<Option<String>> {
        let value = self.console.prompt(label)?;
        let value = value.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn read_roster(&mut self) -> Result<Vec<String>> {
        let max = self.workspace.config().rules.max_players;
        let count = self
            .console
            .choose_number(&format!("Number of players (1-{max})"), 1, max)?;
        (1..=count)
            .map(|n| self.console.prompt_non_blank(&format!("Player {n} name")))
            .collect()
    }

    fn play(&mut self, mut session: GameSession) -> Result<()> {
        loop {
            while session.in_round() {
                self.show_turn(&session)?;
                let report = match self.console.choose_number(
                    "1. Guess  2. Hint  3. Skip",
                    1,
                    3,
                )? {
                    1 => {
                        let guess = self.console.prompt("Your guess")?;
                        session.guess(&guess)?
                    }
                    2 => match self.hint_menu(&mut session)? {
                        Some(report) => report,
                        None => continue,
                    },
                    _ => {
                        let penalty = session.rules().skip_penalty;
                        let confirmed = self
                            .console
                            .confirm(&format!("Skip your turn for -{penalty} points?"))?;
                        session.skip(confirmed)?
                    }
                };
                self.show_report(&session, &report)?;
            }

            if !self.console.confirm("Play another round?")? {
                break;
            }
            self.console.clear()?;
            let status = self.workspace.next_round(&mut session);
            if status.level != StatusLevel::Ok {
                self.console.status(&status)?;
                break;
            }
        }

        let response = self.workspace.finish_session(session);
        if let Some(summary) = &response.summary {
            self.show_summary(summary)?;
        }
        for line in &response.lines {
            self.console.line(line)?;
        }
        self.console.status(&response.status)?;
        if response.status.is_fatal() {
            bail!("{}", response.status.message);
        }
        Ok(())
    }

    fn hint_menu(&mut self, session: &mut GameSession) -> Result<Option<TurnReport>> {
        let penalty = session.rules().letter_penalty;
        let prompt = format!("1. Reveal a letter (-{penalty})  2. Next hint  3. Back");
        let report = match self.console.choose_number(&prompt, 1, 3)? {
            1 => session.reveal_letter()?,
            2 => session.next_hint()?,
            // Backing out keeps the turn with the same player.
            _ => return Ok(None),
        };
        Ok(Some(report))
    }

    fn show_turn(&mut self, session: &GameSession) -> Result<()> {
        let (Some(round), Some(player)) = (session.round(), session.active_player()) else {
            return Ok(());
        };
        self.console.line("")?;
        self.console.heading(&format!("{}'s turn", player.name()))?;
        self.console.line(format!(
            "Attempts left: {} | Round value: {} | Total: {}",
            player.attempts(),
            round.value(),
            player.score()
        ))?;
        self.console.line(format!("Answer: {}", round.mask()))?;
        self.console.line(format!(
            "Hint {}/{}: {}",
            round.hint_index(),
            MAX_HINTS,
            round.current_hint()
        ))
    }

    fn show_report(&mut self, session: &GameSession, report: &TurnReport) -> Result<()> {
        let message = report.event.to_string();
        let status = if report.event.is_warning() {
            Status::warning(message)
        } else {
            Status::ok(message)
        };
        self.console.status(&status)?;

        let answer = session
            .round()
            .map(|round| round.item().answer().to_string())
            .unwrap_or_default();
        match &report.round_end {
            Some(RoundOutcome::Solved { player, points }) => {
                let name = session
                    .players()
                    .get(*player)
                    .map(|p| p.name())
                    .unwrap_or_default();
                self.console
                    .line(format!("{name} wins the round with {points} points: \"{answer}\""))?;
            }
            Some(RoundOutcome::Exhausted) => {
                self.console
                    .line(format!("Nobody guessed it. The answer was \"{answer}\""))?;
            }
            None => {}
        }
        Ok(())
    }

    fn show_summary(&mut self, summary: &SessionSummary) -> Result<()> {
        let format = "%Y-%m-%d %H:%M";
        self.console.heading("=== Final standings ===")?;
        self.console.line(format!(
            "Played {} to {}",
            summary.started_at.with_timezone(&Local).format(format),
            summary.finished_at.with_timezone(&Local).format(format)
        ))
    }
}
