//! Bounded leaderboard persisted as a flat array of fixed-size records.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    error::{Error, LoadWarning, Result},
    store::codec::put_text,
};

/// Most entries the ledger keeps.
pub const MAX_ENTRIES: usize = 10;
/// Width of the name buffer in each record.
pub const NAME_WIDTH: usize = 50;
/// Size in bytes of one encoded entry.
pub const RECORD_LEN: usize = NAME_WIDTH + 4;

/// A submitted score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    /// Player name.
    pub name: String,
    /// Final session score.
    pub score: i32,
}

/// Entries read from the ledger file.
#[derive(Debug, Clone, Default)]
pub struct LedgerRead {
    /// Entries in ranked order.
    pub entries: Vec<RankingEntry>,
    /// Set when the file was missing or ended mid-record.
    pub warning: Option<LoadWarning>,
}

/// Top scores stored at a fixed path. Nothing is cached: every operation
/// reads the file, and `submit` rewrites it.
#[derive(Debug, Clone)]
pub struct RankingLedger {
    path: PathBuf,
}

impl RankingLedger {
    /// Ledger backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored entries. A missing file reads as an empty ledger.
    pub fn load(&self) -> Result<LedgerRead> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(LedgerRead {
                    entries: Vec::new(),
                    warning: Some(LoadWarning::Missing(self.path.clone())),
                })
            }
            Err(err) => return Err(Error::io("read", &self.path, err)),
        };

        let records = bytes.chunks_exact(RECORD_LEN);
        let partial = !records.remainder().is_empty();
        let entries: Vec<RankingEntry> = records.take(MAX_ENTRIES).map(decode_entry).collect();
        let warning = (partial && entries.len() < MAX_ENTRIES).then(|| LoadWarning::Truncated {
            path: self.path.clone(),
            recovered: entries.len(),
            expected: None,
        });
        if let Some(warning) = &warning {
            warn!("{warning}");
        }
        Ok(LedgerRead { entries, warning })
    }

    /// Add a score, keep the best [`MAX_ENTRIES`] sorted by score (earlier
    /// entries first on ties) and rewrite the file. Returns the 1-based
    /// position reached, or `None` when the score did not make the cut.
    pub fn submit(&self, name: &str, score: i32) -> Result<Option<usize>> {
        let mut entries = self.load()?.entries;
        let rank = entries.iter().filter(|entry| entry.score >= score).count() + 1;

        entries.push(RankingEntry {
            name: name.to_string(),
            score,
        });
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_ENTRIES);
        self.write(&entries)?;

        let rank = (rank <= MAX_ENTRIES).then_some(rank);
        info!(name, score, ?rank, "score submitted");
        Ok(rank)
    }

    /// Delete the ledger file. Returns whether there was one.
    pub fn reset(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("ranking reset ({})", self.path.display());
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::io("delete", &self.path, err)),
        }
    }

    fn write(&self, entries: &[RankingEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| Error::io("create", parent, err))?;
        }
        let mut bytes = Vec::with_capacity(entries.len() * RECORD_LEN);
        for entry in entries {
            put_text(&mut bytes, &entry.name, NAME_WIDTH);
            bytes.extend_from_slice(&entry.score.to_le_bytes());
        }
        fs::write(&self.path, bytes).map_err(|err| Error::io("write", &self.path, err))
    }
}

fn decode_entry(record: &[u8]) -> RankingEntry {
    let (name, score) = record.split_at(NAME_WIDTH);
    let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
    let mut code = [0u8; 4];
    code.copy_from_slice(score);
    RankingEntry {
        name: String::from_utf8_lossy(&name[..end]).into_owned(),
        score: i32::from_le_bytes(code),
    }
}
