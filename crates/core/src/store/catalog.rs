use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    models::{Difficulty, Item, MAX_HINTS},
};

use super::ItemStore;

const FIELD_SEPARATOR: char = ';';
const FIELDS_PER_RECORD: usize = 2 + MAX_HINTS;

/// Why ingestion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogStop {
    /// Every record was read.
    Exhausted,
    /// The store filled up; remaining records were left unread.
    CapacityReached,
    /// A record could not be parsed; it and everything after it was skipped.
    Malformed {
        /// 1-based line number in the source.
        line: usize,
        /// What was wrong with the record.
        reason: String,
    },
}

/// Outcome of a catalog ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReport {
    /// Items appended to the store.
    pub appended: usize,
    /// Why ingestion ended.
    pub stop: CatalogStop,
}

impl fmt::Display for CatalogReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "imported {} items", self.appended)?;
        match &self.stop {
            CatalogStop::Exhausted => Ok(()),
            CatalogStop::CapacityReached => write!(f, " (store full, remaining records skipped)"),
            CatalogStop::Malformed { line, reason } => {
                write!(f, " (stopped at line {line}: {reason})")
            }
        }
    }
}

/// Reads `answer;difficulty;hint1;...;hint5` records into an [`ItemStore`].
///
/// The first line is a header and is ignored. Every later line must be a
/// complete UTF-8 record; the first one that is not, blank lines included,
/// ends ingestion.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    default_category: String,
}

impl CatalogLoader {
    /// Loader assigning `default_category` to every imported item, since the
    /// text format carries none.
    pub fn new(default_category: impl Into<String>) -> Self {
        Self {
            default_category: default_category.into(),
        }
    }

    /// Ingest the catalog at `path`. Failing to open the file is fatal.
    pub fn load_file(&self, path: impl AsRef<Path>, store: &mut ItemStore) -> Result<CatalogReport> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| Error::io("open", path, err))?;
        let report = self
            .ingest(BufReader::new(file), store)
            .map_err(|err| match err {
                Error::Io { action, source, .. } => Error::io(action, path, source),
                other => other,
            })?;
        info!("catalog {}: {report}", path.display());
        Ok(report)
    }

    /// Ingest records from `reader`, never growing the store.
    pub fn ingest<R: BufRead>(&self, reader: R, store: &mut ItemStore) -> Result<CatalogReport> {
        let mut appended = 0;
        for (index, line) in reader.split(b'\n').enumerate().skip(1) {
            let line = line.map_err(|err| Error::io("read", "catalog", err))?;
            if store.len() >= store.capacity() {
                return Ok(CatalogReport {
                    appended,
                    stop: CatalogStop::CapacityReached,
                });
            }
            let record = String::from_utf8(line)
                .map_err(|_| "line is not valid UTF-8".to_string())
                .and_then(|line| self.parse_record(&line));
            match record {
                Ok(item) => {
                    store.insert(item)?;
                    appended += 1;
                }
                Err(reason) => {
                    warn!("catalog line {}: {reason}", index + 1);
                    return Ok(CatalogReport {
                        appended,
                        stop: CatalogStop::Malformed {
                            line: index + 1,
                            reason,
                        },
                    });
                }
            }
        }

        Ok(CatalogReport {
            appended,
            stop: CatalogStop::Exhausted,
        })
    }

    fn parse_record(&self, line: &str) -> std::result::Result<Item, String> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() != FIELDS_PER_RECORD {
            return Err(format!(
                "expected {FIELDS_PER_RECORD} fields, found {}",
                fields.len()
            ));
        }

        let code: i64 = fields[1]
            .parse()
            .map_err(|_| format!("difficulty \"{}\" is not a number", fields[1]))?;
        let difficulty = Difficulty::try_from(code).map_err(|err| err.to_string())?;
        let mut hints: [String; MAX_HINTS] = Default::default();
        for (slot, hint) in hints.iter_mut().zip(&fields[2..]) {
            *slot = hint.to_string();
        }

        Item::new(fields[0], hints, &self.default_category, difficulty)
            .map_err(|err| err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "answer;difficulty;hint1;hint2;hint3;hint4;hint5\n";

    fn loader() -> CatalogLoader {
        CatalogLoader::new("computing")
    }

    #[test]
    fn ingests_well_formed_records() -> Result<()> {
        let source = format!(
            "{HEADER}Ada Lovelace;2;first programmer;analytical engine;poet's daughter;notes;1843\n\
             Alan Turing;3;enigma;machine;test;morphogenesis;bletchley\n"
        );
        let mut store = ItemStore::create()?;
        let report = loader().ingest(source.as_bytes(), &mut store)?;

        assert_eq!(report.appended, 2);
        assert_eq!(report.stop, CatalogStop::Exhausted);
        let item = store.get(0).expect("first item");
        assert_eq!(item.answer(), "ada lovelace");
        assert_eq!(item.difficulty(), Difficulty::Easy);
        assert_eq!(item.category(), "computing");
        assert_eq!(item.hint(5), Some("1843"));
        Ok(())
    }

    #[test]
    fn stops_at_first_malformed_record() -> Result<()> {
        let source = format!(
            "{HEADER}a;1;h1;h2;h3;h4;h5\n\
             b;1;h1;h2\n\
             c;1;h1;h2;h3;h4;h5\n"
        );
        let mut store = ItemStore::create()?;
        let report = loader().ingest(source.as_bytes(), &mut store)?;

        assert_eq!(report.appended, 1);
        assert!(matches!(report.stop, CatalogStop::Malformed { line: 3, .. }));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn blank_line_ends_ingestion() -> Result<()> {
        let source = format!("{HEADER}a;1;h1;h2;h3;h4;h5\n\nb;1;h1;h2;h3;h4;h5\n");
        let mut store = ItemStore::create()?;
        let report = loader().ingest(source.as_bytes(), &mut store)?;

        assert_eq!(report.appended, 1);
        assert!(matches!(report.stop, CatalogStop::Malformed { line: 3, .. }));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn non_utf8_line_is_malformed_not_fatal() -> Result<()> {
        let mut source = format!("{HEADER}ada;1;a;b;c;d;e\n").into_bytes();
        source.extend_from_slice(b"s\xe3o paulo;2;a;b;c;d;e\n");
        source.extend_from_slice(b"grace;1;a;b;c;d;e\n");
        let mut store = ItemStore::create()?;
        let report = loader().ingest(source.as_slice(), &mut store)?;

        assert_eq!(report.appended, 1);
        assert_eq!(
            report.stop,
            CatalogStop::Malformed {
                line: 3,
                reason: "line is not valid UTF-8".to_string(),
            }
        );
        assert_eq!(store.get(0).map(Item::answer), Some("ada"));
        Ok(())
    }

    #[test]
    fn non_utf8_header_is_ignored() -> Result<()> {
        let mut source = b"resposta;n\xedvel;d1;d2;d3;d4;d5\n".to_vec();
        source.extend_from_slice(b"ada;1;a;b;c;d;e\n");
        let mut store = ItemStore::create()?;
        let report = loader().ingest(source.as_slice(), &mut store)?;
        assert_eq!(report.appended, 1);
        assert_eq!(report.stop, CatalogStop::Exhausted);
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_difficulty() -> Result<()> {
        let source = format!("{HEADER}a;7;h1;h2;h3;h4;h5\n");
        let mut store = ItemStore::create()?;
        let report = loader().ingest(source.as_bytes(), &mut store)?;
        assert_eq!(report.appended, 0);
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn never_grows_the_store() -> Result<()> {
        let mut source = HEADER.to_string();
        for n in 0..5 {
            source.push_str(&format!("item {n};1;a;b;c;d;e\n"));
        }
        let mut store = ItemStore::with_capacity(3)?;
        let report = loader().ingest(source.as_bytes(), &mut store)?;

        assert_eq!(report.appended, 3);
        assert_eq!(report.stop, CatalogStop::CapacityReached);
        assert_eq!(store.capacity(), 3);
        Ok(())
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        let mut store = ItemStore::create().unwrap();
        let err = loader()
            .load_file(dir.path().join("absent.csv"), &mut store)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn loads_from_disk() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        fs::write(&path, format!("{HEADER}hedy lamarr;4;a;b;c;d;e\r\n")).unwrap();

        let mut store = ItemStore::create()?;
        let report = loader().load_file(&path, &mut store)?;
        assert_eq!(report.appended, 1);
        assert_eq!(store.get(0).map(Item::answer), Some("hedy lamarr"));
        Ok(())
    }
}
