//! Binary layout of the item file.
//!
//! A little-endian `u32` item count followed by that many fixed-size
//! records. Text fields are NUL-padded UTF-8 buffers; the difficulty is an
//! `i32` code between 1 and 5.

use std::{
    io::{self, Read, Write},
    path::Path,
};

use crate::{
    error::LoadWarning,
    models::{Difficulty, Item, MAX_HINTS},
};

use super::ItemStore;

/// Width of the answer buffer.
pub const ANSWER_WIDTH: usize = 102;
/// Width of each hint buffer.
pub const HINT_WIDTH: usize = 200;
/// Width of the category buffer.
pub const CATEGORY_WIDTH: usize = 102;
/// Size in bytes of one encoded item.
pub const RECORD_LEN: usize = ANSWER_WIDTH + MAX_HINTS * HINT_WIDTH + CATEGORY_WIDTH + 4;

/// Write the whole store: count header, then one record per item.
pub fn encode<W: Write>(store: &ItemStore, writer: &mut W) -> io::Result<()> {
    let count = u32::try_from(store.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many items to encode"))?;
    writer.write_all(&count.to_le_bytes())?;
    for item in store.list() {
        writer.write_all(&encode_item(item))?;
    }
    Ok(())
}

fn encode_item(item: &Item) -> Vec<u8> {
    let mut record = Vec::with_capacity(RECORD_LEN);
    put_text(&mut record, item.answer(), ANSWER_WIDTH);
    for hint in item.hints() {
        put_text(&mut record, hint, HINT_WIDTH);
    }
    put_text(&mut record, item.category(), CATEGORY_WIDTH);
    record.extend_from_slice(&item.difficulty().code().to_le_bytes());
    record
}

/// Append `text` as a `width`-byte buffer, keeping at least one trailing NUL.
pub(crate) fn put_text(out: &mut Vec<u8>, text: &str, width: usize) {
    let mut end = text.len().min(width - 1);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    out.extend_from_slice(&text.as_bytes()[..end]);
    out.resize(out.len() + width - end, 0);
}

/// Why decoding ended before the announced count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStop {
    /// The input ended mid-header or mid-record.
    Truncated,
    /// A record could not be turned into an item.
    Corrupt {
        /// Zero-based record index.
        record: usize,
        /// Description of the defect.
        reason: String,
    },
}

/// Items read from a binary stream.
#[derive(Debug)]
pub struct Decoded {
    /// Items recovered in file order.
    pub items: Vec<Item>,
    /// Count announced by the header, if it could be read.
    pub expected: Option<usize>,
    /// Set when fewer than `expected` items were recovered.
    pub stop: Option<DecodeStop>,
}

impl Decoded {
    /// Describe an early stop as a load warning for `path`.
    pub fn warning(&self, path: &Path) -> Option<LoadWarning> {
        match self.stop.as_ref()? {
            DecodeStop::Truncated => Some(LoadWarning::Truncated {
                path: path.to_path_buf(),
                recovered: self.items.len(),
                expected: self.expected,
            }),
            DecodeStop::Corrupt { record, reason } => Some(LoadWarning::Corrupt {
                path: path.to_path_buf(),
                record: *record,
                reason: reason.clone(),
            }),
        }
    }
}

/// Read items until the announced count is reached or the data runs out.
/// Only genuine read failures are returned as errors.
pub fn decode<R: Read>(mut reader: R) -> io::Result<Decoded> {
    let mut header = [0u8; 4];
    if !read_full(&mut reader, &mut header)? {
        return Ok(Decoded {
            items: Vec::new(),
            expected: None,
            stop: Some(DecodeStop::Truncated),
        });
    }
    let expected = u32::from_le_bytes(header) as usize;

    let mut items = Vec::new();
    let mut record = vec![0u8; RECORD_LEN];
    for index in 0..expected {
        if !read_full(&mut reader, &mut record)? {
            return Ok(Decoded {
                items,
                expected: Some(expected),
                stop: Some(DecodeStop::Truncated),
            });
        }
        match decode_item(&record) {
            Ok(item) => items.push(item),
            Err(reason) => {
                return Ok(Decoded {
                    items,
                    expected: Some(expected),
                    stop: Some(DecodeStop::Corrupt {
                        record: index,
                        reason,
                    }),
                })
            }
        }
    }

    Ok(Decoded {
        items,
        expected: Some(expected),
        stop: None,
    })
}

/// Fill `buf` completely; `Ok(false)` when the stream ends first.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}

fn decode_item(record: &[u8]) -> Result<Item, String> {
    let mut rest = record;
    let answer = get_text(take(&mut rest, ANSWER_WIDTH), "answer")?;
    let mut hints: [String; MAX_HINTS] = Default::default();
    for (index, hint) in hints.iter_mut().enumerate() {
        *hint = get_text(take(&mut rest, HINT_WIDTH), &format!("hint {}", index + 1))?;
    }
    let category = get_text(take(&mut rest, CATEGORY_WIDTH), "category")?;

    let mut code = [0u8; 4];
    code.copy_from_slice(take(&mut rest, 4));
    let difficulty =
        Difficulty::try_from(i64::from(i32::from_le_bytes(code))).map_err(|err| err.to_string())?;

    Item::new(&answer, hints, &category, difficulty).map_err(|err| err.to_string())
}

fn take<'a>(rest: &mut &'a [u8], width: usize) -> &'a [u8] {
    let (field, tail) = rest.split_at(width);
    *rest = tail;
    field
}

fn get_text(field: &[u8], name: &str) -> Result<String, String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec()).map_err(|_| format!("{name} is not valid UTF-8"))
}
