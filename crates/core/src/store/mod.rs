//! Growable item collection with binary and catalog persistence.

/// Delimited text catalog ingestion.
pub mod catalog;
/// Fixed-layout binary encoding of the store.
pub mod codec;
/// Random item selection.
pub mod selector;

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use tracing::{debug, info, warn};

use crate::{
    error::{Error, LoadWarning, Result},
    models::{Item, ItemPatch},
};

pub use catalog::{CatalogLoader, CatalogReport, CatalogStop};
pub use selector::ItemSelector;

/// Capacity of a store created without an explicit size.
pub const DEFAULT_CAPACITY: usize = 10;

/// Ordered collection of items in insertion order.
///
/// Capacity is tracked explicitly: it starts at the requested size, doubles
/// whenever an insert finds the store full and never shrinks.
#[derive(Debug, Clone)]
pub struct ItemStore {
    items: Vec<Item>,
    capacity: usize,
}

/// Result of reading a store from disk.
#[derive(Debug)]
pub struct StoreLoad {
    /// Items recovered from the file.
    pub store: ItemStore,
    /// Set when the file was missing or damaged.
    pub warning: Option<LoadWarning>,
}

impl ItemStore {
    /// Create an empty store with [`DEFAULT_CAPACITY`].
    pub fn create() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty store able to hold `capacity` items before growing.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let mut items = Vec::new();
        items
            .try_reserve_exact(capacity)
            .map_err(|source| Error::Allocation {
                what: "the item store",
                source,
            })?;
        Ok(Self { items, capacity })
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no items are stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items the store can hold before it has to grow.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Item at `index`, in insertion order.
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// All live items in insertion order.
    pub fn list(&self) -> &[Item] {
        &self.items
    }

    /// Append an item, doubling capacity first when the store is full.
    /// On allocation failure the store is left exactly as it was.
    pub fn insert(&mut self, item: Item) -> Result<()> {
        if self.items.len() == self.capacity {
            self.grow()?;
        }
        debug!(answer = item.answer(), "inserting item");
        self.items.push(item);
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        let target = self.capacity.saturating_mul(2);
        self.items
            .try_reserve_exact(target - self.items.len())
            .map_err(|source| Error::Allocation {
                what: "growing the item store",
                source,
            })?;
        debug!(from = self.capacity, to = target, "item store grew");
        self.capacity = target;
        Ok(())
    }

    /// First item whose answer matches `query`, ignoring case and whitespace.
    pub fn find(&self, query: &str) -> Option<(usize, &Item)> {
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| item.matches(query))
    }

    /// Replace the supplied fields of the first item matching `query`.
    pub fn update(&mut self, query: &str, patch: ItemPatch) -> Result<&Item> {
        let index = self.position(query)?;
        let item = &mut self.items[index];
        item.apply(patch)?;
        Ok(&*item)
    }

    /// Remove the first item matching `query`, shifting later items left.
    pub fn delete(&mut self, query: &str) -> Result<Item> {
        let index = self.position(query)?;
        Ok(self.items.remove(index))
    }

    fn position(&self, query: &str) -> Result<usize> {
        self.find(query)
            .map(|(index, _)| index)
            .ok_or_else(|| Error::NotFound {
                query: query.trim().to_string(),
            })
    }

    /// Write the store to `path` in the binary layout.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| Error::io("create", parent, err))?;
        }
        let file = File::create(path).map_err(|err| Error::io("create", path, err))?;
        let mut writer = BufWriter::new(file);
        codec::encode(self, &mut writer)
            .and_then(|_| writer.flush())
            .map_err(|err| Error::io("write", path, err))?;
        info!("saved {} items to {}", self.len(), path.display());
        Ok(())
    }

    /// Read a store from `path`. A missing file yields an empty store with
    /// `capacity` and a warning rather than an error.
    pub fn load(path: impl AsRef<Path>, capacity: usize) -> Result<StoreLoad> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("no item file at {}, starting empty", path.display());
                return Ok(StoreLoad {
                    store: Self::with_capacity(capacity)?,
                    warning: Some(LoadWarning::Missing(path.to_path_buf())),
                });
            }
            Err(err) => return Err(Error::io("open", path, err)),
        };

        let decoded =
            codec::decode(BufReader::new(file)).map_err(|err| Error::io("read", path, err))?;
        let warning = decoded.warning(path);
        if let Some(warning) = &warning {
            warn!("{warning}");
        }

        let mut store = Self::with_capacity(capacity)?;
        for item in decoded.items {
            store.insert(item)?;
        }
        info!("loaded {} items from {}", store.len(), path.display());
        Ok(StoreLoad { store, warning })
    }
}
