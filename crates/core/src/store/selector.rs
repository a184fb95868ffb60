use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::models::Item;

use super::ItemStore;

/// Draws random items from a store.
///
/// The random source is created once and reused, so consecutive picks are
/// independent draws from the same stream.
#[derive(Debug, Clone)]
pub struct ItemSelector<R = StdRng> {
    rng: R,
}

impl ItemSelector<StdRng> {
    /// Selector seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Selector with a reproducible sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ItemSelector<R> {
    /// Wrap an existing random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// A uniformly random live item, or `None` when the store is empty.
    pub fn pick<'a>(&mut self, store: &'a ItemStore) -> Option<&'a Item> {
        if store.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..store.len());
        store.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_item;

    #[test]
    fn empty_store_yields_nothing() {
        let store = ItemStore::create().unwrap();
        let mut selector = ItemSelector::seeded(7);
        assert!(selector.pick(&store).is_none());
    }

    #[test]
    fn picks_every_item_eventually() {
        let mut store = ItemStore::create().unwrap();
        for name in ["a", "b", "c"] {
            store.insert(sample_item(name)).unwrap();
        }
        let mut selector = ItemSelector::seeded(42);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let item = selector.pick(&store).expect("non-empty store");
            let (index, _) = store.find(item.answer()).expect("picked item is stored");
            seen[index] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut store = ItemStore::create().unwrap();
        for n in 0..10 {
            store.insert(sample_item(&format!("item {n}"))).unwrap();
        }
        let mut left = ItemSelector::seeded(99);
        let mut right = ItemSelector::seeded(99);
        for _ in 0..20 {
            assert_eq!(
                left.pick(&store).map(Item::answer),
                right.pick(&store).map(Item::answer)
            );
        }
    }
}
