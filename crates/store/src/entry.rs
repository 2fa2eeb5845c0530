//! Cached list of one entity type and its freshness metadata.
use api_types::{Identified, OwnerId};
use chrono::{DateTime, Utc};

use crate::reducer::{Action, reduce};

/// When, and for whom, the cached data was last fetched from the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Freshness {
    pub at: DateTime<Utc>,
    pub by: OwnerId,
}

/// Cached data plus freshness.
///
/// `data == None` is the empty sentinel: nothing was ever loaded (or the entry
/// was cleared). `freshness` is only set by a server fetch, so a fetch
/// timestamp without an owner (or the reverse) cannot be represented.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry<T> {
    pub data: Option<Vec<T>>,
    pub freshness: Option<Freshness>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            data: None,
            freshness: None,
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn is_fresh_for(&self, owner: &OwnerId) -> bool {
        self.freshness.is_some_and(|f| f.by == *owner)
    }
}

/// Holder of one [`CacheEntry`].
///
/// The `epoch` is bumped by every [`clear`](Self::clear). A fetch records the
/// epoch it started in and must not write its result if the epoch moved.
#[derive(Debug)]
pub struct EntityCache<T> {
    entry: CacheEntry<T>,
    epoch: u64,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            entry: CacheEntry::default(),
            epoch: 0,
        }
    }
}

impl<T> EntityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current data, `None` for the empty sentinel.
    pub fn get(&self) -> Option<&[T]> {
        self.entry.data.as_deref()
    }

    pub fn entry(&self) -> &CacheEntry<T> {
        &self.entry
    }

    /// Replaces the data and leaves freshness untouched.
    pub fn set(&mut self, data: Vec<T>) {
        self.entry.data = Some(data);
    }

    /// Replaces the data and stamps it as fetched now by `owner`.
    pub fn set_fetched(&mut self, data: Vec<T>, owner: OwnerId) {
        self.entry = CacheEntry {
            data: Some(data),
            freshness: Some(Freshness {
                at: Utc::now(),
                by: owner,
            }),
        };
    }

    pub fn clear(&mut self) {
        self.entry = CacheEntry::default();
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn is_fresh_for(&self, owner: &OwnerId) -> bool {
        self.entry.is_fresh_for(owner)
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.entry.freshness.map(|f| f.at)
    }

    pub fn fetched_by(&self) -> Option<OwnerId> {
        self.entry.freshness.map(|f| f.by)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl<T: Identified> EntityCache<T> {
    /// Runs `action` through the reducer and stores the result.
    pub fn apply(&mut self, action: Action<T>) {
        if matches!(action, Action::ClearData) {
            self.clear();
            return;
        }
        let entry = std::mem::take(&mut self.entry);
        self.entry = reduce(entry, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq)]
    struct Row(i64);

    fn owner() -> OwnerId {
        OwnerId::new(Uuid::new_v4())
    }

    #[test]
    fn set_fetched_round_trips_and_stamps_owner() {
        let alice = owner();
        let mut cache = EntityCache::new();
        cache.set_fetched(vec![Row(1), Row(2)], alice);

        assert_eq!(cache.get(), Some(&[Row(1), Row(2)][..]));
        assert_eq!(cache.fetched_by(), Some(alice));
        assert!(cache.fetched_at().is_some());
        assert!(cache.is_fresh_for(&alice));
        assert!(!cache.is_fresh_for(&owner()));
    }

    #[test]
    fn clear_resets_to_empty_and_bumps_epoch() {
        let mut cache = EntityCache::new();
        cache.set_fetched(vec![Row(1)], owner());
        let before = cache.epoch();

        cache.clear();

        assert_eq!(cache.get(), None);
        assert_eq!(cache.fetched_at(), None);
        assert_eq!(cache.fetched_by(), None);
        assert_eq!(cache.epoch(), before + 1);
    }

    #[test]
    fn set_keeps_freshness() {
        let alice = owner();
        let mut cache = EntityCache::new();
        cache.set_fetched(vec![Row(1)], alice);
        let stamped = cache.fetched_at();

        cache.set(vec![Row(7)]);

        assert_eq!(cache.get(), Some(&[Row(7)][..]));
        assert_eq!(cache.fetched_at(), stamped);
        assert_eq!(cache.fetched_by(), Some(alice));
    }

    #[test]
    fn set_on_empty_cache_is_not_fresh() {
        let mut cache = EntityCache::new();
        cache.set(vec![Row(1)]);
        assert!(cache.get().is_some());
        assert!(!cache.is_fresh_for(&owner()));
    }
}
