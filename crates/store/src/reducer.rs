//! Local mutations applied to a [`CacheEntry`].
//!
//! The reducer mirrors writes the server has already confirmed. It never
//! performs I/O and never fails: a mutation that cannot apply is logged and
//! the state is returned as it was.
use api_types::{Identified, OwnerId};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::entry::{CacheEntry, Freshness};

#[derive(Clone, Debug, PartialEq)]
pub enum Action<T> {
    /// Data fetched from the server for `fetched_by`.
    FetchData {
        data: Vec<T>,
        fetched_by: OwnerId,
        fetched_at: DateTime<Utc>,
    },
    /// Replaces the data, keeping freshness.
    UpdateData(Vec<T>),
    ClearData,
    AddItem(T),
    UpdateById(T),
    RemoveById(i64),
    RemoveMultipleById(Vec<i64>),
}

impl<T> Action<T> {
    fn name(&self) -> &'static str {
        match self {
            Self::FetchData { .. } => "FETCH_DATA",
            Self::UpdateData(_) => "UPDATE_DATA",
            Self::ClearData => "CLEAR_DATA",
            Self::AddItem(_) => "ADD_ITEM",
            Self::UpdateById(_) => "UPDATE_BY_ID",
            Self::RemoveById(_) => "REMOVE_BY_ID",
            Self::RemoveMultipleById(_) => "REMOVE_MULTIPLE_BY_ID",
        }
    }
}

pub fn reduce<T: Identified>(state: CacheEntry<T>, action: Action<T>) -> CacheEntry<T> {
    let name = action.name();
    match action {
        Action::FetchData {
            data,
            fetched_by,
            fetched_at,
        } => CacheEntry {
            data: Some(data),
            freshness: Some(Freshness {
                at: fetched_at,
                by: fetched_by,
            }),
        },
        Action::UpdateData(data) => CacheEntry {
            data: Some(data),
            freshness: state.freshness,
        },
        Action::ClearData => CacheEntry::default(),
        Action::AddItem(item) => {
            let mut list = state.data.unwrap_or_default();
            list.insert(0, item);
            CacheEntry {
                data: Some(list),
                freshness: state.freshness,
            }
        }
        Action::UpdateById(item) => {
            let Some(target) = item.numeric_id() else {
                warn!(action = name, "entry has no numeric id, ignoring");
                return state;
            };
            with_list(state, name, |mut list| {
                if let Some(slot) = list
                    .iter_mut()
                    .find(|entry| entry.numeric_id() == Some(target))
                {
                    *slot = item;
                }
                list
            })
        }
        Action::RemoveById(id) => with_list(state, name, |list| {
            list.into_iter()
                .filter(|entry| entry.numeric_id() != Some(id))
                .collect()
        }),
        Action::RemoveMultipleById(ids) => with_list(state, name, |list| {
            list.into_iter()
                .filter(|entry| !entry.numeric_id().is_some_and(|id| ids.contains(&id)))
                .collect()
        }),
    }
}

fn with_list<T>(
    state: CacheEntry<T>,
    action: &'static str,
    apply: impl FnOnce(Vec<T>) -> Vec<T>,
) -> CacheEntry<T> {
    let CacheEntry { data, freshness } = state;
    match data {
        Some(list) if !list.is_empty() => CacheEntry {
            data: Some(apply(list)),
            freshness,
        },
        data => {
            warn!(action, "mutation dispatched on an empty cache, ignoring");
            CacheEntry { data, freshness }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: Option<i64>,
        label: &'static str,
    }

    impl Identified for Row {
        fn numeric_id(&self) -> Option<i64> {
            self.id
        }
    }

    fn row(id: i64) -> Row {
        Row {
            id: Some(id),
            label: "row",
        }
    }

    fn entry(ids: &[i64]) -> CacheEntry<Row> {
        CacheEntry {
            data: Some(ids.iter().copied().map(row).collect()),
            freshness: None,
        }
    }

    fn ids(entry: &CacheEntry<Row>) -> Vec<i64> {
        entry
            .data
            .iter()
            .flatten()
            .filter_map(|r| r.id)
            .collect()
    }

    #[test]
    fn add_item_prepends() {
        let state = reduce(entry(&[1, 2]), Action::AddItem(row(3)));
        assert_eq!(ids(&state), vec![3, 1, 2]);
    }

    #[test]
    fn add_item_on_empty_creates_singleton() {
        let state = reduce(CacheEntry::default(), Action::AddItem(row(5)));
        assert_eq!(ids(&state), vec![5]);
    }

    #[test]
    fn update_by_id_replaces_in_place() {
        let updated = Row {
            id: Some(2),
            label: "renamed",
        };
        let state = reduce(entry(&[1, 2, 3]), Action::UpdateById(updated.clone()));
        let data = state.data.unwrap();
        assert_eq!(data[1], updated);
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn update_by_id_with_unknown_id_is_noop() {
        let before = entry(&[1, 2, 3]);
        let after = reduce(before.clone(), Action::UpdateById(row(42)));
        assert_eq!(after, before);
    }

    #[test]
    fn update_without_numeric_id_is_noop() {
        let before = entry(&[1, 2]);
        let shapeless = Row {
            id: None,
            label: "draft",
        };
        let after = reduce(before.clone(), Action::UpdateById(shapeless));
        assert_eq!(after, before);
    }

    #[test]
    fn remove_multiple_preserves_order() {
        let state = reduce(entry(&[1, 2, 3, 4]), Action::RemoveMultipleById(vec![2, 4]));
        assert_eq!(ids(&state), vec![1, 3]);
    }

    #[test]
    fn remove_by_id_filters_match() {
        let state = reduce(entry(&[1, 2, 3]), Action::RemoveById(1));
        assert_eq!(ids(&state), vec![2, 3]);
    }

    #[test]
    fn mutations_on_empty_or_missing_state_are_noops() {
        let none: CacheEntry<Row> = CacheEntry::default();
        assert_eq!(reduce(none.clone(), Action::RemoveById(1)), none);
        assert_eq!(reduce(none.clone(), Action::UpdateById(row(1))), none);

        let empty: CacheEntry<Row> = CacheEntry {
            data: Some(Vec::new()),
            freshness: None,
        };
        assert_eq!(
            reduce(empty.clone(), Action::RemoveMultipleById(vec![1])),
            empty
        );
    }

    #[test]
    fn local_mutations_keep_freshness() {
        let stamp = Freshness {
            at: Utc::now(),
            by: OwnerId::new(Uuid::new_v4()),
        };
        let before = CacheEntry {
            data: Some(vec![row(1)]),
            freshness: Some(stamp),
        };
        let after = reduce(before, Action::AddItem(row(2)));
        assert_eq!(after.freshness, Some(stamp));
    }

    #[test]
    fn fetch_and_clear_passthrough() {
        let owner = OwnerId::new(Uuid::new_v4());
        let at = Utc::now();
        let fetched = reduce(
            CacheEntry::default(),
            Action::FetchData {
                data: vec![row(1)],
                fetched_by: owner,
                fetched_at: at,
            },
        );
        assert!(fetched.is_fresh_for(&owner));
        assert_eq!(fetched.freshness.map(|f| f.at), Some(at));

        let cleared = reduce(fetched, Action::ClearData);
        assert_eq!(cleared, CacheEntry::default());
    }
}
