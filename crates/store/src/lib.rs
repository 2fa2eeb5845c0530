//! Client-side entity stores for the dashboard.
//!
//! Every entity kind (categories, payment methods, subscriptions, ...) gets an
//! [`EntityStore`]: a cached list with freshness metadata, refreshed through a
//! single-flight [`Backend`] fetch and kept in sync with server-confirmed
//! writes by a pure reducer. The [`StoreRegistry`] builds all of them and
//! clears them whenever the signed-in owner changes.
//!
//! [`schedule`] and [`period`] derive views from cached snapshots: next
//! execution dates of monthly subscriptions and the month-to-date consumption
//! of budgets.
//!
//! Cached data is a mirror. Matching `fetched_by` against the current owner
//! only avoids showing one account's data to another in the same session; the
//! server decides what each owner may see.
pub use backend::Backend;
pub use entry::{CacheEntry, EntityCache, Freshness};
pub use error::{BackendError, StoreError};
pub use reducer::{Action, reduce};
pub use registry::{DashboardBackend, EntityKind, StoreRegistry};
pub use store::{EntityStore, RefreshOptions, StoreSnapshot};

mod backend;
mod coordinator;
mod entry;
mod error;
pub mod period;
mod reducer;
mod registry;
pub mod schedule;
mod store;
