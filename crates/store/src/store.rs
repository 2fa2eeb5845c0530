//! Per-entity store shared by every consumer of that entity type.
use std::sync::Arc;

use api_types::{Identified, OwnerId};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};

use crate::{
    backend::Backend,
    coordinator::FetchCoordinator,
    entry::EntityCache,
    error::{BackendError, StoreError},
    reducer::Action,
    registry::EntityKind,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Expose the fetch through `is_loading` while it runs.
    pub show_loading: bool,
    /// Fetch even when the cache is fresh for the current owner.
    pub force: bool,
}

/// Point-in-time view of a store, as handed to UI consumers.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreSnapshot<T> {
    pub data: Option<Vec<T>>,
    pub is_loading: bool,
    pub is_fetched: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub fetched_by: Option<OwnerId>,
    pub error: Option<StoreError>,
}

#[derive(Debug)]
pub(crate) struct StoreState<T> {
    pub(crate) cache: EntityCache<T>,
    pub(crate) error: Option<StoreError>,
}

pub struct EntityStore<T, B> {
    kind: EntityKind,
    pub(crate) backend: Arc<B>,
    identity: watch::Receiver<Option<OwnerId>>,
    pub(crate) state: Mutex<StoreState<T>>,
    pub(crate) coordinator: FetchCoordinator,
}

impl<T, B> EntityStore<T, B>
where
    T: Identified + Clone + Send + Sync,
{
    /// Creates an empty store reading the signed-in owner from `identity`.
    pub fn new(
        kind: EntityKind,
        backend: Arc<B>,
        identity: watch::Receiver<Option<OwnerId>>,
    ) -> Self {
        Self {
            kind,
            backend,
            identity,
            state: Mutex::new(StoreState {
                cache: EntityCache::new(),
                error: None,
            }),
            coordinator: FetchCoordinator::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn current_owner(&self) -> Option<OwnerId> {
        *self.identity.borrow()
    }

    pub async fn data(&self) -> Option<Vec<T>> {
        self.state.lock().await.cache.get().map(<[T]>::to_vec)
    }

    /// Cached data, only if it was fetched for `owner`.
    pub async fn data_for(&self, owner: &OwnerId) -> Option<Vec<T>> {
        let state = self.state.lock().await;
        if !state.cache.is_fresh_for(owner) {
            return None;
        }
        state.cache.get().map(<[T]>::to_vec)
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    pub async fn is_fetched(&self) -> bool {
        self.state.lock().await.cache.fetched_at().is_some()
    }

    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.cache.fetched_at()
    }

    pub async fn fetched_by(&self) -> Option<OwnerId> {
        self.state.lock().await.cache.fetched_by()
    }

    pub async fn error(&self) -> Option<StoreError> {
        self.state.lock().await.error.clone()
    }

    pub async fn snapshot(&self) -> StoreSnapshot<T> {
        let state = self.state.lock().await;
        StoreSnapshot {
            data: state.cache.get().map(<[T]>::to_vec),
            is_loading: self.coordinator.is_loading(),
            is_fetched: state.cache.fetched_at().is_some(),
            fetched_at: state.cache.fetched_at(),
            fetched_by: state.cache.fetched_by(),
            error: state.error.clone(),
        }
    }

    /// Drops cached data, freshness and error. A fetch still in flight will
    /// not write its result.
    pub async fn reset_store(&self) {
        let mut state = self.state.lock().await;
        state.cache.clear();
        state.error = None;
    }

    pub async fn dispatch(&self, action: Action<T>) {
        self.state.lock().await.cache.apply(action);
    }

    pub async fn add_item(&self, item: T) {
        self.dispatch(Action::AddItem(item)).await;
    }

    pub async fn update_by_id(&self, item: T) {
        self.dispatch(Action::UpdateById(item)).await;
    }

    pub async fn remove_by_id(&self, id: i64) {
        self.dispatch(Action::RemoveById(id)).await;
    }

    pub async fn remove_multiple_by_id(&self, ids: Vec<i64>) {
        self.dispatch(Action::RemoveMultipleById(ids)).await;
    }
}

impl<T, B> EntityStore<T, B>
where
    T: Identified + Clone + Send + Sync,
    B: Backend<T>,
{
    /// Creates `payload` on the server, then mirrors the confirmed entity.
    pub async fn create(&self, payload: &T) -> Result<T, BackendError> {
        let created = self.backend.create_one(payload).await?;
        self.add_item(created.clone()).await;
        Ok(created)
    }

    pub async fn update(&self, payload: &T) -> Result<T, BackendError> {
        let updated = self.backend.update_one(payload).await?;
        self.update_by_id(updated.clone()).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<T, BackendError> {
        let deleted = self.backend.delete_one(id).await?;
        self.remove_by_id(id).await;
        Ok(deleted)
    }
}
