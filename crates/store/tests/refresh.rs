use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use api_types::{OwnerId, category::Category};
use store::{Backend, BackendError, EntityKind, EntityStore, RefreshOptions, StoreError};
use tokio::sync::{Mutex, Notify, watch};
use uuid::Uuid;

enum Reply {
    Data(Vec<Category>),
    Transport,
    Cancelled,
}

struct Scripted {
    calls: AtomicUsize,
    gated: bool,
    gate: Notify,
    reply: Mutex<Reply>,
    fail_writes: AtomicBool,
    next_id: AtomicI64,
}

impl Scripted {
    fn new(data: Vec<Category>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gated: false,
            gate: Notify::new(),
            reply: Mutex::new(Reply::Data(data)),
            fail_writes: AtomicBool::new(false),
            next_id: AtomicI64::new(100),
        }
    }

    fn gated(data: Vec<Category>) -> Self {
        Self {
            gated: true,
            ..Self::new(data)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn reply_with(&self, reply: Reply) {
        *self.reply.lock().await = reply;
    }

    fn write_result(&self, payload: &Category) -> Result<Category, BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("503: unavailable".to_string()));
        }
        Ok(payload.clone())
    }
}

impl Backend<Category> for Scripted {
    async fn fetch_all(&self) -> Result<Vec<Category>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.gated {
            self.gate.notified().await;
        }
        match &*self.reply.lock().await {
            Reply::Data(data) => Ok(data.clone()),
            Reply::Transport => Err(BackendError::Transport("connection reset".to_string())),
            Reply::Cancelled => Err(BackendError::Cancelled),
        }
    }

    async fn create_one(&self, payload: &Category) -> Result<Category, BackendError> {
        let mut created = self.write_result(payload)?;
        created.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn update_one(&self, payload: &Category) -> Result<Category, BackendError> {
        self.write_result(payload)
    }

    async fn delete_one(&self, id: i64) -> Result<Category, BackendError> {
        self.write_result(&category(id, "deleted"))
    }
}

fn category(id: i64, name: &str) -> Category {
    Category {
        id,
        name: name.to_string(),
        description: None,
    }
}

fn owner() -> OwnerId {
    OwnerId::new(Uuid::new_v4())
}

fn store_for(
    backend: &Arc<Scripted>,
    owner: Option<OwnerId>,
) -> (
    EntityStore<Category, Scripted>,
    watch::Sender<Option<OwnerId>>,
) {
    let (owner_tx, identity) = watch::channel(owner);
    let store = EntityStore::new(EntityKind::Categories, Arc::clone(backend), identity);
    (store, owner_tx)
}

fn forced() -> RefreshOptions {
    RefreshOptions {
        show_loading: false,
        force: true,
    }
}

#[tokio::test]
async fn refresh_without_owner_is_a_noop() {
    let backend = Arc::new(Scripted::new(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, None);

    assert!(!store.refresh(true).await);
    assert_eq!(backend.calls(), 0);
    assert_eq!(store.data().await, None);
}

#[tokio::test]
async fn refresh_stamps_owner_and_then_hits_cache() {
    let alice = owner();
    let backend = Arc::new(Scripted::new(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, Some(alice));

    assert!(store.refresh(true).await);
    assert!(store.refresh(true).await);

    assert_eq!(backend.calls(), 1);
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.data, Some(vec![category(1, "Food")]));
    assert!(snapshot.is_fetched);
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.fetched_by, Some(alice));
    assert_eq!(snapshot.error, None);
}

#[tokio::test]
async fn forced_refresh_always_fetches() {
    let backend = Arc::new(Scripted::new(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, Some(owner()));

    assert!(store.refresh(false).await);
    assert!(store.refresh_with(forced()).await);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn concurrent_refreshes_share_one_fetch() {
    let backend = Arc::new(Scripted::gated(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, Some(owner()));

    let (first, second, ()) = tokio::join!(store.refresh(true), store.refresh(false), async {
        backend.gate.notify_one();
    });

    assert!(first);
    assert!(second);
    assert_eq!(backend.calls(), 1);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn followers_share_the_leader_failure() {
    let backend = Arc::new(Scripted::gated(Vec::new()));
    backend.reply_with(Reply::Transport).await;
    let (store, _owner) = store_for(&backend, Some(owner()));

    let (first, second, ()) = tokio::join!(store.refresh(false), store.refresh(false), async {
        backend.gate.notify_one();
    });

    assert!(!first);
    assert!(!second);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn is_loading_only_while_a_loading_fetch_runs() {
    let backend = Arc::new(Scripted::gated(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, Some(owner()));

    let (ok, ()) = tokio::join!(store.refresh(true), async {
        tokio::task::yield_now().await;
        assert!(store.is_loading());
        backend.gate.notify_one();
    });

    assert!(ok);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn failed_refresh_keeps_stale_data_and_records_error() {
    let backend = Arc::new(Scripted::new(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, Some(owner()));
    assert!(store.refresh(false).await);
    let stamped = store.fetched_at().await;

    backend.reply_with(Reply::Transport).await;
    assert!(!store.refresh_with(forced()).await);

    assert_eq!(store.data().await, Some(vec![category(1, "Food")]));
    assert_eq!(store.fetched_at().await, stamped);
    assert!(matches!(store.error().await, Some(StoreError::Transport(_))));

    backend
        .reply_with(Reply::Data(vec![category(2, "Rent")]))
        .await;
    assert!(store.refresh_with(forced()).await);
    assert_eq!(store.error().await, None);
    assert_eq!(store.data().await, Some(vec![category(2, "Rent")]));
}

#[tokio::test]
async fn invalid_payload_is_rejected_as_a_whole() {
    let backend = Arc::new(Scripted::new(vec![category(1, "Food"), category(2, " ")]));
    let (store, _owner) = store_for(&backend, Some(owner()));

    assert!(!store.refresh(false).await);

    assert_eq!(store.data().await, None);
    assert!(!store.is_fetched().await);
    assert!(matches!(
        store.error().await,
        Some(StoreError::Validation(_))
    ));
}

#[tokio::test]
async fn cancelled_fetch_is_neither_success_nor_error() {
    let backend = Arc::new(Scripted::new(Vec::new()));
    backend.reply_with(Reply::Cancelled).await;
    let (store, _owner) = store_for(&backend, Some(owner()));

    assert!(store.refresh(true).await);

    assert_eq!(store.error().await, None);
    assert_eq!(store.fetched_at().await, None);
    assert_eq!(store.fetched_by().await, None);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn dropping_the_leader_releases_the_guard() {
    let backend = Arc::new(Scripted::gated(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, Some(owner()));

    let aborted = tokio::time::timeout(Duration::from_millis(20), store.refresh(true)).await;
    assert!(aborted.is_err());
    assert!(!store.is_loading());
    assert_eq!(store.fetched_at().await, None);

    backend.gate.notify_one();
    assert!(store.refresh(false).await);
    assert_eq!(backend.calls(), 2);
    assert!(store.is_fetched().await);
}

#[tokio::test]
async fn owner_change_makes_cache_stale() {
    let alice = owner();
    let bob = owner();
    let backend = Arc::new(Scripted::new(vec![category(1, "Food")]));
    let (store, owner_tx) = store_for(&backend, Some(alice));
    assert!(store.refresh(false).await);

    owner_tx.send_replace(Some(bob));

    assert_eq!(store.data_for(&bob).await, None);
    assert!(store.refresh(false).await);
    assert_eq!(backend.calls(), 2);
    assert_eq!(store.fetched_by().await, Some(bob));
    assert_eq!(store.data_for(&alice).await, None);
}

#[tokio::test]
async fn fetch_landing_after_reset_is_discarded() {
    let backend = Arc::new(Scripted::gated(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, Some(owner()));

    let (ok, ()) = tokio::join!(store.refresh(false), async {
        tokio::task::yield_now().await;
        store.reset_store().await;
        backend.gate.notify_one();
    });

    assert!(!ok);
    assert_eq!(store.data().await, None);
    assert_eq!(store.error().await, None);
}

#[tokio::test]
async fn confirmed_writes_are_mirrored() {
    let backend = Arc::new(Scripted::new(vec![category(1, "Food"), category(2, "Rent")]));
    let (store, _owner) = store_for(&backend, Some(owner()));
    assert!(store.refresh(false).await);

    let created = store.create(&category(0, "Travel")).await.unwrap();
    assert_eq!(created.id, 100);
    store.update(&category(2, "Housing")).await.unwrap();
    store.delete(1).await.unwrap();

    assert_eq!(
        store.data().await,
        Some(vec![category(100, "Travel"), category(2, "Housing")])
    );
    assert!(store.is_fetched().await);
}

#[tokio::test]
async fn rejected_write_leaves_cache_untouched() {
    let backend = Arc::new(Scripted::new(vec![category(1, "Food")]));
    let (store, _owner) = store_for(&backend, Some(owner()));
    assert!(store.refresh(false).await);

    backend.fail_writes.store(true, Ordering::SeqCst);
    assert!(store.update(&category(1, "Groceries")).await.is_err());
    assert!(store.delete(1).await.is_err());

    assert_eq!(store.data().await, Some(vec![category(1, "Food")]));
}

#[tokio::test]
async fn local_actions_on_empty_store_do_not_panic() {
    let backend = Arc::new(Scripted::new(Vec::new()));
    let (store, _owner) = store_for(&backend, Some(owner()));

    store.remove_by_id(1).await;
    store.update_by_id(category(1, "Food")).await;
    store.remove_multiple_by_id(vec![1, 2]).await;
    assert_eq!(store.data().await, None);

    store.add_item(category(4, "Gifts")).await;
    assert_eq!(store.data().await, Some(vec![category(4, "Gifts")]));
    assert!(!store.is_fetched().await);
}
