//! One store per entity kind, built once at start-up.
//!
//! The registry owns the identity channel every store reads the signed-in
//! owner from. Changing the owner (sign-in as someone else, sign-out)
//! publishes the new owner, then clears all stores.
use std::{fmt, sync::Arc};

use api_types::{
    OwnerId, budget::Budget, category::Category, payment_method::PaymentMethod,
    stock::StockPosition, subscription::Subscription, transaction::Transaction,
    watchlist::Watchlist,
};
use tokio::sync::watch;
use tracing::info;

use crate::{backend::Backend, store::EntityStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Categories,
    PaymentMethods,
    Subscriptions,
    Transactions,
    StockPositions,
    Watchlists,
    Budgets,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        Self::Categories,
        Self::PaymentMethods,
        Self::Subscriptions,
        Self::Transactions,
        Self::StockPositions,
        Self::Watchlists,
        Self::Budgets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::PaymentMethods => "payment_methods",
            Self::Subscriptions => "subscriptions",
            Self::Transactions => "transactions",
            Self::StockPositions => "stock_positions",
            Self::Watchlists => "watchlists",
            Self::Budgets => "budgets",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend able to serve every entity kind of the dashboard.
pub trait DashboardBackend:
    Backend<Category>
    + Backend<PaymentMethod>
    + Backend<Subscription>
    + Backend<Transaction>
    + Backend<StockPosition>
    + Backend<Watchlist>
    + Backend<Budget>
{
}

impl<B> DashboardBackend for B where
    B: Backend<Category>
        + Backend<PaymentMethod>
        + Backend<Subscription>
        + Backend<Transaction>
        + Backend<StockPosition>
        + Backend<Watchlist>
        + Backend<Budget>
{
}

pub struct StoreRegistry<B> {
    owner: watch::Sender<Option<OwnerId>>,
    pub categories: EntityStore<Category, B>,
    pub payment_methods: EntityStore<PaymentMethod, B>,
    pub subscriptions: EntityStore<Subscription, B>,
    pub transactions: EntityStore<Transaction, B>,
    pub stock_positions: EntityStore<StockPosition, B>,
    pub watchlists: EntityStore<Watchlist, B>,
    pub budgets: EntityStore<Budget, B>,
}

impl<B: DashboardBackend> StoreRegistry<B> {
    pub fn new(backend: Arc<B>) -> Self {
        let (owner, identity) = watch::channel(None);
        Self {
            categories: EntityStore::new(
                EntityKind::Categories,
                Arc::clone(&backend),
                identity.clone(),
            ),
            payment_methods: EntityStore::new(
                EntityKind::PaymentMethods,
                Arc::clone(&backend),
                identity.clone(),
            ),
            subscriptions: EntityStore::new(
                EntityKind::Subscriptions,
                Arc::clone(&backend),
                identity.clone(),
            ),
            transactions: EntityStore::new(
                EntityKind::Transactions,
                Arc::clone(&backend),
                identity.clone(),
            ),
            stock_positions: EntityStore::new(
                EntityKind::StockPositions,
                Arc::clone(&backend),
                identity.clone(),
            ),
            watchlists: EntityStore::new(
                EntityKind::Watchlists,
                Arc::clone(&backend),
                identity.clone(),
            ),
            budgets: EntityStore::new(EntityKind::Budgets, backend, identity),
            owner,
        }
    }

    pub fn owner(&self) -> Option<OwnerId> {
        *self.owner.borrow()
    }

    /// Subscribes to owner changes.
    pub fn identity(&self) -> watch::Receiver<Option<OwnerId>> {
        self.owner.subscribe()
    }

    pub async fn sign_in(&self, owner: OwnerId) {
        self.set_owner(Some(owner)).await;
    }

    pub async fn sign_out(&self) {
        self.set_owner(None).await;
    }

    async fn set_owner(&self, owner: Option<OwnerId>) {
        if self.owner() == owner {
            return;
        }
        // Published before the clear: a fetch still in flight sees the new
        // owner or the bumped epoch when it lands and is discarded.
        self.owner.send_replace(owner);
        self.reset_all().await;
        match owner {
            Some(owner) => info!(%owner, "owner changed, stores cleared"),
            None => info!("signed out, stores cleared"),
        }
    }

    pub async fn reset_all(&self) {
        tokio::join!(
            self.categories.reset_store(),
            self.payment_methods.reset_store(),
            self.subscriptions.reset_store(),
            self.transactions.reset_store(),
            self.stock_positions.reset_store(),
            self.watchlists.reset_store(),
            self.budgets.reset_store(),
        );
    }

    /// Refreshes every store concurrently. `true` only if all succeeded.
    pub async fn refresh_all(&self, show_loading: bool) -> bool {
        let results = tokio::join!(
            self.categories.refresh(show_loading),
            self.payment_methods.refresh(show_loading),
            self.subscriptions.refresh(show_loading),
            self.transactions.refresh(show_loading),
            self.stock_positions.refresh(show_loading),
            self.watchlists.refresh(show_loading),
            self.budgets.refresh(show_loading),
        );
        let (a, b, c, d, e, f, g) = results;
        a && b && c && d && e && f && g
    }
}
