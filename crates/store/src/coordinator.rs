//! Single-flight refresh of an [`EntityStore`].
//!
//! Each store owns one [`FetchCoordinator`], a two-state machine:
//!
//! - `Idle`: no fetch in flight.
//! - `Fetching`: a leader is talking to the backend. The state carries the
//!   receiving half of the leader's outcome channel, so late callers wait for
//!   the same result instead of starting a second request.
//!
//! The state lives in a [`watch::Sender`], so the check-and-set in
//! [`FetchCoordinator::begin`] is a single `send_if_modified` call. The leader
//! holds a [`FlightGuard`] that always puts the machine back to `Idle` and
//! publishes an outcome, including when the leader future is dropped mid-fetch.
use api_types::{Identified, Validate};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    backend::Backend,
    error::BackendError,
    store::{EntityStore, RefreshOptions},
};

#[derive(Clone, Debug)]
enum Flight {
    Idle,
    Fetching {
        outcome: watch::Receiver<Option<bool>>,
        show_loading: bool,
    },
}

#[derive(Debug)]
pub(crate) struct FetchCoordinator {
    flight: watch::Sender<Flight>,
}

pub(crate) enum Ticket<'a> {
    Leader(FlightGuard<'a>),
    Follower(watch::Receiver<Option<bool>>),
}

impl FetchCoordinator {
    pub(crate) fn new() -> Self {
        let (flight, _) = watch::channel(Flight::Idle);
        Self { flight }
    }

    pub(crate) fn begin(&self, show_loading: bool) -> Ticket<'_> {
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let mut joined = None;
        self.flight.send_if_modified(|state| match state {
            Flight::Fetching { outcome, .. } => {
                joined = Some(outcome.clone());
                false
            }
            Flight::Idle => {
                *state = Flight::Fetching {
                    outcome: outcome_rx,
                    show_loading,
                };
                true
            }
        });

        match joined {
            Some(outcome) => Ticket::Follower(outcome),
            None => Ticket::Leader(FlightGuard {
                flight: &self.flight,
                outcome: outcome_tx,
                settled: None,
            }),
        }
    }

    #[cfg(test)]
    fn is_fetching(&self) -> bool {
        matches!(*self.flight.borrow(), Flight::Fetching { .. })
    }

    pub(crate) fn is_loading(&self) -> bool {
        matches!(
            *self.flight.borrow(),
            Flight::Fetching {
                show_loading: true,
                ..
            }
        )
    }
}

/// Waits for the leader of the current flight to publish its outcome.
pub(crate) async fn join(mut outcome: watch::Receiver<Option<bool>>) -> bool {
    match outcome.wait_for(Option::is_some).await {
        Ok(settled) => {
            let value = *settled;
            value.unwrap_or(false)
        }
        Err(_) => false,
    }
}

pub(crate) struct FlightGuard<'a> {
    flight: &'a watch::Sender<Flight>,
    outcome: watch::Sender<Option<bool>>,
    settled: Option<bool>,
}

impl FlightGuard<'_> {
    pub(crate) fn settle(mut self, ok: bool) -> bool {
        self.settled = Some(ok);
        ok
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Dropped without settling: the leader was cancelled.
        let ok = self.settled.unwrap_or(true);
        self.flight.send_replace(Flight::Idle);
        self.outcome.send_replace(Some(ok));
    }
}

impl<T, B> EntityStore<T, B>
where
    T: Identified + Validate + Clone + Send + Sync,
    B: Backend<T>,
{
    /// Refreshes the cache unless it is already fresh for the current owner.
    ///
    /// Resolves `true` on success, cache hit or cancellation, `false` when
    /// nobody is signed in, on error, or when the result was discarded because
    /// the owner changed (or the store was reset) during the fetch.
    pub async fn refresh(&self, show_loading: bool) -> bool {
        self.refresh_with(RefreshOptions {
            show_loading,
            force: false,
        })
        .await
    }

    pub async fn refresh_with(&self, options: RefreshOptions) -> bool {
        let entity = self.kind().as_str();
        let Some(owner) = self.current_owner() else {
            debug!(entity, "refresh skipped, nobody signed in");
            return false;
        };

        if !options.force && self.state.lock().await.cache.is_fresh_for(&owner) {
            debug!(entity, "cache hit");
            return true;
        }

        let guard = match self.coordinator.begin(options.show_loading) {
            Ticket::Follower(outcome) => {
                debug!(entity, "joining in-flight fetch");
                return join(outcome).await;
            }
            Ticket::Leader(guard) => guard,
        };

        let epoch = {
            let state = self.state.lock().await;
            // A previous leader may have landed between the check and `begin`.
            if !options.force && state.cache.is_fresh_for(&owner) {
                return guard.settle(true);
            }
            state.cache.epoch()
        };

        let result = self.backend.fetch_all().await.and_then(validate_all);

        let mut state = self.state.lock().await;
        let ok = match result {
            Ok(data) => {
                if state.cache.epoch() != epoch || self.current_owner() != Some(owner) {
                    debug!(entity, "discarding fetch for a stale session");
                    false
                } else {
                    info!(entity, count = data.len(), "fetched");
                    state.cache.set_fetched(data, owner);
                    state.error = None;
                    true
                }
            }
            Err(err) => match err.into_store_error() {
                Some(err) => {
                    warn!(entity, %err, "fetch failed, keeping cached data");
                    state.error = Some(err);
                    false
                }
                None => {
                    debug!(entity, "fetch cancelled");
                    true
                }
            },
        };
        drop(state);
        guard.settle(ok)
    }
}

/// Accepts the payload only if every entity validates.
fn validate_all<T: Validate>(data: Vec<T>) -> Result<Vec<T>, BackendError> {
    for item in &data {
        item.validate()
            .map_err(|err| BackendError::Validation(err.to_string()))?;
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_caller_joins_first_flight() {
        let coordinator = FetchCoordinator::new();
        let Ticket::Leader(guard) = coordinator.begin(true) else {
            panic!("first caller must lead");
        };
        assert!(coordinator.is_loading());

        let Ticket::Follower(outcome) = coordinator.begin(false) else {
            panic!("second caller must follow");
        };

        assert!(!guard.settle(false));
        assert!(!join(outcome).await);
        assert!(!coordinator.is_fetching());
    }

    #[tokio::test]
    async fn dropped_leader_releases_guard_as_cancelled() {
        let coordinator = FetchCoordinator::new();
        let Ticket::Leader(guard) = coordinator.begin(false) else {
            panic!("first caller must lead");
        };
        assert!(coordinator.is_fetching());
        assert!(!coordinator.is_loading());
        let Ticket::Follower(outcome) = coordinator.begin(false) else {
            panic!("second caller must follow");
        };

        drop(guard);

        assert!(join(outcome).await);
        assert!(matches!(coordinator.begin(false), Ticket::Leader(_)));
    }
}
