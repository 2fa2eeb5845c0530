//! REST implementation of [`Backend`] for every dashboard entity.
//!
//! Each entity lives under its own collection path (`GET /categories`,
//! `POST /categories`, `PUT /categories/{id}`, `DELETE /categories/{id}`),
//! authenticated with a bearer token.
use std::future::Future;

use api_types::{
    ErrorResponse, Identified, budget::Budget, category::Category,
    payment_method::PaymentMethod, stock::StockPosition, subscription::Subscription,
    transaction::Transaction, watchlist::Watchlist,
};
use reqwest::{RequestBuilder, Url};
use serde::{Serialize, de::DeserializeOwned};
use store::{Backend, BackendError};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{AppError, Result};

/// Collection path of an entity on the server.
pub trait Resource {
    const PATH: &'static str;
}

macro_rules! resource {
    ($($ty:ty => $path:literal),+ $(,)?) => {
        $(
            impl Resource for $ty {
                const PATH: &'static str = $path;
            }
        )+
    };
}

resource!(
    Category => "categories",
    PaymentMethod => "payment-methods",
    Subscription => "subscriptions",
    Transaction => "transactions",
    StockPosition => "stock-positions",
    Watchlist => "watchlists",
    Budget => "budgets",
);

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http: reqwest::Client,
    token: String,
    cancel: watch::Receiver<bool>,
}

impl HttpBackend {
    /// Requests still running when `cancel` flips to `true` resolve as
    /// [`BackendError::Cancelled`].
    pub fn new(base_url: &str, token: &str, cancel: watch::Receiver<bool>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::Setting(format!("invalid base_url: {err}")))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::builder().build()?,
            token: token.to_string(),
            cancel,
        })
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|err| BackendError::Transport(format!("invalid base_url: {err}")))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> std::result::Result<T, BackendError> {
        let mut cancel = self.cancel.clone();
        tokio::select! {
            biased;
            // A dropped sender disables this branch instead of cancelling.
            Ok(_) = cancel.wait_for(|cancelled| *cancelled) => Err(BackendError::Cancelled),
            result = self.exchange(req) => result,
        }
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> std::result::Result<T, BackendError> {
        let res = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if status.is_success() {
            let body = res.bytes().await.map_err(transport)?;
            return serde_json::from_slice(&body)
                .map_err(|err| BackendError::Validation(err.to_string()));
        }

        let body = res
            .json::<ErrorResponse>()
            .await
            .map(|err| err.error)
            .unwrap_or_else(|_| "unknown error".to_string());
        Err(BackendError::Transport(format!("{status}: {body}")))
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

impl<T> Backend<T> for HttpBackend
where
    T: Resource + Identified + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn fetch_all(&self) -> impl Future<Output = std::result::Result<Vec<T>, BackendError>> + Send {
        async move {
            let url = self.endpoint(T::PATH)?;
            debug!(path = T::PATH, "GET");
            self.send(self.http.get(url)).await
        }
    }

    fn create_one(
        &self,
        payload: &T,
    ) -> impl Future<Output = std::result::Result<T, BackendError>> + Send {
        async move {
            let url = self.endpoint(T::PATH)?;
            debug!(path = T::PATH, "POST");
            self.send(self.http.post(url).json(payload)).await
        }
    }

    fn update_one(
        &self,
        payload: &T,
    ) -> impl Future<Output = std::result::Result<T, BackendError>> + Send {
        async move {
            let id = payload.numeric_id().ok_or_else(|| {
                BackendError::Validation(format!("{} entry without id", T::PATH))
            })?;
            let url = self.endpoint(&format!("{}/{id}", T::PATH))?;
            debug!(path = T::PATH, id, "PUT");
            self.send(self.http.put(url).json(payload)).await
        }
    }

    fn delete_one(&self, id: i64) -> impl Future<Output = std::result::Result<T, BackendError>> + Send {
        async move {
            let url = self.endpoint(&format!("{}/{id}", T::PATH))?;
            debug!(path = T::PATH, id, "DELETE");
            self.send(self.http.delete(url)).await
        }
    }
}
