use std::future::Future;

use crate::error::BackendError;

/// Remote source of truth for one entity type.
///
/// Every method returns the server-confirmed state. Implementations decode
/// the wire format and report decode failures as
/// [`BackendError::Validation`], and aborted requests as
/// [`BackendError::Cancelled`].
pub trait Backend<T>: Send + Sync + 'static {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<T>, BackendError>> + Send;

    fn create_one(&self, payload: &T) -> impl Future<Output = Result<T, BackendError>> + Send;

    fn update_one(&self, payload: &T) -> impl Future<Output = Result<T, BackendError>> + Send;

    fn delete_one(&self, id: i64) -> impl Future<Output = Result<T, BackendError>> + Send;
}
