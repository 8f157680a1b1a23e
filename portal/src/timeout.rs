use crate::identity::ProviderError;
use docstore::StoreError;
use std::future::Future;
use std::time::Duration;

pub(crate) trait Elapsed {
    fn elapsed(limit: Duration) -> Self;
}

impl Elapsed for StoreError {
    fn elapsed(limit: Duration) -> Self {
        StoreError::Timeout(limit)
    }
}

impl Elapsed for ProviderError {
    fn elapsed(limit: Duration) -> Self {
        ProviderError::Timeout(limit)
    }
}

/// Runs one remote call, giving up after `limit`. The call is dropped on
/// expiry; a write may still land on the far side.
pub(crate) async fn bounded<T, E, F>(limit: Duration, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Elapsed,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(E::elapsed(limit)),
    }
}
