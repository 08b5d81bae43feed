//! Loader Module
//!
//! The application-supplied source of truth consulted on a local miss.

use std::future::Future;

use async_trait::async_trait;

use crate::error::Result;

// == Loader ==
/// Fetches the canonical bytes for a key.
///
/// Return [`CacheError::NotFound`](crate::error::CacheError::NotFound) when
/// the source has no such key and
/// [`CacheError::SourceUnavailable`](crate::error::CacheError::SourceUnavailable)
/// when the source cannot be reached. Errors reach every caller coalesced on
/// the key unchanged.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<u8>>;
}

/// Adapts an async closure into a [`Loader`].
///
/// ```ignore
/// let loader = LoaderFn(|key: String| async move {
///     Ok(key.into_bytes())
/// });
/// ```
pub struct LoaderFn<F>(pub F);

#[async_trait]
impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
{
    async fn load(&self, key: &str) -> Result<Vec<u8>> {
        (self.0)(key.to_string()).await
    }
}
