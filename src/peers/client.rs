//! HTTP Peer Client
//!
//! Fetches values from another node's `/_cache/:group/:key` endpoint.

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::error::{CacheError, Result};
use crate::peers::PeerGetter;

/// Path segment under which nodes serve each other.
pub const CACHE_PATH: &str = "_cache";

// == HTTP Peer ==
/// Remote node reachable over HTTP at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpPeer {
    base_url: String,
    client: Client,
}

impl HttpPeer {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `<base>/_cache/<group>/<key>` with each segment percent-encoded.
    pub fn url_for(&self, group: &str, key: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            CacheError::Configuration(format!("invalid peer address {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                CacheError::Configuration(format!(
                    "peer address {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(CACHE_PATH)
            .push(group)
            .push(key);
        Ok(url)
    }
}

#[async_trait]
impl PeerGetter for HttpPeer {
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.url_for(group, key)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::PeerUnavailable(format!("{}: {}", self.base_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::PeerUnavailable(format!(
                "{} returned {}",
                self.base_url, status
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            CacheError::PeerUnavailable(format!("reading body from {}: {}", self.base_url, e))
        })?;

        Ok(body.to_vec())
    }
}
