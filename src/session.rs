use anyhow::Result;
use tokio::sync::Mutex;

use crate::github::GithubClient;
use crate::model::Identity;

/// Owns the credential for one logical run and memoizes the authenticated
/// identity behind it.
///
/// The mutex is held across the first `/user` fetch, so concurrent callers
/// collapse onto a single in-flight request instead of racing to populate
/// the cache.
pub struct Session {
    client: GithubClient,
    identity: Mutex<Option<Identity>>,
}

impl Session {
    pub fn new(token: String) -> Self {
        Self {
            client: GithubClient::new(token),
            identity: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &GithubClient {
        &self.client
    }

    pub async fn identity(&self) -> Result<Identity> {
        let mut cached = self.identity.lock().await;
        if let Some(identity) = cached.as_ref() {
            return Ok(identity.clone());
        }

        let fetched: Identity = self.client.get("/user").await?;
        *cached = Some(fetched.clone());
        Ok(fetched)
    }

    /// Drop the memoized identity; the next `identity()` call refetches.
    pub async fn invalidate_identity(&self) {
        *self.identity.lock().await = None;
    }
}
