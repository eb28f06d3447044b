//! Bearer-token authentication (spec §6 "Authentication").
//!
//! A version-4 UUID token identifies a tenant. Validation is a lookup
//! against a tenant table; the reference implementation keeps that table
//! in memory and hides lookup latency from callers with a per-connection
//! cache, the same `dashmap` + TTL shape as the CMI `RoutingCache`.

use crate::error::{FedMemError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Validates a bearer token and resolves it to a tenant id.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<String>;
}

struct CacheEntry {
    tenant_id: String,
    expires_at: Instant,
}

/// In-memory reference implementation: a fixed table of valid tokens plus a
/// short-lived per-token cache so repeated requests on the same connection
/// don't re-walk the table (spec §6: "validation latency is hidden from
/// request logic by per-connection caching").
pub struct InMemoryAuthenticator {
    tokens: DashMap<String, String>,
    cache: DashMap<String, CacheEntry>,
    cache_ttl: Duration,
}

impl InMemoryAuthenticator {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            cache: DashMap::new(),
            cache_ttl,
        }
    }

    /// Registers `token` (expected to be a v4 UUID) as valid for `tenant_id`.
    pub fn register_tenant(&self, token: impl Into<String>, tenant_id: impl Into<String>) {
        self.tokens.insert(token.into(), tenant_id.into());
    }

    pub fn revoke_token(&self, token: &str) {
        self.tokens.remove(token);
        self.cache.remove(token);
    }
}

impl Default for InMemoryAuthenticator {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl Authenticator for InMemoryAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<String> {
        if Uuid::parse_str(token).is_err() {
            return Err(FedMemError::Unauthorized);
        }

        if let Some(entry) = self.cache.get(token) {
            if entry.expires_at > Instant::now() {
                return Ok(entry.tenant_id.clone());
            }
        }

        let Some(tenant_id) = self.tokens.get(token).map(|e| e.clone()) else {
            return Err(FedMemError::Unauthorized);
        };

        self.cache.insert(
            token.to_string(),
            CacheEntry {
                tenant_id: tenant_id.clone(),
                expires_at: Instant::now() + self.cache_ttl,
            },
        );
        Ok(tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_token_resolves_to_tenant() {
        let auth = InMemoryAuthenticator::default();
        let token = Uuid::new_v4().to_string();
        auth.register_tenant(token.clone(), "tenant-a");
        assert_eq!(auth.authenticate(&token).await.unwrap(), "tenant-a");
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let auth = InMemoryAuthenticator::default();
        let token = Uuid::new_v4().to_string();
        let err = auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, FedMemError::Unauthorized));
    }

    #[tokio::test]
    async fn malformed_token_is_unauthorized() {
        let auth = InMemoryAuthenticator::default();
        let err = auth.authenticate("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, FedMemError::Unauthorized));
    }

    #[tokio::test]
    async fn revoked_token_stops_authenticating() {
        let auth = InMemoryAuthenticator::default();
        let token = Uuid::new_v4().to_string();
        auth.register_tenant(token.clone(), "tenant-a");
        assert!(auth.authenticate(&token).await.is_ok());
        auth.revoke_token(&token);
        assert!(auth.authenticate(&token).await.is_err());
    }

    #[tokio::test]
    async fn repeated_authentication_hits_cache() {
        let auth = InMemoryAuthenticator::default();
        let token = Uuid::new_v4().to_string();
        auth.register_tenant(token.clone(), "tenant-a");
        assert_eq!(auth.authenticate(&token).await.unwrap(), "tenant-a");
        auth.tokens.remove(&token);
        // cache still holds the resolution even though the backing table forgot it
        assert_eq!(auth.authenticate(&token).await.unwrap(), "tenant-a");
    }
}
