use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::StoredToken;

/// Persistence abstraction mapping an Omi user id to a Splitwise OAuth
/// credential, plus short-lived OAuth state nonces for the callback check.
///
/// Business logic only ever sees `Arc<dyn TokenStore>`; the backend is picked
/// at startup from configuration.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn put_token(&self, uid: &str, token: &StoredToken) -> Result<(), anyhow::Error>;
    async fn get_token(&self, uid: &str) -> Result<Option<StoredToken>, anyhow::Error>;
    async fn delete_token(&self, uid: &str) -> Result<(), anyhow::Error>;

    async fn put_oauth_state(
        &self,
        uid: &str,
        state: &str,
        ttl_seconds: i64,
    ) -> Result<(), anyhow::Error>;
    /// Fetch and delete the pending state in one step so a callback can only
    /// be redeemed once.
    async fn take_oauth_state(&self, uid: &str) -> Result<Option<String>, anyhow::Error>;

    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct RedisTokenStore {
    _client: Client,
    manager: ConnectionManager,
}

fn token_key(uid: &str) -> String {
    format!("splitwise:token:{}", uid)
}

fn state_key(uid: &str) -> String {
    format!("splitwise:oauth_state:{}", uid)
}

impl RedisTokenStore {
    pub async fn new(url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %url, "Connecting to Redis");
        let client = Client::open(url)?;

        // ConnectionManager gives automatic reconnection
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn put_token(&self, uid: &str, token: &StoredToken) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let value = serde_json::to_string(token)?;
        redis::cmd("SET")
            .arg(token_key(uid))
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to store token: {}", e))
    }

    async fn get_token(&self, uid: &str) -> Result<Option<StoredToken>, anyhow::Error> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(token_key(uid))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read token: {}", e))?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete_token(&self, uid: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(token_key(uid))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete token: {}", e))
    }

    async fn put_oauth_state(
        &self,
        uid: &str,
        state: &str,
        ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(state_key(uid))
            .arg(state)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to store oauth state: {}", e))
    }

    async fn take_oauth_state(&self, uid: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.manager.clone();
        // GETDEL makes state redemption single-use
        redis::cmd("GETDEL")
            .arg(state_key(uid))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to take oauth state: {}", e))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// In-memory backend for dev and tests.
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, StoredToken>>,
    states: Mutex<HashMap<String, (String, Instant)>>,
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put_token(&self, uid: &str, token: &StoredToken) -> Result<(), anyhow::Error> {
        self.tokens
            .lock()
            .map_err(|e| anyhow::anyhow!("Token map mutex poisoned: {}", e))?
            .insert(uid.to_string(), token.clone());
        Ok(())
    }

    async fn get_token(&self, uid: &str) -> Result<Option<StoredToken>, anyhow::Error> {
        let token = self
            .tokens
            .lock()
            .map_err(|e| anyhow::anyhow!("Token map mutex poisoned: {}", e))?
            .get(uid)
            .cloned();
        Ok(token)
    }

    async fn delete_token(&self, uid: &str) -> Result<(), anyhow::Error> {
        self.tokens
            .lock()
            .map_err(|e| anyhow::anyhow!("Token map mutex poisoned: {}", e))?
            .remove(uid);
        Ok(())
    }

    async fn put_oauth_state(
        &self,
        uid: &str,
        state: &str,
        ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds.max(0) as u64);
        self.states
            .lock()
            .map_err(|e| anyhow::anyhow!("State map mutex poisoned: {}", e))?
            .insert(uid.to_string(), (state.to_string(), expires_at));
        Ok(())
    }

    async fn take_oauth_state(&self, uid: &str) -> Result<Option<String>, anyhow::Error> {
        let entry = self
            .states
            .lock()
            .map_err(|e| anyhow::anyhow!("State map mutex poisoned: {}", e))?
            .remove(uid);
        Ok(entry.and_then(|(state, expires_at)| {
            if Instant::now() < expires_at {
                Some(state)
            } else {
                None
            }
        }))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_token_lifecycle() {
        let store = MemoryTokenStore::new();
        assert!(store.get_token("u1").await.unwrap().is_none());

        let token = StoredToken::new("tok-1".to_string(), None);
        store.put_token("u1", &token).await.unwrap();

        let loaded = store.get_token("u1").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "tok-1");
        assert_eq!(loaded.token_type, "Bearer");

        store.delete_token("u1").await.unwrap();
        assert!(store.get_token("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oauth_state_is_single_use() {
        let store = MemoryTokenStore::new();
        store.put_oauth_state("u1", "u1:nonce", 600).await.unwrap();

        assert_eq!(
            store.take_oauth_state("u1").await.unwrap().as_deref(),
            Some("u1:nonce")
        );
        assert!(store.take_oauth_state("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_oauth_state_is_not_returned() {
        let store = MemoryTokenStore::new();
        store.put_oauth_state("u1", "u1:nonce", 0).await.unwrap();
        assert!(store.take_oauth_state("u1").await.unwrap().is_none());
    }
}
