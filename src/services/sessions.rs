//! Server-side session state keyed by the `sessionid` cookie

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

/// Session key holding the dashboard visit counter
pub const NUM_VISITS: &str = "num_visits";

/// Integer values stored per session
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_counter(&self, session_id: &str, key: &str) -> AppResult<Option<i64>>;

    /// Atomically add one to the counter (absent counts as 0) and return the new value
    async fn increment_counter(&self, session_id: &str, key: &str) -> AppResult<i64>;
}

/// Count this visit; returns the number of visits before it (0 for a fresh session)
pub async fn record_visit(store: &dyn SessionStore, session_id: &str) -> AppResult<i64> {
    let visits = store.increment_counter(session_id, NUM_VISITS).await?;
    Ok(visits - 1)
}

pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Sessions as Redis hashes `session:<id>`, refreshed to a fixed TTL on write
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// Create a new Redis session store
    pub async fn new(url: &str, ttl_seconds: u64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client, ttl_seconds })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get_counter(&self, session_id: &str, key: &str) -> AppResult<Option<i64>> {
        let mut conn = self.connection().await?;
        let value: Option<i64> = conn
            .hget(session_key(session_id), key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read session from Redis: {}", e)))?;
        Ok(value)
    }

    async fn increment_counter(&self, session_id: &str, key: &str) -> AppResult<i64> {
        let mut conn = self.connection().await?;
        let redis_key = session_key(session_id);
        let (value,): (i64,) = redis::pipe()
            .atomic()
            .hincr(&redis_key, key, 1)
            .expire(&redis_key, self.ttl_seconds as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write session to Redis: {}", e)))?;
        Ok(value)
    }
}

/// Process-local sessions for tests and single-node development
#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<(String, String), i64>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_counter(&self, session_id: &str, key: &str) -> AppResult<Option<i64>> {
        let values = self
            .values
            .lock()
            .map_err(|_| AppError::Internal("Session store lock poisoned".to_string()))?;
        Ok(values.get(&(session_id.to_string(), key.to_string())).copied())
    }

    async fn increment_counter(&self, session_id: &str, key: &str) -> AppResult<i64> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| AppError::Internal("Session store lock poisoned".to_string()))?;
        let value = values
            .entry((session_id.to_string(), key.to_string()))
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_visit_reads_zero_then_counts_up() {
        let store = MemorySessionStore::new();
        assert_eq!(record_visit(&store, "abc").await.unwrap(), 0);
        assert_eq!(record_visit(&store, "abc").await.unwrap(), 1);
        assert_eq!(record_visit(&store, "abc").await.unwrap(), 2);
        assert_eq!(store.get_counter("abc", NUM_VISITS).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = MemorySessionStore::new();
        record_visit(&store, "a").await.unwrap();
        record_visit(&store, "a").await.unwrap();
        assert_eq!(record_visit(&store, "b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_visits_are_all_counted() {
        let store = std::sync::Arc::new(MemorySessionStore::new());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                record_visit(store.as_ref(), "shared").await.unwrap()
            }));
        }
        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();

        assert_eq!(seen, (0..20).collect::<Vec<i64>>());
        assert_eq!(store.get_counter("shared", NUM_VISITS).await.unwrap(), Some(20));
    }

    #[tokio::test]
    async fn visit_is_one_increment() {
        let mut store = MockSessionStore::new();
        store
            .expect_increment_counter()
            .withf(|session, key| session == "s1" && key == NUM_VISITS)
            .times(1)
            .returning(|_, _| Ok(42));
        store.expect_get_counter().never();

        assert_eq!(record_visit(&store, "s1").await.unwrap(), 41);
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let mut store = MockSessionStore::new();
        store
            .expect_increment_counter()
            .returning(|_, _| Err(AppError::Internal("down".into())));

        assert!(record_visit(&store, "s1").await.is_err());
    }
}
