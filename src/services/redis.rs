//! Redis-backed visitor sessions

use async_trait::async_trait;
use redis::Client;

use crate::error::{AppError, AppResult};

use super::sessions::SessionStore;

#[derive(Clone)]
pub struct RedisService {
    client: Client,
    session_ttl_seconds: u64,
}

impl RedisService {
    /// Create a new Redis service and check the connection
    pub async fn new(url: &str, session_ttl_seconds: u64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let service = Self {
            client,
            session_ttl_seconds,
        };
        service.ping().await?;
        Ok(service)
    }

    fn session_key(session_id: &str) -> String {
        format!("session:{}", session_id)
    }

    /// Get a Redis connection
    pub async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl SessionStore for RedisService {
    async fn incr(&self, session_id: &str, field: &str) -> AppResult<i64> {
        let mut conn = self.get_connection().await?;
        let key = Self::session_key(session_id);

        // Counter and idle expiry move together
        let (value, _): (i64, i64) = redis::pipe()
            .atomic()
            .hincr(&key, field, 1)
            .expire(&key, self.session_ttl_seconds as i64)
            .query_async(&mut conn)
            .await?;

        Ok(value)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
