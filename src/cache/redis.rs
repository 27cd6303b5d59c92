// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Redis backed [`Cache`] implementation
//!
//! Uses a multiplexed async connection opened lazily and shared by every
//! request. A failed command drops the connection so the next call reconnects.
//! Each operation, connection included, is bounded by the configured timeout.

use super::Cache;
use crate::error::{AuthError, ErrorKind, Result};
use async_trait::async_trait;
use log::{debug, error, warn};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default upper bound of a single cache operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RedisCache {
    url: String,
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    operation_timeout: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("url", &self.url)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl RedisCache {
    /// Create a cache for `url` (e.g. `redis://127.0.0.1:6379/0`).
    ///
    /// No connection is attempted here, see [`RedisCache::ping`].
    pub fn new(url: impl Into<String>, operation_timeout: Duration) -> anyhow::Result<Self> {
        let url = url.into();
        let client = Client::open(url.as_str())?;
        Ok(Self {
            url,
            client,
            connection: Mutex::new(None),
            operation_timeout,
        })
    }

    /// Check the server answers within the operation timeout.
    pub async fn ping(&self) -> Result<()> {
        let _pong: String = self
            .run("ping", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!("Redis connection error: {}", e);
                AuthError::with_source(ErrorKind::Internal, "redis connection failed", e)
            })?;
        debug!("Connected to redis at {}", self.url);
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn run<T, F, Fut>(&self, operation: &str, command: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut + Send,
        Fut: Future<Output = RedisResult<T>> + Send,
        T: Send,
    {
        let attempt = async {
            let conn = self.connection().await?;
            match command(conn).await {
                Ok(value) => Ok(value),
                Err(e) => {
                    warn!("Redis {} failed: {}", operation, e);
                    self.connection.lock().await.take();
                    Err(AuthError::with_source(
                        ErrorKind::Internal,
                        format!("redis {} failed", operation),
                        e,
                    ))
                }
            }
        };

        match tokio::time::timeout(self.operation_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Redis {} exceeded {}ms",
                    operation,
                    self.operation_timeout.as_millis()
                );
                Err(AuthError::internal(format!("redis {} timed out", operation)))
            }
        }
    }
}

/// Redis expiries are whole seconds, round up so an entry never expires early.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<String> {
        let value: Option<String> = self
            .run("get", |mut conn| async move { conn.get(key).await })
            .await?;
        value.ok_or_else(|| AuthError::not_found(format!("cache key {} not found", key)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let seconds = ttl_seconds(ttl);
        self.run("set", |mut conn| async move {
            conn.set_ex::<_, _, ()>(key, value, seconds).await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.run("delete", |mut conn| async move {
            conn.del::<_, ()>(key).await
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.run("exists", |mut conn| async move { conn.exists(key).await })
            .await
    }

    async fn take(&self, key: &str) -> Result<String> {
        let value: Option<String> = self
            .run("take", |mut conn| async move { conn.get_del(key).await })
            .await?;
        value.ok_or_else(|| AuthError::not_found(format!("cache key {} not found", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_rounded_up_to_whole_seconds() {
        assert_eq!(ttl_seconds(Duration::from_secs(600)), 600);
        assert_eq!(ttl_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_seconds(Duration::from_millis(1)), 1);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(RedisCache::new("not-a-url", DEFAULT_OPERATION_TIMEOUT).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_reports_internal() {
        let cache = RedisCache::new("redis://127.0.0.1:1/", Duration::from_millis(500)).unwrap();
        let err = cache.exists("blacklist:abc").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(cache.ping().await.is_err());
    }
}
