//! Redis-backed file writer.
//!
//! Bodies are stored under their target path as the key; every completed
//! write pushes the key onto [`REDIS_QUEUE_KEY`], where external readers
//! pick it up with `BLPOP` and persist it to disk out of band.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::FileWriter;
use crate::error::{CrawlError, ResponseError};
use crate::meta::keys;
use crate::middleware::OpenClose;
use crate::request::Request;
use crate::spider::Spider;

/// List the writer pushes completed keys onto, consumed by queue readers.
pub const REDIS_QUEUE_KEY: &str = "leiogo.redis.queue";

/// File writer storing bodies in Redis. Register it as an open/close
/// listener so the connection is established before the crawl starts.
pub struct RedisWriter {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisWriter {
    /// `addr` is a Redis connection URL, e.g. `redis://127.0.0.1/`.
    pub fn new(addr: &str) -> Result<Self, CrawlError> {
        Ok(RedisWriter {
            client: redis::Client::open(addr)?,
            conn: Mutex::new(None),
        })
    }

    fn connection(&self) -> Option<MultiplexedConnection> {
        self.conn.lock().clone()
    }
}

#[async_trait]
impl OpenClose for RedisWriter {
    async fn open(&self, _spider: &Spider) -> Result<(), CrawlError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        *self.conn.lock() = Some(conn);
        Ok(())
    }

    async fn close(&self, _reason: &str, _spider: &Spider) -> Result<(), CrawlError> {
        self.conn.lock().take();
        Ok(())
    }
}

#[async_trait]
impl FileWriter for RedisWriter {
    async fn not_exists(&self, path: &Path) -> bool {
        let Some(mut conn) = self.connection() else {
            return true;
        };
        let key = path.to_string_lossy();
        match conn.exists::<_, bool>(key.as_ref()).await {
            Ok(exists) => !exists,
            // On a broken connection, prefer re-fetching over losing data.
            Err(_) => true,
        }
    }

    async fn write_file(&self, req: &Request, body: &[u8]) -> (String, ResponseError) {
        let Some(path) = req.meta.get_path(keys::FILEPATH) else {
            return (
                format!("File request {} carries no target path", req.url),
                ResponseError::Fail("missing __filepath__ meta".to_owned()),
            );
        };
        let key = path.to_string_lossy().into_owned();

        let Some(mut conn) = self.connection() else {
            return (
                format!("Caching {} failed", key),
                ResponseError::Fail("redis writer not opened".to_owned()),
            );
        };

        let outcome: redis::RedisResult<()> = async {
            conn.set::<_, _, ()>(&key, body).await?;
            conn.rpush::<_, _, ()>(REDIS_QUEUE_KEY, &key).await?;
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => (
                format!("Cached {} to redis", key),
                ResponseError::Drop("File cached completed".to_owned()),
            ),
            Err(err) => (format!("Caching {} failed", key), ResponseError::Fail(err.to_string())),
        }
    }
}
