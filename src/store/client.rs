//! Redis-backed sessions.
//!
//! One multiplexed connection per session, opened with the database already selected;
//! nothing is pooled across cycles. Every round trip runs under the configured timeout,
//! and dropping a session future abandons the query.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, FromRedisValue, RedisError, ToRedisArgs};

use crate::store::{DatabaseIndex, LengthOutcome, QueueName, QueueStore, StoreError, StoreSession};

/// Server error code for a command applied to a key of another type.
const WRONG_TYPE: &str = "WRONGTYPE";

pub struct RedisStore {
    addr: String,
    timeout: Duration,
}

impl RedisStore {
    /// `addr` is `host[:port]`; the port defaults to 6379.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    fn connection_url(&self, db: DatabaseIndex) -> String {
        format!("redis://{}/{}", self.addr, db)
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn open(&self, db: DatabaseIndex) -> Result<Box<dyn StoreSession>, StoreError> {
        let client = Client::open(self.connection_url(db))?;
        let conn = with_timeout(self.timeout, "connect", client.get_multiplexed_async_connection()).await??;

        Ok(Box::new(RedisSession {
            conn,
            timeout: self.timeout,
        }))
    }
}

// ========================================
// SESSION
// ========================================

struct RedisSession {
    conn: MultiplexedConnection,
    timeout: Duration,
}

impl RedisSession {
    async fn query<T: FromRedisValue>(&mut self, op: &'static str, cmd: Cmd) -> Result<T, RedisQueryError> {
        match with_timeout(self.timeout, op, cmd.query_async::<T>(&mut self.conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(RedisQueryError::Server(err)),
            Err(timeout) => Err(RedisQueryError::Store(timeout)),
        }
    }
}

/// Keeps the server error around until it has been classified.
enum RedisQueryError {
    Server(RedisError),
    Store(StoreError),
}

impl From<RedisQueryError> for StoreError {
    fn from(error: RedisQueryError) -> Self {
        match error {
            RedisQueryError::Server(err) => err.into(),
            RedisQueryError::Store(err) => err,
        }
    }
}

#[async_trait]
impl StoreSession for RedisSession {
    async fn keyspace(&mut self) -> Result<String, StoreError> {
        Ok(self.query("info", command("INFO", "keyspace")).await?)
    }

    async fn keys(&mut self, pattern: &str) -> Result<Vec<QueueName>, StoreError> {
        Ok(self.query("keys", command("KEYS", pattern)).await?)
    }

    async fn list_length(&mut self, key: &[u8]) -> LengthOutcome {
        let kind: String = match self.query("type", command("TYPE", key)).await {
            Ok(kind) => kind,
            Err(err) => return LengthOutcome::Failed(err.into()),
        };
        // "none" once the key was deleted after enumeration
        if kind != "list" {
            return LengthOutcome::NotApplicable;
        }

        match self.query::<u64>("llen", command("LLEN", key)).await {
            Ok(len) => LengthOutcome::Measured(len),
            // replaced by another type between the two commands
            Err(RedisQueryError::Server(err)) if is_wrong_type(&err) => LengthOutcome::NotApplicable,
            Err(err) => LengthOutcome::Failed(err.into()),
        }
    }

    async fn close(self: Box<Self>) {
        let RedisSession { mut conn, timeout } = *self;
        match with_timeout(timeout, "quit", redis::cmd("QUIT").query_async::<()>(&mut conn)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::trace!(error = %err, "QUIT rejected"),
            Err(err) => tracing::trace!(error = %err, "QUIT not acknowledged"),
        }
    }
}

fn command(name: &str, arg: impl ToRedisArgs) -> Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(arg);
    cmd
}

fn is_wrong_type(err: &RedisError) -> bool {
    err.code() == Some(WRONG_TYPE)
}

async fn with_timeout<F: Future>(
    timeout: Duration,
    op: &'static str,
    fut: F,
) -> Result<F::Output, StoreError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| StoreError::Timeout(op))
}
