use std::future::Future;
use std::sync::Arc;

use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{Client, FromRedisValue, RedisResult};
use relay_core::{RelayError, RelayResult};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use super::config::RedisListConfig;
use super::metrics_collector::RedisListMetrics;

/// Redis连接管理
///
/// 普通命令共享一个自动重连的 `ConnectionManager`；阻塞弹出会占住所在连接，
/// 因此在独立的连接上执行。空闲的阻塞连接放回池中复用，出错的连接直接丢弃。
pub struct RedisConnectionManager {
    client: Client,
    shared: ConnectionManager,
    idle_blocking: Mutex<Vec<MultiplexedConnection>>,
    config: RedisListConfig,
    metrics: Arc<RedisListMetrics>,
}

impl RedisConnectionManager {
    pub async fn new(config: RedisListConfig, metrics: Arc<RedisListMetrics>) -> RelayResult<Self> {
        let client = Client::open(config.build_connection_url()).map_err(|e| {
            RelayError::Broker(format!("Failed to create Redis client: {e}"))
        })?;

        let shared = connect_with_retry(&config, &metrics, || {
            ConnectionManager::new(client.clone())
        })
        .await?;
        metrics.connection_opened();

        let manager = Self {
            client,
            shared,
            idle_blocking: Mutex::new(Vec::new()),
            config,
            metrics,
        };
        manager.test_connection().await?;
        debug!(
            "Successfully connected to Redis at {}",
            manager.config.endpoint()
        );

        Ok(manager)
    }

    pub fn config(&self) -> &RedisListConfig {
        &self.config
    }

    /// 共享连接，克隆开销很小
    pub fn shared_connection(&self) -> ConnectionManager {
        self.shared.clone()
    }

    /// 为阻塞命令打开独立连接
    pub async fn dedicated_connection(&self) -> RelayResult<MultiplexedConnection> {
        let client = self.client.clone();
        connect_with_retry(&self.config, &self.metrics, || {
            let client = client.clone();
            async move { client.get_multiplexed_async_connection().await }
        })
        .await
    }

    pub async fn execute_command<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> RelayResult<T> {
        let mut conn = self.shared_connection();
        cmd.query_async(&mut conn).await.map_err(|e| {
            self.metrics.record_connection_error();
            RelayError::Broker(format!("Redis command failed: {e}"))
        })
    }

    pub async fn execute_pipeline<T: FromRedisValue>(
        &self,
        pipe: &redis::Pipeline,
    ) -> RelayResult<T> {
        let mut conn = self.shared_connection();
        pipe.query_async(&mut conn).await.map_err(|e| {
            self.metrics.record_connection_error();
            RelayError::Broker(format!("Redis pipeline failed: {e}"))
        })
    }

    /// 在独立连接上执行阻塞命令
    ///
    /// 命令被取消（例如等待期间收到停止信号）时连接随之丢弃，不会放回池中。
    pub async fn execute_blocking<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> RelayResult<T> {
        let idle = self.idle_blocking.lock().await.pop();
        let mut conn = match idle {
            Some(conn) => conn,
            None => {
                let conn = self.dedicated_connection().await?;
                self.metrics.connection_opened();
                debug!("Opened dedicated Redis connection for blocking commands");
                conn
            }
        };

        match cmd.query_async(&mut conn).await {
            Ok(value) => {
                self.idle_blocking.lock().await.push(conn);
                Ok(value)
            }
            Err(e) => {
                self.metrics.connection_closed();
                self.metrics.record_connection_error();
                Err(RelayError::Broker(format!(
                    "Redis blocking command failed: {e}"
                )))
            }
        }
    }

    /// 池中空闲的阻塞连接数量
    pub async fn idle_blocking_connections(&self) -> usize {
        self.idle_blocking.lock().await.len()
    }

    async fn test_connection(&self) -> RelayResult<()> {
        let response: String = self.execute_command(&redis::cmd("PING")).await?;
        if response == "PONG" {
            debug!("Redis connection test successful");
            Ok(())
        } else {
            let error_msg = format!("Unexpected PING response: {response}");
            error!("{}", error_msg);
            Err(RelayError::Broker(error_msg))
        }
    }

    pub async fn ping(&self) -> RelayResult<()> {
        self.test_connection().await
    }
}

async fn connect_with_retry<T, F, Fut>(
    config: &RedisListConfig,
    metrics: &RedisListMetrics,
    mut connect: F,
) -> RelayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RedisResult<T>>,
{
    let attempts = config.max_retry_attempts.max(1);
    let mut last_error = String::from("Unknown");

    for attempt in 0..attempts {
        match timeout(config.connection_timeout(), connect()).await {
            Ok(Ok(conn)) => {
                if attempt > 0 {
                    debug!(
                        "Successfully reconnected to Redis after {} attempts",
                        attempt + 1
                    );
                }
                return Ok(conn);
            }
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => {
                last_error = format!(
                    "connection timed out after {}s",
                    config.connection_timeout_seconds
                )
            }
        }
        metrics.record_connection_error();

        if attempt + 1 < attempts {
            warn!(
                "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}s...",
                attempt + 1,
                attempts,
                last_error,
                config.retry_delay_seconds
            );
            sleep(config.retry_delay()).await;
        }
    }

    let error_msg = format!(
        "Failed to connect to Redis at {} after {} attempts. Last error: {}",
        config.endpoint(),
        attempts,
        last_error
    );
    error!("{}", error_msg);
    Err(RelayError::Broker(error_msg))
}
