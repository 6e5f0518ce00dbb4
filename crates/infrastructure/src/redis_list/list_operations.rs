use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_core::RelayResult;
use tracing::debug;

use super::connection_manager::RedisConnectionManager;
use super::metrics_collector::RedisListMetrics;

/// Redis的BLPOP超时为0表示永久阻塞，这里保证传入的超时至少为1毫秒
const MIN_BLOCK_SECONDS: f64 = 0.001;

pub struct RedisListOperations {
    connection_manager: Arc<RedisConnectionManager>,
    metrics: Arc<RedisListMetrics>,
}

impl RedisListOperations {
    pub fn new(
        connection_manager: Arc<RedisConnectionManager>,
        metrics: Arc<RedisListMetrics>,
    ) -> Self {
        Self {
            connection_manager,
            metrics,
        }
    }

    pub async fn push(&self, key: &str, value: &str) -> RelayResult<()> {
        let start = Instant::now();

        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key).arg(value);
        let length: u64 = self.connection_manager.execute_command(&cmd).await?;

        self.metrics.record_item_pushed();
        self.metrics
            .record_operation_duration("push", start.elapsed().as_millis() as f64);
        debug!("Pushed item to {} (length now {})", key, length);
        Ok(())
    }

    pub async fn push_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()> {
        let start = Instant::now();

        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("RPUSH")
            .arg(key)
            .arg(value)
            .ignore()
            .cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_ms)
            .ignore();
        let _: () = self.connection_manager.execute_pipeline(&pipe).await?;

        self.metrics.record_item_pushed();
        self.metrics.record_operation_duration(
            "push_with_expiry",
            start.elapsed().as_millis() as f64,
        );
        debug!("Pushed item to {} with ttl {:?}", key, ttl);
        Ok(())
    }

    pub async fn blocking_pop(&self, key: &str, timeout: Duration) -> RelayResult<Option<String>> {
        let start = Instant::now();

        let mut cmd = redis::cmd("BLPOP");
        cmd.arg(key).arg(timeout.as_secs_f64().max(MIN_BLOCK_SECONDS));
        let popped: Option<(String, String)> =
            self.connection_manager.execute_blocking(&cmd).await?;

        self.metrics.record_pop(popped.is_some());
        self.metrics
            .record_operation_duration("blocking_pop", start.elapsed().as_millis() as f64);
        Ok(popped.map(|(_, value)| value))
    }

    pub async fn pop(&self, key: &str) -> RelayResult<Option<String>> {
        let start = Instant::now();

        let mut cmd = redis::cmd("LPOP");
        cmd.arg(key);
        let popped: Option<String> = self.connection_manager.execute_command(&cmd).await?;

        self.metrics.record_pop(popped.is_some());
        self.metrics
            .record_operation_duration("pop", start.elapsed().as_millis() as f64);
        Ok(popped)
    }

    pub async fn len(&self, key: &str) -> RelayResult<u64> {
        let mut cmd = redis::cmd("LLEN");
        cmd.arg(key);
        self.connection_manager.execute_command(&cmd).await
    }

    pub async fn exists(&self, key: &str) -> RelayResult<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        let count: u64 = self.connection_manager.execute_command(&cmd).await?;
        Ok(count > 0)
    }

    pub async fn delete(&self, key: &str) -> RelayResult<()> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let deleted: u64 = self.connection_manager.execute_command(&cmd).await?;
        debug!("Deleted key {} (removed: {})", key, deleted);
        Ok(())
    }
}
