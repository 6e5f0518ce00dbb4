//! Redis列表消息代理
//!
//! 基于 `RPUSH` / `BLPOP` / `LPOP` 的轻量队列实现，回复键通过 `PEXPIRE`
//! 自动过期。按单一职责分解为连接管理、列表操作和指标收集三个子模块。

pub mod config;
pub mod connection_manager;
pub mod list_operations;
pub mod metrics_collector;

// 重新导出公共接口
pub use config::RedisListConfig;
pub use connection_manager::RedisConnectionManager;
pub use list_operations::RedisListOperations;
pub use metrics_collector::{MetricsSnapshot, RedisListMetrics};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{Broker, RelayResult};

/// 健康状态
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub error_message: Option<String>,
}

/// Redis列表代理主要实现
///
/// 协调各个子组件提供完整的 [`Broker`] 功能
pub struct RedisListBroker {
    connection_manager: Arc<RedisConnectionManager>,
    list_operations: RedisListOperations,
    metrics: Arc<RedisListMetrics>,
}

impl RedisListBroker {
    /// 创建新的Redis列表代理实例，连接失败时按配置重试
    pub async fn new(config: RedisListConfig) -> RelayResult<Self> {
        let metrics = Arc::new(RedisListMetrics::default());
        let connection_manager =
            Arc::new(RedisConnectionManager::new(config, metrics.clone()).await?);
        let list_operations = RedisListOperations::new(connection_manager.clone(), metrics.clone());

        Ok(Self {
            connection_manager,
            list_operations,
            metrics,
        })
    }

    /// 获取性能指标
    pub fn metrics(&self) -> Arc<RedisListMetrics> {
        self.metrics.clone()
    }

    pub fn connection_manager(&self) -> &RedisConnectionManager {
        &self.connection_manager
    }

    /// 健康检查
    pub async fn health_check(&self) -> HealthStatus {
        match self.connection_manager.ping().await {
            Ok(()) => HealthStatus {
                healthy: true,
                error_message: None,
            },
            Err(e) => HealthStatus {
                healthy: false,
                error_message: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl Broker for RedisListBroker {
    async fn push(&self, key: &str, value: &str) -> RelayResult<()> {
        self.list_operations.push(key, value).await
    }

    async fn push_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()> {
        self.list_operations.push_with_expiry(key, value, ttl).await
    }

    async fn blocking_pop(&self, key: &str, timeout: Duration) -> RelayResult<Option<String>> {
        self.list_operations.blocking_pop(key, timeout).await
    }

    async fn pop(&self, key: &str) -> RelayResult<Option<String>> {
        self.list_operations.pop(key).await
    }

    async fn len(&self, key: &str) -> RelayResult<u64> {
        self.list_operations.len(key).await
    }

    async fn exists(&self, key: &str) -> RelayResult<bool> {
        self.list_operations.exists(key).await
    }

    async fn delete(&self, key: &str) -> RelayResult<()> {
        self.list_operations.delete(key).await
    }

    async fn ping(&self) -> RelayResult<()> {
        self.connection_manager.ping().await
    }
}
