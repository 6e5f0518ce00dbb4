use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatcherConfig {
    pub queue_name: String,
    pub batch_size: usize,
    pub block_timeout_ms: u64,
    pub max_concurrent_handlers: usize,
    /// 同一进程内针对同一队列运行的分发循环数量
    pub instances: usize,
    pub shutdown_timeout_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_name: "requests".to_string(),
            batch_size: 16,
            block_timeout_ms: 5000,
            max_concurrent_handlers: 8,
            instances: 1,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.queue_name.is_empty() {
            return Err(anyhow::anyhow!("请求队列名称不能为空"));
        }

        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("批量大小必须大于0"));
        }

        if self.max_concurrent_handlers == 0 {
            return Err(anyhow::anyhow!("最大并发处理数必须大于0"));
        }

        if self.instances == 0 {
            return Err(anyhow::anyhow!("分发实例数必须大于0"));
        }

        Ok(())
    }

    pub fn block_timeout(&self) -> Duration {
        Duration::from_millis(self.block_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplyConfig {
    pub key_prefix: String,
    pub ttl_seconds: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            key_prefix: "reply:".to_string(),
            ttl_seconds: 10,
        }
    }
}

impl ReplyConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.key_prefix.is_empty() {
            return Err(anyhow::anyhow!("回复键前缀不能为空"));
        }

        if self.ttl_seconds == 0 {
            return Err(anyhow::anyhow!("回复过期时间必须大于0"));
        }

        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}
