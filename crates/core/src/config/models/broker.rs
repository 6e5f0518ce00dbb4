use serde::{Deserialize, Serialize};

/// Broker type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrokerType {
    #[default]
    Redis,
    InMemory,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: i64,
    pub password: Option<String>,
    pub connection_timeout_seconds: u64,
    pub max_retry_attempts: u32,
    pub retry_delay_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            password: None,
            connection_timeout_seconds: 30,
            max_retry_attempts: 3,
            retry_delay_seconds: 1,
        }
    }
}

impl RedisConfig {
    /// Validate Redis configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.is_empty() {
            return Err(anyhow::anyhow!("Redis主机地址不能为空"));
        }

        if self.port == 0 {
            return Err(anyhow::anyhow!("Redis端口必须大于0"));
        }

        if self.database < 0 {
            return Err(anyhow::anyhow!("Redis数据库索引不能为负数"));
        }

        if self.connection_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Redis连接超时时间必须大于0"));
        }

        if self.max_retry_attempts == 0 {
            return Err(anyhow::anyhow!("Redis最大重试次数必须大于0"));
        }

        Ok(())
    }
}

/// Broker configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BrokerConfig {
    #[serde(rename = "type")]
    pub r#type: BrokerType,
    /// 完整的连接URL，非空时优先于 `redis` 段
    pub url: String,
    pub redis: RedisConfig,
}

impl BrokerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.r#type {
            BrokerType::InMemory => Ok(()),
            BrokerType::Redis => {
                if !self.url.is_empty()
                    && !self.url.starts_with("redis://")
                    && !self.url.starts_with("rediss://")
                {
                    return Err(anyhow::anyhow!("Redis URL必须是redis://或rediss://格式"));
                }
                self.redis.validate()
            }
        }
    }
}
