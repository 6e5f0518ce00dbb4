use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Redis列表代理配置
///
/// 包含连接Redis服务器以及连接重试行为所需的参数。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedisListConfig {
    pub host: String,
    pub port: u16,
    pub database: i64,
    pub password: Option<String>,
    pub use_tls: bool,
    pub connection_timeout_seconds: u64,
    pub max_retry_attempts: u32,
    pub retry_delay_seconds: u64,
}

impl Default for RedisListConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            password: None,
            use_tls: false,
            connection_timeout_seconds: 30,
            max_retry_attempts: 3,
            retry_delay_seconds: 1,
        }
    }
}

impl RedisListConfig {
    /// 构建Redis连接URL
    pub fn build_connection_url(&self) -> String {
        let scheme = if self.use_tls { "rediss" } else { "redis" };
        if let Some(password) = &self.password {
            format!(
                "{}://:{}@{}:{}/{}",
                scheme, password, self.host, self.port, self.database
            )
        } else {
            format!("{}://{}:{}/{}", scheme, self.host, self.port, self.database)
        }
    }

    /// 用于日志输出的地址，不包含密码
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url() {
        let mut config = RedisListConfig::default();
        assert_eq!(config.build_connection_url(), "redis://127.0.0.1:6379/0");

        config.password = Some("secret".to_string());
        config.use_tls = true;
        config.database = 3;
        assert_eq!(
            config.build_connection_url(),
            "rediss://:secret@127.0.0.1:6379/3"
        );
        assert_eq!(config.endpoint(), "127.0.0.1:6379/3");
    }
}
