use std::sync::Arc;

use tracing::{debug, info};

use relay_core::config::models::{BrokerConfig, BrokerType};
use relay_core::{Broker, RelayError, RelayResult};

use crate::in_memory_broker::InMemoryBroker;
use crate::redis_list::{RedisListBroker, RedisListConfig};

/// 按配置创建消息代理
pub async fn create_broker(config: &BrokerConfig) -> RelayResult<Arc<dyn Broker>> {
    BrokerFactory::create(config).await
}

pub struct BrokerFactory;

impl BrokerFactory {
    pub async fn create(config: &BrokerConfig) -> RelayResult<Arc<dyn Broker>> {
        debug!("Creating broker with type: {:?}", config.r#type);
        Self::validate_config(config)?;

        match config.r#type {
            BrokerType::InMemory => {
                info!("Initializing in-memory broker");
                Ok(Arc::new(InMemoryBroker::new()))
            }
            BrokerType::Redis => {
                let redis_config = Self::build_redis_config(config)?;
                info!(
                    "Initializing Redis list broker at {}",
                    redis_config.endpoint()
                );
                let broker = RedisListBroker::new(redis_config).await?;
                Ok(Arc::new(broker))
            }
        }
    }

    /// 非空的 `url` 优先，否则使用 `redis` 配置段
    pub fn build_redis_config(config: &BrokerConfig) -> RelayResult<RedisListConfig> {
        if !config.url.is_empty() {
            return Self::parse_redis_url(&config.url, config);
        }

        let redis = &config.redis;
        Ok(RedisListConfig {
            host: redis.host.clone(),
            port: redis.port,
            database: redis.database,
            password: redis.password.clone(),
            use_tls: false,
            connection_timeout_seconds: redis.connection_timeout_seconds,
            max_retry_attempts: redis.max_retry_attempts,
            retry_delay_seconds: redis.retry_delay_seconds,
        })
    }

    pub fn parse_redis_url(url: &str, config: &BrokerConfig) -> RelayResult<RedisListConfig> {
        let url = url::Url::parse(url)
            .map_err(|e| RelayError::Configuration(format!("无效的Redis URL: {e}")))?;

        let use_tls = match url.scheme() {
            "redis" => false,
            "rediss" => true,
            other => {
                return Err(RelayError::Configuration(format!(
                    "不支持的Redis URL协议: {other}"
                )))
            }
        };

        let host = url.host_str().unwrap_or("127.0.0.1").to_string();
        let port = url.port().unwrap_or(6379);
        let database = match url.path().trim_start_matches('/') {
            "" => 0,
            db => db
                .parse()
                .map_err(|_| RelayError::Configuration(format!("无效的Redis数据库索引: {db}")))?,
        };
        let password = url
            .password()
            .filter(|password| !password.is_empty())
            .map(str::to_string);

        Ok(RedisListConfig {
            host,
            port,
            database,
            password,
            use_tls,
            connection_timeout_seconds: config.redis.connection_timeout_seconds,
            max_retry_attempts: config.redis.max_retry_attempts,
            retry_delay_seconds: config.redis.retry_delay_seconds,
        })
    }

    pub fn validate_config(config: &BrokerConfig) -> RelayResult<()> {
        config
            .validate()
            .map_err(|e| RelayError::Configuration(e.to_string()))
    }

    pub fn get_type_string(broker_type: &BrokerType) -> &'static str {
        match broker_type {
            BrokerType::Redis => "redis",
            BrokerType::InMemory => "in_memory",
        }
    }

    pub fn parse_type_string(type_str: &str) -> RelayResult<BrokerType> {
        match type_str.to_lowercase().as_str() {
            "redis" => Ok(BrokerType::Redis),
            "in_memory" | "memory" => Ok(BrokerType::InMemory),
            _ => Err(RelayError::Configuration(format!(
                "不支持的代理类型: {type_str}，支持的类型: redis, in_memory"
            ))),
        }
    }
}
