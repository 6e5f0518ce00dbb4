use crate::config::models::{AppConfig, BrokerType};

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    // 验证默认值
    assert_eq!(config.broker.r#type, BrokerType::Redis);
    assert_eq!(config.dispatcher.queue_name, "requests");
    assert_eq!(config.dispatcher.batch_size, 16);
    assert_eq!(config.reply.key_prefix, "reply:");
    assert_eq!(config.reply.ttl_seconds, 10);
    assert!(!config.observability.metrics_enabled);
}

#[test]
fn test_config_from_toml() {
    let toml_content = r#"
[broker]
type = "redis"

[broker.redis]
host = "redis.internal"
port = 6380
database = 2

[dispatcher]
queue_name = "jobs"
batch_size = 32
block_timeout_ms = 1000

[reply]
ttl_seconds = 30
"#;

    let config = AppConfig::from_toml(toml_content).unwrap();
    assert_eq!(config.broker.redis.host, "redis.internal");
    assert_eq!(config.broker.redis.port, 6380);
    assert_eq!(config.broker.redis.database, 2);
    assert_eq!(config.dispatcher.queue_name, "jobs");
    assert_eq!(config.dispatcher.batch_size, 32);
    assert_eq!(
        config.dispatcher.block_timeout(),
        std::time::Duration::from_millis(1000)
    );
    // 未出现的字段使用默认值
    assert_eq!(config.dispatcher.max_concurrent_handlers, 8);
    assert_eq!(config.reply.key_prefix, "reply:");
    assert_eq!(config.reply.ttl(), std::time::Duration::from_secs(30));
}

#[test]
fn test_in_memory_broker_from_toml() {
    let config = AppConfig::from_toml(
        r#"
[broker]
type = "in_memory"
"#,
    )
    .unwrap();
    assert_eq!(config.broker.r#type, BrokerType::InMemory);
}

#[test]
fn test_invalid_values_are_rejected() {
    let mut config = AppConfig::default();
    config.dispatcher.batch_size = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.dispatcher.queue_name.clear();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.reply.ttl_seconds = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.broker.url = "http://localhost:6379".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.observability.log_level = "verbose".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.observability.metrics_enabled = true;
    config.observability.metrics_bind_address = "not-an-address".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_in_memory_broker_skips_redis_validation() {
    let mut config = AppConfig::default();
    config.broker.r#type = BrokerType::InMemory;
    config.broker.redis.host.clear();
    assert!(config.validate().is_ok());
}

#[test]
fn test_toml_roundtrip_keeps_values() {
    let mut config = AppConfig::default();
    config.dispatcher.queue_name = "roundtrip".to_string();
    config.broker.redis.password = Some("pw".to_string());

    let toml_str = config.to_toml().unwrap();
    let parsed = AppConfig::from_toml(&toml_str).unwrap();
    assert_eq!(parsed, config);
}
