pub mod app_config;
pub mod broker;
pub mod dispatcher;
pub mod observability;

// Re-export main types for easier imports
pub use app_config::AppConfig;
pub use broker::{BrokerConfig, BrokerType, RedisConfig};
pub use dispatcher::{DispatcherConfig, ReplyConfig};
pub use observability::ObservabilityConfig;
