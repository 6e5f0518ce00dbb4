//! 配置管理
//!
//! 所有配置集中在 [`AppConfig`] 中，通过构造函数显式传入各组件，
//! 不存在进程级的全局配置。加载顺序为：内置默认值 → TOML配置文件 →
//! `RELAY__` 前缀的环境变量。

pub mod models;

#[cfg(test)]
mod tests;

pub use models::{
    AppConfig, BrokerConfig, BrokerType, DispatcherConfig, ObservabilityConfig, RedisConfig,
    ReplyConfig,
};
