use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CorrelationId;

/// 分发请求
///
/// 生产者创建，分发端最多消费一次，转发或过期后即被丢弃。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub correlation_id: CorrelationId,
    /// 处理器注册表中的键，单一处理器场景下可以为空
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timeout_ms: u64,
}

impl Request {
    pub fn new(method: impl Into<String>, payload: serde_json::Value, timeout: Duration) -> Self {
        Self::with_correlation_id(CorrelationId::generate(), method, payload, timeout)
    }

    pub fn with_correlation_id(
        correlation_id: CorrelationId,
        method: impl Into<String>,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Self {
        Self {
            correlation_id,
            method: method.into(),
            payload,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// 请求的截止时间（创建时间 + 超时）
    pub fn deadline(&self) -> DateTime<Utc> {
        i64::try_from(self.timeout_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .and_then(|timeout| self.correlation_id.created_at().checked_add_signed(timeout))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// `elapsed >= timeout` 即视为过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }

    /// 距离截止时间的剩余时长，已过期时为零
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline() - now).to_std().unwrap_or_default()
    }
}

/// 处理结果，推送到以关联ID为键的回复队列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub correlation_id: CorrelationId,
    pub result: serde_json::Value,
}

impl Response {
    pub fn new(correlation_id: CorrelationId, result: serde_json::Value) -> Self {
        Self {
            correlation_id,
            result,
        }
    }
}
