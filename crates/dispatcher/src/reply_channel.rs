use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use relay_core::codec;
use relay_core::config::ReplyConfig;
use relay_core::{Broker, CorrelationId, RelayResult, Response};

/// 回复通道
///
/// 结果推入 `{key_prefix}{correlation_id}` 列表，并与推入操作原子地设置过期时间，
/// 无论是否被消费都会在TTL后消失。
#[derive(Clone)]
pub struct ResponseChannel {
    broker: Arc<dyn Broker>,
    key_prefix: String,
    ttl: Duration,
}

impl ResponseChannel {
    pub fn new(broker: Arc<dyn Broker>, key_prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            broker,
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    pub fn from_config(broker: Arc<dyn Broker>, config: &ReplyConfig) -> Self {
        Self::new(broker, config.key_prefix.clone(), config.ttl())
    }

    pub fn reply_key(&self, correlation_id: &CorrelationId) -> String {
        format!("{}{}", self.key_prefix, correlation_id)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn send(
        &self,
        correlation_id: &CorrelationId,
        result: serde_json::Value,
    ) -> RelayResult<()> {
        let response = Response::new(correlation_id.clone(), result);
        let raw = codec::encode_response(&response)?;
        let key = self.reply_key(correlation_id);
        self.broker.push_with_expiry(&key, &raw, self.ttl).await?;
        debug!("Sent reply to {} (ttl {:?})", key, self.ttl);
        Ok(())
    }

    /// 在回复键上阻塞等待最多 `wait`，超时返回 `None`
    pub async fn receive(
        &self,
        correlation_id: &CorrelationId,
        wait: Duration,
    ) -> RelayResult<Option<Response>> {
        let key = self.reply_key(correlation_id);
        let raw = if wait.is_zero() {
            self.broker.pop(&key).await?
        } else {
            self.broker.blocking_pop(&key, wait).await?
        };
        raw.map(|raw| codec::decode_response(&raw)).transpose()
    }
}
