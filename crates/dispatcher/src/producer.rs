use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use relay_core::config::ReplyConfig;
use relay_core::{Broker, CorrelationId, RelayResult, Request, Response};

use crate::broker_client::{validate_queue_name, BrokerClient};
use crate::reply_channel::ResponseChannel;

/// 请求生产者
///
/// 为每个请求生成新的关联ID并入队，`call` 还会在回复键上等待结果。
#[derive(Clone)]
pub struct RequestProducer {
    client: BrokerClient,
    replies: ResponseChannel,
    queue_name: String,
}

impl RequestProducer {
    pub fn new(
        broker: Arc<dyn Broker>,
        queue_name: impl Into<String>,
        reply: &ReplyConfig,
    ) -> RelayResult<Self> {
        let queue_name = queue_name.into();
        validate_queue_name(&queue_name)?;
        Ok(Self {
            client: BrokerClient::new(broker.clone()),
            replies: ResponseChannel::from_config(broker, reply),
            queue_name,
        })
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub async fn submit(
        &self,
        method: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> RelayResult<CorrelationId> {
        let request = Request::new(method, payload, timeout);
        self.submit_request(&request).await?;
        Ok(request.correlation_id)
    }

    /// 入队一个已构造好的请求
    pub async fn submit_request(&self, request: &Request) -> RelayResult<()> {
        self.client.enqueue(&self.queue_name, request).await
    }

    /// 提交请求并在 `timeout` 内等待回复，超时返回 `None`
    pub async fn call(
        &self,
        method: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> RelayResult<Option<Response>> {
        let correlation_id = self.submit(method, payload, timeout).await?;
        let response = self.replies.receive(&correlation_id, timeout).await?;
        if response.is_none() {
            debug!("No reply for {} within {:?}", correlation_id, timeout);
        }
        Ok(response)
    }
}
