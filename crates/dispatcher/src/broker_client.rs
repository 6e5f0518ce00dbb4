use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use relay_core::codec;
use relay_core::{Broker, RelayError, RelayResult, Request};

/// 队列名的最大字节数
pub const MAX_QUEUE_NAME_LEN: usize = 255;

/// 队列名必须非空、不超过255字节且不含空白字符
pub fn validate_queue_name(queue_name: &str) -> RelayResult<()> {
    if queue_name.is_empty() {
        return Err(RelayError::InvalidQueueName(
            "queue name cannot be empty".to_string(),
        ));
    }
    if queue_name.len() > MAX_QUEUE_NAME_LEN {
        return Err(RelayError::InvalidQueueName(format!(
            "queue name exceeds {MAX_QUEUE_NAME_LEN} bytes"
        )));
    }
    if queue_name.chars().any(char::is_whitespace) {
        return Err(RelayError::InvalidQueueName(format!(
            "queue name '{queue_name}' contains whitespace"
        )));
    }
    Ok(())
}

/// 代理客户端，负责批量取出原始请求和请求入队
#[derive(Clone)]
pub struct BrokerClient {
    broker: Arc<dyn Broker>,
}

impl BrokerClient {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    /// 阻塞直到至少有一个元素或超时，然后非阻塞地继续弹出直到达到
    /// `batch_size` 或队列为空。超时返回空批次。
    ///
    /// `block_timeout` 为零时只做一次非阻塞弹出。
    pub async fn fetch(
        &self,
        queue_name: &str,
        batch_size: usize,
        block_timeout: Duration,
    ) -> RelayResult<Vec<String>> {
        if batch_size == 0 {
            validate_queue_name(queue_name)?;
            return Ok(Vec::new());
        }

        match self.wait_first(queue_name, block_timeout).await? {
            Some(first) => self.drain(queue_name, first, batch_size).await,
            None => Ok(Vec::new()),
        }
    }

    /// 等待批次的第一个元素，超时返回 `None`
    pub async fn wait_first(
        &self,
        queue_name: &str,
        block_timeout: Duration,
    ) -> RelayResult<Option<String>> {
        validate_queue_name(queue_name)?;
        if block_timeout.is_zero() {
            self.broker.pop(queue_name).await
        } else {
            self.broker.blocking_pop(queue_name, block_timeout).await
        }
    }

    /// 以已取出的 `first` 开头，非阻塞地补齐批次
    ///
    /// `first` 已经离开队列，因此返回的批次至少包含它。
    pub async fn drain(
        &self,
        queue_name: &str,
        first: String,
        batch_size: usize,
    ) -> RelayResult<Vec<String>> {
        let mut batch = Vec::with_capacity(batch_size.clamp(1, 64));
        batch.push(first);
        while batch.len() < batch_size {
            match self.broker.pop(queue_name).await? {
                Some(item) => batch.push(item),
                None => break,
            }
        }

        debug!("Fetched {} item(s) from {}", batch.len(), queue_name);
        Ok(batch)
    }

    /// 序列化请求并推入队列尾部
    pub async fn enqueue(&self, queue_name: &str, request: &Request) -> RelayResult<()> {
        validate_queue_name(queue_name)?;
        let raw = codec::encode_request(request)?;
        self.broker.push(queue_name, &raw).await?;
        debug!(
            "Enqueued request {} to {}",
            request.correlation_id, queue_name
        );
        Ok(())
    }

    /// 队列中等待处理的元素数量
    pub async fn pending(&self, queue_name: &str) -> RelayResult<u64> {
        validate_queue_name(queue_name)?;
        self.broker.len(queue_name).await
    }
}
