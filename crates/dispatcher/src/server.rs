use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::{FutureExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use relay_core::codec;
use relay_core::config::{DispatcherConfig, ReplyConfig};
use relay_core::{Broker, RelayResult, Request, RequestHandler};

use crate::broker_client::{validate_queue_name, BrokerClient};
use crate::metrics::DispatchMetrics;
use crate::reply_channel::ResponseChannel;

/// 单个批次的处理统计
///
/// `processed` 为实际调用处理器的次数，等于 `replied + failed`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub processed: usize,
    pub replied: usize,
    pub expired: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.fetched == 0
    }

    pub fn merge(&mut self, other: &BatchReport) {
        self.fetched += other.fetched;
        self.processed += other.processed;
        self.replied += other.replied;
        self.expired += other.expired;
        self.dropped += other.dropped;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Replied,
    Expired,
    Failed,
}

/// 分发服务器
///
/// 循环地从队列取出一批请求，丢弃坏数据与过期请求，把有效请求交给处理器，
/// 并将成功结果写入回复通道。处理器的错误和panic按请求隔离，不会中断循环；
/// 代理传输错误则向上传播。
pub struct DispatchServer {
    client: BrokerClient,
    replies: ResponseChannel,
    config: DispatcherConfig,
    instance_id: String,
}

impl DispatchServer {
    pub fn new(broker: Arc<dyn Broker>, config: DispatcherConfig, reply: &ReplyConfig) -> Self {
        Self {
            client: BrokerClient::new(broker.clone()),
            replies: ResponseChannel::from_config(broker, reply),
            config,
            instance_id: "dispatcher".to_string(),
        }
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn client(&self) -> &BrokerClient {
        &self.client
    }

    pub fn replies(&self) -> &ResponseChannel {
        &self.replies
    }

    /// 持续分发直到收到停止信号或发生传输错误
    ///
    /// 停止信号在批次之间以及阻塞等待第一个元素时都会被响应；
    /// 一旦取到第一个元素，整个批次都会补齐并处理完毕。
    pub async fn run(
        &self,
        queue_name: &str,
        handler: Arc<dyn RequestHandler>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> RelayResult<()> {
        validate_queue_name(queue_name)?;
        let metrics = DispatchMetrics::new(queue_name);
        let mut totals = BatchReport::default();

        info!(
            "分发实例 {} 开始监听队列 {} (batch_size={}, block_timeout={}ms)",
            self.instance_id, queue_name, self.config.batch_size, self.config.block_timeout_ms
        );

        loop {
            // 只有等待第一个元素时响应停止信号，已弹出的元素总会进入批次
            let first = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("分发实例 {} 收到停止信号，退出队列 {} 的监听", self.instance_id, queue_name);
                    break;
                }
                first = self.client.wait_first(queue_name, self.config.block_timeout()) => first,
            };

            let fetched = match first {
                Ok(Some(first)) => {
                    self.client
                        .drain(queue_name, first, self.config.batch_size)
                        .await
                }
                Ok(None) => continue,
                Err(e) => Err(e),
            };
            let raw_items = match fetched {
                Ok(items) => items,
                Err(e) => {
                    metrics.record_transport_error();
                    error!("从队列 {} 取出请求失败: {}", queue_name, e);
                    return Err(e);
                }
            };

            let start = Instant::now();
            let report = match self.process_batch(raw_items, handler.as_ref(), &metrics).await {
                Ok(report) => report,
                Err(e) => {
                    metrics.record_transport_error();
                    error!("发送回复失败，分发实例 {} 终止: {}", self.instance_id, e);
                    return Err(e);
                }
            };
            metrics.record_batch(&report, start.elapsed().as_secs_f64() * 1000.0);
            totals.merge(&report);
        }

        info!(
            "分发实例 {} 已停止: 共取出 {} 个请求，回复 {} 个，过期 {} 个，丢弃 {} 个，失败 {} 个",
            self.instance_id,
            totals.fetched,
            totals.replied,
            totals.expired,
            totals.dropped,
            totals.failed
        );
        Ok(())
    }

    /// 只处理一个批次，取数超时时返回空报告
    pub async fn run_once(
        &self,
        queue_name: &str,
        handler: &dyn RequestHandler,
    ) -> RelayResult<BatchReport> {
        let metrics = DispatchMetrics::new(queue_name);
        let raw_items = self
            .client
            .fetch(
                queue_name,
                self.config.batch_size,
                self.config.block_timeout(),
            )
            .await?;
        let start = Instant::now();
        let report = self.process_batch(raw_items, handler, &metrics).await?;
        metrics.record_batch(&report, start.elapsed().as_secs_f64() * 1000.0);
        Ok(report)
    }

    async fn process_batch(
        &self,
        raw_items: Vec<String>,
        handler: &dyn RequestHandler,
        metrics: &DispatchMetrics,
    ) -> RelayResult<BatchReport> {
        let mut report = BatchReport {
            fetched: raw_items.len(),
            ..Default::default()
        };

        let mut requests = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            match codec::decode_request(&raw) {
                Ok(request) => requests.push(request),
                Err(e) => {
                    report.dropped += 1;
                    warn!("丢弃无法解析的请求: {}", e);
                }
            }
        }

        let outcomes: Vec<RelayResult<Outcome>> = futures::stream::iter(requests)
            .map(|request| self.dispatch_one(request, handler, metrics))
            .buffer_unordered(self.config.max_concurrent_handlers.max(1))
            .collect()
            .await;

        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(Outcome::Replied) => {
                    report.processed += 1;
                    report.replied += 1;
                }
                Ok(Outcome::Failed) => {
                    report.processed += 1;
                    report.failed += 1;
                }
                Ok(Outcome::Expired) => report.expired += 1,
                Err(e) => {
                    report.processed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        debug!("批次处理完成: {:?}", report);
        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    async fn dispatch_one(
        &self,
        request: Request,
        handler: &dyn RequestHandler,
        metrics: &DispatchMetrics,
    ) -> RelayResult<Outcome> {
        let now = Utc::now();
        if request.is_expired_at(now) {
            debug!(
                "丢弃过期请求 {} (timeout {}ms)",
                request.correlation_id, request.timeout_ms
            );
            return Ok(Outcome::Expired);
        }
        debug!(
            "分发请求 {} (method '{}'，剩余 {:?})",
            request.correlation_id,
            request.method,
            request.remaining_at(now)
        );

        let start = Instant::now();
        let result = AssertUnwindSafe(handler.handle(&request))
            .catch_unwind()
            .await;
        metrics.record_handler_duration(&request.method, start.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(Ok(value)) => {
                self.replies.send(&request.correlation_id, value).await?;
                debug!("请求 {} 处理完成并已回复", request.correlation_id);
                Ok(Outcome::Replied)
            }
            Ok(Err(e)) => {
                error!(
                    "处理请求 {} (method '{}') 失败: {}",
                    request.correlation_id, request.method, e
                );
                Ok(Outcome::Failed)
            }
            Err(panic) => {
                error!(
                    "处理请求 {} (method '{}') 时处理器panic: {}",
                    request.correlation_id,
                    request.method,
                    panic_message(panic.as_ref())
                );
                Ok(Outcome::Failed)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
