use metrics::{counter, histogram};

use crate::server::BatchReport;

/// 分发指标
///
/// 各实例共享同一组全局指标，`queue` 标签区分不同队列。
#[derive(Debug, Clone)]
pub struct DispatchMetrics {
    queue: String,
}

impl DispatchMetrics {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
        }
    }

    pub fn record_batch(&self, report: &BatchReport, duration_ms: f64) {
        let queue = self.queue.clone();
        counter!("relay_dispatch_fetched_total", "queue" => queue.clone())
            .increment(report.fetched as u64);
        counter!("relay_dispatch_processed_total", "queue" => queue.clone())
            .increment(report.processed as u64);
        counter!("relay_dispatch_replied_total", "queue" => queue.clone())
            .increment(report.replied as u64);
        counter!("relay_dispatch_expired_total", "queue" => queue.clone())
            .increment(report.expired as u64);
        counter!("relay_dispatch_dropped_total", "queue" => queue.clone())
            .increment(report.dropped as u64);
        counter!("relay_dispatch_failed_total", "queue" => queue.clone())
            .increment(report.failed as u64);
        if report.fetched > 0 {
            histogram!("relay_dispatch_batch_size", "queue" => queue.clone())
                .record(report.fetched as f64);
            histogram!("relay_dispatch_batch_duration_ms", "queue" => queue).record(duration_ms);
        }
    }

    pub fn record_handler_duration(&self, method: &str, duration_ms: f64) {
        histogram!(
            "relay_dispatch_handler_duration_ms",
            "queue" => self.queue.clone(),
            "method" => method.to_string()
        )
        .record(duration_ms);
    }

    pub fn record_transport_error(&self) {
        counter!("relay_dispatch_transport_errors_total", "queue" => self.queue.clone())
            .increment(1);
    }
}
