use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use metrics::{counter, gauge, histogram};

/// Redis列表代理性能监控指标
///
/// 所有计数器都是原子操作，进程内快照与 `metrics` 导出同步更新。
#[derive(Debug, Clone)]
pub struct RedisListMetrics {
    pub items_pushed: Arc<AtomicU64>,
    pub items_popped: Arc<AtomicU64>,
    pub empty_pops: Arc<AtomicU64>,
    pub connection_errors: Arc<AtomicU64>,
    pub active_connections: Arc<AtomicU32>,
}

impl Default for RedisListMetrics {
    fn default() -> Self {
        Self {
            items_pushed: Arc::new(AtomicU64::new(0)),
            items_popped: Arc::new(AtomicU64::new(0)),
            empty_pops: Arc::new(AtomicU64::new(0)),
            connection_errors: Arc::new(AtomicU64::new(0)),
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl RedisListMetrics {
    /// 记录推送
    pub fn record_item_pushed(&self) {
        self.items_pushed.fetch_add(1, Ordering::Relaxed);
        counter!("relay_redis_items_pushed_total").increment(1);
    }

    /// 记录弹出，`hit` 为false表示队列为空或阻塞超时
    pub fn record_pop(&self, hit: bool) {
        if hit {
            self.items_popped.fetch_add(1, Ordering::Relaxed);
            counter!("relay_redis_items_popped_total").increment(1);
        } else {
            self.empty_pops.fetch_add(1, Ordering::Relaxed);
            counter!("relay_redis_empty_pops_total").increment(1);
        }
    }

    /// 记录连接错误
    pub fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
        counter!("relay_redis_connection_errors_total").increment(1);
    }

    /// 更新活跃连接数
    pub fn connection_opened(&self) {
        let count = self.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!("relay_redis_active_connections").set(count as f64);
    }

    pub fn connection_closed(&self) {
        let count = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| Some(c.saturating_sub(1)))
            .unwrap_or(0)
            .saturating_sub(1);
        gauge!("relay_redis_active_connections").set(count as f64);
    }

    /// 记录操作耗时
    pub fn record_operation_duration(&self, operation: &'static str, duration_ms: f64) {
        histogram!("relay_redis_operation_duration_ms", "operation" => operation)
            .record(duration_ms);
    }

    /// 获取当前统计信息
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_pushed: self.items_pushed.load(Ordering::Relaxed),
            items_popped: self.items_popped.load(Ordering::Relaxed),
            empty_pops: self.empty_pops.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_pushed: u64,
    pub items_popped: u64,
    pub empty_pops: u64,
    pub connection_errors: u64,
    pub active_connections: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = RedisListMetrics::default();
        metrics.record_item_pushed();
        metrics.record_pop(true);
        metrics.record_pop(false);
        metrics.record_pop(false);
        metrics.record_connection_error();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();

        let stats = metrics.get_stats();
        assert_eq!(stats.items_pushed, 1);
        assert_eq!(stats.items_popped, 1);
        assert_eq!(stats.empty_pops, 2);
        assert_eq!(stats.connection_errors, 1);
        assert_eq!(stats.active_connections, 1);
    }

    #[test]
    fn test_connection_closed_saturates() {
        let metrics = RedisListMetrics::default();
        metrics.connection_closed();
        assert_eq!(metrics.get_stats().active_connections, 0);
    }
}
