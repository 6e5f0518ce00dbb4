use std::time::Duration;

use async_trait::async_trait;

use crate::RelayResult;

/// 基于列表的共享存储抽象
///
/// 所有操作都是针对外部存储的原子操作，弹出即删除，不存在确认或重投递。
/// 多个分发实例可以同时对同一个键调用弹出，每个元素只会交付给其中一个。
#[async_trait]
pub trait Broker: Send + Sync {
    /// 追加到列表尾部
    async fn push(&self, key: &str, value: &str) -> RelayResult<()>;

    /// 追加到列表尾部并设置键的过期时间，两步操作原子完成
    async fn push_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()>;

    /// 阻塞弹出列表头部，超时返回 `None`
    async fn blocking_pop(&self, key: &str, timeout: Duration) -> RelayResult<Option<String>>;

    /// 非阻塞弹出列表头部，列表为空时返回 `None`
    async fn pop(&self, key: &str) -> RelayResult<Option<String>>;

    /// 获取列表长度
    async fn len(&self, key: &str) -> RelayResult<u64>;

    /// 键是否存在（已过期的键视为不存在）
    async fn exists(&self, key: &str) -> RelayResult<bool>;

    /// 删除键
    async fn delete(&self, key: &str) -> RelayResult<()>;

    /// 连通性检查
    async fn ping(&self) -> RelayResult<()>;
}
