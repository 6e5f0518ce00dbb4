use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{Broker, RelayResult};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info};

/// 两次全量过期清理之间的最短间隔
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// 内存消息代理实现
///
/// 在单进程内模拟Redis列表语义：弹出即删除、空列表即删除键。
/// 过期的键在被访问时立即清理，其余的在推送时按间隔批量清理，
/// 没人读取的回复不会一直留在内存中。适用于嵌入式部署和测试。
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    lists: Arc<Mutex<Lists>>,
    /// 有新元素入队时唤醒阻塞的弹出者
    pushed: Arc<Notify>,
    sweep_interval: Duration,
}

#[derive(Debug)]
struct Lists {
    entries: HashMap<String, ListEntry>,
    next_sweep: Instant,
}

#[derive(Debug, Default)]
struct ListEntry {
    items: VecDeque<String>,
    expires_at: Option<Instant>,
}

impl ListEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        info!("Creating in-memory broker");
        Self::default()
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            lists: Arc::new(Mutex::new(Lists {
                entries: HashMap::new(),
                next_sweep: Instant::now() + sweep_interval,
            })),
            pushed: Arc::new(Notify::new()),
            sweep_interval,
        }
    }

    fn sweep_if_due(&self, lists: &mut Lists, now: Instant) {
        if now < lists.next_sweep {
            return;
        }
        let before = lists.entries.len();
        lists.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - lists.entries.len();
        if removed > 0 {
            debug!("Swept {} expired key(s)", removed);
        }
        lists.next_sweep = now + self.sweep_interval;
    }

    fn live_entry<'a>(
        entries: &'a mut HashMap<String, ListEntry>,
        key: &str,
    ) -> Option<&'a mut ListEntry> {
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            debug!("Key {} expired", key);
        }
        entries.get_mut(key)
    }

    fn pop_front(entries: &mut HashMap<String, ListEntry>, key: &str) -> Option<String> {
        let entry = Self::live_entry(entries, key)?;
        let item = entry.items.pop_front();
        if entry.items.is_empty() {
            entries.remove(key);
        }
        item
    }

    async fn push_inner(&self, key: &str, value: &str, ttl: Option<Duration>) {
        {
            let mut lists = self.lists.lock().await;
            let now = Instant::now();
            self.sweep_if_due(&mut lists, now);

            let entries = &mut lists.entries;
            if Self::live_entry(entries, key).is_none() {
                entries.insert(key.to_string(), ListEntry::default());
            }
            if let Some(entry) = entries.get_mut(key) {
                entry.items.push_back(value.to_string());
                if let Some(ttl) = ttl {
                    entry.expires_at = Some(now + ttl);
                }
            }
        }
        self.pushed.notify_waiters();
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn push(&self, key: &str, value: &str) -> RelayResult<()> {
        self.push_inner(key, value, None).await;
        Ok(())
    }

    async fn push_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()> {
        self.push_inner(key, value, Some(ttl)).await;
        Ok(())
    }

    async fn blocking_pop(&self, key: &str, timeout: Duration) -> RelayResult<Option<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            // 先注册唤醒再检查列表，避免错过检查与等待之间的推送
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut lists = self.lists.lock().await;
                if let Some(item) = Self::pop_front(&mut lists.entries, key) {
                    return Ok(Some(item));
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn pop(&self, key: &str) -> RelayResult<Option<String>> {
        let mut lists = self.lists.lock().await;
        Ok(Self::pop_front(&mut lists.entries, key))
    }

    async fn len(&self, key: &str) -> RelayResult<u64> {
        let mut lists = self.lists.lock().await;
        Ok(Self::live_entry(&mut lists.entries, key)
            .map(|entry| entry.items.len() as u64)
            .unwrap_or(0))
    }

    async fn exists(&self, key: &str) -> RelayResult<bool> {
        let mut lists = self.lists.lock().await;
        Ok(Self::live_entry(&mut lists.entries, key).is_some())
    }

    async fn delete(&self, key: &str) -> RelayResult<()> {
        let mut lists = self.lists.lock().await;
        lists.entries.remove(key);
        Ok(())
    }

    async fn ping(&self) -> RelayResult<()> {
        Ok(())
    }
}
