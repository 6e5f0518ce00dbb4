use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use serde_json::json;
use tokio::sync::broadcast;

use relay_core::codec;
use relay_core::config::{DispatcherConfig, ReplyConfig};
use relay_core::{handler_fn, Broker, RelayError, RelayResult, Request};
use relay_dispatcher::{BrokerClient, DispatchServer, RequestProducer, ResponseChannel};
use relay_infrastructure::InMemoryBroker;

mock! {
    pub Broker {}

    #[async_trait]
    impl Broker for Broker {
        async fn push(&self, key: &str, value: &str) -> RelayResult<()>;
        async fn push_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()>;
        async fn blocking_pop(&self, key: &str, timeout: Duration) -> RelayResult<Option<String>>;
        async fn pop(&self, key: &str) -> RelayResult<Option<String>>;
        async fn len(&self, key: &str) -> RelayResult<u64>;
        async fn exists(&self, key: &str) -> RelayResult<bool>;
        async fn delete(&self, key: &str) -> RelayResult<()>;
        async fn ping(&self) -> RelayResult<()>;
    }
}

fn connection_lost() -> RelayError {
    RelayError::Broker("connection reset by peer".to_string())
}

/// 补齐批次时的每次非阻塞弹出都很慢，并在弹出途中发出停止信号
struct SlowDrainBroker {
    inner: InMemoryBroker,
    shutdown_tx: broadcast::Sender<()>,
}

#[async_trait]
impl Broker for SlowDrainBroker {
    async fn push(&self, key: &str, value: &str) -> RelayResult<()> {
        self.inner.push(key, value).await
    }

    async fn push_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()> {
        self.inner.push_with_expiry(key, value, ttl).await
    }

    async fn blocking_pop(&self, key: &str, timeout: Duration) -> RelayResult<Option<String>> {
        self.inner.blocking_pop(key, timeout).await
    }

    async fn pop(&self, key: &str) -> RelayResult<Option<String>> {
        if key == "requests" {
            let _ = self.shutdown_tx.send(());
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        self.inner.pop(key).await
    }

    async fn len(&self, key: &str) -> RelayResult<u64> {
        self.inner.len(key).await
    }

    async fn exists(&self, key: &str) -> RelayResult<bool> {
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> RelayResult<()> {
        self.inner.delete(key).await
    }

    async fn ping(&self) -> RelayResult<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn test_fetch_drains_until_empty() {
    let mut broker = MockBroker::new();
    broker
        .expect_blocking_pop()
        .withf(|key, timeout| key == "requests" && *timeout == Duration::from_secs(2))
        .times(1)
        .returning(|_, _| Ok(Some("a".to_string())));
    let mut rest = VecDeque::from(vec!["b".to_string(), "c".to_string()]);
    broker
        .expect_pop()
        .times(3)
        .returning(move |_| Ok(rest.pop_front()));

    let client = BrokerClient::new(Arc::new(broker));
    let batch = client
        .fetch("requests", 10, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(batch, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_fetch_with_zero_batch_size_skips_broker() {
    let broker = MockBroker::new();
    let client = BrokerClient::new(Arc::new(broker));

    let batch = client
        .fetch("requests", 0, Duration::from_secs(2))
        .await
        .unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_fetch_with_zero_timeout_does_not_block() {
    let mut broker = MockBroker::new();
    broker.expect_blocking_pop().never();
    broker.expect_pop().times(1).returning(|_| Ok(None));

    let client = BrokerClient::new(Arc::new(broker));
    let batch = client
        .fetch("requests", 5, Duration::ZERO)
        .await
        .unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_fetch_propagates_transport_error() {
    let mut broker = MockBroker::new();
    broker
        .expect_blocking_pop()
        .returning(|_, _| Err(connection_lost()));

    let client = BrokerClient::new(Arc::new(broker));
    let err = client
        .fetch("requests", 5, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_reply_send_failure_propagates_from_run_once() {
    let request = Request::new("echo", json!({"x": 1}), Duration::from_secs(5));
    let raw = codec::encode_request(&request).unwrap();
    let reply_key = format!("reply:{}", request.correlation_id);

    let mut broker = MockBroker::new();
    broker
        .expect_blocking_pop()
        .times(1)
        .returning(move |_, _| Ok(Some(raw.clone())));
    broker.expect_pop().returning(|_| Ok(None));
    broker
        .expect_push_with_expiry()
        .withf(move |key, _, ttl| *key == reply_key && *ttl == Duration::from_secs(10))
        .times(1)
        .returning(|_, _, _| Err(connection_lost()));

    let server = DispatchServer::new(
        Arc::new(broker),
        DispatcherConfig::default(),
        &ReplyConfig::default(),
    );
    let handler = handler_fn(|request: Request| async move { Ok(request.payload) });

    let err = server.run_once("requests", &handler).await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_run_stops_on_transport_error() {
    let mut broker = MockBroker::new();
    broker
        .expect_blocking_pop()
        .times(1)
        .returning(|_, _| Err(connection_lost()));

    let server = DispatchServer::new(
        Arc::new(broker),
        DispatcherConfig::default(),
        &ReplyConfig::default(),
    );
    let handler = Arc::new(handler_fn(|request: Request| async move {
        Ok(request.payload)
    }));
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let result = server.run("requests", handler, shutdown_rx).await;
    assert!(matches!(result, Err(RelayError::Broker(_))));
}

#[tokio::test]
async fn test_enqueue_propagates_push_error() {
    let mut broker = MockBroker::new();
    broker
        .expect_push()
        .withf(|key, value| key == "requests" && value.contains("\"method\":\"echo\""))
        .times(1)
        .returning(|_, _| Err(connection_lost()));

    let producer =
        RequestProducer::new(Arc::new(broker), "requests", &ReplyConfig::default()).unwrap();
    let err = producer
        .submit("echo", json!(null), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_shutdown_during_drain_still_processes_popped_items() {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
    let broker = Arc::new(SlowDrainBroker {
        inner: InMemoryBroker::new(),
        shutdown_tx,
    });

    let requests: Vec<Request> = (0..3)
        .map(|n| Request::new("echo", json!({ "n": n }), Duration::from_secs(5)))
        .collect();
    for request in &requests {
        let raw = codec::encode_request(request).unwrap();
        broker.inner.push("requests", &raw).await.unwrap();
    }

    let server = DispatchServer::new(
        broker.clone(),
        DispatcherConfig::default(),
        &ReplyConfig::default(),
    );
    let handler = Arc::new(handler_fn(|request: Request| async move {
        Ok(request.payload)
    }));

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        server.run("requests", handler, shutdown_rx),
    )
    .await
    .unwrap();
    assert!(result.is_ok());

    let replies = ResponseChannel::from_config(broker.clone(), &ReplyConfig::default());
    for request in &requests {
        let reply = replies
            .receive(&request.correlation_id, Duration::ZERO)
            .await
            .unwrap()
            .expect("popped request is replied");
        assert_eq!(reply.result, request.payload);
    }
    assert_eq!(broker.inner.len("requests").await.unwrap(), 0);
}
