use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    models::Request,
    traits::RequestHandler,
    RelayError, RelayResult,
};

/// 处理器注册表
///
/// 启动时按字符串键注册处理器，分发时按 `request.method` 精确匹配，
/// 未注册的键返回 [`RelayError::HandlerNotFound`]。
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn RequestHandler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册处理器，同名键会被覆盖并返回 `true`
    pub async fn register(
        &self,
        key: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) -> RelayResult<bool> {
        let key = key.into();
        if key.is_empty() {
            return Err(RelayError::Configuration(
                "handler key cannot be empty".to_string(),
            ));
        }
        let mut registry = self.handlers.write().await;
        let replaced = registry.insert(key.clone(), handler).is_some();
        debug!("Registered handler '{}' (replaced: {})", key, replaced);
        Ok(replaced)
    }

    pub async fn register_batch(
        &self,
        handlers: Vec<(String, Arc<dyn RequestHandler>)>,
    ) -> RelayResult<()> {
        for (key, handler) in handlers {
            self.register(key, handler).await?;
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<Arc<dyn RequestHandler>> {
        let registry = self.handlers.read().await;
        registry.get(key).cloned()
    }

    pub async fn unregister(&self, key: &str) -> bool {
        let mut registry = self.handlers.write().await;
        registry.remove(key).is_some()
    }

    pub async fn contains(&self, key: &str) -> bool {
        let registry = self.handlers.read().await;
        registry.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        let registry = self.handlers.read().await;
        let mut keys: Vec<String> = registry.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        let registry = self.handlers.read().await;
        registry.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestHandler for HandlerRegistry {
    async fn handle(&self, request: &Request) -> RelayResult<serde_json::Value> {
        let handler = self
            .get(&request.method)
            .await
            .ok_or_else(|| RelayError::HandlerNotFound(request.method.clone()))?;
        handler.handle(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use serde_json::json;
    use std::time::Duration;

    fn echo() -> Arc<dyn RequestHandler> {
        Arc::new(handler_fn(|request: Request| async move { Ok(request.payload) }))
    }

    fn constant(value: serde_json::Value) -> Arc<dyn RequestHandler> {
        Arc::new(handler_fn(move |_request: Request| {
            let value = value.clone();
            async move { Ok(value) }
        }))
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty().await);

        assert!(!registry.register("echo", echo()).await.unwrap());
        assert!(registry.contains("echo").await);
        assert!(!registry.contains("Echo").await);
        assert_eq!(registry.len().await, 1);
        assert!(registry.get("echo").await.is_some());
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_existing_key() {
        let registry = HandlerRegistry::new();
        registry.register("k", constant(json!(1))).await.unwrap();
        assert!(registry.register("k", constant(json!(2))).await.unwrap());

        let request = Request::new("k", json!(null), Duration::from_secs(1));
        assert_eq!(registry.handle(&request).await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let registry = HandlerRegistry::new();
        let err = registry.register("", echo()).await.unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_dispatch_by_method() {
        let registry = HandlerRegistry::new();
        registry
            .register_batch(vec![
                ("echo".to_string(), echo()),
                ("ping".to_string(), constant(json!("pong"))),
            ])
            .await
            .unwrap();

        let request = Request::new("echo", json!({"x": 1}), Duration::from_secs(1));
        assert_eq!(registry.handle(&request).await.unwrap(), json!({"x": 1}));

        let request = Request::new("ping", json!(null), Duration::from_secs(1));
        assert_eq!(registry.handle(&request).await.unwrap(), json!("pong"));

        assert_eq!(registry.keys().await, vec!["echo", "ping"]);
    }

    #[tokio::test]
    async fn test_unregistered_method_returns_not_found() {
        let registry = HandlerRegistry::new();
        registry.register("echo", echo()).await.unwrap();

        let request = Request::new("eval", json!(null), Duration::from_secs(1));
        match registry.handle(&request).await {
            Err(RelayError::HandlerNotFound(key)) => assert_eq!(key, "eval"),
            other => panic!("expected HandlerNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = HandlerRegistry::new();
        registry.register("echo", echo()).await.unwrap();
        assert!(registry.unregister("echo").await);
        assert!(!registry.unregister("echo").await);
        assert!(registry.is_empty().await);
    }
}
