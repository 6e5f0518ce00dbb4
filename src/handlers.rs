use std::sync::Arc;

use serde_json::json;

use relay_core::{handler_fn, HandlerRegistry, RelayResult, Request};

pub const ECHO: &str = "echo";
pub const PING: &str = "ping";

/// 注册内置处理器：`echo` 原样返回负载，`ping` 返回 `"pong"`
pub async fn register_builtin(registry: &HandlerRegistry) -> RelayResult<()> {
    registry
        .register(
            ECHO,
            Arc::new(handler_fn(|request: Request| async move {
                Ok(request.payload)
            })),
        )
        .await?;
    registry
        .register(
            PING,
            Arc::new(handler_fn(|_request: Request| async move { Ok(json!("pong")) })),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::RequestHandler;
    use std::time::Duration;

    #[tokio::test]
    async fn test_builtin_handlers() {
        let registry = HandlerRegistry::new();
        register_builtin(&registry).await.unwrap();
        assert_eq!(registry.keys().await, vec![ECHO, PING]);

        let echo = Request::new(ECHO, json!({"a": [1, 2]}), Duration::from_secs(1));
        assert_eq!(registry.handle(&echo).await.unwrap(), json!({"a": [1, 2]}));

        let ping = Request::new(PING, json!(null), Duration::from_secs(1));
        assert_eq!(registry.handle(&ping).await.unwrap(), json!("pong"));
    }
}
