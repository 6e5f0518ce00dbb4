//! 请求处理器接口
//!
//! 分发端把每个有效请求交给一个 [`RequestHandler`]。应用既可以直接实现该
//! 特征，也可以通过 [`handler_fn`] 包装异步闭包，或者把多个处理器注册到
//! [`HandlerRegistry`](crate::HandlerRegistry) 中按 `method` 路由。

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::models::Request;
use crate::RelayResult;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// 处理请求并返回结果，返回错误时不会发送回复
    async fn handle(&self, request: &Request) -> RelayResult<serde_json::Value>;
}

/// 异步闭包适配器
pub struct FnHandler<F, Fut> {
    func: F,
    _marker: PhantomData<fn() -> Fut>,
}

/// 将 `Fn(Request) -> Future<Output = RelayResult<Value>>` 包装为处理器
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = RelayResult<serde_json::Value>> + Send,
{
    FnHandler {
        func,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = RelayResult<serde_json::Value>> + Send,
{
    async fn handle(&self, request: &Request) -> RelayResult<serde_json::Value> {
        (self.func)(request.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RelayError;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_handler_fn_passes_request() {
        let handler = handler_fn(|request: Request| async move {
            Ok(json!({ "method": request.method, "payload": request.payload }))
        });
        let request = Request::new("echo", json!({"x": 1}), Duration::from_secs(1));

        let result = handler.handle(&request).await.unwrap();
        assert_eq!(result, json!({"method": "echo", "payload": {"x": 1}}));
    }

    #[tokio::test]
    async fn test_handler_fn_propagates_errors() {
        let handler =
            handler_fn(|_request: Request| async { Err(RelayError::Handler("boom".to_string())) });
        let request = Request::new("", json!(null), Duration::from_secs(1));

        assert!(matches!(
            handler.handle(&request).await,
            Err(RelayError::Handler(_))
        ));
    }
}
