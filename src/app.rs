use std::sync::Arc;

use anyhow::{Context, Result};
use relay_core::config::AppConfig;
use relay_core::{Broker, HandlerRegistry, RequestHandler};
use relay_dispatcher::DispatchServer;
use relay_infrastructure::create_broker;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::handlers;

/// 主应用程序
///
/// 持有代理、处理器注册表和配置，按 `dispatcher.instances` 启动多个分发循环。
pub struct Application {
    config: AppConfig,
    broker: Arc<dyn Broker>,
    registry: HandlerRegistry,
    node_name: String,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!(
            "初始化应用程序，代理类型: {:?}",
            config.broker.r#type
        );

        let broker = create_broker(&config.broker)
            .await
            .context("创建消息代理失败")?;

        let registry = HandlerRegistry::new();
        handlers::register_builtin(&registry)
            .await
            .context("注册内置处理器失败")?;

        Ok(Self::with_parts(config, broker, registry))
    }

    pub fn with_parts(config: AppConfig, broker: Arc<dyn Broker>, registry: HandlerRegistry) -> Self {
        let node_name = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "relay".to_string());

        Self {
            config,
            broker,
            registry,
            node_name,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn broker(&self) -> Arc<dyn Broker> {
        self.broker.clone()
    }

    /// 运行所有分发循环，直到收到停止信号或任一循环出现传输错误
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let dispatcher = &self.config.dispatcher;
        let handler: Arc<dyn RequestHandler> = Arc::new(self.registry.clone());
        let mut loops = JoinSet::new();

        info!(
            "启动 {} 个分发循环，队列: {}，已注册处理器: {:?}",
            dispatcher.instances,
            dispatcher.queue_name,
            self.registry.keys().await
        );

        for index in 0..dispatcher.instances {
            let server = DispatchServer::new(self.broker.clone(), dispatcher.clone(), &self.config.reply)
                .with_instance_id(format!("{}-{}", self.node_name, index));
            let queue_name = dispatcher.queue_name.clone();
            let handler = handler.clone();
            let shutdown_rx = shutdown_rx.resubscribe();

            loops.spawn(async move { server.run(&queue_name, handler, shutdown_rx).await });
        }

        while let Some(joined) = loops.join_next().await {
            let outcome = joined.context("分发循环任务异常终止")?;
            if let Err(e) = outcome {
                error!("分发循环失败，停止其余循环: {e}");
                loops.abort_all();
                return Err(e).context("分发循环因传输错误退出");
            }
        }

        info!("所有分发循环已停止");
        Ok(())
    }
}
