use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use metrics_exporter_prometheus::PrometheusBuilder;
use relay_core::config::AppConfig;
use relay_core::logging::{init_logging, LogFormat, LogLevel};
use relay_infrastructure::BrokerFactory;
use tracing::{error, info, warn};

mod app;
mod handlers;
mod shutdown;

use app::Application;
use shutdown::ShutdownManager;

fn cli() -> Command {
    Command::new("relay")
        .version(env!("CARGO_PKG_VERSION"))
        .about("基于Redis列表的请求分发队列")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时依次查找 config/relay.toml、relay.toml、/etc/relay/config.toml"),
        )
        .arg(
            Arg::new("queue")
                .short('q')
                .long("queue")
                .value_name("NAME")
                .help("覆盖请求队列名称"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty", "compact"]),
        )
        .arg(
            Arg::new("broker")
                .long("broker")
                .value_name("TYPE")
                .help("消息代理类型")
                .value_parser(["redis", "memory"]),
        )
}

/// 命令行参数覆盖配置文件和环境变量
fn apply_overrides(config: &mut AppConfig, matches: &ArgMatches) -> Result<()> {
    if let Some(queue) = matches.get_one::<String>("queue") {
        config.dispatcher.queue_name = queue.clone();
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.observability.log_format = format.clone();
    }
    if let Some(broker) = matches.get_one::<String>("broker") {
        config.broker.r#type = BrokerFactory::parse_type_string(broker)?;
    }
    config.validate().context("配置验证失败")
}

fn install_metrics_exporter(config: &AppConfig) -> Result<()> {
    let addr: SocketAddr = config
        .observability
        .metrics_bind_address
        .parse()
        .with_context(|| {
            format!(
                "无效的指标监听地址: {}",
                config.observability.metrics_bind_address
            )
        })?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("启动Prometheus指标导出器失败")?;
    info!("Prometheus指标导出器监听于 {addr}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config_path = matches.get_one::<String>("config").map(String::as_str);

    let mut config = AppConfig::load(config_path)
        .with_context(|| format!("加载配置失败: {}", config_path.unwrap_or("<默认路径>")))?;
    apply_overrides(&mut config, &matches)?;

    let level: LogLevel = config.observability.log_level.parse()?;
    let format: LogFormat = config.observability.log_format.parse()?;
    init_logging(level, format)?;

    info!("启动请求分发队列");
    info!(
        "队列: {}，批量大小: {}，实例数: {}",
        config.dispatcher.queue_name, config.dispatcher.batch_size, config.dispatcher.instances
    );

    if config.observability.metrics_enabled {
        install_metrics_exporter(&config)?;
    }

    let shutdown_timeout = config.dispatcher.shutdown_timeout();
    let app = Arc::new(Application::new(config).await?);
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown_manager.subscribe().await;
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    tokio::select! {
        _ = shutdown::wait_for_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
        }
        joined = &mut app_handle => {
            shutdown_manager.shutdown().await;
            let outcome = joined.context("分发任务异常终止")?;
            if let Err(e) = &outcome {
                error!("分发服务异常退出: {e:#}");
            }
            return outcome;
        }
    }

    shutdown_manager.shutdown().await;

    match tokio::time::timeout(shutdown_timeout, app_handle).await {
        Ok(Ok(Ok(()))) => info!("应用已优雅关闭"),
        Ok(Ok(Err(e))) => error!("应用关闭时发生错误: {e:#}"),
        Ok(Err(e)) => error!("分发任务异常终止: {e}"),
        Err(_) => warn!(
            "应用关闭超时（{}秒），强制退出",
            shutdown_timeout.as_secs()
        ),
    }

    info!("请求分发队列已退出");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::config::BrokerType;

    #[test]
    fn test_cli_overrides() {
        let matches = cli().get_matches_from([
            "relay",
            "--queue",
            "jobs",
            "--broker",
            "memory",
            "-l",
            "debug",
            "--log-format",
            "json",
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &matches).unwrap();

        assert_eq!(config.dispatcher.queue_name, "jobs");
        assert_eq!(config.broker.r#type, BrokerType::InMemory);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let matches = cli().get_matches_from(["relay"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &matches).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_cli_rejects_unknown_broker() {
        assert!(cli()
            .try_get_matches_from(["relay", "--broker", "kafka"])
            .is_err());
    }
}
