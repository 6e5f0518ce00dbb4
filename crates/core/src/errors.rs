use thiserror::Error;

/// 请求分发错误类型定义
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("消息代理错误: {0}")]
    Broker(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("请求格式错误: {0}")]
    MalformedRequest(String),

    #[error("无效的关联ID: {0}")]
    InvalidCorrelationId(String),

    #[error("处理器未注册: {0}")]
    HandlerNotFound(String),

    #[error("处理器执行错误: {0}")]
    Handler(String),

    #[error("无效的队列名称: {0}")]
    InvalidQueueName(String),

    #[error("配置错误: {0}")]
    Configuration(String),
}

impl RelayError {
    /// 传输层错误不在进程内恢复，需要上抛并由进程重启处理
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Broker(_))
    }

    /// 数据层面的问题，对应的请求会被丢弃
    pub fn is_bad_data(&self) -> bool {
        matches!(
            self,
            RelayError::Serialization(_)
                | RelayError::MalformedRequest(_)
                | RelayError::InvalidCorrelationId(_)
        )
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Serialization(e.to_string())
    }
}

/// 统一的Result类型
pub type RelayResult<T> = std::result::Result<T, RelayError>;
