//! 请求分发
//!
//! 从共享队列批量取出请求，交给处理器执行，并把结果写入按关联ID命名、
//! 带过期时间的回复列表。

pub mod broker_client;
pub mod metrics;
pub mod producer;
pub mod reply_channel;
pub mod server;

pub use broker_client::{validate_queue_name, BrokerClient, MAX_QUEUE_NAME_LEN};
pub use producer::RequestProducer;
pub use reply_channel::ResponseChannel;
pub use server::{BatchReport, DispatchServer};
