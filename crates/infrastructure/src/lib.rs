pub mod broker_factory;
pub mod in_memory_broker;
pub mod redis_list;

pub use broker_factory::{create_broker, BrokerFactory};
pub use in_memory_broker::InMemoryBroker;
pub use redis_list::{RedisListBroker, RedisListConfig};
