pub mod codec;
pub mod config;
pub mod errors;
pub mod handler_registry;
pub mod logging;
pub mod models;
pub mod traits;

pub use handler_registry::HandlerRegistry;
pub use models::{CorrelationId, Request, Response};
pub use traits::{handler_fn, Broker, FnHandler, RequestHandler};
pub use errors::{RelayError, RelayResult};
