pub mod correlation_id;
pub mod request;

pub use correlation_id::CorrelationId;
pub use request::{Request, Response};
