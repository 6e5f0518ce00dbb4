pub mod broker;
pub mod request_handler;

pub use broker::*;
pub use request_handler::*;
