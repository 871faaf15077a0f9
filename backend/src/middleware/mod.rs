pub mod logging;
pub mod request_id;

pub use logging::log_error_responses;
pub use request_id::{request_id, CorrelationId};
