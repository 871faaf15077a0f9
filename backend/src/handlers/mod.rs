pub mod documents;
pub mod health;
pub mod notifications;
pub mod requests;
pub mod response;

pub use response::ApiResponse;
