//! Unified validation framework for request payloads.
//!
//! Payload structs derive `validator::Validate` for format checks; the rules
//! module adds presence checks and the leave duration cap, and turns a
//! submission into a fully typed [`crate::models::NewAbsenceRequest`].

pub mod rules;

pub use rules::{validate_edit, validate_submission};
pub use validator::Validate;
