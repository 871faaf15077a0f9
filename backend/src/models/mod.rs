//! Data models shared across storage, services and API handlers.

pub mod decision;
pub mod recipient;
pub mod request;
pub mod request_status;

pub use decision::Decision;
pub use recipient::{DirectoryRole, Recipient, RegisterDevicePayload};
pub use request::{
    AbsenceRequest, DocumentReference, LeaveDetails, LeaveType, NewAbsenceRequest, Placement,
    RequestKind, RequestKindTag, RequestResponse,
};
pub use request_status::{OverallStatus, RejectedBy, StageStatus};
