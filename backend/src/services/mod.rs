pub mod best_effort;
pub mod document;
pub mod notification;
pub mod pdf;
pub mod transitions;
pub mod verification;
pub mod workflow;

pub use document::{DocumentError, DocumentGenerator, DocumentSettings};
pub use notification::{
    DeliveryError, DisabledTransport, FcmTransport, NotificationGateway, PushMessage,
    PushTransport,
};
pub use verification::{VerificationService, VerificationView};
pub use workflow::{DocumentDownload, WorkflowEngine};
