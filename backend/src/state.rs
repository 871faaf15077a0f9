use crate::services::{NotificationGateway, VerificationService, WorkflowEngine};

#[derive(Clone)]
pub struct AppState {
    pub engine: WorkflowEngine,
    pub verifier: VerificationService,
    pub notifier: NotificationGateway,
}

impl AppState {
    pub fn new(
        engine: WorkflowEngine,
        verifier: VerificationService,
        notifier: NotificationGateway,
    ) -> Self {
        Self {
            engine,
            verifier,
            notifier,
        }
    }
}
