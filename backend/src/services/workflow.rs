//! Approval workflow for Leave and On-Duty requests.
//!
//! Every mutation follows the same path: load the record, compute the next
//! record with a pure transition, write it back conditionally on the version
//! that was read. Notifications and document generation run through
//! [`best_effort`] and never change the outcome of the operation.

use std::sync::Arc;

use chrono::Utc;

use crate::error::AppError;
use crate::models::request::{
    EditRequestPayload, HodDecisionPayload, StaffDecisionPayload, SubmitRequestPayload,
};
use crate::models::{AbsenceRequest, Decision, OverallStatus};
use crate::repositories::{RequestFilter, RequestStore};
use crate::services::best_effort::best_effort;
use crate::services::document::DocumentGenerator;
use crate::services::notification::{
    forwarded_to_hod_message, new_request_message, student_update_message, DeliveryError,
    DeliveryReceipt, NotificationGateway, Reviewer, StudentUpdate,
};
use crate::services::transitions::{
    apply_edit, apply_hod_decision, apply_staff_decision, HodReview, StaffReview,
};
use crate::types::RequestId;
use crate::validation::{validate_edit, validate_submission};

/// A PDF ready to be streamed to the client.
#[derive(Debug, Clone)]
pub struct DocumentDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn RequestStore>,
    notifier: NotificationGateway,
    documents: DocumentGenerator,
    leave_max_days: i32,
}

fn parse_decision(raw: Option<&str>) -> Result<Decision, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("status is required"))?;
    raw.parse::<Decision>()
        .map_err(|err| AppError::validation(err.to_string()))
}

fn download_filename(request: &AbsenceRequest) -> String {
    let name: String = request
        .student_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let name = name.trim_matches('_');
    let name = if name.is_empty() { "student" } else { name };
    format!("{}_{}.pdf", request.kind_tag().label(), name)
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn RequestStore>,
        notifier: NotificationGateway,
        documents: DocumentGenerator,
        leave_max_days: i32,
    ) -> Self {
        Self {
            store,
            notifier,
            documents,
            leave_max_days,
        }
    }

    pub async fn submit(&self, payload: SubmitRequestPayload) -> Result<AbsenceRequest, AppError> {
        let input = validate_submission(&payload, self.leave_max_days)?;
        let request = AbsenceRequest::new(input, Utc::now());
        let created = self.store.create(&request).await?;
        tracing::info!(
            request_id = %created.id,
            kind = created.kind_tag().db_value(),
            department = %created.placement.department,
            "absence request submitted"
        );

        self.notify_class_staff(&created).await;
        Ok(created)
    }

    pub async fn get(&self, id: RequestId) -> Result<AbsenceRequest, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {id} not found")))
    }

    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<AbsenceRequest>, AppError> {
        self.store.find(filter).await
    }

    pub async fn staff_decision(
        &self,
        id: RequestId,
        payload: StaffDecisionPayload,
    ) -> Result<AbsenceRequest, AppError> {
        let decision = parse_decision(payload.status.as_deref())?;
        let current = self.get(id).await?;
        let review = StaffReview {
            decision,
            rejection_reason: payload.rejection_reason,
            staff_name: payload.staff_name,
            incharge_name: payload.incharge_name,
            year: payload.year,
            section: payload.section,
        };
        let next = apply_staff_decision(&current, &review, Utc::now())?;
        let saved = self.persist(next).await?;
        tracing::info!(request_id = %saved.id, ?decision, "staff decision recorded");

        match decision {
            Decision::Rejected => {
                self.notify_student(&saved, StudentUpdate::Rejected(Reviewer::Staff))
                    .await;
            }
            Decision::Approved => {
                tokio::join!(
                    self.notify_department_head(&saved),
                    self.notify_student(&saved, StudentUpdate::Forwarded),
                );
            }
        }
        Ok(saved)
    }

    pub async fn hod_decision(
        &self,
        id: RequestId,
        payload: HodDecisionPayload,
    ) -> Result<AbsenceRequest, AppError> {
        let decision = parse_decision(payload.status.as_deref())?;
        let current = self.get(id).await?;
        let review = HodReview {
            decision,
            remarks: payload.remarks,
        };
        let now = Utc::now();
        let mut next = apply_hod_decision(&current, &review, now)?;

        if next.status == OverallStatus::Accepted {
            match best_effort("generate_document", self.documents.generate(&next, now)).await {
                Some(generated) => next.document = Some(generated.reference),
                None => tracing::error!(
                    request_id = %next.id,
                    "request accepted without a document; it will be generated on download"
                ),
            }
        }

        let minted = next
            .document_id()
            .filter(|_| current.document.is_none())
            .map(str::to_string);
        let saved = match self.persist(next).await {
            Ok(saved) => saved,
            Err(err) => {
                if let Some(document_id) = minted {
                    self.documents.discard(&document_id).await;
                }
                return Err(err);
            }
        };
        tracing::info!(request_id = %saved.id, ?decision, "HOD decision recorded");

        let update = match decision {
            Decision::Approved => StudentUpdate::Approved(Reviewer::Hod),
            Decision::Rejected => StudentUpdate::Rejected(Reviewer::Hod),
        };
        self.notify_student(&saved, update).await;
        Ok(saved)
    }

    pub async fn edit(
        &self,
        id: RequestId,
        payload: EditRequestPayload,
    ) -> Result<AbsenceRequest, AppError> {
        let current = self.get(id).await?;
        validate_edit(&payload, current.kind_tag())?;
        let next = apply_edit(&current, &payload, Utc::now())?;
        self.persist(next).await
    }

    pub async fn delete(&self, id: RequestId) -> Result<(), AppError> {
        if self.store.delete(id).await? {
            tracing::info!(request_id = %id, "absence request deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Request {id} not found")))
        }
    }

    /// Load the PDF for a request. An accepted request whose file is missing
    /// gets one regeneration attempt.
    pub async fn download(&self, id: RequestId) -> Result<DocumentDownload, AppError> {
        let request = self.get(id).await?;
        let unavailable = || AppError::NotFound("Document not available for this request".into());

        let mut on_disk = None;
        if let Some(existing) = request.document_id() {
            if self.documents.exists(existing).await {
                on_disk = Some(existing.to_string());
            }
        }
        let document_id = match on_disk {
            Some(document_id) => document_id,
            None if request.status == OverallStatus::Accepted => {
                self.regenerate(&request).await.ok_or_else(unavailable)?
            }
            None => return Err(unavailable()),
        };

        let bytes = self.documents.read(&document_id).await.map_err(|err| {
            tracing::warn!(request_id = %id, error = %err, "document read failed");
            unavailable()
        })?;
        Ok(DocumentDownload {
            filename: download_filename(&request),
            bytes,
        })
    }

    async fn regenerate(&self, request: &AbsenceRequest) -> Option<String> {
        let generated =
            best_effort("regenerate_document", self.documents.generate(request, Utc::now()))
                .await?;
        let document_id = generated.reference.document_id.clone();

        if request.document.as_ref() != Some(&generated.reference) {
            let mut next = request.clone();
            next.document = Some(generated.reference);
            let recorded = best_effort("record_regenerated_document", self.persist(next)).await;
            if recorded.is_none() && request.document_id() != Some(document_id.as_str()) {
                self.documents.discard(&document_id).await;
                return None;
            }
        }
        Some(document_id)
    }

    async fn persist(&self, next: AbsenceRequest) -> Result<AbsenceRequest, AppError> {
        self.store.update(&next).await?.ok_or_else(|| {
            tracing::warn!(request_id = %next.id, version = next.version, "conditional update lost");
            AppError::Conflict(format!(
                "Request {} was changed by someone else; reload and try again",
                next.id
            ))
        })
    }

    async fn notify_class_staff(&self, request: &AbsenceRequest) {
        let Some(staff) = best_effort(
            "find_class_staff",
            self.notifier.find_recipients(&request.placement),
        )
        .await
        else {
            return;
        };
        if staff.is_empty() {
            tracing::info!(
                request_id = %request.id,
                department = %request.placement.department,
                year = %request.placement.year,
                section = %request.placement.section,
                "no class staff with a registered device"
            );
            return;
        }

        let message = new_request_message(request);
        for member in &staff {
            best_effort("notify_class_staff", self.notifier.deliver(member, &message)).await;
        }
    }

    async fn notify_department_head(&self, request: &AbsenceRequest) {
        best_effort("notify_department_head", self.deliver_to_head(request)).await;
    }

    async fn deliver_to_head(
        &self,
        request: &AbsenceRequest,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let department = &request.placement.department;
        let head = self
            .notifier
            .find_department_head(department)
            .await?
            .ok_or_else(|| DeliveryError::UnknownRecipient(format!("HOD of {department}")))?;
        self.notifier
            .deliver(&head, &forwarded_to_hod_message(request))
            .await
    }

    async fn notify_student(&self, request: &AbsenceRequest, update: StudentUpdate) {
        let message = student_update_message(request, update);
        best_effort(
            "notify_student",
            self.notifier.notify(&request.student_email, &message),
        )
        .await;
    }
}
