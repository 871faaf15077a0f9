//! Pure state transitions of the approval workflow.
//!
//! Each function takes the current record and returns the complete next
//! record, or the reason the move is not allowed. Nothing here touches the
//! store; the engine persists the result with a single conditional write.
//!
//! | state | staff    | hod      | status   |
//! |-------|----------|----------|----------|
//! | S0    | pending  | pending  | pending  |
//! | S1    | rejected | -        | rejected |
//! | S2    | approved | pending  | pending  |
//! | S3    | approved | approved | accepted |
//! | S4    | approved | rejected | rejected |

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{
    AbsenceRequest, Decision, LeaveType, OverallStatus, RejectedBy, RequestKind, StageStatus,
};
use crate::models::request::EditRequestPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    AwaitingStaff,
    RejectedByStaff,
    AwaitingHod,
    Accepted,
    RejectedByHod,
}

impl WorkflowState {
    pub fn of(request: &AbsenceRequest) -> Self {
        match (request.staff_status, request.hod_status, request.status) {
            (StageStatus::Rejected, _, _) => WorkflowState::RejectedByStaff,
            (StageStatus::Approved, StageStatus::Approved, _)
            | (StageStatus::Approved, _, OverallStatus::Accepted) => WorkflowState::Accepted,
            (StageStatus::Approved, StageStatus::Rejected, _) => WorkflowState::RejectedByHod,
            (StageStatus::Approved, StageStatus::Pending, _) => WorkflowState::AwaitingHod,
            (StageStatus::Pending, _, _) => WorkflowState::AwaitingStaff,
        }
    }
}

/// What a class staff member decided, with the forwarding metadata.
#[derive(Debug, Clone)]
pub struct StaffReview {
    pub decision: Decision,
    pub rejection_reason: Option<String>,
    pub staff_name: Option<String>,
    pub incharge_name: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HodReview {
    pub decision: Decision,
    pub remarks: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn apply_staff_decision(
    request: &AbsenceRequest,
    review: &StaffReview,
    now: DateTime<Utc>,
) -> Result<AbsenceRequest, AppError> {
    if WorkflowState::of(request) != WorkflowState::AwaitingStaff || request.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Request {} has already been reviewed by staff",
            request.id
        )));
    }

    let mut next = request.clone();
    match review.decision {
        Decision::Rejected => {
            let reason = non_blank(&review.rejection_reason);
            next.staff_status = StageStatus::Rejected;
            next.status = OverallStatus::Rejected;
            next.rejected_by = Some(RejectedBy::Staff);
            next.rejection_reason = reason.clone();
            next.staff_remarks = reason;
        }
        Decision::Approved => {
            next.staff_status = StageStatus::Approved;
            next.hod_status = StageStatus::Pending;
            next.status = OverallStatus::Pending;
            next.forwarded_by = non_blank(&review.staff_name);
            next.forwarded_by_incharge = non_blank(&review.incharge_name);
            next.forwarded_at = Some(now);
            if let Some(year) = non_blank(&review.year) {
                next.placement.year = year;
            }
            if let Some(section) = non_blank(&review.section) {
                next.placement.section = section;
            }
        }
    }
    next.updated_at = Some(now);
    Ok(next)
}

pub fn apply_hod_decision(
    request: &AbsenceRequest,
    review: &HodReview,
    now: DateTime<Utc>,
) -> Result<AbsenceRequest, AppError> {
    match WorkflowState::of(request) {
        WorkflowState::AwaitingHod => {}
        WorkflowState::AwaitingStaff | WorkflowState::RejectedByStaff => {
            return Err(AppError::PreconditionFailed(
                "Request must be approved by staff before the HOD can decide".to_string(),
            ))
        }
        WorkflowState::Accepted | WorkflowState::RejectedByHod => {
            return Err(AppError::Conflict(format!(
                "Request {} has already been decided by the HOD",
                request.id
            )))
        }
    }

    let mut next = request.clone();
    let remarks = non_blank(&review.remarks);
    match review.decision {
        Decision::Approved => {
            next.hod_status = StageStatus::Approved;
            next.status = OverallStatus::Accepted;
        }
        Decision::Rejected => {
            next.hod_status = StageStatus::Rejected;
            next.status = OverallStatus::Rejected;
            next.rejected_by = Some(RejectedBy::Hod);
            next.rejection_reason = remarks.clone();
        }
    }
    next.hod_remarks = remarks;
    next.updated_at = Some(now);
    Ok(next)
}

/// Apply a student's edit. Only descriptive fields change.
pub fn apply_edit(
    request: &AbsenceRequest,
    edit: &EditRequestPayload,
    now: DateTime<Utc>,
) -> Result<AbsenceRequest, AppError> {
    if !request.is_pending() {
        return Err(AppError::Conflict(format!(
            "Request {} can no longer be edited",
            request.id
        )));
    }

    let mut next = request.clone();
    if let Some(subject) = &edit.subject {
        next.subject = subject.clone();
    }
    if let Some(content) = &edit.content {
        next.content = content.clone();
    }
    if let Some(from) = &edit.from {
        next.from = from.clone();
    }
    if let Some(to) = &edit.to {
        next.to = to.clone();
    }
    if let Some(attachment) = &edit.attachment {
        next.attachment = Some(attachment.clone()).filter(|a| !a.is_empty());
    }
    if let RequestKind::Leave(details) = &mut next.kind {
        if let Some(reason) = &edit.reason {
            details.reason = reason.clone();
        }
        if let Some(raw) = edit.leave_type.as_deref() {
            details.leave_type = raw.parse::<LeaveType>().map_err(AppError::validation)?;
        }
    }
    next.updated_at = Some(now);
    Ok(next)
}
