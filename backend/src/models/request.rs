//! Absence requests (Leave and On-Duty) and their API payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    models::request_status::{OverallStatus, RejectedBy, StageStatus},
    types::RequestId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Request subtype selector used in payloads, filters and storage.
pub enum RequestKindTag {
    Leave,
    Od,
}

impl RequestKindTag {
    pub fn db_value(&self) -> &'static str {
        match self {
            RequestKindTag::Leave => "leave",
            RequestKindTag::Od => "od",
        }
    }

    /// Prefix used in minted document IDs.
    pub fn document_prefix(&self) -> &'static str {
        match self {
            RequestKindTag::Leave => "LV",
            RequestKindTag::Od => "OD",
        }
    }

    /// Human label used in notifications and documents.
    pub fn label(&self) -> &'static str {
        match self {
            RequestKindTag::Leave => "Leave",
            RequestKindTag::Od => "OD",
        }
    }
}

impl FromStr for RequestKindTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leave" => Ok(RequestKindTag::Leave),
            "od" | "on_duty" | "on-duty" => Ok(RequestKindTag::Od),
            other => Err(format!("unknown request kind `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
/// Leave classification. Serialized with the display names students pick from.
pub enum LeaveType {
    #[serde(rename = "Sick Leave")]
    Sick,
    #[serde(rename = "Emergency Leave")]
    Emergency,
    #[serde(rename = "Personal Leave")]
    Personal,
    #[serde(rename = "Medical Leave")]
    Medical,
    #[serde(rename = "Family Leave")]
    Family,
    #[serde(rename = "Other")]
    Other,
}

impl LeaveType {
    pub fn db_value(&self) -> &'static str {
        match self {
            LeaveType::Sick => "sick",
            LeaveType::Emergency => "emergency",
            LeaveType::Personal => "personal",
            LeaveType::Medical => "medical",
            LeaveType::Family => "family",
            LeaveType::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LeaveType::Sick => "Sick Leave",
            LeaveType::Emergency => "Emergency Leave",
            LeaveType::Personal => "Personal Leave",
            LeaveType::Medical => "Medical Leave",
            LeaveType::Family => "Family Leave",
            LeaveType::Other => "Other",
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for LeaveType {
    type Err = String;

    /// Accepts both the storage value (`sick`) and the display name (`Sick Leave`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let key = normalized.strip_suffix(" leave").unwrap_or(&normalized);
        match key {
            "sick" => Ok(LeaveType::Sick),
            "emergency" => Ok(LeaveType::Emergency),
            "personal" => Ok(LeaveType::Personal),
            "medical" => Ok(LeaveType::Medical),
            "family" => Ok(LeaveType::Family),
            "other" => Ok(LeaveType::Other),
            _ => Err(format!("unknown leave type `{s}`")),
        }
    }
}

/// Fields only a Leave request carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveDetails {
    pub leave_type: LeaveType,
    pub reason: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    Leave(LeaveDetails),
    Od,
}

impl RequestKind {
    pub fn tag(&self) -> RequestKindTag {
        match self {
            RequestKind::Leave(_) => RequestKindTag::Leave,
            RequestKind::Od => RequestKindTag::Od,
        }
    }

    pub fn leave(&self) -> Option<&LeaveDetails> {
        match self {
            RequestKind::Leave(details) => Some(details),
            RequestKind::Od => None,
        }
    }
}

/// Routing coordinates used to find the reviewing staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Placement {
    pub department: String,
    pub year: String,
    pub section: String,
}

/// Reference to the issued authorization document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentReference {
    pub document_id: String,
    pub verification_url: String,
    /// SHA-256 of the issued PDF, hex encoded.
    pub sha256: String,
    pub issued_at: DateTime<Utc>,
}

/// Path a client uses to fetch the PDF for a request.
pub fn download_locator(id: RequestId) -> String {
    format!("/api/requests/{id}/download")
}

/// A student absence request. `version` increments on every persisted
/// mutation and guards conditional updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsenceRequest {
    pub id: RequestId,
    pub student_name: String,
    pub student_email: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub content: String,
    pub kind: RequestKind,
    pub duration: i32,
    pub placement: Placement,
    pub attachment: Option<String>,
    pub staff_status: StageStatus,
    pub hod_status: StageStatus,
    pub status: OverallStatus,
    pub forwarded_by: Option<String>,
    pub forwarded_by_incharge: Option<String>,
    pub forwarded_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<RejectedBy>,
    pub rejection_reason: Option<String>,
    pub staff_remarks: Option<String>,
    pub hod_remarks: Option<String>,
    pub document: Option<DocumentReference>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Submission data that passed validation.
#[derive(Debug, Clone)]
pub struct NewAbsenceRequest {
    pub student_name: String,
    pub student_email: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub content: String,
    pub kind: RequestKind,
    pub duration: i32,
    pub placement: Placement,
    pub attachment: Option<String>,
}

impl AbsenceRequest {
    pub fn new(input: NewAbsenceRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: RequestId::new(),
            student_name: input.student_name,
            student_email: input.student_email,
            from: input.from,
            to: input.to,
            subject: input.subject,
            content: input.content,
            kind: input.kind,
            duration: input.duration,
            placement: input.placement,
            attachment: input.attachment,
            staff_status: StageStatus::Pending,
            hod_status: StageStatus::Pending,
            status: OverallStatus::Pending,
            forwarded_by: None,
            forwarded_by_incharge: None,
            forwarded_at: None,
            rejected_by: None,
            rejection_reason: None,
            staff_remarks: None,
            hod_remarks: None,
            document: None,
            version: 0,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn kind_tag(&self) -> RequestKindTag {
        self.kind.tag()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, OverallStatus::Pending)
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document.as_ref().map(|doc| doc.document_id.as_str())
    }

    /// Date window shown on documents and the verification page.
    pub fn window_label(&self) -> String {
        match &self.kind {
            RequestKind::Leave(details) if details.from_date == details.to_date => {
                details.from_date.format("%d %b %Y").to_string()
            }
            RequestKind::Leave(details) => format!(
                "{} to {}",
                details.from_date.format("%d %b %Y"),
                details.to_date.format("%d %b %Y")
            ),
            RequestKind::Od => format!("{} to {}", self.from, self.to),
        }
    }

    /// Reason for Leave, activity description for OD.
    pub fn stated_reason(&self) -> &str {
        match &self.kind {
            RequestKind::Leave(details) => &details.reason,
            RequestKind::Od => &self.content,
        }
    }
}

/// Inbound submission body. Every field is optional at the serde layer so
/// that missing values are reported together by validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct SubmitRequestPayload {
    pub kind: Option<RequestKindTag>,
    #[validate(length(max = 120))]
    pub student_name: Option<String>,
    #[validate(email)]
    pub student_email: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(max = 5000))]
    pub content: Option<String>,
    pub reason: Option<String>,
    pub leave_type: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub duration: Option<i32>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
    /// Base64 image (medical certificate, event invitation).
    pub attachment: Option<String>,
}

/// Fields a student may still change while the request is pending.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct EditRequestPayload {
    #[validate(length(min = 1, max = 200))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub content: Option<String>,
    #[validate(length(min = 1))]
    pub from: Option<String>,
    #[validate(length(min = 1))]
    pub to: Option<String>,
    #[validate(length(min = 1))]
    pub reason: Option<String>,
    pub leave_type: Option<String>,
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct StaffDecisionPayload {
    /// `approved` (or `accepted` / `forwarded`) or `rejected`.
    pub status: Option<String>,
    pub rejection_reason: Option<String>,
    pub staff_name: Option<String>,
    pub incharge_name: Option<String>,
    /// Corrects the student's year when forwarding.
    pub year: Option<String>,
    /// Corrects the student's section when forwarding.
    pub section: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct HodDecisionPayload {
    /// `approved` / `accepted` or `rejected`, case-insensitive.
    pub status: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentInfo {
    pub document_id: String,
    pub verification_url: String,
    pub download_url: String,
    pub sha256: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestResponse {
    #[schema(value_type = String)]
    pub id: RequestId,
    pub kind: RequestKindTag,
    pub student_name: String,
    pub student_email: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub content: String,
    pub leave_type: Option<LeaveType>,
    pub reason: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub duration: i32,
    pub department: String,
    pub year: String,
    pub section: String,
    pub has_attachment: bool,
    pub staff_status: StageStatus,
    pub hod_status: StageStatus,
    pub status: OverallStatus,
    pub forwarded_by: Option<String>,
    pub forwarded_by_incharge: Option<String>,
    pub forwarded_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<RejectedBy>,
    pub rejection_reason: Option<String>,
    pub staff_remarks: Option<String>,
    pub hod_remarks: Option<String>,
    pub document: Option<DocumentInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<AbsenceRequest> for RequestResponse {
    fn from(request: AbsenceRequest) -> Self {
        let kind = request.kind_tag();
        let (leave_type, reason, from_date, to_date) = match request.kind {
            RequestKind::Leave(details) => (
                Some(details.leave_type),
                Some(details.reason),
                Some(details.from_date),
                Some(details.to_date),
            ),
            RequestKind::Od => (None, None, None, None),
        };
        let document = request.document.map(|doc| DocumentInfo {
            document_id: doc.document_id,
            verification_url: doc.verification_url,
            download_url: download_locator(request.id),
            sha256: doc.sha256,
            issued_at: doc.issued_at,
        });
        RequestResponse {
            id: request.id,
            kind,
            student_name: request.student_name,
            student_email: request.student_email,
            from: request.from,
            to: request.to,
            subject: request.subject,
            content: request.content,
            leave_type,
            reason,
            from_date,
            to_date,
            duration: request.duration,
            department: request.placement.department,
            year: request.placement.year,
            section: request.placement.section,
            has_attachment: request.attachment.is_some(),
            staff_status: request.staff_status,
            hod_status: request.hod_status,
            status: request.status,
            forwarded_by: request.forwarded_by,
            forwarded_by_incharge: request.forwarded_by_incharge,
            forwarded_at: request.forwarded_at,
            rejected_by: request.rejected_by,
            rejection_reason: request.rejection_reason,
            staff_remarks: request.staff_remarks,
            hod_remarks: request.hod_remarks,
            document,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: RequestKind) -> AbsenceRequest {
        AbsenceRequest::new(
            NewAbsenceRequest {
                student_name: "Asha".into(),
                student_email: "asha@college.edu".into(),
                from: "Asha".into(),
                to: "Class Advisor".into(),
                subject: "Request".into(),
                content: "Symposium at PSG".into(),
                kind,
                duration: 1,
                placement: Placement {
                    department: "CSE".into(),
                    year: "2".into(),
                    section: "A".into(),
                },
                attachment: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn leave_type_accepts_display_and_storage_names() {
        assert_eq!("Sick Leave".parse::<LeaveType>(), Ok(LeaveType::Sick));
        assert_eq!("medical".parse::<LeaveType>(), Ok(LeaveType::Medical));
        assert_eq!("Other".parse::<LeaveType>(), Ok(LeaveType::Other));
        assert!("Vacation".parse::<LeaveType>().is_err());
        assert_eq!(
            serde_json::to_value(LeaveType::Family).unwrap(),
            serde_json::json!("Family Leave")
        );
    }

    #[test]
    fn new_request_starts_fully_pending() {
        let request = sample(RequestKind::Od);
        assert_eq!(request.staff_status, StageStatus::Pending);
        assert_eq!(request.hod_status, StageStatus::Pending);
        assert_eq!(request.status, OverallStatus::Pending);
        assert_eq!(request.version, 0);
        assert!(request.document.is_none());
    }

    #[test]
    fn window_label_uses_dates_for_leave() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let leave = sample(RequestKind::Leave(LeaveDetails {
            leave_type: LeaveType::Sick,
            reason: "fever".into(),
            from_date: date,
            to_date: date,
        }));
        assert_eq!(leave.window_label(), "04 Mar 2025");
        assert_eq!(leave.stated_reason(), "fever");

        let od = sample(RequestKind::Od);
        assert_eq!(od.window_label(), "Asha to Class Advisor");
        assert_eq!(od.stated_reason(), "Symposium at PSG");
    }

    #[test]
    fn response_flattens_leave_details_and_document() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let mut request = sample(RequestKind::Leave(LeaveDetails {
            leave_type: LeaveType::Medical,
            reason: "surgery".into(),
            from_date: date,
            to_date: date,
        }));
        request.document = Some(DocumentReference {
            document_id: "LV-20250304-AB12".into(),
            verification_url: "http://localhost/api/verify/LV-20250304-AB12".into(),
            sha256: "00".into(),
            issued_at: Utc::now(),
        });
        let id = request.id;
        let response = RequestResponse::from(request);
        assert_eq!(response.kind, RequestKindTag::Leave);
        assert_eq!(response.leave_type, Some(LeaveType::Medical));
        let document = response.document.expect("document");
        assert_eq!(document.download_url, format!("/api/requests/{id}/download"));
    }
}
