//! Absence request store.
//!
//! `RequestStore` is the seam between the workflow engine and persistence.
//! Every write is conditional on the `version` the caller read, so two
//! reviewers acting on the same record cannot silently overwrite each other.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::models::{
    AbsenceRequest, DocumentReference, LeaveDetails, LeaveType, OverallStatus, Placement,
    RejectedBy, RequestKind, RequestKindTag, StageStatus,
};
use crate::repositories::common::{push_clause, push_eq};
use crate::types::RequestId;

/// Filter for listing requests. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFilter {
    pub kind: Option<RequestKindTag>,
    pub student_email: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
    pub status: Option<OverallStatus>,
    pub staff_status: Option<StageStatus>,
    pub hod_status: Option<StageStatus>,
    pub leave_type: Option<LeaveType>,
}

impl RequestFilter {
    pub fn matches(&self, request: &AbsenceRequest) -> bool {
        fn eq(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }

        self.kind.map_or(true, |k| k == request.kind_tag())
            && eq(&self.student_email, &request.student_email)
            && eq(&self.department, &request.placement.department)
            && eq(&self.year, &request.placement.year)
            && eq(&self.section, &request.placement.section)
            && self.status.map_or(true, |s| s == request.status)
            && self.staff_status.map_or(true, |s| s == request.staff_status)
            && self.hod_status.map_or(true, |s| s == request.hod_status)
            && self.leave_type.map_or(true, |t| {
                request.kind.leave().is_some_and(|d| d.leave_type == t)
            })
    }
}

/// Persistence operations for absence requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a new request.
    async fn create(&self, request: &AbsenceRequest) -> Result<AbsenceRequest, AppError>;

    /// Find a request by its store ID.
    async fn find_by_id(&self, id: RequestId) -> Result<Option<AbsenceRequest>, AppError>;

    /// Requests matching the filter, newest submission first.
    async fn find(&self, filter: &RequestFilter) -> Result<Vec<AbsenceRequest>, AppError>;

    /// Exact match on the issued document ID.
    async fn find_by_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<AbsenceRequest>, AppError>;

    /// Replace the stored record if its version still equals `request.version`.
    /// Returns the saved record with the incremented version, or `None` when the
    /// record is gone or was changed in the meantime.
    async fn update(&self, request: &AbsenceRequest) -> Result<Option<AbsenceRequest>, AppError>;

    /// Delete a request. Returns whether a record was removed.
    async fn delete(&self, id: RequestId) -> Result<bool, AppError>;
}

const COLUMNS: &str = "id, kind, student_name, student_email, from_text, to_text, subject, content, \
     leave_type, leave_reason, from_date, to_date, duration, department, year, section, attachment, \
     staff_status, hod_status, status, forwarded_by, forwarded_by_incharge, forwarded_at, \
     rejected_by, rejection_reason, staff_remarks, hod_remarks, document_id, verification_url, \
     document_sha256, document_issued_at, version, created_at, updated_at";

const TABLE: &str = "absence_requests";

#[derive(Debug, FromRow)]
struct RequestRow {
    id: RequestId,
    kind: String,
    student_name: String,
    student_email: String,
    from_text: String,
    to_text: String,
    subject: String,
    content: String,
    leave_type: Option<String>,
    leave_reason: Option<String>,
    from_date: Option<NaiveDate>,
    to_date: Option<NaiveDate>,
    duration: i32,
    department: String,
    year: String,
    section: String,
    attachment: Option<String>,
    staff_status: String,
    hod_status: String,
    status: String,
    forwarded_by: Option<String>,
    forwarded_by_incharge: Option<String>,
    forwarded_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejection_reason: Option<String>,
    staff_remarks: Option<String>,
    hod_remarks: Option<String>,
    document_id: Option<String>,
    verification_url: Option<String>,
    document_sha256: Option<String>,
    document_issued_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for AbsenceRequest {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt =
            move |msg: String| AppError::InternalServerError(anyhow!("{} (request {})", msg, id));

        let kind = match row.kind.parse::<RequestKindTag>().map_err(corrupt)? {
            RequestKindTag::Od => RequestKind::Od,
            RequestKindTag::Leave => {
                let leave_type = row
                    .leave_type
                    .as_deref()
                    .ok_or_else(|| "leave row without leave_type".to_string())
                    .and_then(str::parse::<LeaveType>)
                    .map_err(corrupt)?;
                let (from_date, to_date) = row
                    .from_date
                    .zip(row.to_date)
                    .ok_or_else(|| corrupt("leave row without dates".to_string()))?;
                RequestKind::Leave(LeaveDetails {
                    leave_type,
                    reason: row.leave_reason.clone().unwrap_or_else(|| row.content.clone()),
                    from_date,
                    to_date,
                })
            }
        };

        let document = match (
            row.document_id,
            row.verification_url,
            row.document_sha256,
            row.document_issued_at,
        ) {
            (Some(document_id), Some(verification_url), Some(sha256), Some(issued_at)) => {
                Some(DocumentReference {
                    document_id,
                    verification_url,
                    sha256,
                    issued_at,
                })
            }
            _ => None,
        };

        Ok(AbsenceRequest {
            id: row.id,
            student_name: row.student_name,
            student_email: row.student_email,
            from: row.from_text,
            to: row.to_text,
            subject: row.subject,
            content: row.content,
            kind,
            duration: row.duration,
            placement: Placement {
                department: row.department,
                year: row.year,
                section: row.section,
            },
            attachment: row.attachment,
            staff_status: row.staff_status.parse().map_err(corrupt)?,
            hod_status: row.hod_status.parse().map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            forwarded_by: row.forwarded_by,
            forwarded_by_incharge: row.forwarded_by_incharge,
            forwarded_at: row.forwarded_at,
            rejected_by: row
                .rejected_by
                .as_deref()
                .map(str::parse::<RejectedBy>)
                .transpose()
                .map_err(corrupt)?,
            rejection_reason: row.rejection_reason,
            staff_remarks: row.staff_remarks,
            hod_remarks: row.hod_remarks,
            document,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_into_requests(rows: Vec<RequestRow>) -> Result<Vec<AbsenceRequest>, AppError> {
    rows.into_iter().map(AbsenceRequest::try_from).collect()
}

/// PostgreSQL implementation of [`RequestStore`].
#[derive(Debug, Clone)]
pub struct PgRequestRepository {
    pool: PgPool,
}

impl PgRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for PgRequestRepository {
    async fn create(&self, request: &AbsenceRequest) -> Result<AbsenceRequest, AppError> {
        let query = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
             $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, \
             $31, $32, $33, $34) RETURNING {}",
            TABLE, COLUMNS, COLUMNS
        );
        let leave = request.kind.leave();
        let document = request.document.as_ref();
        let row = sqlx::query_as::<_, RequestRow>(&query)
            .bind(request.id)
            .bind(request.kind_tag().db_value())
            .bind(&request.student_name)
            .bind(&request.student_email)
            .bind(&request.from)
            .bind(&request.to)
            .bind(&request.subject)
            .bind(&request.content)
            .bind(leave.map(|d| d.leave_type.db_value()))
            .bind(leave.map(|d| d.reason.as_str()))
            .bind(leave.map(|d| d.from_date))
            .bind(leave.map(|d| d.to_date))
            .bind(request.duration)
            .bind(&request.placement.department)
            .bind(&request.placement.year)
            .bind(&request.placement.section)
            .bind(&request.attachment)
            .bind(request.staff_status.db_value())
            .bind(request.hod_status.db_value())
            .bind(request.status.db_value())
            .bind(&request.forwarded_by)
            .bind(&request.forwarded_by_incharge)
            .bind(request.forwarded_at)
            .bind(request.rejected_by.map(|r| r.db_value()))
            .bind(&request.rejection_reason)
            .bind(&request.staff_remarks)
            .bind(&request.hod_remarks)
            .bind(document.map(|d| d.document_id.as_str()))
            .bind(document.map(|d| d.verification_url.as_str()))
            .bind(document.map(|d| d.sha256.as_str()))
            .bind(document.map(|d| d.issued_at))
            .bind(request.version)
            .bind(request.created_at)
            .bind(request.updated_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<AbsenceRequest>, AppError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, TABLE);
        sqlx::query_as::<_, RequestRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AbsenceRequest::try_from)
            .transpose()
    }

    async fn find(&self, filter: &RequestFilter) -> Result<Vec<AbsenceRequest>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM {}", COLUMNS, TABLE));
        let mut has_clause = false;
        push_eq(
            &mut builder,
            &mut has_clause,
            "kind",
            filter.kind.as_ref().map(RequestKindTag::db_value),
        );
        push_eq(
            &mut builder,
            &mut has_clause,
            "student_email",
            filter.student_email.as_deref(),
        );
        push_eq(
            &mut builder,
            &mut has_clause,
            "department",
            filter.department.as_deref(),
        );
        push_eq(&mut builder, &mut has_clause, "year", filter.year.as_deref());
        push_eq(
            &mut builder,
            &mut has_clause,
            "section",
            filter.section.as_deref(),
        );
        push_eq(
            &mut builder,
            &mut has_clause,
            "status",
            filter.status.as_ref().map(OverallStatus::db_value),
        );
        push_eq(
            &mut builder,
            &mut has_clause,
            "staff_status",
            filter.staff_status.as_ref().map(StageStatus::db_value),
        );
        push_eq(
            &mut builder,
            &mut has_clause,
            "hod_status",
            filter.hod_status.as_ref().map(StageStatus::db_value),
        );
        if let Some(leave_type) = filter.leave_type {
            push_clause(&mut builder, &mut has_clause);
            builder
                .push("leave_type = ")
                .push_bind(leave_type.db_value());
        }
        builder.push(" ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<RequestRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to list absence requests");
                AppError::from(err)
            })?;
        rows_into_requests(rows)
    }

    async fn find_by_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<AbsenceRequest>, AppError> {
        let query = format!("SELECT {} FROM {} WHERE document_id = $1", COLUMNS, TABLE);
        sqlx::query_as::<_, RequestRow>(&query)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?
            .map(AbsenceRequest::try_from)
            .transpose()
    }

    async fn update(&self, request: &AbsenceRequest) -> Result<Option<AbsenceRequest>, AppError> {
        let query = format!(
            "UPDATE {} SET from_text = $3, to_text = $4, subject = $5, content = $6, \
             leave_type = $7, leave_reason = $8, year = $9, section = $10, attachment = $11, \
             staff_status = $12, hod_status = $13, status = $14, forwarded_by = $15, \
             forwarded_by_incharge = $16, forwarded_at = $17, rejected_by = $18, \
             rejection_reason = $19, staff_remarks = $20, hod_remarks = $21, document_id = $22, \
             verification_url = $23, document_sha256 = $24, document_issued_at = $25, \
             updated_at = $26, version = version + 1 \
             WHERE id = $1 AND version = $2 RETURNING {}",
            TABLE, COLUMNS
        );
        let leave = request.kind.leave();
        let document = request.document.as_ref();
        let row = sqlx::query_as::<_, RequestRow>(&query)
            .bind(request.id)
            .bind(request.version)
            .bind(&request.from)
            .bind(&request.to)
            .bind(&request.subject)
            .bind(&request.content)
            .bind(leave.map(|d| d.leave_type.db_value()))
            .bind(leave.map(|d| d.reason.as_str()))
            .bind(&request.placement.year)
            .bind(&request.placement.section)
            .bind(&request.attachment)
            .bind(request.staff_status.db_value())
            .bind(request.hod_status.db_value())
            .bind(request.status.db_value())
            .bind(&request.forwarded_by)
            .bind(&request.forwarded_by_incharge)
            .bind(request.forwarded_at)
            .bind(request.rejected_by.map(|r| r.db_value()))
            .bind(&request.rejection_reason)
            .bind(&request.staff_remarks)
            .bind(&request.hod_remarks)
            .bind(document.map(|d| d.document_id.as_str()))
            .bind(document.map(|d| d.verification_url.as_str()))
            .bind(document.map(|d| d.sha256.as_str()))
            .bind(document.map(|d| d.issued_at))
            .bind(request.updated_at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AbsenceRequest::try_from).transpose()
    }

    async fn delete(&self, id: RequestId) -> Result<bool, AppError> {
        let query = format!("DELETE FROM {} WHERE id = $1", TABLE);
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAbsenceRequest;

    fn leave_request() -> AbsenceRequest {
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        AbsenceRequest::new(
            NewAbsenceRequest {
                student_name: "A".into(),
                student_email: "a@college.edu".into(),
                from: "A".into(),
                to: "Advisor".into(),
                subject: "Leave".into(),
                content: "fever".into(),
                kind: RequestKind::Leave(LeaveDetails {
                    leave_type: LeaveType::Sick,
                    reason: "fever".into(),
                    from_date: date,
                    to_date: date,
                }),
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
    fn test_mock_request_store_trait_bounds() {
        fn check_send_sync<T: Send + Sync>() {}
        check_send_sync::<MockRequestStore>();
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(RequestFilter::default().matches(&leave_request()));
    }

    #[test]
    fn filter_matches_on_every_set_field() {
        let request = leave_request();
        let hod_queue = RequestFilter {
            department: Some("CSE".into()),
            staff_status: Some(StageStatus::Approved),
            hod_status: Some(StageStatus::Pending),
            ..Default::default()
        };
        assert!(!hod_queue.matches(&request));

        let by_type = RequestFilter {
            leave_type: Some(LeaveType::Sick),
            kind: Some(RequestKindTag::Leave),
            ..Default::default()
        };
        assert!(by_type.matches(&request));

        let other_section = RequestFilter {
            section: Some("B".into()),
            ..Default::default()
        };
        assert!(!other_section.matches(&request));
    }
}
