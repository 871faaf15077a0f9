//! Public document verification.
//!
//! Anyone holding a printed certificate can scan its QR code and land here.
//! The lookup is an exact match on an accepted request's document ID. Every
//! failure renders the same invalid page, so the response never reveals why
//! a given ID was refused.

use std::sync::Arc;

use crate::models::{AbsenceRequest, OverallStatus};
use crate::repositories::RequestStore;
use crate::services::document::is_well_formed_document_id;
use crate::utils::html::escape;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedDocument {
    pub document_id: String,
    pub kind_label: &'static str,
    pub student_name: String,
    pub student_email: String,
    pub department: String,
    pub window: String,
    pub reason: String,
    pub forwarded_by: Option<String>,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationView {
    Valid(Box<VerifiedDocument>),
    Invalid,
}

impl VerificationView {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationView::Valid(_))
    }

    pub fn render(&self) -> String {
        match self {
            VerificationView::Valid(doc) => render_valid(doc),
            VerificationView::Invalid => render_invalid(),
        }
    }
}

#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn RequestStore>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    /// Matches the ID exactly as given; padding or case changes are invalid.
    pub async fn verify(&self, document_id: &str) -> VerificationView {
        if !is_well_formed_document_id(document_id) {
            return VerificationView::Invalid;
        }

        let request = match self.store.find_by_document_id(document_id).await {
            Ok(Some(request)) => request,
            Ok(None) => return VerificationView::Invalid,
            Err(err) => {
                tracing::warn!(error = %err, "verification lookup failed");
                return VerificationView::Invalid;
            }
        };

        match confirm(&request, document_id) {
            Some(doc) => {
                tracing::info!(document_id, request_id = %request.id, "document verified");
                VerificationView::Valid(Box::new(doc))
            }
            None => VerificationView::Invalid,
        }
    }
}

fn confirm(request: &AbsenceRequest, document_id: &str) -> Option<VerifiedDocument> {
    if request.status != OverallStatus::Accepted {
        return None;
    }
    let document = request.document.as_ref()?;
    if document.document_id != document_id {
        return None;
    }
    Some(VerifiedDocument {
        document_id: document.document_id.clone(),
        kind_label: request.kind_tag().label(),
        student_name: request.student_name.clone(),
        student_email: request.student_email.clone(),
        department: request.placement.department.clone(),
        window: request.window_label(),
        reason: request.stated_reason().to_string(),
        forwarded_by: request.forwarded_by.clone(),
        sha256: document.sha256.clone(),
    })
}

const STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;background:#f4f6f8;margin:0;padding:32px}\
.card{max-width:560px;margin:0 auto;background:#fff;border-radius:8px;padding:24px;box-shadow:0 1px 4px rgba(0,0,0,.1)}\
.badge{display:inline-block;padding:4px 12px;border-radius:12px;color:#fff;font-weight:bold}\
.ok{background:#1e8e3e}.bad{background:#c5221f}\
dt{font-weight:bold;margin-top:8px}dd{margin:0}code{word-break:break-all}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title><style>{STYLE}</style></head>\
         <body><div class=\"card\">{body}</div></body></html>"
    )
}

fn render_valid(doc: &VerifiedDocument) -> String {
    let mut rows = vec![
        ("Document ID", escape(&doc.document_id)),
        ("Type", escape(doc.kind_label)),
        ("Name", escape(&doc.student_name)),
        ("Email", escape(&doc.student_email)),
        ("Department", escape(&doc.department)),
        ("Period", escape(&doc.window)),
        ("Reason / Activity", escape(&doc.reason)),
    ];
    if let Some(staff) = &doc.forwarded_by {
        rows.push(("Forwarded by", escape(staff)));
    }
    rows.push(("SHA-256", format!("<code>{}</code>", escape(&doc.sha256))));

    let list: String = rows
        .into_iter()
        .map(|(label, value)| format!("<dt>{label}</dt><dd>{value}</dd>"))
        .collect();
    page(
        "Document verified",
        &format!(
            "<span class=\"badge ok\">Authorized</span>\
             <h1>Document verified</h1>\
             <p>This document was issued by the institution and is authentic.</p>\
             <dl>{list}</dl>"
        ),
    )
}

fn render_invalid() -> String {
    page(
        "Invalid document",
        "<span class=\"badge bad\">Invalid</span>\
         <h1>Invalid document</h1>\
         <p>This document could not be verified. It may have been altered or was never issued.</p>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{
        DocumentReference, NewAbsenceRequest, Placement, RequestKind, StageStatus,
    };
    use crate::repositories::request_repository::MockRequestStore;
    use chrono::Utc;

    const DOC_ID: &str = "OD-20250101-AB12";

    fn issued(name: &str) -> AbsenceRequest {
        let mut request = AbsenceRequest::new(
            NewAbsenceRequest {
                student_name: name.into(),
                student_email: "s@college.edu".into(),
                from: "1 Jan".into(),
                to: "2 Jan".into(),
                subject: "OD".into(),
                content: "Quiz".into(),
                kind: RequestKind::Od,
                duration: 2,
                placement: Placement {
                    department: "CSE".into(),
                    year: "1".into(),
                    section: "A".into(),
                },
                attachment: None,
            },
            Utc::now(),
        );
        request.staff_status = StageStatus::Approved;
        request.hod_status = StageStatus::Approved;
        request.status = OverallStatus::Accepted;
        request.document = Some(DocumentReference {
            document_id: DOC_ID.into(),
            verification_url: format!("http://localhost/api/verify/{DOC_ID}"),
            sha256: "ab".repeat(32),
            issued_at: Utc::now(),
        });
        request
    }

    fn service_returning(request: Option<AbsenceRequest>) -> VerificationService {
        let mut store = MockRequestStore::new();
        store
            .expect_find_by_document_id()
            .returning(move |_| Ok(request.clone()));
        VerificationService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn valid_document_shows_escaped_details() {
        let service = service_returning(Some(issued("<script>alert(1)</script>")));
        let view = service.verify(DOC_ID).await;
        assert!(view.is_valid());
        let html = view.render();
        assert!(html.contains("Authorized"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn malformed_ids_never_reach_the_store() {
        let mut store = MockRequestStore::new();
        store.expect_find_by_document_id().never();
        let service = VerificationService::new(Arc::new(store));
        for raw in ["", "   ", "od-20250101-ab12", "<b>", "x".repeat(200).as_str()] {
            assert_eq!(service.verify(raw).await, VerificationView::Invalid, "{raw}");
        }
    }

    #[tokio::test]
    async fn padded_ids_are_not_trimmed_into_a_match() {
        let mut store = MockRequestStore::new();
        store.expect_find_by_document_id().never();
        let service = VerificationService::new(Arc::new(store));
        for raw in [format!(" {DOC_ID}"), format!("{DOC_ID} "), format!("{DOC_ID}\n")] {
            assert_eq!(service.verify(&raw).await, VerificationView::Invalid, "{raw:?}");
        }
    }

    #[tokio::test]
    async fn every_failure_renders_the_same_page() {
        let unknown = service_returning(None).verify("OD-20250101-ZZZZ").await;

        let mut pending = issued("A");
        pending.status = OverallStatus::Pending;
        let not_accepted = service_returning(Some(pending)).verify(DOC_ID).await;

        let mut store = MockRequestStore::new();
        store
            .expect_find_by_document_id()
            .returning(|_| Err(AppError::InternalServerError(anyhow::anyhow!("db down"))));
        let store_error = VerificationService::new(Arc::new(store))
            .verify(DOC_ID)
            .await;

        let garbage = service_returning(None).verify("!!").await;

        let pages: Vec<String> = [unknown, not_accepted, store_error, garbage]
            .iter()
            .map(VerificationView::render)
            .collect();
        assert!(pages.iter().all(|p| p == &render_invalid()));
    }
}
