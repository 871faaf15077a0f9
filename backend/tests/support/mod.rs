#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono_tz::Asia::Kolkata;
use http_body_util::BodyExt;
use passdesk_backend::{
    models::{DirectoryRole, Recipient},
    repositories::{InMemoryDirectory, InMemoryRequestStore, RequestStore},
    routes::build_router,
    services::{
        DeliveryError, DocumentGenerator, DocumentSettings, NotificationGateway, PushMessage,
        PushTransport, VerificationService, WorkflowEngine,
    },
    state::AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

pub const STUDENT_EMAIL: &str = "arun.k@college.edu";
pub const STAFF_EMAIL: &str = "meena.staff@college.edu";
pub const HOD_EMAIL: &str = "hod.cse@college.edu";
pub const STUDENT_TOKEN: &str = "device-student";
pub const STAFF_TOKEN: &str = "device-staff";
pub const HOD_TOKEN: &str = "device-hod";

const LETTERHEAD: &str = r#"{
  "institution": "Government College of Engineering",
  "affiliation": "Affiliated to the State Technical University",
  "address_lines": ["College Road, Main Campus"],
  "contact": "office@college.edu"
}"#;

/// Push transport that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, PushMessage)>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(String, PushMessage)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, token: &str) -> Vec<PushMessage> {
        self.sent()
            .into_iter()
            .filter(|(t, _)| t == token)
            .map(|(_, m)| m)
            .collect()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<String, DeliveryError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;
        sent.push((token.to_string(), message.clone()));
        Ok(format!("projects/test/messages/{}", sent.len()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryRequestStore>,
    pub transport: Arc<RecordingTransport>,
    pub dir: TempDir,
}

fn member(
    email: &str,
    name: &str,
    role: DirectoryRole,
    year: Option<&str>,
    section: Option<&str>,
    token: &str,
) -> Recipient {
    Recipient {
        email: email.to_string(),
        name: name.to_string(),
        role,
        department: "CSE".to_string(),
        year: year.map(str::to_string),
        section: section.map(str::to_string),
        device_token: Some(token.to_string()),
    }
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("letterhead.json"), LETTERHEAD).expect("letterhead");

        let store = Arc::new(InMemoryRequestStore::new());
        let directory = Arc::new(InMemoryDirectory::seeded([
            member(
                STUDENT_EMAIL,
                "Arun K",
                DirectoryRole::Student,
                Some("3"),
                Some("A"),
                STUDENT_TOKEN,
            ),
            member(
                STAFF_EMAIL,
                "Meena R",
                DirectoryRole::Staff,
                Some("3"),
                Some("A"),
                STAFF_TOKEN,
            ),
            member(HOD_EMAIL, "Dr. Ravi", DirectoryRole::Hod, None, None, HOD_TOKEN),
        ]));
        let transport = Arc::new(RecordingTransport::default());

        let settings = DocumentSettings {
            documents_dir: dir.path().join("documents"),
            letterhead_path: dir.path().join("letterhead.json"),
            public_base_url: Url::parse("https://passdesk.test").expect("base url"),
            time_zone: Kolkata,
        };
        let notifier = NotificationGateway::new(directory, transport.clone());
        let request_store: Arc<dyn RequestStore> = store.clone();
        let engine = WorkflowEngine::new(
            request_store.clone(),
            notifier.clone(),
            DocumentGenerator::new(settings),
            2,
        );
        let verifier = VerificationService::new(request_store);

        Self {
            router: build_router(AppState::new(engine, verifier, notifier)),
            store,
            transport,
            dir,
        }
    }

    pub fn letterhead_path(&self) -> PathBuf {
        self.dir.path().join("letterhead.json")
    }

    pub fn document_path(&self, document_id: &str) -> PathBuf {
        self.dir
            .path()
            .join("documents")
            .join(format!("{document_id}.pdf"))
    }

    pub async fn send_json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    pub async fn get_raw(&self, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        (status, headers, bytes.to_vec())
    }

    pub async fn submit(&self, body: Value) -> (StatusCode, Value) {
        self.send_json(Method::POST, "/api/requests", Some(body)).await
    }

    pub async fn staff(&self, id: &str, body: Value) -> (StatusCode, Value) {
        self.send_json(Method::PUT, &format!("/api/requests/{id}/staff-status"), Some(body))
            .await
    }

    pub async fn hod(&self, id: &str, body: Value) -> (StatusCode, Value) {
        self.send_json(Method::PUT, &format!("/api/requests/{id}/hod-status"), Some(body))
            .await
    }

    /// Submits an OD request and walks it through both approvals.
    pub async fn accepted_od(&self) -> Value {
        let (status, created) = self.submit(od_body("Arun K")).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        let id = request_id(&created);
        let (status, body) = self
            .staff(&id, serde_json::json!({ "status": "approved", "staff_name": "Meena R" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let (status, body) = self.hod(&id, serde_json::json!({ "status": "approved" })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }
}

pub fn od_body(name: &str) -> Value {
    serde_json::json!({
        "kind": "od",
        "student_name": name,
        "student_email": STUDENT_EMAIL,
        "from": "2025-03-10 09:00",
        "to": "2025-03-10 17:00",
        "subject": "State level hackathon",
        "content": "Requesting on-duty to represent the department at the hackathon.",
        "department": "CSE",
        "year": "3",
        "section": "A"
    })
}

/// Leave starting 2025-03-10 whose date window spans `duration` days.
pub fn leave_body(duration: i32) -> Value {
    let from_date = chrono::NaiveDate::from_ymd_opt(2025, 3, 10).expect("date");
    let to_date = from_date + chrono::Duration::days(i64::from(duration) - 1);
    serde_json::json!({
        "kind": "leave",
        "student_name": "Arun K",
        "student_email": STUDENT_EMAIL,
        "from": "Arun K",
        "to": "Class Advisor",
        "subject": "Leave request",
        "content": "Down with fever",
        "reason": "Fever",
        "leave_type": "Sick Leave",
        "from_date": from_date.to_string(),
        "to_date": to_date.to_string(),
        "duration": duration,
        "department": "CSE",
        "year": "3",
        "section": "A"
    })
}

pub fn request_id(body: &Value) -> String {
    body["data"]["id"].as_str().expect("id in data").to_string()
}
