//! Push notifications for workflow events.
//!
//! `NotificationGateway` resolves people through the [`RecipientDirectory`]
//! and hands messages to a [`PushTransport`]. Delivery is always best-effort
//! from the workflow's point of view; the gateway only reports what happened.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::error::AppError;
use crate::models::{AbsenceRequest, Placement, Recipient};
use crate::repositories::RecipientDirectory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub recipient: String,
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no device registered for {0}")]
    NoDeviceRegistered(String),
    #[error("unknown recipient {0}")]
    UnknownRecipient(String),
    #[error("push transport is not configured")]
    TransportUnavailable,
    #[error("push transport failed: {0}")]
    Transport(String),
    #[error("directory lookup failed: {0}")]
    Directory(String),
}

impl From<AppError> for DeliveryError {
    fn from(err: AppError) -> Self {
        DeliveryError::Directory(err.to_string())
    }
}

/// Sends one message to one device token. Returns the provider's message ID.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<String, DeliveryError>;
}

/// HTTP transport speaking the FCM v1 `messages:send` shape.
#[derive(Debug, Clone)]
pub struct FcmTransport {
    client: reqwest::Client,
    endpoint: Url,
    access_token: String,
}

impl FcmTransport {
    pub fn new(endpoint: Url, access_token: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            access_token,
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct FcmSendResponse {
    name: String,
}

#[async_trait]
impl PushTransport for FcmTransport {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<String, DeliveryError> {
        let mut data = message.data.clone();
        data.insert(
            "click_action".to_string(),
            "FLUTTER_NOTIFICATION_CLICK".to_string(),
        );
        let body = json!({
            "message": {
                "token": token,
                "notification": { "title": message.title, "body": message.body },
                "data": data,
            }
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Transport(format!("{status}: {detail}")));
        }

        let parsed: FcmSendResponse = response
            .json()
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;
        Ok(parsed.name)
    }
}

/// Transport used when no push endpoint is configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledTransport;

#[async_trait]
impl PushTransport for DisabledTransport {
    async fn send(&self, _token: &str, _message: &PushMessage) -> Result<String, DeliveryError> {
        Err(DeliveryError::TransportUnavailable)
    }
}

#[derive(Clone)]
pub struct NotificationGateway {
    directory: Arc<dyn RecipientDirectory>,
    transport: Arc<dyn PushTransport>,
}

impl NotificationGateway {
    pub fn new(directory: Arc<dyn RecipientDirectory>, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            directory,
            transport,
        }
    }

    /// Deliver a message to the device registered for `email`.
    pub async fn notify(
        &self,
        email: &str,
        message: &PushMessage,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let recipient = self
            .directory
            .find_by_email(email)
            .await?
            .ok_or_else(|| DeliveryError::UnknownRecipient(email.to_string()))?;
        self.deliver(&recipient, message).await
    }

    /// Deliver to an already resolved recipient.
    pub async fn deliver(
        &self,
        recipient: &Recipient,
        message: &PushMessage,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let token = recipient
            .device_token
            .as_deref()
            .filter(|_| recipient.has_device())
            .ok_or_else(|| DeliveryError::NoDeviceRegistered(recipient.email.clone()))?;
        let message_id = self.transport.send(token, message).await?;
        tracing::info!(recipient = %recipient.email, %message_id, "push notification sent");
        Ok(DeliveryReceipt {
            recipient: recipient.email.clone(),
            message_id,
        })
    }

    /// Class staff for a placement who can receive pushes.
    pub async fn find_recipients(
        &self,
        placement: &Placement,
    ) -> Result<Vec<Recipient>, DeliveryError> {
        let staff = self
            .directory
            .find_class_staff(&placement.department, &placement.year, &placement.section)
            .await?;
        Ok(staff.into_iter().filter(Recipient::has_device).collect())
    }

    pub async fn find_department_head(
        &self,
        department: &str,
    ) -> Result<Option<Recipient>, DeliveryError> {
        Ok(self.directory.find_department_head(department).await?)
    }

    /// Returns false when the email is unknown.
    pub async fn register_device(&self, email: &str, token: &str) -> Result<bool, AppError> {
        self.directory.register_device(email, token).await
    }
}

/// Review stage that acted on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reviewer {
    Staff,
    Hod,
}

impl Reviewer {
    fn label(self) -> &'static str {
        match self {
            Reviewer::Staff => "Staff",
            Reviewer::Hod => "HOD",
        }
    }
}

/// Outcome a student is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentUpdate {
    Approved(Reviewer),
    Rejected(Reviewer),
    Forwarded,
}

fn base_data(kind: &str, request: &AbsenceRequest, event: &str) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    data.insert("type".to_string(), event.to_string());
    data.insert("request_type".to_string(), kind.to_string());
    data.insert("request_id".to_string(), request.id.to_string());
    data
}

pub fn new_request_message(request: &AbsenceRequest) -> PushMessage {
    let kind = request.kind_tag().label();
    let mut data = base_data(kind, request, "new_request");
    data.insert("student_email".to_string(), request.student_email.clone());
    PushMessage {
        title: format!("New {kind} Request"),
        body: format!(
            "{} has submitted a {} request",
            request.student_name,
            kind.to_lowercase()
        ),
        data,
    }
}

pub fn forwarded_to_hod_message(request: &AbsenceRequest) -> PushMessage {
    let kind = request.kind_tag().label();
    let mut data = base_data(kind, request, "forwarded_request");
    data.insert("student_email".to_string(), request.student_email.clone());
    PushMessage {
        title: format!("{kind} Request Forwarded"),
        body: format!(
            "A {} request from {} needs your approval",
            kind.to_lowercase(),
            request.student_name
        ),
        data,
    }
}

pub fn student_update_message(request: &AbsenceRequest, update: StudentUpdate) -> PushMessage {
    let kind = request.kind_tag().label();
    let lower = kind.to_lowercase();
    let (title, body, status) = match update {
        StudentUpdate::Approved(by) => (
            format!("{kind} Request Approved"),
            format!(
                "Your {lower} request has been approved by {}",
                by.label()
            ),
            "approved",
        ),
        StudentUpdate::Rejected(by) => (
            format!("{kind} Request Rejected"),
            format!(
                "Your {lower} request has been rejected by {}",
                by.label()
            ),
            "rejected",
        ),
        StudentUpdate::Forwarded => (
            format!("{kind} Request Forwarded"),
            format!("Your {lower} request has been forwarded to HOD for approval"),
            "forwarded",
        ),
    };
    let mut data = base_data(kind, request, "status_update");
    data.insert("status".to_string(), status.to_string());
    PushMessage { title, body, data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DirectoryRole, NewAbsenceRequest, RequestKind};
    use crate::repositories::InMemoryDirectory;
    use chrono::Utc;

    fn od_request() -> AbsenceRequest {
        AbsenceRequest::new(
            NewAbsenceRequest {
                student_name: "Kavya".into(),
                student_email: "kavya@college.edu".into(),
                from: "10 Mar".into(),
                to: "11 Mar".into(),
                subject: "Symposium".into(),
                content: "Paper presentation".into(),
                kind: RequestKind::Od,
                duration: 2,
                placement: Placement {
                    department: "ECE".into(),
                    year: "2".into(),
                    section: "C".into(),
                },
                attachment: None,
            },
            Utc::now(),
        )
    }

    fn member(email: &str, role: DirectoryRole, token: Option<&str>) -> Recipient {
        Recipient {
            email: email.into(),
            name: email.into(),
            role,
            department: "ECE".into(),
            year: Some("2".into()),
            section: Some("C".into()),
            device_token: token.map(str::to_string),
        }
    }

    #[test]
    fn student_messages_name_the_deciding_stage() {
        let request = od_request();
        let rejected = student_update_message(&request, StudentUpdate::Rejected(Reviewer::Staff));
        assert_eq!(rejected.title, "OD Request Rejected");
        assert_eq!(rejected.body, "Your od request has been rejected by Staff");
        assert_eq!(rejected.data["status"], "rejected");
        assert_eq!(rejected.data["request_id"], request.id.to_string());

        let approved = student_update_message(&request, StudentUpdate::Approved(Reviewer::Hod));
        assert_eq!(approved.body, "Your od request has been approved by HOD");

        let forwarded = student_update_message(&request, StudentUpdate::Forwarded);
        assert_eq!(forwarded.data["type"], "status_update");
        assert_eq!(forwarded.data["status"], "forwarded");
    }

    #[test]
    fn staff_and_hod_messages_carry_request_type() {
        let request = od_request();
        let new = new_request_message(&request);
        assert_eq!(new.title, "New OD Request");
        assert_eq!(new.data["request_type"], "OD");
        let forwarded = forwarded_to_hod_message(&request);
        assert_eq!(forwarded.title, "OD Request Forwarded");
        assert_eq!(forwarded.data["type"], "forwarded_request");
    }

    #[tokio::test]
    async fn notify_sends_to_registered_token() {
        let directory = InMemoryDirectory::seeded([member(
            "kavya@college.edu",
            DirectoryRole::Student,
            Some("device-1"),
        )]);
        let mut transport = MockPushTransport::new();
        transport
            .expect_send()
            .withf(|token, message| token == "device-1" && message.title == "New OD Request")
            .times(1)
            .returning(|_, _| Ok("projects/x/messages/1".to_string()));

        let gateway = NotificationGateway::new(Arc::new(directory), Arc::new(transport));
        let message = new_request_message(&od_request());
        let receipt = gateway.notify("kavya@college.edu", &message).await.unwrap();
        assert_eq!(receipt.message_id, "projects/x/messages/1");
    }

    #[tokio::test]
    async fn notify_reports_missing_device_and_unknown_people() {
        let directory = InMemoryDirectory::seeded([member(
            "kavya@college.edu",
            DirectoryRole::Student,
            None,
        )]);
        let mut transport = MockPushTransport::new();
        transport.expect_send().never();
        let gateway = NotificationGateway::new(Arc::new(directory), Arc::new(transport));
        let message = new_request_message(&od_request());

        assert!(matches!(
            gateway.notify("kavya@college.edu", &message).await,
            Err(DeliveryError::NoDeviceRegistered(_))
        ));
        assert!(matches!(
            gateway.notify("ghost@college.edu", &message).await,
            Err(DeliveryError::UnknownRecipient(_))
        ));
    }

    #[tokio::test]
    async fn find_recipients_skips_staff_without_devices() {
        let directory = InMemoryDirectory::seeded([
            member("a@college.edu", DirectoryRole::Staff, Some("tok-a")),
            member("b@college.edu", DirectoryRole::Staff, None),
        ]);
        let gateway = NotificationGateway::new(Arc::new(directory), Arc::new(DisabledTransport));
        let recipients = gateway
            .find_recipients(&od_request().placement)
            .await
            .unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].email, "a@college.edu");
    }
}
