//! In-process store and directory, selected with `STORE_BACKEND=memory` and
//! used by the integration tests.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{AbsenceRequest, DirectoryRole, Recipient};
use crate::repositories::directory_repository::RecipientDirectory;
use crate::repositories::request_repository::{RequestFilter, RequestStore};
use crate::types::RequestId;

fn poisoned<T>(_: T) -> AppError {
    AppError::InternalServerError(anyhow!("in-memory store lock poisoned"))
}

#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    records: RwLock<HashMap<RequestId, AbsenceRequest>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn create(&self, request: &AbsenceRequest) -> Result<AbsenceRequest, AppError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&request.id) {
            return Err(AppError::Conflict(format!(
                "Request {} already exists",
                request.id
            )));
        }
        records.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<AbsenceRequest>, AppError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&id).cloned())
    }

    async fn find(&self, filter: &RequestFilter) -> Result<Vec<AbsenceRequest>, AppError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut matching: Vec<AbsenceRequest> = records
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn find_by_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<AbsenceRequest>, AppError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .find(|request| request.document_id() == Some(document_id))
            .cloned())
    }

    async fn update(&self, request: &AbsenceRequest) -> Result<Option<AbsenceRequest>, AppError> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.get_mut(&request.id) {
            Some(stored) if stored.version == request.version => {
                let mut saved = request.clone();
                saved.version += 1;
                *stored = saved.clone();
                Ok(Some(saved))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: RequestId) -> Result<bool, AppError> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.remove(&id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    members: RwLock<HashMap<String, Recipient>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory pre-populated with the given people.
    pub fn seeded(members: impl IntoIterator<Item = Recipient>) -> Self {
        let directory = Self::new();
        if let Ok(mut map) = directory.members.write() {
            for member in members {
                map.insert(member.email.to_lowercase(), member);
            }
        }
        directory
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryDirectory {
    async fn find_class_staff(
        &self,
        department: &str,
        year: &str,
        section: &str,
    ) -> Result<Vec<Recipient>, AppError> {
        let members = self.members.read().map_err(poisoned)?;
        let mut staff: Vec<Recipient> = members
            .values()
            .filter(|m| {
                m.role == DirectoryRole::Staff
                    && m.department == department
                    && m.year.as_deref() == Some(year)
                    && m.section.as_deref() == Some(section)
            })
            .cloned()
            .collect();
        staff.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(staff)
    }

    async fn find_department_head(
        &self,
        department: &str,
    ) -> Result<Option<Recipient>, AppError> {
        let members = self.members.read().map_err(poisoned)?;
        Ok(members
            .values()
            .filter(|m| m.role == DirectoryRole::Hod && m.department == department)
            .min_by(|a, b| a.email.cmp(&b.email))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Recipient>, AppError> {
        let members = self.members.read().map_err(poisoned)?;
        Ok(members.get(&email.to_lowercase()).cloned())
    }

    async fn register_device(&self, email: &str, token: &str) -> Result<bool, AppError> {
        let mut members = self.members.write().map_err(poisoned)?;
        match members.get_mut(&email.to_lowercase()) {
            Some(member) => {
                member.device_token = Some(token.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
