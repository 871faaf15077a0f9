//! Recipient directory used to route notifications.
//!
//! The directory answers "who reviews this class" and "who heads this
//! department", and stores the push token of each person's latest device.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::models::{DirectoryRole, Recipient};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Staff assigned to a department, year and section.
    async fn find_class_staff(
        &self,
        department: &str,
        year: &str,
        section: &str,
    ) -> Result<Vec<Recipient>, AppError>;

    /// Head of a department, if one is registered.
    async fn find_department_head(&self, department: &str)
        -> Result<Option<Recipient>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Recipient>, AppError>;

    /// Store the device token for a known person. Returns false when the
    /// email is not in the directory.
    async fn register_device(&self, email: &str, token: &str) -> Result<bool, AppError>;
}

const COLUMNS: &str = "email, name, role, department, year, section, device_token";

#[derive(Debug, FromRow)]
struct RecipientRow {
    email: String,
    name: String,
    role: String,
    department: String,
    year: Option<String>,
    section: Option<String>,
    device_token: Option<String>,
}

impl TryFrom<RecipientRow> for Recipient {
    type Error = AppError;

    fn try_from(row: RecipientRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<DirectoryRole>()
            .map_err(|msg| AppError::InternalServerError(anyhow!(msg)))?;
        Ok(Recipient {
            email: row.email,
            name: row.name,
            role,
            department: row.department,
            year: row.year,
            section: row.section,
            device_token: row.device_token,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgRecipientDirectory {
    pool: PgPool,
}

impl PgRecipientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientDirectory for PgRecipientDirectory {
    async fn find_class_staff(
        &self,
        department: &str,
        year: &str,
        section: &str,
    ) -> Result<Vec<Recipient>, AppError> {
        let query = format!(
            "SELECT {} FROM directory_members \
             WHERE role = $1 AND department = $2 AND year = $3 AND section = $4 \
             ORDER BY email",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, RecipientRow>(&query)
            .bind(DirectoryRole::Staff.db_value())
            .bind(department)
            .bind(year)
            .bind(section)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Recipient::try_from).collect()
    }

    async fn find_department_head(
        &self,
        department: &str,
    ) -> Result<Option<Recipient>, AppError> {
        let query = format!(
            "SELECT {} FROM directory_members WHERE role = $1 AND department = $2 \
             ORDER BY email LIMIT 1",
            COLUMNS
        );
        sqlx::query_as::<_, RecipientRow>(&query)
            .bind(DirectoryRole::Hod.db_value())
            .bind(department)
            .fetch_optional(&self.pool)
            .await?
            .map(Recipient::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Recipient>, AppError> {
        let query = format!(
            "SELECT {} FROM directory_members WHERE email = $1",
            COLUMNS
        );
        sqlx::query_as::<_, RecipientRow>(&query)
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?
            .map(Recipient::try_from)
            .transpose()
    }

    async fn register_device(&self, email: &str, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE directory_members SET device_token = $2, device_token_updated_at = NOW() \
             WHERE email = $1",
        )
        .bind(email.to_lowercase())
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_directory_trait_bounds() {
        fn check_send_sync<T: Send + Sync>() {}
        check_send_sync::<MockRecipientDirectory>();
    }

    #[test]
    fn unknown_role_in_row_is_an_internal_error() {
        let row = RecipientRow {
            email: "x@college.edu".into(),
            name: "X".into(),
            role: "janitor".into(),
            department: "CSE".into(),
            year: None,
            section: None,
            device_token: None,
        };
        assert!(matches!(
            Recipient::try_from(row),
            Err(AppError::InternalServerError(_))
        ));
    }
}
