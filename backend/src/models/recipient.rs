//! Directory entries for people who receive workflow notifications.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryRole {
    Student,
    Staff,
    Hod,
}

impl DirectoryRole {
    pub fn db_value(&self) -> &'static str {
        match self {
            DirectoryRole::Student => "student",
            DirectoryRole::Staff => "staff",
            DirectoryRole::Hod => "hod",
        }
    }
}

impl FromStr for DirectoryRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" | "user" => Ok(DirectoryRole::Student),
            "staff" => Ok(DirectoryRole::Staff),
            "hod" => Ok(DirectoryRole::Hod),
            other => Err(format!("unknown directory role `{other}`")),
        }
    }
}

/// A person known to the notification directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub name: String,
    pub role: DirectoryRole,
    pub department: String,
    pub year: Option<String>,
    pub section: Option<String>,
    /// Push token of the most recently registered device.
    pub device_token: Option<String>,
}

impl Recipient {
    pub fn has_device(&self) -> bool {
        self.device_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterDevicePayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 4096))]
    pub token: String,
}
