//! Approval decisions as submitted by staff and HOD reviewers.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// A reviewer's verdict. Inbound strings are normalized case-insensitively;
/// `accepted`, `approve` and `forwarded` are synonyms of `approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDecision(pub String);

impl fmt::Display for InvalidDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid decision `{}`; expected \"approved\" or \"rejected\"",
            self.0
        )
    }
}

impl std::error::Error for InvalidDecision {}

impl FromStr for Decision {
    type Err = InvalidDecision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" | "accepted" | "accept" | "forwarded" | "forward" => {
                Ok(Decision::Approved)
            }
            "rejected" | "reject" => Ok(Decision::Rejected),
            _ => Err(InvalidDecision(s.to_string())),
        }
    }
}
