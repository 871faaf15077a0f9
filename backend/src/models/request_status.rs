//! Workflow status enums shared by Leave and On-Duty requests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
/// Status of a single approval stage (class staff or HOD).
pub enum StageStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl StageStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Approved => "approved",
            StageStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StageStatus::Pending),
            "approved" => Ok(StageStatus::Approved),
            "rejected" => Ok(StageStatus::Rejected),
            other => Err(format!("unknown stage status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
/// Externally visible status of a request. Stored alongside the stage statuses.
pub enum OverallStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl OverallStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            OverallStatus::Pending => "pending",
            OverallStatus::Accepted => "accepted",
            OverallStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OverallStatus::Pending)
    }
}

impl FromStr for OverallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OverallStatus::Pending),
            "accepted" => Ok(OverallStatus::Accepted),
            "rejected" => Ok(OverallStatus::Rejected),
            other => Err(format!("unknown request status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Approval stage that declined a request.
pub enum RejectedBy {
    Staff,
    Hod,
}

impl RejectedBy {
    pub fn db_value(&self) -> &'static str {
        match self {
            RejectedBy::Staff => "staff",
            RejectedBy::Hod => "hod",
        }
    }
}

impl FromStr for RejectedBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(RejectedBy::Staff),
            "hod" => Ok(RejectedBy::Hod),
            other => Err(format!("unknown rejecting party `{other}`")),
        }
    }
}
