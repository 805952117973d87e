use super::BillId;
use crate::error::RepscoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Introduced,
    InCommittee,
    Passed,
    Signed,
    Vetoed,
    Failed,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Introduced => "introduced",
            BillStatus::InCommittee => "in_committee",
            BillStatus::Passed => "passed",
            BillStatus::Signed => "signed",
            BillStatus::Vetoed => "vetoed",
            BillStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = RepscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "introduced" => Ok(BillStatus::Introduced),
            "in_committee" => Ok(BillStatus::InCommittee),
            "passed" => Ok(BillStatus::Passed),
            "signed" => Ok(BillStatus::Signed),
            "vetoed" => Ok(BillStatus::Vetoed),
            "failed" => Ok(BillStatus::Failed),
            other => Err(RepscoreError::Malformed(format!("unknown bill status: {other}"))),
        }
    }
}

/// A tracked piece of legislation. Written by ingestion, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    /// State code, e.g. "UT".
    pub jurisdiction: String,
    pub bill_type: String,
    pub bill_number: String,
    pub title: String,
    pub status: BillStatus,
    pub session_year: i32,
}
