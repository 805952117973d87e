use super::{BillId, Disposition};
use crate::error::RepscoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A legislator's recorded outcome on a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Yea,
    Nay,
    Absent,
    Present,
}

impl VoteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteOutcome::Yea => "yea",
            VoteOutcome::Nay => "nay",
            VoteOutcome::Absent => "absent",
            VoteOutcome::Present => "present",
        }
    }

    /// The sentiment pole this vote expresses. `absent` and `present` align
    /// with neither pole, so they can never match a constituent majority.
    pub fn alignment(&self) -> Option<Disposition> {
        match self {
            VoteOutcome::Yea => Some(Disposition::Support),
            VoteOutcome::Nay => Some(Disposition::Oppose),
            VoteOutcome::Absent | VoteOutcome::Present => None,
        }
    }
}

impl fmt::Display for VoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteOutcome {
    type Err = RepscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yea" => Ok(VoteOutcome::Yea),
            "nay" => Ok(VoteOutcome::Nay),
            "absent" => Ok(VoteOutcome::Absent),
            "present" => Ok(VoteOutcome::Present),
            other => Err(RepscoreError::Malformed(format!("unknown vote outcome: {other}"))),
        }
    }
}

/// One row of `list_votes_by_legislator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub bill_id: BillId,
    pub outcome: VoteOutcome,
}

impl VoteRecord {
    pub fn new(bill_id: impl Into<BillId>, outcome: VoteOutcome) -> Self {
        Self {
            bill_id: bill_id.into(),
            outcome,
        }
    }
}
