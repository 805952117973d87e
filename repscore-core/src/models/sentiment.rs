use super::{BillId, BillStatus};
use crate::error::RepscoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A constituent's stance on a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Support,
    Oppose,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Support => "support",
            Disposition::Oppose => "oppose",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = RepscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "support" => Ok(Disposition::Support),
            "oppose" => Ok(Disposition::Oppose),
            other => Err(RepscoreError::Malformed(format!("unknown sentiment: {other}"))),
        }
    }
}

/// One row of the grouped sentiment aggregate: (bill, disposition) -> count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyRow {
    pub bill_id: BillId,
    pub disposition: Disposition,
    pub count: u64,
}

/// Per-bill sentiment totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTally {
    pub support: u64,
    pub oppose: u64,
}

impl SentimentTally {
    pub fn new(support: u64, oppose: u64) -> Self {
        Self { support, oppose }
    }

    pub fn total(&self) -> u64 {
        self.support + self.oppose
    }

    /// Majority pole. Ties resolve to `Support`.
    pub fn majority(&self) -> Disposition {
        if self.support >= self.oppose {
            Disposition::Support
        } else {
            Disposition::Oppose
        }
    }

    pub(crate) fn set(&mut self, disposition: Disposition, count: u64) {
        match disposition {
            Disposition::Support => self.support = count,
            Disposition::Oppose => self.oppose = count,
        }
    }
}

/// One of a user's own stances, joined to the bill it was cast on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSentiment {
    pub bill_id: BillId,
    pub bill_type: String,
    pub bill_number: String,
    pub title: String,
    pub status: BillStatus,
    pub disposition: Disposition,
    pub updated_at: DateTime<Utc>,
}
