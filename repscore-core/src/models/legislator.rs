use super::LegislatorId;
use crate::error::RepscoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chamber {
    House,
    Senate,
}

impl Chamber {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::House => "house",
            Chamber::Senate => "senate",
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chamber {
    type Err = RepscoreError;

    // Ingestion writes single-letter codes; accept both forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "house" | "H" => Ok(Chamber::House),
            "senate" | "S" => Ok(Chamber::Senate),
            other => Err(RepscoreError::Malformed(format!("unknown chamber: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legislator {
    pub id: LegislatorId,
    pub first_name: String,
    pub last_name: String,
    pub chamber: Chamber,
    pub party: Option<String>,
    /// State code, e.g. "UT". Empty when ingestion did not record one.
    #[serde(default)]
    pub jurisdiction: String,
    pub active: bool,
}

impl Legislator {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Largest page a roster listing will return.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Roster query over active legislators. Pages are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegislatorFilter {
    pub chamber: Option<Chamber>,
    pub jurisdiction: Option<String>,
    /// Case-insensitive substring of the first or last name.
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for LegislatorFilter {
    fn default() -> Self {
        Self {
            chamber: None,
            jurisdiction: None,
            search: None,
            page: 0,
            limit: 20,
        }
    }
}

impl LegislatorFilter {
    pub fn validate(&self) -> Result<(), RepscoreError> {
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(RepscoreError::InvalidInput(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit)
    }

    /// Trimmed search term; blank terms match everything.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// In-process equivalent of the roster `WHERE` clause.
    pub fn matches(&self, legislator: &Legislator) -> bool {
        if !legislator.active {
            return false;
        }
        if self.chamber.is_some_and(|c| c != legislator.chamber) {
            return false;
        }
        if let Some(jurisdiction) = &self.jurisdiction {
            if legislator.jurisdiction != *jurisdiction {
                return false;
            }
        }
        match self.search_term() {
            Some(term) => {
                let term = term.to_lowercase();
                legislator.first_name.to_lowercase().contains(&term)
                    || legislator.last_name.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// One roster row: the legislator plus the published score, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegislatorSummary {
    #[serde(flatten)]
    pub legislator: Legislator,
    pub score: Option<f64>,
    pub bills_analyzed: Option<u32>,
}
