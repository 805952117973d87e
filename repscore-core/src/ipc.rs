use crate::error::RepscoreError;
use crate::models::{BillId, Disposition, LegislatorFilter, LegislatorId, UserId};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "0.1.0";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScoreRequest {
    Ping,
    Health,
    /// Compute without publishing.
    ComputeScore {
        legislator_id: LegislatorId,
    },
    /// Read the published score.
    GetScore {
        legislator_id: LegislatorId,
    },
    /// Legislator profile plus published score.
    GetLegislator {
        legislator_id: LegislatorId,
    },
    /// Roster page of active legislators with published scores.
    ListLegislators {
        #[serde(default)]
        filter: LegislatorFilter,
    },
    RefreshLegislator {
        legislator_id: LegislatorId,
    },
    RefreshAll,
    /// Bill totals; with `user_id`, also that user's own stance.
    BillSentiment {
        bill_id: BillId,
        #[serde(default)]
        user_id: Option<UserId>,
    },
    UserSentiments {
        user_id: UserId,
    },
    SubmitSentiment {
        user_id: UserId,
        bill_id: BillId,
        disposition: Disposition,
    },
    RemoveSentiment {
        user_id: UserId,
        bill_id: BillId,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    /// `RepscoreError::kind()` of the failure, when there is one.
    #[serde(default)]
    pub error_kind: Option<String>,
    pub version: String,
}

impl ScoreResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            error_kind: None,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            error_kind: None,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn from_error(error: &RepscoreError) -> Self {
        let mut resp = Self::err(error.to_string());
        resp.error_kind = Some(error.kind().to_string());
        resp
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
