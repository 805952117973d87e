pub mod bill;
pub mod legislator;
pub mod score;
pub mod sentiment;
pub mod vote;

pub use bill::{Bill, BillStatus};
pub use legislator::{Chamber, Legislator, LegislatorFilter, LegislatorSummary, MAX_PAGE_LIMIT};
pub use score::{RepresentationScore, ScoreOutcome};
pub use sentiment::{Disposition, SentimentTally, TallyRow, UserSentiment};
pub use vote::{VoteOutcome, VoteRecord};

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Identity of a legislator, owned by the ingestion subsystem.
    LegislatorId
);
opaque_id!(
    /// Identity of a bill, owned by the ingestion subsystem.
    BillId
);
opaque_id!(
    /// Identity of an end user submitting sentiment.
    UserId
);
