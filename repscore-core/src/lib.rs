pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod models;
pub mod score;
pub mod store;

pub use config::RepscoreConfig;
pub use error::{RepscoreError, Result};
pub use models::{
    Bill, BillId, BillStatus, Chamber, Disposition, Legislator, LegislatorFilter, LegislatorId,
    LegislatorSummary, RepresentationScore, ScoreOutcome, SentimentTally, TallyRow, UserId,
    UserSentiment, VoteOutcome, VoteRecord,
};
pub use score::MIN_CONSTITUENT_SENTIMENTS;
pub use store::{CatalogStore, MemoryStore, PgStore, ScoreStore, SentimentStore, Store, VoteStore};
