pub mod rate_limit;
pub mod refresh;
pub mod roster;
pub mod score;
pub mod sentiment;
