use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepscoreError>;

#[derive(Error, Debug)]
pub enum RepscoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be decoded (e.g. an unknown vote outcome).
    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl RepscoreError {
    /// Stable machine-readable tag, carried in IPC responses and mapped to
    /// HTTP status codes by the server.
    pub fn kind(&self) -> &'static str {
        match self {
            RepscoreError::Database(_) => "database",
            RepscoreError::Config(_) => "config",
            RepscoreError::Io(_) => "io",
            RepscoreError::Malformed(_) => "malformed",
            RepscoreError::InvalidInput(_) => "invalid_input",
            RepscoreError::NotFound(_) => "not_found",
            RepscoreError::RateLimited { .. } => "rate_limited",
            RepscoreError::Unauthorized => "unauthorized",
            RepscoreError::Ipc(_) => "ipc",
            RepscoreError::Other(_) => "other",
        }
    }
}
