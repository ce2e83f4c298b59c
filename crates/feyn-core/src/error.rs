use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeynError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("api call failed: {0}")]
    Transport(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("unexpected response shape: {0}")]
    MalformedResponse(String),

    #[error("all models failed: {0}")]
    RosterExhausted(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type FeynResult<T> = Result<T, FeynError>;
