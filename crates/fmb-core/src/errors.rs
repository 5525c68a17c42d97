/// Core error type for the feedback moderation bot.
///
/// Adapter crates map their library-specific errors into this type so the
/// orchestrator can handle failures consistently (log-and-continue vs fatal).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("classifier error: {0}")]
    Classifier(String),
}

pub type Result<T> = std::result::Result<T, Error>;
