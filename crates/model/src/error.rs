use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error{}: {message}", status_suffix(.status))]
    Api {
        status: Option<u16>,
        message: String,
    },

    #[error("no response from the model within {secs}s")]
    Timeout { secs: u64 },

    #[error("malformed response: {0}")]
    Malformed(String),

    /// The chunk consumer failed, e.g. while persisting to the session file.
    #[error("failed to handle streamed chunk: {0:#}")]
    Sink(#[source] anyhow::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (HTTP {code})"))
        .unwrap_or_default()
}
