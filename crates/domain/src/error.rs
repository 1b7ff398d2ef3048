/// Shared error type used across all pagepilot crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("tool: {0}")]
    Tool(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors that mean the deployment itself is broken (missing
    /// credentials, no usable provider) rather than the request being bad.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
