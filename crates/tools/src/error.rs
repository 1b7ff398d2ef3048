/// Failure of a single tool invocation.
///
/// The display text is what the model sees as the tool observation's
/// `error` field, so messages are written for the model to act on.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("malformed tool arguments: {0}")]
    MalformedArguments(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Non-success response from the Finance Data Service, carried verbatim.
    #[error("finance service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("finance service unreachable: {0}")]
    Transport(String),
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidArgument(message.into())
    }

    /// The observation appended to the conversation for this failure.
    pub fn to_observation(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::Transport(e.to_string())
    }
}
