use thiserror::Error;

/// Errors surfaced by the portal client and its view-models.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("server rejected the request: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("action already in flight: {0}")]
    InFlight(String),

    #[error("invalid answer: {0}")]
    InvalidAnswer(String),
}

impl PortalError {
    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            PortalError::Status { message, .. } | PortalError::Rejected { message } => {
                message.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortalError::Status { status: 404, .. })
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
