use thiserror::Error;

/// Failure of a single poll iteration. Each stage of the loop returns one of
/// these and the loop decides what to do with it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("review API request failed: {0}")]
    Network(String),
    #[error("review API returned {status}: {preview}")]
    HttpStatus { status: u16, preview: String },
    #[error("malformed review API response: {0}")]
    Schema(String),
    #[error("unknown homework status: {0}")]
    UnknownStatus(String),
    #[error("homework record has no `{0}` field")]
    MissingField(&'static str),
    #[error("failed delivering message: {0}")]
    Delivery(String),
}

impl PollError {
    /// Delivery failures mean the chat channel itself is broken, so there is
    /// no point reporting them through it.
    pub fn should_alert(&self) -> bool {
        !matches!(self, Self::Delivery(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::Schema(_) => "schema",
            Self::UnknownStatus(_) => "unknown_status",
            Self::MissingField(_) => "missing_field",
            Self::Delivery(_) => "delivery",
        }
    }
}
