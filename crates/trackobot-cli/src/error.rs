use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the Track-o-Bot client.
///
/// Argument problems (`InvalidArgument`, `InvalidDateRange`) are always raised
/// before a request is sent. `Http` means the service answered with a non-2xx
/// status.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {name} '{value}': expected {expected}")]
    InvalidArgument {
        name: &'static str,
        value: String,
        expected: String,
    },

    #[error("invalid custom time range: {0}")]
    InvalidDateRange(String),

    /// `message` is the body's `error`/`message` field when present; `body`
    /// is the response text as received.
    #[error("API error ({status}): {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] ureq::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response missing '{0}'")]
    MissingField(&'static str),

    #[error("{0} is not supported by the Track-o-Bot API")]
    Unsupported(&'static str),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, value: impl Into<String>, expected: String) -> Self {
        Self::InvalidArgument {
            name,
            value: value.into(),
            expected,
        }
    }

    /// True for errors caused by caller input rather than the service.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::InvalidDateRange(_))
    }

    /// Raw response body for `Http` errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    /// HTTP status for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
