use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("API key must not be empty")]
    InvalidCredential,

    #[error("subscription '{0}' is invalid (expected: developer|basic|premium)")]
    InvalidSubscriptionTier(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("unknown operation {0}")]
    UnknownOperation(String),

    #[error("missing parameter {0}")]
    MissingParameter(String),

    #[error("unknown parameter {0}")]
    UnknownParameter(String),

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidParameterValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("http {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("malformed response from {operation}: {reason}")]
    MalformedResponse { operation: String, reason: String },
}

impl Error {
    /// Errors the caller can fix by changing the call.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownOperation(_)
                | Error::MissingParameter(_)
                | Error::UnknownParameter(_)
                | Error::InvalidParameterValue { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
