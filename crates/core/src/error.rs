use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlightError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("bad response from {endpoint}: {details}")]
    BadResponse { endpoint: String, details: String },

    #[error("response from {endpoint} is missing `{field}`")]
    MissingField {
        endpoint: String,
        field: &'static str,
    },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no results after {attempts} polling attempts")]
    PollTimeout { attempts: u32 },

    #[error("search was superseded by a newer submission")]
    Superseded,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlightError {
    pub(crate) fn bad_response(endpoint: &str, details: impl Into<String>) -> Self {
        Self::BadResponse {
            endpoint: endpoint.to_string(),
            details: details.into(),
        }
    }

    /// The text to show a user: the backend's own words for a bad response,
    /// the full description otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadResponse { details, .. } => details.clone(),
            other => other.to_string(),
        }
    }

    pub(crate) fn missing_field(endpoint: &str, field: &'static str) -> Self {
        Self::MissingField {
            endpoint: endpoint.to_string(),
            field,
        }
    }
}

pub type Result<T, E = FlightError> = std::result::Result<T, E>;
