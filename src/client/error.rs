use thiserror::Error;

/// Error returned by `ApiClient`
#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response; `message` is the server's `error` field
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// Transport or decoding failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request needs a token but the client is not signed in
    #[error("Not signed in")]
    NotSignedIn,
}

impl ClientError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(error) => error.status().map(|status| status.as_u16()),
            ClientError::NotSignedIn => None,
        }
    }
}
