//! Minimal XRPC client for AT Protocol services
//!
//! This crate builds authenticated requests against XRPC methods, keeps the
//! access/refresh token pair of one account fresh, and collects cursor-paginated
//! list endpoints into a single result.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod executor;
pub mod pagination;
pub mod request;
pub mod token;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::Client;
pub use config::ClientConfig;
pub use credentials::UserCredentials;
pub use executor::{HttpExecutor, ResponseError};
pub use pagination::{FetchAllOptions, Progress};
pub use request::{Auth, QueryParams, QueryValue, RequestBody, XrpcRequest};
pub use token::{is_token_stale, token_expiry, AccessState};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for client operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing credentials or tokens, or an undecodable token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid method name, header or other caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error status outside the 3xx/4xx/5xx ranges
    #[error("Bad response: {0}")]
    BadResponse(ResponseError),

    /// 4xx response
    #[error("Client error response: {0}")]
    ClientErrorResponse(ResponseError),

    /// 5xx response
    #[error("Server error response: {0}")]
    ServerErrorResponse(ResponseError),

    /// 4xx response reporting an expired access or refresh token
    #[error("Expired token: {0}")]
    ExpiredToken(ResponseError),

    /// 3xx response; redirects are never followed
    #[error("Unexpected redirect to {location}: {response}")]
    UnexpectedRedirect {
        /// Status, message and body of the redirect response
        response: ResponseError,
        /// Value of the `Location` header
        location: String,
    },

    /// `fetch_all` was called without naming the records field
    #[error("Field parameter not provided; available fields: {fields:?}")]
    FieldNotSet {
        /// Array-valued fields found in the first page
        fields: Vec<String>,
    },

    /// A successful response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Loading or saving the config failed
    #[error("Config store error: {0}")]
    Store(#[from] config_store::StoreError),
}

impl Error {
    /// Response details carried by every bad-response variant
    pub fn response(&self) -> Option<&ResponseError> {
        match self {
            Error::BadResponse(response)
            | Error::ClientErrorResponse(response)
            | Error::ServerErrorResponse(response)
            | Error::ExpiredToken(response)
            | Error::UnexpectedRedirect { response, .. } => Some(response),
            _ => None,
        }
    }

    /// HTTP status of a bad response
    pub fn status(&self) -> Option<u16> {
        self.response().map(ResponseError::status)
    }

    /// True for 4xx responses, including expired-token errors
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::ClientErrorResponse(_) | Error::ExpiredToken(_))
    }
}
