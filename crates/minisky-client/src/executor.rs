//! HTTP round trips and response classification

use crate::config::ClientConfig;
use crate::request::HttpMethod;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, StatusCode, Url};
use serde_json::{json, Value};

/// Details of a non-2xx response
///
/// # Examples
/// ```
/// use minisky_client::ResponseError;
/// use serde_json::json;
///
/// let error = ResponseError::new(
///     403,
///     "Forbidden",
///     json!({"error": "BadReq", "message": "This request was bad"}),
/// );
/// assert_eq!(error.error_type(), Some("BadReq"));
/// assert_eq!(error.error_message(), Some("This request was bad"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseError {
    status: u16,
    status_message: String,
    data: Value,
}

impl ResponseError {
    /// Create a new response error
    pub fn new(status: u16, status_message: impl Into<String>, data: Value) -> Self {
        Self {
            status,
            status_message: status_message.into(),
            data,
        }
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase of the status
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Decoded body: parsed JSON, or the raw text as a string
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// `error` field of a JSON object body (e.g., "InvalidRequest")
    pub fn error_type(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }

    /// `message` field of a JSON object body
    pub fn error_message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.status_message)?;
        match (self.error_type(), self.error_message()) {
            (Some(error), Some(message)) => write!(f, ": {} - {}", error, message),
            (Some(error), None) => write!(f, ": {}", error),
            (None, Some(message)) => write!(f, ": {}", message),
            (None, None) => Ok(()),
        }
    }
}

/// Sends single requests and classifies the outcome
///
/// Redirects are never followed; a 3xx response becomes
/// [`Error::UnexpectedRedirect`].
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Build an executor with the timeout and user agent from `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }

    /// Perform one request and return the decoded body of a 2xx response
    pub async fn send(
        &self,
        method: HttpMethod,
        url: Url,
        headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<Value> {
        let mut builder = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url).body(body.unwrap_or_default()),
        };
        builder = builder.headers(headers);

        let response = builder.send().await?;
        let status = response.status();
        let location = header_string(response.headers(), LOCATION);
        let content_type = header_string(response.headers(), CONTENT_TYPE);
        let text = response.text().await?;

        let data = decode_body(content_type.as_deref(), text);
        classify(status, location, data)
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Parse JSON bodies, keep everything else as a string
fn decode_body(content_type: Option<&str>, text: String) -> Value {
    match content_type {
        Some(ct) if ct.to_ascii_lowercase().contains("json") => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        Some(_) => Value::String(text),
        None => serde_json::from_str(&text).unwrap_or(Value::String(text)),
    }
}

fn classify(status: StatusCode, location: Option<String>, data: Value) -> Result<Value> {
    if status.is_success() {
        return Ok(data);
    }

    let reason = status.canonical_reason().unwrap_or_default();

    if status.is_redirection() {
        let location = location.unwrap_or_default();
        let data = json!({ "message": format!("Unexpected redirect: {location}") });
        return Err(Error::UnexpectedRedirect {
            response: ResponseError::new(status.as_u16(), reason, data),
            location,
        });
    }

    let error = ResponseError::new(status.as_u16(), reason, data);

    if error.error_type() == Some("ExpiredToken") {
        return Err(Error::ExpiredToken(error));
    }

    if status.is_client_error() {
        Err(Error::ClientErrorResponse(error))
    } else if status.is_server_error() {
        Err(Error::ServerErrorResponse(error))
    } else {
        Err(Error::BadResponse(error))
    }
}
