//! XRPC request descriptors
//!
//! An [`XrpcRequest`] names its target (an NSID or a complete URL) and carries
//! ordered query parameters, an optional body, extra headers and an auth mode.
//! The client turns it into a URL and a header map right before sending.

use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method for XRPC requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request (used for queries)
    Get,
    /// POST request (used for procedures)
    Post,
}

impl HttpMethod {
    /// Method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Which `Authorization` header a request carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// Managed token if `send_auth_headers` is on, otherwise none
    #[default]
    Default,
    /// Always the managed access token; fails if there is none
    Managed,
    /// No authorization header
    Off,
    /// This exact bearer token
    Bearer(String),
}

impl From<bool> for Auth {
    fn from(enabled: bool) -> Self {
        if enabled {
            Auth::Managed
        } else {
            Auth::Off
        }
    }
}

impl From<&str> for Auth {
    fn from(token: &str) -> Self {
        Auth::Bearer(token.to_string())
    }
}

impl From<String> for Auth {
    fn from(token: String) -> Self {
        Auth::Bearer(token)
    }
}

/// Value of a query parameter
///
/// A list expands to one `key=value` pair per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Single value
    Scalar(String),
    /// Repeated key
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Scalar(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Scalar(value.clone())
    }
}

macro_rules! scalar_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_from_display!(bool, i32, i64, u32, u64, usize);

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for QueryValue {
    fn from(values: &[&str]) -> Self {
        QueryValue::List(values.iter().map(|v| v.to_string()).collect())
    }
}

impl From<&Value> for QueryValue {
    /// Strings are used as-is, anything else as its JSON text
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => QueryValue::Scalar(s.clone()),
            other => QueryValue::Scalar(other.to_string()),
        }
    }
}

/// Ordered query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParams {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter; an existing key is replaced in place, a new one appended
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value of a parameter
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Remove a parameter
    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// True if no parameters are set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wire-level key/value pairs, lists expanded in order
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.entries {
            match value {
                QueryValue::Scalar(v) => pairs.push((key.as_str(), v.as_str())),
                QueryValue::List(values) => {
                    pairs.extend(values.iter().map(|v| (key.as_str(), v.as_str())))
                }
            }
        }
        pairs
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent verbatim, no content type added
    Raw(Vec<u8>),
    /// Serialized on send, sent as `application/json` unless overridden
    Json(Value),
}

impl RequestBody {
    /// Bytes sent on the wire
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            RequestBody::Raw(bytes) => Ok(bytes.clone()),
            RequestBody::Json(value) => Ok(serde_json::to_vec(value)?),
        }
    }
}

/// XRPC request parameters
///
/// # Examples
/// ```
/// use minisky_client::{Auth, XrpcRequest};
///
/// let req = XrpcRequest::query("app.bsky.feed.getAuthorFeed")
///     .param("actor", "john.foo")
///     .param("limit", 100)
///     .auth(Auth::Off);
///
/// assert_eq!(req.target, "app.bsky.feed.getAuthorFeed");
/// ```
#[derive(Debug, Clone)]
pub struct XrpcRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// NSID (e.g., "com.atproto.repo.getRecord") or complete URL
    pub target: String,
    /// Query parameters
    pub params: QueryParams,
    /// Request body
    pub body: Option<RequestBody>,
    /// Extra headers, in the order they were added
    pub headers: Vec<(String, String)>,
    /// Auth mode
    pub auth: Auth,
}

impl XrpcRequest {
    fn new(method: HttpMethod, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            params: QueryParams::new(),
            body: None,
            headers: Vec::new(),
            auth: Auth::Default,
        }
    }

    /// Create a new GET request (query)
    pub fn query(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, target)
    }

    /// Create a new POST request (procedure)
    pub fn procedure(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, target)
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.params.set(key, value);
        self
    }

    /// Add several query parameters
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<QueryValue>,
    {
        for (key, value) in params {
            self.params.set(key, value);
        }
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set the auth mode
    pub fn auth(mut self, auth: impl Into<Auth>) -> Self {
        self.auth = auth.into();
        self
    }

    /// Set the request body from any serializable value
    pub fn json_body<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(value)?));
        Ok(self)
    }

    /// Set a body that is sent verbatim
    pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }
}

// =============================================================================
// URL and Header Building
// =============================================================================

/// Check whether a string is a valid NSID
///
/// At least two dot-separated labels of ASCII letters, digits and hyphens. The
/// domain labels are lowercase and never start or end with a hyphen; only the
/// first of them must start with a letter. The last label is a camelCase name
/// starting with a letter, without hyphens.
pub fn is_valid_nsid(nsid: &str) -> bool {
    let segments: Vec<&str> = nsid.split('.').collect();
    if segments.len() < 2 {
        return false;
    }

    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        let Some(first) = segment.chars().next() else {
            return false;
        };

        let valid = if i == last {
            first.is_ascii_alphabetic() && segment.chars().all(|c| c.is_ascii_alphanumeric())
        } else {
            (i > 0 || first.is_ascii_alphabetic())
                && !segment.starts_with('-')
                && !segment.ends_with('-')
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        };
        if !valid {
            return false;
        }
    }

    true
}

/// Build the URL for a request target
///
/// Targets containing `://` are used verbatim; anything else must be an NSID
/// and is appended to `base_url`.
pub fn build_url(base_url: &str, target: &str, params: &QueryParams) -> Result<Url> {
    let raw = if target.contains("://") {
        target.to_string()
    } else if is_valid_nsid(target) {
        format!("{}/{}", base_url, target)
    } else {
        return Err(Error::InvalidArgument(format!("Invalid method name: {:?}", target)));
    };

    let mut url = Url::parse(&raw)
        .map_err(|e| Error::InvalidArgument(format!("Invalid URL {:?}: {}", raw, e)))?;

    let pairs = params.pairs();
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }

    Ok(url)
}

/// Merge the auth header, caller headers and the JSON content type
pub fn build_headers(
    extra: &[(String, String)],
    bearer: Option<&str>,
    json_body: bool,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = bearer {
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
    }

    for (key, value) in extra {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| Error::InvalidArgument(format!("Invalid header name: {:?}", key)))?;
        headers.insert(name, header_value(value)?);
    }

    if json_body && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidArgument("Invalid header value".to_string()))
}

// =============================================================================
// Tests
// =============================================================================
