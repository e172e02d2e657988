//! Client configuration

use std::time::Duration;

/// Per-client settings
///
/// # Examples
/// ```
/// use minisky_client::ClientConfig;
///
/// let config = ClientConfig::new("bsky.social").with_default_progress(".");
/// assert_eq!(config.base_url(), "https://bsky.social/xrpc");
/// assert!(config.send_auth_headers);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bare hostname or full base URL (e.g., "bsky.social", "http://localhost:2583")
    pub host: String,
    /// Attach the managed access token to requests that don't say otherwise
    pub send_auth_headers: bool,
    /// Log in or refresh automatically before authenticated requests
    pub auto_manage_tokens: bool,
    /// Progress marker printed per page when `fetch_all` doesn't pass one
    pub default_progress: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a config for the given host with default settings
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            send_auth_headers: true,
            auto_manage_tokens: true,
            default_progress: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("minisky-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set whether requests carry the access token by default
    pub fn with_auth_headers(mut self, enabled: bool) -> Self {
        self.send_auth_headers = enabled;
        self
    }

    /// Set whether tokens are managed automatically
    pub fn with_auto_manage_tokens(mut self, enabled: bool) -> Self {
        self.auto_manage_tokens = enabled;
        self
    }

    /// Set the default progress marker
    pub fn with_default_progress(mut self, progress: impl Into<String>) -> Self {
        self.default_progress = Some(progress.into());
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Root of all XRPC endpoints
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.contains("://") {
            format!("{host}/xrpc")
        } else {
            format!("https://{host}/xrpc")
        }
    }
}
