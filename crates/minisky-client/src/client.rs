//! XRPC client
//!
//! [`Client`] ties together the configuration, the credential store and the
//! HTTP executor. Every request goes through [`Client::execute`]: the target
//! is validated, the auth mode resolved (logging in or refreshing first if
//! needed), and the response classified.

use crate::config::ClientConfig;
use crate::credentials::UserCredentials;
use crate::executor::HttpExecutor;
use crate::request::{build_headers, build_url, Auth, RequestBody, XrpcRequest};
use crate::{Error, Result};
use config_store::{ConfigStore, JsonFileStore, MemoryStore};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, MutexGuard};

/// Sink for pagination progress markers
pub type ProgressOutput = Arc<std::sync::Mutex<dyn Write + Send>>;

/// Client for one account on one XRPC host
///
/// # Example
///
/// ```rust,no_run
/// use minisky_client::{Client, XrpcRequest};
///
/// # async fn example() -> minisky_client::Result<()> {
/// let client = Client::from_file("bsky.social", "bluesky.json").await?;
///
/// let timeline = client
///     .execute(&XrpcRequest::query("app.bsky.feed.getTimeline").param("limit", 50))
///     .await?;
/// println!("{}", timeline["feed"]);
/// # Ok(())
/// # }
/// ```
pub struct Client<S: ConfigStore> {
    pub(crate) config: ClientConfig,
    pub(crate) store: S,
    pub(crate) user: Mutex<UserCredentials>,
    http: HttpExecutor,
    progress_output: ProgressOutput,
}

impl<S: ConfigStore> Client<S> {
    /// Create a client, loading credentials from `store`
    ///
    /// Timeout and user agent are applied here; later changes through
    /// [`Client::config_mut`] don't affect them.
    pub async fn new(config: ClientConfig, store: S) -> Result<Self> {
        let user = UserCredentials::new(store.load().await?);
        let http = HttpExecutor::new(&config)?;

        tracing::debug!("Created client for {}", config.base_url());

        Ok(Self {
            config,
            store,
            user: Mutex::new(user),
            http,
            progress_output: Arc::new(std::sync::Mutex::new(std::io::stdout())),
        })
    }

    /// Write pagination progress to `output` instead of stdout
    pub fn with_progress_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.progress_output = Arc::new(std::sync::Mutex::new(output));
        self
    }

    /// Current settings
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Change settings at runtime
    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Config store backing this client
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of the current credentials
    pub async fn user(&self) -> UserCredentials {
        self.user.lock().await.clone()
    }

    /// Lock the credentials for editing
    ///
    /// Requests wait while the guard is held. Call [`Client::save_config`]
    /// afterwards to persist the changes.
    pub async fn user_mut(&self) -> MutexGuard<'_, UserCredentials> {
        self.user.lock().await
    }

    /// Persist the current credentials
    pub async fn save_config(&self) -> Result<()> {
        let user = self.user.lock().await;
        self.store.save(user.as_map()).await?;
        Ok(())
    }

    /// Send a request and return its decoded body
    pub async fn execute(&self, request: &XrpcRequest) -> Result<Value> {
        let url = build_url(&self.config.base_url(), &request.target, &request.params)?;
        let bearer = self.resolve_auth(&request.auth).await?;
        self.send(request, url, bearer.as_deref()).await
    }

    /// GET an XRPC method without parameters
    pub async fn get(&self, target: &str) -> Result<Value> {
        self.execute(&XrpcRequest::query(target)).await
    }

    /// POST a JSON body to an XRPC method
    pub async fn post<T: Serialize + ?Sized>(&self, target: &str, body: &T) -> Result<Value> {
        self.execute(&XrpcRequest::procedure(target).json_body(body)?).await
    }

    /// Send a request with a fixed bearer token, skipping auth resolution
    pub(crate) async fn dispatch(&self, request: &XrpcRequest, bearer: Option<&str>) -> Result<Value> {
        let url = build_url(&self.config.base_url(), &request.target, &request.params)?;
        self.send(request, url, bearer).await
    }

    async fn send(&self, request: &XrpcRequest, url: Url, bearer: Option<&str>) -> Result<Value> {
        let json_body = matches!(request.body, Some(RequestBody::Json(_)));
        let headers = build_headers(&request.headers, bearer, json_body)?;
        let body = request.body.as_ref().map(RequestBody::to_bytes).transpose()?;

        tracing::debug!("{} {}", request.method.as_str(), url);
        self.http.send(request.method, url, headers, body).await
    }

    /// Bearer token for a request, refreshing the managed one first if enabled
    async fn resolve_auth(&self, auth: &Auth) -> Result<Option<String>> {
        let managed = match auth {
            Auth::Bearer(token) => return Ok(Some(token.clone())),
            Auth::Off => false,
            Auth::Managed => true,
            Auth::Default => self.config.send_auth_headers,
        };
        if !managed {
            return Ok(None);
        }

        let mut user = self.user.lock().await;
        if self.config.auto_manage_tokens {
            self.ensure_fresh_locked(&mut user).await?;
        }

        match user.access_token() {
            Some(token) if !token.is_empty() => Ok(Some(token.to_string())),
            _ => Err(Error::Auth("Access token is missing".to_string())),
        }
    }

    pub(crate) fn write_progress(&self, marker: &str) {
        let mut output = self
            .progress_output
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Err(e) = output.write_all(marker.as_bytes()).and_then(|_| output.flush()) {
            tracing::warn!("Failed to write progress: {}", e);
        }
    }
}

impl Client<JsonFileStore> {
    /// Create a client whose credentials live in a JSON file
    pub async fn from_file(host: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(ClientConfig::new(host), JsonFileStore::new(path)).await
    }
}

impl Client<MemoryStore> {
    /// Create a client that never sends credentials
    pub async fn public(host: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::new(host)
            .with_auth_headers(false)
            .with_auto_manage_tokens(false);
        Self::new(config, MemoryStore::new()).await
    }
}

impl<S: ConfigStore> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
