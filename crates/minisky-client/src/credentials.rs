//! Typed view over the persisted credential mapping

use config_store::ConfigMap;
use serde_json::Value;

/// Field holding the login handle or DID
pub const ID: &str = "id";
/// Field holding the account password
pub const PASS: &str = "pass";
/// Field holding the account DID, written after login
pub const DID: &str = "did";
/// Field holding the access token
pub const ACCESS_TOKEN: &str = "access_token";
/// Field holding the refresh token
pub const REFRESH_TOKEN: &str = "refresh_token";

/// Credentials and tokens of a single account
///
/// Wraps the mapping loaded from a [`config_store::ConfigStore`]. Fields other
/// than the five known ones are kept in place and written back unchanged.
///
/// # Examples
/// ```
/// use minisky_client::UserCredentials;
///
/// let mut user = UserCredentials::default();
/// user.set_id("john.foo");
/// user.set_pass("hunter2");
///
/// assert!(user.has_credentials());
/// assert!(!user.logged_in());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserCredentials {
    config: ConfigMap,
}

impl UserCredentials {
    /// Wrap an existing mapping
    pub fn new(config: ConfigMap) -> Self {
        Self { config }
    }

    /// Login handle or DID
    pub fn id(&self) -> Option<&str> {
        self.get_str(ID)
    }

    /// Account password
    pub fn pass(&self) -> Option<&str> {
        self.get_str(PASS)
    }

    /// Account DID
    pub fn did(&self) -> Option<&str> {
        self.get_str(DID)
    }

    /// Current access token
    pub fn access_token(&self) -> Option<&str> {
        self.get_str(ACCESS_TOKEN)
    }

    /// Current refresh token
    pub fn refresh_token(&self) -> Option<&str> {
        self.get_str(REFRESH_TOKEN)
    }

    /// Set the login handle or DID
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set(ID, id.into());
    }

    /// Set the account password
    pub fn set_pass(&mut self, pass: impl Into<String>) {
        self.set(PASS, pass.into());
    }

    /// True when both tokens are present and non-empty
    pub fn logged_in(&self) -> bool {
        non_empty(self.access_token()) && non_empty(self.refresh_token())
    }

    /// True when both id and password are present and non-empty
    pub fn has_credentials(&self) -> bool {
        non_empty(self.id()) && non_empty(self.pass())
    }

    /// Any field, including extra ones
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Set any field; an existing key keeps its position
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.config.insert(key.into(), value.into());
    }

    /// Remove a field, returning its previous value; other keys keep their order
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.config.shift_remove(key)
    }

    /// Underlying mapping
    pub fn as_map(&self) -> &ConfigMap {
        &self.config
    }

    /// Consume into the underlying mapping
    pub fn into_map(self) -> ConfigMap {
        self.config
    }

    pub(crate) fn store_tokens(&mut self, access: String, refresh: String) {
        self.set(ACCESS_TOKEN, access);
        self.set(REFRESH_TOKEN, refresh);
    }

    pub(crate) fn clear_tokens(&mut self) {
        self.config.insert(ACCESS_TOKEN.into(), Value::Null);
        self.config.insert(REFRESH_TOKEN.into(), Value::Null);
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}

impl From<ConfigMap> for UserCredentials {
    fn from(config: ConfigMap) -> Self {
        Self::new(config)
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.is_empty())
}
