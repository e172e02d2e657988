//! Access/refresh token lifecycle
//!
//! Before an authenticated request the client makes sure it holds a usable
//! access token: it logs in when there is no token pair yet and refreshes the
//! pair when the access token expires within [`REFRESH_MARGIN_SECS`]. Expiry is
//! read from the token payload without verifying the signature.

use crate::client::Client;
use crate::credentials::{UserCredentials, ACCESS_TOKEN, DID, REFRESH_TOKEN};
use crate::request::{Auth, XrpcRequest};
use crate::{Error, Result};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::Utc;
use config_store::ConfigStore;
use serde::Serialize;
use serde_json::Value;

/// Procedure that creates a session from id and password
pub const CREATE_SESSION: &str = "com.atproto.server.createSession";
/// Procedure that exchanges a refresh token for a new token pair
pub const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
/// Access tokens expiring within this many seconds are refreshed
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// URL-safe alphabet, padding optional
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// What [`Client::ensure_fresh`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// There was no token pair, a new session was created
    LoggedIn,
    /// The access token was about to expire and was refreshed
    Refreshed,
    /// The access token is still valid
    Ok,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

/// Read the `exp` claim of a JWT-style token
///
/// # Examples
/// ```
/// use minisky_client::token_expiry;
///
/// // {"alg":"none"} . {"exp":1700000000} . signature
/// let token = "eyJhbGciOiJub25lIn0.eyJleHAiOjE3MDAwMDAwMDB9.c2ln";
/// assert_eq!(token_expiry(token).unwrap(), 1_700_000_000);
/// assert!(token_expiry("not-a-token").is_err());
/// ```
pub fn token_expiry(token: &str) -> Result<i64> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(Error::Auth("Invalid access token format".to_string()));
    }

    let payload = TOKEN_ENGINE
        .decode(parts[1])
        .map_err(|e| Error::Auth(format!("Couldn't decode access token payload: {}", e)))?;
    let claims: Value = serde_json::from_slice(&payload)
        .map_err(|e| Error::Auth(format!("Couldn't parse access token payload: {}", e)))?;

    match claims.get("exp").and_then(Value::as_f64) {
        Some(exp) if exp > 0.0 => Ok(exp as i64),
        _ => Err(Error::Auth("Invalid access token expiry".to_string())),
    }
}

/// True if the token expires within the refresh margin or can't be decoded
pub fn is_token_stale(token: &str) -> bool {
    match token_expiry(token) {
        Ok(exp) => exp <= refresh_deadline(),
        Err(_) => true,
    }
}

fn refresh_deadline() -> i64 {
    Utc::now().timestamp() + REFRESH_MARGIN_SECS
}

/// Copy a response field into the credentials, `null` if absent
fn store_field(user: &mut UserCredentials, key: &str, json: &Value, field: &str) {
    user.set(key, json.get(field).cloned().unwrap_or(Value::Null));
}

impl<S: ConfigStore> Client<S> {
    /// Log in or refresh the token pair if needed
    pub async fn ensure_fresh(&self) -> Result<AccessState> {
        let mut user = self.user.lock().await;
        self.ensure_fresh_locked(&mut user).await
    }

    /// Same as [`Client::ensure_fresh`]
    pub async fn check_access(&self) -> Result<AccessState> {
        self.ensure_fresh().await
    }

    /// Create a new session from the stored id and password
    ///
    /// Stores the returned DID and tokens, saves the config and returns the
    /// raw response.
    pub async fn login(&self) -> Result<Value> {
        let mut user = self.user.lock().await;
        self.login_locked(&mut user).await
    }

    /// Exchange the refresh token for a new token pair
    pub async fn refresh(&self) -> Result<Value> {
        let mut user = self.user.lock().await;
        self.refresh_locked(&mut user).await
    }

    /// Forget both tokens, keeping id and password
    pub async fn reset_tokens(&self) -> Result<()> {
        let mut user = self.user.lock().await;
        user.clear_tokens();
        self.store.save(user.as_map()).await?;

        tracing::info!("Cleared session tokens");
        Ok(())
    }

    /// True if the access token expires within the refresh margin
    pub async fn is_expired(&self) -> Result<bool> {
        let user = self.user.lock().await;
        let token = user
            .access_token()
            .ok_or_else(|| Error::Auth("No access token".to_string()))?;

        Ok(token_expiry(token)? <= refresh_deadline())
    }

    pub(crate) async fn ensure_fresh_locked(
        &self,
        user: &mut UserCredentials,
    ) -> Result<AccessState> {
        if !user.logged_in() {
            tracing::debug!("No session tokens, logging in");
            self.login_locked(user).await?;
            return Ok(AccessState::LoggedIn);
        }

        if user.access_token().map_or(true, is_token_stale) {
            tracing::debug!("Access token expires soon, refreshing");
            self.refresh_locked(user).await?;
            return Ok(AccessState::Refreshed);
        }

        Ok(AccessState::Ok)
    }

    async fn login_locked(&self, user: &mut UserCredentials) -> Result<Value> {
        if !user.has_credentials() {
            return Err(Error::Auth("User id or password is missing".to_string()));
        }
        let identifier = user.id().unwrap_or_default().to_string();

        let request = XrpcRequest::procedure(CREATE_SESSION)
            .auth(Auth::Off)
            .json_body(&LoginRequest {
                identifier: &identifier,
                password: user.pass().unwrap_or_default(),
            })?;
        let json = self.dispatch(&request, None).await?;

        store_field(user, DID, &json, "did");
        store_field(user, ACCESS_TOKEN, &json, "accessJwt");
        store_field(user, REFRESH_TOKEN, &json, "refreshJwt");
        self.store.save(user.as_map()).await?;

        tracing::info!("Logged in as {}", identifier);
        Ok(json)
    }

    async fn refresh_locked(&self, user: &mut UserCredentials) -> Result<Value> {
        let refresh_token = match user.refresh_token() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => return Err(Error::Auth("No refresh token".to_string())),
        };

        let request = XrpcRequest::procedure(REFRESH_SESSION);
        let json = self.dispatch(&request, Some(&refresh_token)).await?;

        store_field(user, ACCESS_TOKEN, &json, "accessJwt");
        store_field(user, REFRESH_TOKEN, &json, "refreshJwt");
        self.store.save(user.as_map()).await?;

        tracing::info!("Refreshed session tokens");
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{make_token, token_expiring_in};

    #[test]
    fn test_token_expiry_decodes_exp() {
        let token = make_token(1_700_000_000);
        assert_eq!(token_expiry(&token).unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_token_expiry_accepts_padding() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":17000}"#);
        assert!(payload.ends_with('='));

        let token = format!("eyJhbGciOiJub25lIn0.{}.c2ln", payload);
        assert_eq!(token_expiry(&token).unwrap(), 17000);
    }

    #[test]
    fn test_token_expiry_wrong_part_count() {
        for token in ["", "abc", "a.b", "a.b.c.d"] {
            assert!(matches!(token_expiry(token), Err(Error::Auth(_))), "{:?}", token);
        }
    }

    #[test]
    fn test_token_expiry_undecodable_payload() {
        assert!(matches!(token_expiry("header.!!!.sig"), Err(Error::Auth(_))));

        let not_json = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("not json");
        let token = format!("header.{}.sig", not_json);
        assert!(matches!(token_expiry(&token), Err(Error::Auth(_))));
    }

    #[test]
    fn test_token_expiry_bad_exp() {
        for claims in [r#"{}"#, r#"{"exp":"soon"}"#, r#"{"exp":0}"#, r#"{"exp":-5}"#] {
            let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(claims);
            let token = format!("header.{}.sig", payload);
            assert!(matches!(token_expiry(&token), Err(Error::Auth(_))), "{}", claims);
        }
    }

    #[test]
    fn test_is_token_stale() {
        assert!(is_token_stale(&token_expiring_in(50)));
        assert!(is_token_stale(&token_expiring_in(-3600)));
        assert!(!is_token_stale(&token_expiring_in(180)));
        assert!(is_token_stale("garbage"));
    }
}
