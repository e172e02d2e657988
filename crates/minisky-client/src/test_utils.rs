//! Helpers for tests: fake tokens, a progress buffer and tracing setup

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Build an unsigned JWT-style token expiring at `exp`
#[inline]
pub fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT","alg":"ES256K"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({"scope": "com.atproto.access", "sub": "did:plc:test", "exp": exp})
            .to_string(),
    );
    format!("{}.{}.fakesignature", header, payload)
}

/// Token expiring `seconds` from now
#[inline]
pub fn token_expiring_in(seconds: i64) -> String {
    make_token(Utc::now().timestamp() + seconds)
}

/// Cloneable in-memory writer for capturing progress output
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
