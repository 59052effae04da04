use crate::{error::Result, pkce::random_urlsafe};

const STATE_BYTES: usize = 16;

/// Opaque anti-CSRF state: 16 random bytes, base64url without padding.
pub fn generate_state() -> Result<String> {
    random_urlsafe(STATE_BYTES)
}
