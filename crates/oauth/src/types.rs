use std::borrow::Cow;

use {
    secrecy::{ExposeSecret, SecretString},
    serde::{Deserialize, Serialize},
    url::{Url, form_urlencoded},
};

/// Serialize a secret as its plain value (for on-disk stores only).
pub fn serialize_secret<S: serde::Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// PKCE challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

/// The `{state, verifier}` pair saved between redirect-out and redirect-back.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub state: String,
    pub verifier: SecretString,
}

impl PendingAuthorization {
    pub fn new(state: impl Into<String>, verifier: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            verifier: SecretString::new(verifier.into()),
        }
    }
}

/// Successful token endpoint response. Only built with a non-empty token.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access_token: SecretString,
    pub token_type: Option<String>,
}

/// Access token as persisted by [`TokenStore`](crate::TokenStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: SecretString,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Unix timestamp when the token was stored.
    pub stored_at: u64,
}

/// Query parameters the identity provider appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string (with or without the leading `?`).
    /// Empty values count as absent; the first occurrence of a key wins.
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(form_urlencoded::parse(
            query.trim_start_matches('?').as_bytes(),
        ))
    }

    /// Parse the query of the full URL the browser was sent back to.
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }

    fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            let slot = match &*key {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}
