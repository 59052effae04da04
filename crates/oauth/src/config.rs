use std::time::Duration;

use {tripwire_config::OidcSettings, url::Url};

use crate::error::{Error, Result};

pub const DEFAULT_SCOPE: &str = "openid profile email";
pub const CALLBACK_PATH: &str = "/auth/callback";
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved identity provider settings for one client registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcConfig {
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    /// Upper bound for one token request, body included.
    pub exchange_timeout: Duration,
}

impl OidcConfig {
    /// Resolve loaded settings, applying defaults for `redirect_uri` and
    /// `scope`. Missing endpoints or client id are a deployment defect.
    pub fn resolve(settings: &OidcSettings) -> Result<Self> {
        let authorization_endpoint =
            required_url("authorization_endpoint", &settings.authorization_endpoint)?;
        let token_endpoint = required_url("token_endpoint", &settings.token_endpoint)?;
        let client_id = non_blank(&settings.client_id)
            .ok_or_else(|| Error::Config("client_id is not set".into()))?
            .to_string();

        let redirect_uri = match (non_blank(&settings.redirect_uri), non_blank(&settings.origin)) {
            (Some(uri), _) => uri.to_string(),
            (None, Some(origin)) => format!("{}{CALLBACK_PATH}", origin.trim_end_matches('/')),
            (None, None) => {
                return Err(Error::Config(
                    "neither redirect_uri nor origin is set".into(),
                ));
            },
        };

        let scope = non_blank(&settings.scope)
            .unwrap_or(DEFAULT_SCOPE)
            .to_string();

        Ok(Self {
            authorization_endpoint,
            token_endpoint,
            client_id,
            redirect_uri,
            scope,
            exchange_timeout: exchange_timeout(settings),
        })
    }
}

/// Token request timeout from settings, or [`DEFAULT_EXCHANGE_TIMEOUT`].
fn exchange_timeout(settings: &OidcSettings) -> Duration {
    settings
        .exchange_timeout_secs
        .filter(|secs| *secs > 0)
        .map_or(DEFAULT_EXCHANGE_TIMEOUT, Duration::from_secs)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required_url(name: &str, value: &Option<String>) -> Result<Url> {
    let raw = non_blank(value).ok_or_else(|| Error::Config(format!("{name} is not set")))?;
    let url = Url::parse(raw).map_err(|e| Error::Config(format!("{name} {raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("{name} {raw:?} is not an absolute URL")));
    }
    Ok(url)
}
