use crate::{
    error::{Error, Result},
    schema::TripwireConfig,
};

const PREFIX: &str = "TRIPWIRE_OIDC_";

/// Apply `TRIPWIRE_OIDC_*` environment variables on top of `config`.
pub fn apply_env_overrides(config: TripwireConfig) -> Result<TripwireConfig> {
    apply_overrides_with(config, |key| std::env::var(key).ok())
}

/// Same as [`apply_env_overrides`] with an injectable lookup, so callers and
/// tests can supply variables without touching the process environment.
pub fn apply_overrides_with<F>(mut config: TripwireConfig, lookup: F) -> Result<TripwireConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        lookup(&format!("{PREFIX}{name}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let oidc = &mut config.oidc;
    if let Some(v) = get("AUTHORIZATION_ENDPOINT") {
        oidc.authorization_endpoint = Some(v);
    }
    if let Some(v) = get("TOKEN_ENDPOINT") {
        oidc.token_endpoint = Some(v);
    }
    if let Some(v) = get("CLIENT_ID") {
        oidc.client_id = Some(v);
    }
    if let Some(v) = get("REDIRECT_URI") {
        oidc.redirect_uri = Some(v);
    }
    if let Some(v) = get("ORIGIN") {
        oidc.origin = Some(v);
    }
    if let Some(v) = get("SCOPE") {
        oidc.scope = Some(v);
    }
    if let Some(v) = get("EXCHANGE_TIMEOUT_SECS") {
        let secs = v.parse::<u64>().map_err(|e| Error::Env {
            key: format!("{PREFIX}EXCHANGE_TIMEOUT_SECS"),
            message: e.to_string(),
        })?;
        oidc.exchange_timeout_secs = Some(secs);
    }

    Ok(config)
}
