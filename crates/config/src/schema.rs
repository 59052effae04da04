use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TripwireConfig {
    pub oidc: OidcSettings,
}

/// The `[oidc]` table. Every field is optional here; required values are
/// enforced when the settings are resolved for a login attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OidcSettings {
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub client_id: Option<String>,
    /// Must match the provider registration exactly.
    pub redirect_uri: Option<String>,
    /// Application origin, used to derive `<origin>/auth/callback` when
    /// `redirect_uri` is unset.
    pub origin: Option<String>,
    pub scope: Option<String>,
    pub exchange_timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_deserializes() {
        let cfg: TripwireConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, TripwireConfig::default());
    }

    #[test]
    fn test_partial_oidc_table() {
        let cfg: TripwireConfig = toml::from_str(
            r#"
            [oidc]
            client_id = "dashboard"
            exchange_timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.oidc.client_id.as_deref(), Some("dashboard"));
        assert_eq!(cfg.oidc.exchange_timeout_secs, Some(10));
        assert!(cfg.oidc.token_endpoint.is_none());
    }
}
