use std::time::Duration;

use {
    secrecy::SecretString,
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::{
    config::OidcConfig,
    error::{ExchangeError, Result},
    types::TokenResponse,
};

#[derive(Deserialize)]
struct RawTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Client for the authorization-code grant at the token endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http: reqwest::Client,
}

impl TokenExchangeClient {
    /// Every request, including reading the body, is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tripwire/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Exchange `code` for an access token. Transport errors, non-2xx
    /// statuses, unparseable bodies and empty tokens all come back as
    /// [`ExchangeError`]; nothing escapes as a panic.
    pub async fn exchange(
        &self,
        code: &str,
        verifier: &str,
        config: &OidcConfig,
    ) -> std::result::Result<TokenResponse, ExchangeError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("client_id", config.client_id.as_str()),
            ("code_verifier", verifier),
        ];

        debug!(token_endpoint = %config.token_endpoint, "exchanging authorization code");

        let response = self
            .http
            .post(config.token_endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "token endpoint rejected the exchange");
            return Err(ExchangeError::HttpStatus(status));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        parse_token_response(&body)
    }
}

fn transport_error(e: reqwest::Error) -> ExchangeError {
    if e.is_timeout() {
        ExchangeError::Timeout
    } else {
        ExchangeError::Network(e.to_string())
    }
}

fn parse_token_response(body: &[u8]) -> std::result::Result<TokenResponse, ExchangeError> {
    let raw: RawTokenResponse =
        serde_json::from_slice(body).map_err(|e| ExchangeError::MalformedBody(e.to_string()))?;

    match raw.access_token {
        Some(token) if !token.is_empty() => Ok(TokenResponse {
            access_token: SecretString::new(token),
            token_type: raw.token_type,
        }),
        _ => Err(ExchangeError::NoToken),
    }
}

#[cfg(test)]
mod tests {
    use {
        mockito::Matcher,
        secrecy::ExposeSecret,
        tripwire_config::OidcSettings,
    };

    use super::*;

    fn config_for(server: &mockito::ServerGuard) -> OidcConfig {
        OidcConfig::resolve(&OidcSettings {
            authorization_endpoint: Some(format!("{}/authorize", server.url())),
            token_endpoint: Some(format!("{}/token", server.url())),
            client_id: Some("dashboard".into()),
            redirect_uri: Some("http://localhost:5173/auth/callback".into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn client() -> TokenExchangeClient {
        TokenExchangeClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_token_response() {
        let token = parse_token_response(br#"{"access_token":"tok","token_type":"Bearer"}"#).unwrap();
        assert_eq!(token.access_token.expose_secret(), "tok");
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));

        assert!(matches!(
            parse_token_response(br#"{"token_type":"Bearer"}"#),
            Err(ExchangeError::NoToken)
        ));
        assert!(matches!(
            parse_token_response(br#"{"access_token":""}"#),
            Err(ExchangeError::NoToken)
        ));
        assert!(matches!(
            parse_token_response(br#"{"access_token":42}"#),
            Err(ExchangeError::MalformedBody(_))
        ));
        assert!(matches!(
            parse_token_response(b"<html>oops</html>"),
            Err(ExchangeError::MalformedBody(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_sends_pkce_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "abc".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "http://localhost:5173/auth/callback".into(),
                ),
                Matcher::UrlEncoded("client_id".into(), "dashboard".into()),
                Matcher::UrlEncoded("code_verifier".into(), "verifier-1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok123","token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let token = client()
            .exchange("abc", "verifier-1", &config_for(&server))
            .await
            .unwrap();
        assert_eq!(token.access_token.expose_secret(), "tok123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let err = client()
            .exchange("abc", "v", &config_for(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::HttpStatus(s) if s.as_u16() == 400));
    }

    #[tokio::test]
    async fn test_exchange_success_status_without_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let err = client()
            .exchange("abc", "v", &config_for(&server))
            .await
            .unwrap_err();
        assert_eq!(err.cause(), "no-token");
    }

    #[tokio::test]
    async fn test_exchange_connection_refused_is_network_error() {
        let config = OidcConfig::resolve(&OidcSettings {
            authorization_endpoint: Some("http://127.0.0.1:1/authorize".into()),
            token_endpoint: Some("http://127.0.0.1:1/token".into()),
            client_id: Some("dashboard".into()),
            origin: Some("http://localhost:5173".into()),
            ..Default::default()
        })
        .unwrap();

        let err = client().exchange("abc", "v", &config).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Network(_) | ExchangeError::Timeout
        ));
    }
}
