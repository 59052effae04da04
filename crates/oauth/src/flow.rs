use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    config::OidcConfig,
    error::{CallbackError, Result},
    exchange::TokenExchangeClient,
    navigator::Navigator,
    sink::SessionTokenSink,
    state::generate_state,
    storage::{PendingAuthStore, SessionStorage},
    types::{CallbackParams, PendingAuthorization, PkceChallenge},
};

/// Authorization code + PKCE login for one client registration.
pub struct OAuthFlow {
    config: OidcConfig,
    pending: PendingAuthStore,
    navigator: Arc<dyn Navigator>,
    sink: Arc<dyn SessionTokenSink>,
    exchange: TokenExchangeClient,
}

impl OAuthFlow {
    /// The token client is bounded by `config.exchange_timeout`.
    pub fn new(
        config: OidcConfig,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        sink: Arc<dyn SessionTokenSink>,
    ) -> Result<Self> {
        let exchange = TokenExchangeClient::new(config.exchange_timeout)?;
        Ok(Self {
            config,
            pending: PendingAuthStore::new(storage),
            navigator,
            sink,
            exchange,
        })
    }

    /// Replace the token client, e.g. one with extra proxy or TLS settings.
    pub fn with_exchange_client(mut self, exchange: TokenExchangeClient) -> Self {
        self.exchange = exchange;
        self
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// Authorization request URL for the given state and S256 challenge.
    pub fn authorization_url(&self, state: &str, code_challenge: &str) -> Url {
        let mut url = self.config.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        url
    }

    /// Start a login: persist a fresh `{state, verifier}` and only then send
    /// the user to the identity provider. Any earlier pending attempt is
    /// replaced.
    pub fn initiate_login(&self) -> Result<()> {
        let state = generate_state()?;
        let pkce = PkceChallenge::generate()?;

        self.pending
            .save(&PendingAuthorization::new(state.clone(), pkce.verifier))?;

        let url = self.authorization_url(&state, &pkce.challenge);
        info!(
            authorization_endpoint = %self.config.authorization_endpoint,
            client_id = %self.config.client_id,
            "redirecting to identity provider"
        );
        self.navigator.redirect_to(&url)
    }

    /// Complete a login from the callback query. Returns `true` only when the
    /// access token was handed to the sink; every other outcome is `false`
    /// and means the user has to start over. The pending authorization is
    /// gone afterwards either way.
    pub async fn handle_callback(&self, params: &CallbackParams) -> bool {
        match self.process_callback(params).await {
            Ok(()) => true,
            Err(e) => {
                warn!(cause = e.cause(), error = %e, "login callback rejected");
                false
            },
        }
    }

    /// Same as [`handle_callback`](Self::handle_callback) but keeps the reason
    /// for a rejection.
    pub async fn process_callback(
        &self,
        params: &CallbackParams,
    ) -> std::result::Result<(), CallbackError> {
        let pending = self.pending.load();
        self.pending
            .clear()
            .map_err(|e| CallbackError::Storage(e.to_string()))?;

        if let Some(error) = &params.error {
            debug!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or_default(),
                "identity provider reported an error"
            );
            return Err(CallbackError::ProviderError {
                error: error.clone(),
                description: params.error_description.clone(),
            });
        }

        let code = params.code.as_deref().ok_or(CallbackError::MissingCode)?;
        let state = params.state.as_deref().ok_or(CallbackError::MissingState)?;
        let pending = pending
            .map_err(|e| CallbackError::Storage(e.to_string()))?
            .ok_or(CallbackError::NoPendingAuthorization)?;

        if state != pending.state {
            return Err(CallbackError::StateMismatch);
        }

        let token = self
            .exchange
            .exchange(code, pending.verifier.expose_secret(), &self.config)
            .await?;

        self.sink.set_token(&token);
        info!(token_type = token.token_type.as_deref().unwrap_or("unknown"), "login completed");
        Ok(())
    }

    /// Drop the current access token. Safe to call repeatedly.
    pub fn logout(&self) {
        self.sink.clear_token();
        info!("logged out");
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use tripwire_config::OidcSettings;

    use super::*;
    use crate::{
        error::Error,
        pkce::derive_challenge,
        sink::MemoryTokenSink,
        storage::{FileSessionStorage, MemorySessionStorage, STATE_KEY, VERIFIER_KEY},
    };

    fn config() -> OidcConfig {
        OidcConfig::resolve(&OidcSettings {
            authorization_endpoint: Some("https://idp.example.com/authorize?tenant=acme".into()),
            token_endpoint: Some("https://idp.example.com/token".into()),
            client_id: Some("dashboard".into()),
            origin: Some("http://localhost:5173".into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn noop_navigator() -> Arc<dyn Navigator> {
        Arc::new(|_: &Url| -> Result<()> { Ok(()) })
    }

    fn flow_with(storage: Arc<dyn SessionStorage>, navigator: Arc<dyn Navigator>) -> OAuthFlow {
        OAuthFlow::new(config(), storage, navigator, Arc::new(MemoryTokenSink::new())).unwrap()
    }

    fn query_map(url: &Url) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in url.query_pairs() {
            map.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        map
    }

    #[test]
    fn test_authorization_url_parameters() {
        let flow = flow_with(
            Arc::new(MemorySessionStorage::new()),
            noop_navigator(),
        );
        let url = flow.authorization_url("st+ate", "chal");
        let q = query_map(&url);

        assert_eq!(url.host_str(), Some("idp.example.com"));
        assert_eq!(url.path(), "/authorize");
        assert_eq!(q["tenant"], vec!["acme"]);
        assert_eq!(q["response_type"], vec!["code"]);
        assert_eq!(q["client_id"], vec!["dashboard"]);
        assert_eq!(q["redirect_uri"], vec!["http://localhost:5173/auth/callback"]);
        assert_eq!(q["scope"], vec!["openid profile email"]);
        assert_eq!(q["state"], vec!["st+ate"]);
        assert_eq!(q["code_challenge"], vec!["chal"]);
        assert_eq!(q["code_challenge_method"], vec!["S256"]);
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_initiate_login_persists_before_navigating() {
        let storage = Arc::new(MemorySessionStorage::new());
        let seen: Arc<Mutex<Option<(Url, Option<String>, Option<String>)>>> =
            Arc::new(Mutex::new(None));

        let nav_storage = storage.clone();
        let nav_seen = seen.clone();
        let navigator = move |url: &Url| -> Result<()> {
            let state = nav_storage.get(STATE_KEY)?;
            let verifier = nav_storage.get(VERIFIER_KEY)?;
            *nav_seen.lock().unwrap() = Some((url.clone(), state, verifier));
            Ok(())
        };

        let flow = flow_with(storage.clone(), Arc::new(navigator));
        flow.initiate_login().unwrap();

        let (url, state, verifier) = seen.lock().unwrap().take().unwrap();
        let state = state.expect("state saved before navigation");
        let verifier = verifier.expect("verifier saved before navigation");
        let q = query_map(&url);
        assert_eq!(q["state"], vec![state]);
        assert_eq!(q["code_challenge"], vec![derive_challenge(&verifier)]);
        assert!(!url.as_str().contains(&verifier));
    }

    #[test]
    fn test_second_login_replaces_pending() {
        let storage = Arc::new(MemorySessionStorage::new());
        let flow = flow_with(storage.clone(), noop_navigator());

        flow.initiate_login().unwrap();
        let first = storage.get(STATE_KEY).unwrap().unwrap();
        flow.initiate_login().unwrap();
        let second = storage.get(STATE_KEY).unwrap().unwrap();
        assert_ne!(first, second);
    }

    /// Storage whose reads and writes fail; removals succeed and are recorded.
    #[derive(Default)]
    struct FailingStorage {
        removed: Mutex<Vec<String>>,
    }

    impl SessionStorage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Storage("unavailable".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("unavailable".into()))
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.removed.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_storage_failure_prevents_navigation() {
        let navigated = Arc::new(Mutex::new(false));
        let flag = navigated.clone();
        let flow = flow_with(
            Arc::new(FailingStorage::default()),
            Arc::new(move |_: &Url| -> Result<()> {
                *flag.lock().unwrap() = true;
                Ok(())
            }),
        );

        assert!(matches!(flow.initiate_login(), Err(Error::Storage(_))));
        assert!(!*navigated.lock().unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_storage_rejects_callback() {
        let storage = Arc::new(FailingStorage::default());
        let flow = flow_with(storage.clone(), noop_navigator());
        let params = CallbackParams::from_query("code=abc&state=s");
        let err = flow.process_callback(&params).await.unwrap_err();
        assert!(matches!(err, CallbackError::Storage(_)));

        let mut removed = storage.removed.lock().unwrap().clone();
        removed.sort();
        assert_eq!(removed, vec![VERIFIER_KEY.to_string(), STATE_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_pending_file_is_deleted_on_callback() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileSessionStorage::in_dir(dir.path()));
        std::fs::write(storage.path(), "{not json").unwrap();

        let flow = flow_with(storage.clone(), noop_navigator());
        let params = CallbackParams::from_query("code=abc&state=s");
        assert!(!flow.handle_callback(&params).await);
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_navigation_failure_keeps_pending() {
        let storage = Arc::new(MemorySessionStorage::new());
        let flow = flow_with(
            storage.clone(),
            Arc::new(|url: &Url| -> Result<()> {
                Err(Error::Navigation {
                    url: url.to_string(),
                    reason: "no browser".into(),
                })
            }),
        );

        let url = match flow.initiate_login() {
            Err(Error::Navigation { url, .. }) => url,
            other => panic!("expected a navigation error, got {other:?}"),
        };

        let state = storage.get(STATE_KEY).unwrap().expect("state kept");
        let verifier = storage.get(VERIFIER_KEY).unwrap().expect("verifier kept");
        let url = Url::parse(&url).unwrap();
        let q = query_map(&url);
        assert_eq!(q["state"], vec![state]);
        assert_eq!(q["code_challenge"], vec![derive_challenge(&verifier)]);
    }

    #[tokio::test]
    async fn test_provider_error_clears_pending() {
        let storage = Arc::new(MemorySessionStorage::new());
        let flow = flow_with(storage.clone(), noop_navigator());
        flow.initiate_login().unwrap();

        let params = CallbackParams::from_query("error=access_denied&error_description=nope");
        let err = flow.process_callback(&params).await.unwrap_err();
        assert!(matches!(err, CallbackError::ProviderError { ref error, .. } if error == "access_denied"));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_verifier_is_secret_in_pending() {
        let pending = PendingAuthorization::new("s", "v");
        assert_eq!(pending.verifier.expose_secret(), "v");
    }
}
