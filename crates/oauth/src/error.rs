use reqwest::StatusCode;

/// Fatal errors: misconfiguration, missing randomness, broken storage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid OIDC configuration: {0}")]
    Config(String),

    #[error("secure random source unavailable: {0}")]
    Randomness(String),

    #[error("session storage error: {0}")]
    Storage(String),

    #[error("could not open {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a token exchange did not produce an access token.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("token request failed: {0}")]
    Network(String),

    #[error("token request timed out")]
    Timeout,

    #[error("token endpoint returned HTTP {0}")]
    HttpStatus(StatusCode),

    #[error("token response is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("token response has no access_token")]
    NoToken,
}

impl ExchangeError {
    /// Short tag for logs.
    pub fn cause(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout => "timeout",
            Self::HttpStatus(_) => "http-status",
            Self::MalformedBody(_) => "malformed-body",
            Self::NoToken => "no-token",
        }
    }
}

/// Why a callback was rejected. Callers of
/// [`OAuthFlow::handle_callback`](crate::OAuthFlow::handle_callback) only see
/// `false`; this is what gets logged.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("identity provider returned error {error}")]
    ProviderError {
        error: String,
        description: Option<String>,
    },

    #[error("callback has no authorization code")]
    MissingCode,

    #[error("callback has no state")]
    MissingState,

    #[error("no pending authorization")]
    NoPendingAuthorization,

    #[error("state does not match pending authorization")]
    StateMismatch,

    #[error("could not read pending authorization: {0}")]
    Storage(String),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl CallbackError {
    pub fn cause(&self) -> &'static str {
        match self {
            Self::ProviderError { .. } => "provider-error",
            Self::MissingCode => "missing-code",
            Self::MissingState => "missing-state",
            Self::NoPendingAuthorization => "no-pending-authorization",
            Self::StateMismatch => "state-mismatch",
            Self::Storage(_) => "storage",
            Self::Exchange(e) => e.cause(),
        }
    }
}
