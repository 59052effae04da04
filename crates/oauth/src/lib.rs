//! OAuth 2.0 authorization code flow with PKCE for a public client.
//!
//! [`OAuthFlow`] ties the pieces together: it stores a pending
//! `{state, verifier}` pair, sends the user to the identity provider through a
//! [`Navigator`], and on the way back validates the callback, exchanges the
//! code and hands the access token to a [`SessionTokenSink`].

pub mod config;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod navigator;
pub mod pkce;
pub mod sink;
pub mod state;
pub mod storage;
pub mod types;

pub use {
    config::OidcConfig,
    error::{CallbackError, Error, ExchangeError, Result},
    exchange::TokenExchangeClient,
    flow::OAuthFlow,
    navigator::Navigator,
    pkce::{derive_challenge, generate_verifier},
    sink::{MemoryTokenSink, SessionTokenSink, TokenStore},
    state::generate_state,
    storage::{FileSessionStorage, MemorySessionStorage, PendingAuthStore, SessionStorage},
    types::{CallbackParams, PendingAuthorization, PkceChallenge, StoredToken, TokenResponse},
};
