use std::sync::Arc;

use {
    anyhow::{Context, Result},
    clap::Subcommand,
    tracing::debug,
    tripwire_config::TripwireConfig,
    tripwire_oauth::{
        CallbackParams, Error, FileSessionStorage, OAuthFlow, OidcConfig, PendingAuthStore,
        SessionTokenSink, TokenStore,
    },
    url::Url,
};

use crate::browser::BrowserNavigator;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Start a login in the browser.
    Login,
    /// Finish a login with the URL the browser was redirected to.
    Callback {
        /// Full redirect URL, e.g. http://localhost:5173/auth/callback?code=...&state=...
        url: String,
    },
    /// Show whether an access token is stored.
    Status,
    /// Remove the stored access token.
    Logout,
}

pub async fn handle_auth(action: AuthAction, config: &TripwireConfig) -> Result<()> {
    match action {
        AuthAction::Login => login(config),
        AuthAction::Callback { url } => callback(config, &url).await,
        AuthAction::Status => status(),
        AuthAction::Logout => logout(),
    }
}

fn token_store() -> Result<TokenStore> {
    Ok(TokenStore::in_dir(&tripwire_config::data_dir()?))
}

fn session_storage() -> Result<FileSessionStorage> {
    Ok(FileSessionStorage::in_dir(&tripwire_config::state_dir()?))
}

fn build_flow(config: &TripwireConfig) -> Result<OAuthFlow> {
    let oidc = OidcConfig::resolve(&config.oidc)?;
    let flow = OAuthFlow::new(
        oidc,
        Arc::new(session_storage()?),
        Arc::new(BrowserNavigator),
        Arc::new(token_store()?),
    )?;
    Ok(flow)
}

fn login(config: &TripwireConfig) -> Result<()> {
    let flow = build_flow(config)?;

    println!("Opening browser for authentication...");
    match flow.initiate_login() {
        Ok(()) => {},
        Err(Error::Navigation { url, reason }) => {
            debug!(%reason, "browser launch failed");
            println!("Could not open browser. Please visit:\n{url}");
        },
        Err(e) => return Err(e.into()),
    }

    println!(
        "After signing in, run:\n  tripwire auth callback '<URL of {}?...>'",
        flow.config().redirect_uri
    );
    Ok(())
}

async fn callback(config: &TripwireConfig, raw_url: &str) -> Result<()> {
    let url = Url::parse(raw_url).with_context(|| format!("invalid callback URL: {raw_url}"))?;
    let flow = build_flow(config)?;

    println!("Exchanging code for tokens...");
    if !flow.handle_callback(&CallbackParams::from_url(&url)).await {
        anyhow::bail!("login failed; run `tripwire auth login` to start again");
    }

    println!("Successfully logged in");
    Ok(())
}

fn status() -> Result<()> {
    match token_store()?.load() {
        Some(token) => {
            let age = unix_now().saturating_sub(token.stored_at);
            let hours = age / 3600;
            let mins = (age % 3600) / 60;
            println!(
                "Logged in [{}] (token stored {hours}h {mins}m ago)",
                token.token_type.as_deref().unwrap_or("unknown type")
            );
        },
        None => println!("Not logged in."),
    }

    let pending = PendingAuthStore::new(Arc::new(session_storage()?));
    if pending.load()?.is_some() {
        println!("A login is waiting for its callback.");
    }
    Ok(())
}

fn logout() -> Result<()> {
    token_store()?.clear_token();
    println!("Logged out");
    Ok(())
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
