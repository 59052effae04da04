mod auth_commands;
mod browser;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    tripwire_config::TripwireConfig,
    tripwire_oauth::OidcConfig,
};

#[derive(Parser)]
#[command(name = "tripwire", about = "Tripwire dashboard login client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./tripwire.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the identity provider.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved identity provider settings.
    Show,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<TripwireConfig> {
    let config = tripwire_config::discover_and_load(cli.config.as_deref())?;
    Ok(tripwire_config::apply_env_overrides(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "tripwire starting");

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Auth { action } => auth_commands::handle_auth(action, &config).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => show_config(&config),
    }
}

fn show_config(config: &TripwireConfig) -> anyhow::Result<()> {
    let oidc = OidcConfig::resolve(&config.oidc)?;
    println!("Authorization endpoint: {}", oidc.authorization_endpoint);
    println!("Token endpoint:         {}", oidc.token_endpoint);
    println!("Client ID:              {}", oidc.client_id);
    println!("Redirect URI:           {}", oidc.redirect_uri);
    println!("Scope:                  {}", oidc.scope);
    println!("Exchange timeout:       {}s", oidc.exchange_timeout.as_secs());
    Ok(())
}
