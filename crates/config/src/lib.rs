//! Configuration for the tripwire login client.
//!
//! Settings are read from `tripwire.toml` (or `.yaml` / `.json`) and then
//! overridden by `TRIPWIRE_*` environment variables. Resolution into the
//! values the login flow actually uses lives in `tripwire-oauth`; this crate
//! only loads what the operator wrote down.

pub mod env_overrides;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    env_overrides::{apply_env_overrides, apply_overrides_with},
    error::{Error, Result},
    loader::{config_dir, data_dir, discover_and_load, load_config, state_dir},
    schema::{OidcSettings, TripwireConfig},
};
