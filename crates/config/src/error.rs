use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: {0} (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid value for {key}: {message}")]
    Env { key: String, message: String },

    #[error("could not determine home directory")]
    NoHomeDir,
}

pub type Result<T> = std::result::Result<T, Error>;
