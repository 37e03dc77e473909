use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating gate configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has unexpected keys.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A resource's settings are out of range.
    #[error("invalid configuration for '{resource}': {reason}")]
    Invalid {
        /// Resource whose settings were rejected.
        resource: String,
        /// Which rule was broken.
        reason: String,
    },

    /// Two gates were registered under the same name.
    #[error("resource '{0}' is registered more than once")]
    DuplicateResource(String),
}
