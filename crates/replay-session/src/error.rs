//! Error types for the session binary.

use replay_core::ConfigError;

/// Top-level error for the session binary.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Reading commands or writing output failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
