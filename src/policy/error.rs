// Error types for Policy module

use thiserror::Error;

/// Errors raised while loading a policy file
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read policy file '{0}': {1}")]
    Read(String, std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid policy: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
