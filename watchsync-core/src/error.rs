use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("Not joined: {0}")]
    NotJoined(String),

    #[error("Transport publish error: {0}")]
    TransportPublish(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Errors the caller is expected to surface to the user as a warning.
    ///
    /// Publish faults are logged where they happen and never reach the user.
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::InvalidReference(_) | Self::NotConnected(_) | Self::NotJoined(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
