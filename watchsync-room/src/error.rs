use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] watchsync_core::Error),

    #[error("Channel closed: {0}")]
    Closed(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for watchsync_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::NotFound(msg) => Self::NotJoined(msg),
            Error::Closed(msg) => Self::TransportPublish(msg),
        }
    }
}
