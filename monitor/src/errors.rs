use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("measurement {0} not found")]
    NotFound(i64),

    #[error("command channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
