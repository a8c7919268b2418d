use thiserror::Error;

use crate::events::ClientId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The id was never registered, or has already been unregistered.
    #[error("client {0} not found")]
    ClientNotFound(ClientId),

    /// Time scales must be finite and strictly positive.
    #[error("invalid time scale: {0}")]
    InvalidScale(f64),

    /// The control queue has no free slot. Backpressure, not a fault.
    #[error("control queue is full")]
    QueueFull,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] ron::Error),
}
