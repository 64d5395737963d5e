use std::net::SocketAddr;
use thiserror::Error;

/// Failures while bringing the listener up
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Failures on a running listener or in frame coding
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Socket receive failed: {0}")]
    Recv(#[source] std::io::Error),

    #[error("Socket send to {addr} failed: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Frame encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Payload of {len} bytes exceeds limit of {max}")]
    Oversized { len: usize, max: usize },

    #[error("Request loop is gone")]
    LoopClosed,
}

impl From<rmp_serde::decode::Error> for TransportError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        TransportError::Malformed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
