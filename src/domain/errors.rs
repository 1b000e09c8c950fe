//! Domain Errors

use derive_more::{Display, Error};

/// Why a connection ended without a logged request.
#[derive(Debug, Display, Error)]
pub enum RequestError {
    #[display("malformed request: {_0}")]
    Malformed(#[error(source)] httparse::Error),
    #[display("request head is too large")]
    HeadTooLarge,
    #[display("peer closed the connection mid-request")]
    Incomplete,
    #[display("i/o error: {_0}")]
    Io(#[error(source)] std::io::Error),
}

impl RequestError {
    /// Whether the peer should still be told off with a `400`.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::HeadTooLarge)
    }
}

impl From<httparse::Error> for RequestError {
    fn from(value: httparse::Error) -> Self {
        Self::Malformed(value)
    }
}

impl From<std::io::Error> for RequestError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
