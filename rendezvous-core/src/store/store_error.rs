use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or the request was lost in flight.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid store path '{0}'")]
    InvalidPath(String),

    /// The store answered with something the client did not expect.
    #[error("store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::Unavailable(reason.to_string())
    }
}
