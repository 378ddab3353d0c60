use crate::email::store::StoreError;
use crate::email::violation::Violation;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A candidate value was rejected by one of the email checks.
    #[error(transparent)]
    Violation(#[from] Violation),

    /// The record store could not answer the uniqueness query.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// The violation carried by this error, if it is a rejection.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Self::Violation(v) => Some(v),
            _ => None,
        }
    }
}
