use std::time::Duration;

use crate::foundation::core::Address;

pub type AvatarResult<T> = Result<T, AvatarError>;

#[derive(thiserror::Error, Debug)]
pub enum AvatarError {
    /// The source has no entry for the address. Expected; drives the fallback chain.
    #[error("no cached avatar")]
    NotCached,

    #[error("avatar source used without a prepared session")]
    NotPrepared,

    #[error("avatar fetch for {address} timed out after {after:?}")]
    FetchTimeout { address: Address, after: Duration },

    #[error("account {0} is already registered")]
    AccountAlreadyRegistered(String),

    #[error("account {0} is not registered")]
    UnknownAccount(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AvatarError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// `true` for the expected cache-miss outcome.
    pub fn is_not_cached(&self) -> bool {
        matches!(self, Self::NotCached)
    }
}

/// Failure reported by the protocol collaborator while querying avatar metadata.
///
/// Sources treat these as soft failures: logged, then degraded to an absent avatar.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("xmpp error: {0}")]
    Xmpp(String),

    #[error("erroneous stanza: {0}")]
    ErroneousStanza(String),
}

/// Failure retrieving the bytes behind one avatar descriptor. The next descriptor is tried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor retrieval not implemented")]
    NotImplemented,

    #[error("descriptor retrieval failed: {0}")]
    Runtime(String),

    #[error("descriptor retrieval cancelled")]
    Cancelled,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
