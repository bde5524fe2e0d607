//! Avatar sources: backends answering "which picture represents this address".
//!
//! The manager only talks to sources through [`AvatarSource`]; it never inspects the concrete
//! type. Behavioural differences are expressed through [`RefreshPolicy`].

use async_trait::async_trait;

use crate::{
    cache::CacheEntry,
    foundation::{core::Address, error::AvatarResult, signal::Signal},
    render::AvatarFont,
    session::Session,
};

pub(crate) mod directory;
pub(crate) mod network;

pub use directory::DirectoryNameSource;
pub use network::NetworkAvatarSource;

/// Why a source reports a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The source's own `fetch` rewrote its cache entry.
    Fetched,
    /// The upstream collaborator signalled new data.
    Upstream,
}

/// Change notification of a source. Carries no picture; read it back with `get_cached`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceChange {
    pub address: Address,
    pub kind: ChangeKind,
}

impl SourceChange {
    pub fn fetched(address: Address) -> Self {
        Self {
            address,
            kind: ChangeKind::Fetched,
        }
    }

    pub fn upstream(address: Address) -> Self {
        Self {
            address,
            kind: ChangeKind::Upstream,
        }
    }
}

/// How the manager keeps a source fresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Misses are filled by background `fetch` jobs; upstream changes refetch cached entries.
    Fetch,
    /// Answers are computed on read; upstream changes are forwarded to subscribers as-is.
    Passive,
}

#[async_trait]
pub trait AvatarSource: Send + Sync {
    /// Hook up to the session's collaborators. Calling it again for the same session is a no-op.
    fn prepare_session(&self, session: &Session);

    /// Drop every subscription and collaborator handle. Safe after a partial prepare.
    fn shutdown_session(&self, session: &Session);

    /// Synchronous read. Fails with [`crate::AvatarError::NotCached`] when nothing is known.
    fn get_cached(&self, address: &Address, font: &AvatarFont) -> AvatarResult<CacheEntry>;

    /// Produce a fresh answer for `address`, updating whatever the source caches.
    async fn fetch(&self, address: &Address) -> AvatarResult<CacheEntry>;

    /// Whether a cache entry (picture or absent) exists for `address`.
    fn has_entry(&self, address: &Address) -> bool;

    fn refresh_policy(&self) -> RefreshPolicy;

    fn on_avatar_changed(&self) -> Signal<SourceChange>;
}
