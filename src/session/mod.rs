//! Collaborators supplied by the client session of one account.
//!
//! The protocol side ([`AvatarService`]) delivers avatar metadata and bytes; the directory side
//! ([`RosterService`]) delivers display names. Both push change events through [`Signal`]s.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::foundation::{
    core::{AccountId, Address},
    error::{DescriptorError, ProtocolError},
    signal::Signal,
};

pub(crate) mod memory;

pub use memory::{MemoryAvatarService, MemoryDescriptor, MemoryRoster};

/// Protocol capability for avatar metadata and data of one account.
#[async_trait]
pub trait AvatarService: Send + Sync {
    /// Emits the address of a peer whose published avatar metadata changed.
    fn on_metadata_changed(&self) -> Signal<Address>;

    /// Current avatar descriptors for `address`, in server order.
    async fn get_avatar_metadata(
        &self,
        address: &Address,
    ) -> Result<Vec<Arc<dyn AvatarDescriptor>>, ProtocolError>;
}

/// Handle to one published avatar variant.
#[async_trait]
pub trait AvatarDescriptor: Send + Sync {
    async fn get_image_bytes(&self) -> Result<Vec<u8>, DescriptorError>;
}

/// Directory (roster) entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub address: Address,
    /// Display name; contacts without one get no name-derived avatar.
    pub name: Option<String>,
}

/// Directory capability of one account.
pub trait RosterService: Send + Sync {
    fn entry(&self, address: &Address) -> Option<RosterEntry>;
    fn on_entry_added(&self) -> Signal<RosterEntry>;
    fn on_entry_name_changed(&self) -> Signal<RosterEntry>;
    fn on_entry_removed(&self) -> Signal<RosterEntry>;
}

/// The collaborators of one running client session.
#[derive(Clone)]
pub struct Session {
    avatar: Arc<dyn AvatarService>,
    roster: Arc<dyn RosterService>,
}

impl Session {
    pub fn new(avatar: Arc<dyn AvatarService>, roster: Arc<dyn RosterService>) -> Self {
        Self { avatar, roster }
    }

    pub fn avatar_service(&self) -> Arc<dyn AvatarService> {
        Arc::clone(&self.avatar)
    }

    pub fn roster(&self) -> Arc<dyn RosterService> {
        Arc::clone(&self.roster)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Client lifecycle notifications, see [`crate::AvatarManager::follow`].
#[derive(Clone, Debug, Default)]
pub struct SessionEvents {
    /// A client session for the account is ready to be used.
    pub on_session_prepared: Signal<(AccountId, Session)>,
    /// The account's client session stopped.
    pub on_session_stopped: Signal<(AccountId, Session)>,
}

impl SessionEvents {
    pub fn new() -> Self {
        Self::default()
    }
}
