//! Avatar resolution and caching for chat clients.
//!
//! The public API is manager-oriented:
//!
//! - Build an [`AvatarManager`] from [`ManagerOpts`] inside a tokio runtime
//! - Register accounts with their client [`Session`] (or [`AvatarManager::follow`] session events)
//! - Call [`AvatarManager::resolve`] from UI code and re-resolve on
//!   [`AvatarManager::on_avatar_changed`]
#![forbid(unsafe_code)]

mod foundation;

pub mod cache;
pub mod config;
pub mod manager;
pub mod render;
pub mod session;
pub mod source;

pub use crate::foundation::core::{AccountId, Address, FetchKey, Rgba8Premul};
pub use crate::foundation::error::{AvatarError, AvatarResult, DescriptorError, ProtocolError};
pub use crate::foundation::signal::{Signal, SubscriptionToken, Subscriptions};

pub use crate::cache::{BoundedLru, CacheEntry};
pub use crate::config::{MAX_AVATAR_SIZE, ManagerOpts};
pub use crate::manager::{AvatarChanged, AvatarManager, FetchStats};
pub use crate::render::{
    AvatarFont, BASE_SIZE, CpuRenderer, Picture, PictureKind, Renderer, color_for_text,
    first_grapheme, render_dummy_avatar,
};
pub use crate::session::{
    AvatarDescriptor, AvatarService, MemoryAvatarService, MemoryDescriptor, MemoryRoster,
    RosterEntry, RosterService, Session, SessionEvents,
};
pub use crate::source::{
    AvatarSource, ChangeKind, DirectoryNameSource, NetworkAvatarSource, RefreshPolicy,
    SourceChange,
};
