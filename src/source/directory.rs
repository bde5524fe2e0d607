use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::{
    cache::CacheEntry,
    foundation::{
        core::Address,
        error::{AvatarError, AvatarResult},
        signal::{Signal, Subscriptions},
    },
    render::{AvatarFont, Renderer, render_dummy_avatar},
    session::{RosterEntry, RosterService, Session},
    source::{AvatarSource, RefreshPolicy, SourceChange},
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Generated avatars derived from roster display names.
///
/// Nothing is cached: rendering is deterministic, so reads always reflect the current name.
pub struct DirectoryNameSource {
    renderer: Arc<dyn Renderer>,
    font: AvatarFont,
    size: u32,
    roster: Mutex<Option<Arc<dyn RosterService>>>,
    subscriptions: Mutex<Subscriptions>,
    on_avatar_changed: Signal<SourceChange>,
}

impl DirectoryNameSource {
    /// `font` is used by [`AvatarSource::fetch`], which has no caller-supplied font.
    pub fn new(renderer: Arc<dyn Renderer>, font: AvatarFont, size: u32) -> Self {
        Self {
            renderer,
            font,
            size,
            roster: Mutex::new(None),
            subscriptions: Mutex::new(Subscriptions::new()),
            on_avatar_changed: Signal::new(),
        }
    }

    fn display_name(&self, address: &Address) -> Option<String> {
        let roster = lock(&self.roster).clone()?;
        roster.entry(address)?.name
    }
}

#[async_trait]
impl AvatarSource for DirectoryNameSource {
    fn prepare_session(&self, session: &Session) {
        let roster = session.roster();
        let mut current = lock(&self.roster);
        if current.as_ref().is_some_and(|r| Arc::ptr_eq(r, &roster)) {
            return;
        }

        let mut subs = lock(&self.subscriptions);
        subs.disconnect_all();
        for signal in [
            roster.on_entry_added(),
            roster.on_entry_name_changed(),
            roster.on_entry_removed(),
        ] {
            let changed = self.on_avatar_changed.clone();
            subs.connect(&signal, move |entry: &RosterEntry| {
                changed.emit(&SourceChange::upstream(entry.address.clone()));
            });
        }
        *current = Some(roster);
    }

    fn shutdown_session(&self, _session: &Session) {
        lock(&self.subscriptions).disconnect_all();
        *lock(&self.roster) = None;
    }

    fn get_cached(&self, address: &Address, font: &AvatarFont) -> AvatarResult<CacheEntry> {
        let name = self.display_name(address).ok_or(AvatarError::NotCached)?;
        let seed = address.to_string();
        Ok(CacheEntry::Picture(render_dummy_avatar(
            self.renderer.as_ref(),
            font,
            &name,
            self.size,
            Some(&seed),
        )))
    }

    async fn fetch(&self, address: &Address) -> AvatarResult<CacheEntry> {
        match self.get_cached(address, &self.font) {
            Err(AvatarError::NotCached) => Ok(CacheEntry::Absent),
            other => other,
        }
    }

    fn has_entry(&self, address: &Address) -> bool {
        self.display_name(address).is_some()
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::Passive
    }

    fn on_avatar_changed(&self) -> Signal<SourceChange> {
        self.on_avatar_changed.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/directory.rs"]
mod tests;
