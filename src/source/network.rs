use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::{
    cache::{BoundedLru, CacheEntry},
    foundation::{
        core::{AccountId, Address},
        error::{AvatarError, AvatarResult},
        signal::{Signal, Subscriptions},
    },
    render::{AvatarFont, Picture, Renderer},
    session::{AvatarService, Session},
    source::{AvatarSource, RefreshPolicy, SourceChange},
};

/// Default number of peers whose avatar answer is retained per account.
pub const NETWORK_CACHE_CAPACITY: usize = 1024;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Authoritative avatars published by remote peers, fetched over the protocol.
pub struct NetworkAvatarSource {
    account: AccountId,
    renderer: Arc<dyn Renderer>,
    size: u32,
    cache: Mutex<BoundedLru<Address, CacheEntry>>,
    service: Mutex<Option<Arc<dyn AvatarService>>>,
    subscriptions: Mutex<Subscriptions>,
    on_avatar_changed: Signal<SourceChange>,
}

impl NetworkAvatarSource {
    pub fn new(
        account: AccountId,
        renderer: Arc<dyn Renderer>,
        cache_capacity: usize,
        size: u32,
    ) -> Self {
        Self {
            account,
            renderer,
            size,
            cache: Mutex::new(BoundedLru::new(cache_capacity)),
            service: Mutex::new(None),
            subscriptions: Mutex::new(Subscriptions::new()),
            on_avatar_changed: Signal::new(),
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.cache).len()
    }

    pub fn is_prepared(&self) -> bool {
        lock(&self.service).is_some()
    }

    /// Query metadata and return the first descriptor that decodes to a picture.
    async fn fetch_picture(&self, address: &Address) -> AvatarResult<Option<Picture>> {
        let service = lock(&self.service).clone().ok_or(AvatarError::NotPrepared)?;

        let metadata = match service.get_avatar_metadata(address).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(account = %self.account, %address, %err, "cannot fetch avatar");
                return Ok(None);
            }
        };

        for descriptor in metadata {
            let bytes = match descriptor.get_image_bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    trace!(%address, %err, "skipping avatar descriptor");
                    continue;
                }
            };
            if let Some(picture) = self.renderer.render_from_bytes(&bytes, self.size) {
                return Ok(Some(picture));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl AvatarSource for NetworkAvatarSource {
    fn prepare_session(&self, session: &Session) {
        let service = session.avatar_service();
        let mut current = lock(&self.service);
        if current.as_ref().is_some_and(|s| Arc::ptr_eq(s, &service)) {
            return;
        }

        let mut subs = lock(&self.subscriptions);
        subs.disconnect_all();
        let changed = self.on_avatar_changed.clone();
        subs.connect(&service.on_metadata_changed(), move |address: &Address| {
            changed.emit(&SourceChange::upstream(address.clone()));
        });
        *current = Some(service);
    }

    fn shutdown_session(&self, _session: &Session) {
        lock(&self.subscriptions).disconnect_all();
        *lock(&self.service) = None;
    }

    fn get_cached(&self, address: &Address, _font: &AvatarFont) -> AvatarResult<CacheEntry> {
        lock(&self.cache).get(address).ok_or(AvatarError::NotCached)
    }

    #[tracing::instrument(skip(self), fields(account = %self.account))]
    async fn fetch(&self, address: &Address) -> AvatarResult<CacheEntry> {
        let entry = CacheEntry::from(self.fetch_picture(address).await?);
        debug!(absent = entry.is_absent(), "avatar fetch finished");

        lock(&self.cache).insert(address.clone(), entry.clone());
        self.on_avatar_changed
            .emit(&SourceChange::fetched(address.clone()));
        Ok(entry)
    }

    fn has_entry(&self, address: &Address) -> bool {
        lock(&self.cache).contains(address)
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::Fetch
    }

    fn on_avatar_changed(&self) -> Signal<SourceChange> {
        self.on_avatar_changed.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/network.rs"]
mod tests;
