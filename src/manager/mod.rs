//! Per-account avatar resolution with background refresh.
//!
//! [`AvatarManager::resolve`] never blocks: it walks the account's sources in priority order,
//! answers from whatever is cached, and queues a background fetch for sources whose
//! [`RefreshPolicy`] is [`RefreshPolicy::Fetch`]. Subscribers learn about new answers through
//! [`AvatarManager::on_avatar_changed`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use futures::FutureExt as _;
use tracing::{debug, info, warn};

use crate::{
    cache::CacheEntry,
    config::ManagerOpts,
    foundation::{
        core::{AccountId, Address, FetchKey},
        error::{AvatarError, AvatarResult},
        signal::{Signal, Subscriptions},
    },
    render::{AvatarFont, CpuRenderer, Picture, Renderer, render_dummy_avatar},
    session::{Session, SessionEvents},
    source::{
        AvatarSource, ChangeKind, DirectoryNameSource, NetworkAvatarSource, RefreshPolicy,
        SourceChange,
    },
};

pub(crate) mod pending;
pub(crate) mod pool;

use pending::PendingSet;
use pool::{FetchJob, FetchWorkerPool};

pub use pool::FetchStats;

/// Emitted when the picture for `(account, address)` may have changed. Carries no picture;
/// call [`AvatarManager::resolve`] again.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AvatarChanged {
    pub account: AccountId,
    pub address: Address,
}

struct AccountSources {
    /// Priority order: first hit wins.
    chain: Vec<Arc<dyn AvatarSource>>,
    network: Arc<NetworkAvatarSource>,
    subscriptions: Subscriptions,
}

struct ManagerInner {
    opts: ManagerOpts,
    renderer: Arc<dyn Renderer>,
    font: RwLock<AvatarFont>,
    accounts: RwLock<HashMap<AccountId, AccountSources>>,
    pending: PendingSet,
    pool: FetchWorkerPool,
    on_avatar_changed: Signal<AvatarChanged>,
}

/// Resolves avatars for every registered account.
pub struct AvatarManager {
    inner: Arc<ManagerInner>,
    lifecycle: std::sync::Mutex<Subscriptions>,
}

impl AvatarManager {
    /// Build a manager and spawn its fetch workers on the current tokio runtime.
    pub fn new(opts: ManagerOpts, renderer: Arc<dyn Renderer>) -> AvatarResult<Self> {
        opts.validate()?;
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            AvatarError::validation("AvatarManager must be created inside a tokio runtime")
        })?;
        let font = match &opts.font_path {
            Some(path) => AvatarFont::load(path)?,
            None => AvatarFont::none(),
        };

        info!(
            workers = opts.workers,
            timeout_ms = opts.fetch_timeout_ms,
            size = opts.avatar_size,
            "starting avatar manager"
        );
        let pool = FetchWorkerPool::spawn(&handle, opts.workers);
        Ok(Self {
            inner: Arc::new(ManagerInner {
                opts,
                renderer,
                font: RwLock::new(font),
                accounts: RwLock::new(HashMap::new()),
                pending: PendingSet::default(),
                pool,
                on_avatar_changed: Signal::new(),
            }),
            lifecycle: std::sync::Mutex::new(Subscriptions::new()),
        })
    }

    pub fn with_cpu_renderer(opts: ManagerOpts) -> AvatarResult<Self> {
        Self::new(opts, Arc::new(CpuRenderer::new()))
    }

    /// Builder form of [`AvatarManager::set_font`].
    pub fn with_font(self, font: AvatarFont) -> Self {
        self.set_font(font);
        self
    }

    /// Replace the glyph font. Only affects pictures rendered afterwards.
    pub fn set_font(&self, font: AvatarFont) {
        debug!(font = ?font.id(), "avatar font replaced");
        *self
            .inner
            .font
            .write()
            .unwrap_or_else(PoisonError::into_inner) = font;
    }

    /// Create and prepare the sources of `account`.
    pub fn register_account(&self, account: AccountId, session: Session) -> AvatarResult<()> {
        self.inner.register_account(account, session)
    }

    /// Shut down and drop the sources of `account`. Queued fetches still run to completion.
    pub fn unregister_account(&self, account: &AccountId, session: &Session) -> AvatarResult<()> {
        self.inner.unregister_account(account, session)
    }

    /// Register and unregister accounts as client sessions start and stop.
    ///
    /// Failures are logged; they cannot be returned to the emitter.
    pub fn follow(&self, events: &SessionEvents) {
        let mut lifecycle = self
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let weak = Arc::downgrade(&self.inner);
        lifecycle.connect(
            &events.on_session_prepared,
            move |(account, session): &(AccountId, Session)| {
                let Some(inner) = weak.upgrade() else { return };
                if let Err(err) = inner.register_account(account.clone(), session.clone()) {
                    warn!(%account, %err, "cannot register account");
                }
            },
        );

        let weak = Arc::downgrade(&self.inner);
        lifecycle.connect(
            &events.on_session_stopped,
            move |(account, session): &(AccountId, Session)| {
                let Some(inner) = weak.upgrade() else { return };
                if let Err(err) = inner.unregister_account(account, session) {
                    warn!(%account, %err, "cannot unregister account");
                }
            },
        );
    }

    /// Best picture available right now for `address` as seen by `account`.
    ///
    /// Never fails. Cache misses of fetching sources queue a background job; the generated
    /// fallback uses `name_surrogate`, else the address itself.
    pub fn resolve(
        &self,
        account: &AccountId,
        address: &Address,
        name_surrogate: Option<&str>,
    ) -> Picture {
        self.inner.resolve(account, address, name_surrogate)
    }

    pub fn on_avatar_changed(&self) -> Signal<AvatarChanged> {
        self.inner.on_avatar_changed.clone()
    }

    /// Stop the fetch workers and forget every outstanding job.
    pub fn close(&self) {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .disconnect_all();
        self.inner.pool.close();
        self.inner.pending.clear();
    }

    pub fn is_registered(&self, account: &AccountId) -> bool {
        self.inner.accounts().contains_key(account)
    }

    /// Registered accounts, sorted.
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<_> = self.inner.accounts().keys().cloned().collect();
        accounts.sort();
        accounts
    }

    /// Number of `(account, address)` fetches queued or running.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_pending(&self, account: &AccountId, address: &Address) -> bool {
        self.inner
            .pending
            .contains(&FetchKey::new(account.clone(), address.clone()))
    }

    pub fn stats(&self) -> FetchStats {
        self.inner.pool.stats()
    }

    /// Entries held by the network cache of `account`.
    pub fn network_cached_len(&self, account: &AccountId) -> Option<usize> {
        self.inner
            .accounts()
            .get(account)
            .map(|sources| sources.network.cached_len())
    }

    pub fn avatar_font(&self) -> AvatarFont {
        self.inner.font()
    }

    pub fn opts(&self) -> &ManagerOpts {
        &self.inner.opts
    }
}

impl Drop for AvatarManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl ManagerInner {
    fn font(&self) -> AvatarFont {
        self.font
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn accounts(&self) -> RwLockReadGuard<'_, HashMap<AccountId, AccountSources>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn accounts_mut(&self) -> RwLockWriteGuard<'_, HashMap<AccountId, AccountSources>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn register_account(self: &Arc<Self>, account: AccountId, session: Session) -> AvatarResult<()> {
        if self.accounts().contains_key(&account) {
            return Err(AvatarError::AccountAlreadyRegistered(account.to_string()));
        }

        let size = self.opts.avatar_size;
        let network = Arc::new(NetworkAvatarSource::new(
            account.clone(),
            Arc::clone(&self.renderer),
            self.opts.network_cache_capacity,
            size,
        ));
        let directory = Arc::new(DirectoryNameSource::new(
            Arc::clone(&self.renderer),
            self.font(),
            size,
        ));
        let chain: Vec<Arc<dyn AvatarSource>> = vec![
            Arc::clone(&network) as Arc<dyn AvatarSource>,
            directory as Arc<dyn AvatarSource>,
        ];

        let mut subscriptions = Subscriptions::new();
        for source in &chain {
            source.prepare_session(&session);
            self.watch_source(&mut subscriptions, &account, source);
        }

        let mut accounts = self.accounts_mut();
        if accounts.contains_key(&account) {
            drop(accounts);
            for source in &chain {
                source.shutdown_session(&session);
            }
            return Err(AvatarError::AccountAlreadyRegistered(account.to_string()));
        }
        info!(%account, "account registered");
        accounts.insert(
            account,
            AccountSources {
                chain,
                network,
                subscriptions,
            },
        );
        Ok(())
    }

    fn unregister_account(&self, account: &AccountId, session: &Session) -> AvatarResult<()> {
        let removed = self.accounts_mut().remove(account);
        let Some(mut sources) = removed else {
            return Err(AvatarError::UnknownAccount(account.to_string()));
        };
        sources.subscriptions.disconnect_all();
        for source in &sources.chain {
            source.shutdown_session(session);
        }
        info!(%account, "account unregistered");
        Ok(())
    }

    fn watch_source(
        self: &Arc<Self>,
        subscriptions: &mut Subscriptions,
        account: &AccountId,
        source: &Arc<dyn AvatarSource>,
    ) {
        let inner: Weak<Self> = Arc::downgrade(self);
        let weak_source = Arc::downgrade(source);
        let account = account.clone();
        subscriptions.connect(&source.on_avatar_changed(), move |change: &SourceChange| {
            let (Some(inner), Some(source)) = (inner.upgrade(), weak_source.upgrade()) else {
                return;
            };
            inner.on_source_changed(&account, &source, change);
        });
    }

    fn on_source_changed(
        &self,
        account: &AccountId,
        source: &Arc<dyn AvatarSource>,
        change: &SourceChange,
    ) {
        match (change.kind, source.refresh_policy()) {
            // Completion of the fetch job emits on its own.
            (ChangeKind::Fetched, _) => {}
            (ChangeKind::Upstream, RefreshPolicy::Passive) => {
                self.on_avatar_changed.emit(&AvatarChanged {
                    account: account.clone(),
                    address: change.address.clone(),
                });
            }
            (ChangeKind::Upstream, RefreshPolicy::Fetch) => {
                if source.has_entry(&change.address) {
                    debug!(%account, address = %change.address, "upstream change, refetching");
                    self.fetch_in_background(account, source, &change.address);
                }
            }
        }
    }

    fn resolve(
        &self,
        account: &AccountId,
        address: &Address,
        name_surrogate: Option<&str>,
    ) -> Picture {
        let font = self.font();
        if let Some(sources) = self.accounts().get(account) {
            for source in &sources.chain {
                match source.get_cached(address, &font) {
                    Ok(CacheEntry::Picture(picture)) => return picture,
                    Ok(CacheEntry::Absent) => {}
                    Err(AvatarError::NotCached) => {
                        if source.refresh_policy() == RefreshPolicy::Fetch {
                            self.fetch_in_background(account, source, address);
                        }
                    }
                    Err(err) => debug!(%account, %address, %err, "avatar source lookup failed"),
                }
            }
        }

        let label = match name_surrogate {
            Some(name) => name.to_owned(),
            None => address.to_string(),
        };
        render_dummy_avatar(
            self.renderer.as_ref(),
            &font,
            &label,
            self.opts.avatar_size,
            None,
        )
    }

    /// Queue `source.fetch(address)` unless a job for the pair is already outstanding.
    fn fetch_in_background(
        &self,
        account: &AccountId,
        source: &Arc<dyn AvatarSource>,
        address: &Address,
    ) {
        let key = FetchKey::new(account.clone(), address.clone());
        let Some(guard) = self.pending.try_claim(key.clone()) else {
            return;
        };

        let source = Arc::clone(source);
        let changed = self.on_avatar_changed.clone();
        let timeout = self.opts.fetch_timeout();
        let job_key = key.clone();
        let run = async move {
            let result = tokio::time::timeout(timeout, source.fetch(&job_key.address)).await;
            drop(guard);
            match result {
                Err(_) => Err(AvatarError::FetchTimeout {
                    address: job_key.address,
                    after: timeout,
                }),
                Ok(Err(err)) => Err(err),
                Ok(Ok(entry)) => {
                    debug!(key = %job_key, absent = entry.is_absent(), "background fetch done");
                    changed.emit(&AvatarChanged {
                        account: job_key.account,
                        address: job_key.address,
                    });
                    Ok(())
                }
            }
        }
        .boxed();

        self.pool.submit(FetchJob { key, run });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/manager/mod.rs"]
mod tests;
