use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    foundation::{
        core::Address,
        error::{DescriptorError, ProtocolError},
        signal::Signal,
    },
    session::{AvatarDescriptor, AvatarService, RosterEntry, RosterService},
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Descriptor answering with fixed bytes or a fixed error.
#[derive(Clone, Debug)]
pub struct MemoryDescriptor {
    result: Result<Vec<u8>, DescriptorError>,
}

impl MemoryDescriptor {
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self { result: Ok(bytes) }
    }

    pub fn failing(err: DescriptorError) -> Self {
        Self { result: Err(err) }
    }
}

#[async_trait]
impl AvatarDescriptor for MemoryDescriptor {
    async fn get_image_bytes(&self) -> Result<Vec<u8>, DescriptorError> {
        self.result.clone()
    }
}

#[derive(Default)]
struct ServiceState {
    published: HashMap<Address, Vec<MemoryDescriptor>>,
    failures: HashMap<Address, ProtocolError>,
    latency: Duration,
}

/// In-process [`AvatarService`] with configurable latency and failures.
///
/// Counts metadata queries so callers can observe how often a peer was fetched.
#[derive(Default)]
pub struct MemoryAvatarService {
    state: Mutex<ServiceState>,
    queries: AtomicUsize,
    on_metadata_changed: Signal<Address>,
}

impl MemoryAvatarService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every metadata query by `latency` (tokio time).
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.state).latency = latency;
    }

    /// Replace the descriptors of `address` without notifying.
    pub fn set_descriptors(&self, address: Address, descriptors: Vec<MemoryDescriptor>) {
        lock(&self.state).published.insert(address, descriptors);
    }

    /// Replace the descriptors of `address` and emit a metadata-changed event.
    pub fn publish(&self, address: Address, descriptors: Vec<MemoryDescriptor>) {
        self.set_descriptors(address.clone(), descriptors);
        self.on_metadata_changed.emit(&address);
    }

    /// Make metadata queries for `address` fail with `err`.
    pub fn fail_metadata(&self, address: Address, err: ProtocolError) {
        lock(&self.state).failures.insert(address, err);
    }

    /// Number of metadata queries answered or started so far.
    pub fn metadata_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvatarService for MemoryAvatarService {
    fn on_metadata_changed(&self) -> Signal<Address> {
        self.on_metadata_changed.clone()
    }

    async fn get_avatar_metadata(
        &self,
        address: &Address,
    ) -> Result<Vec<Arc<dyn AvatarDescriptor>>, ProtocolError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let latency = lock(&self.state).latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let state = lock(&self.state);
        if let Some(err) = state.failures.get(address) {
            return Err(err.clone());
        }
        Ok(state
            .published
            .get(address)
            .map(|ds| {
                ds.iter()
                    .cloned()
                    .map(|d| Arc::new(d) as Arc<dyn AvatarDescriptor>)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-process [`RosterService`].
#[derive(Default)]
pub struct MemoryRoster {
    entries: Mutex<HashMap<Address, RosterEntry>>,
    on_entry_added: Signal<RosterEntry>,
    on_entry_name_changed: Signal<RosterEntry>,
    on_entry_removed: Signal<RosterEntry>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, address: Address, name: Option<&str>) {
        let entry = RosterEntry {
            address: address.clone(),
            name: name.map(str::to_owned),
        };
        lock(&self.entries).insert(address, entry.clone());
        self.on_entry_added.emit(&entry);
    }

    /// Change the display name. Unknown addresses are ignored.
    pub fn rename(&self, address: &Address, name: Option<&str>) {
        let entry = {
            let mut entries = lock(&self.entries);
            let Some(entry) = entries.get_mut(address) else {
                return;
            };
            entry.name = name.map(str::to_owned);
            entry.clone()
        };
        self.on_entry_name_changed.emit(&entry);
    }

    pub fn remove(&self, address: &Address) {
        let removed = lock(&self.entries).remove(address);
        if let Some(entry) = removed {
            self.on_entry_removed.emit(&entry);
        }
    }
}

impl RosterService for MemoryRoster {
    fn entry(&self, address: &Address) -> Option<RosterEntry> {
        lock(&self.entries).get(address).cloned()
    }

    fn on_entry_added(&self) -> Signal<RosterEntry> {
        self.on_entry_added.clone()
    }

    fn on_entry_name_changed(&self) -> Signal<RosterEntry> {
        self.on_entry_name_changed.clone()
    }

    fn on_entry_removed(&self) -> Signal<RosterEntry> {
        self.on_entry_removed.clone()
    }
}
