use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::HotmapConfig;
use crate::entry::Slot;
use crate::error::Error;
use crate::watcher;

/// TTLs are capped to ~100 years so the deadline never overflows `Instant`.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Internal shared state for the hotmap
pub(crate) struct HotmapInner {
    slots: DashMap<String, Slot>,
    /// Gate between mutators (shared side) and `close` (exclusive side)
    closed: RwLock<bool>,
    default_ttl: RwLock<Duration>,
    next_generation: AtomicU64,
    runtime: Handle,
}

impl HotmapInner {
    /// Removes `key` if it is still the slot created by `generation`.
    ///
    /// Called by a watcher whose deadline elapsed. A no-op when the entry was
    /// consumed, deleted, replaced or flushed in the meantime.
    pub(crate) fn expire(&self, key: &str, generation: u64) {
        let closed = self.closed.read();
        if *closed {
            return;
        }

        // The removed slot holds the sender of the calling watcher, so it is
        // simply dropped instead of signalled.
        if self
            .slots
            .remove_if(key, |_, slot| slot.generation() == generation)
            .is_some()
        {
            tracing::debug!(key = %key, generation, "entry expired");
        }
    }

    fn close(&self) {
        let mut closed = self.closed.write();
        if *closed {
            return;
        }
        *closed = true;

        let keys: Vec<String> = self.slots.iter().map(|slot| slot.key().clone()).collect();
        let mut flushed = 0usize;
        for key in keys {
            if let Some((_, slot)) = self.slots.remove(&key) {
                slot.cancel();
                flushed += 1;
            }
        }

        tracing::debug!(flushed, "hotmap closed");
    }
}

impl Drop for HotmapInner {
    fn drop(&mut self) {
        // Stop every outstanding watcher when the last handle goes away
        self.close();
    }
}

/// Thread-safe in-memory key/value store with single-use reads and per-entry expiration
///
/// Every `set` starts a watcher task on the Tokio runtime that removes the
/// entry once its TTL elapses. A `get` consumes the entry: it returns the
/// value, stops the watcher and deletes the key, so each stored value is
/// handed out at most once.
///
/// Entries live in a `DashMap`, so operations on different keys rarely
/// contend. Each key's value and watcher handle are stored together and only
/// change under that key's exclusive shard lock.
///
/// Cloning a `Hotmap` is cheap and every clone shares the same entries.
///
/// # Example
///
/// ```rust,no_run
/// use hotmap_core::Hotmap;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let hotmap = Hotmap::new();
///     hotmap.set_duration(Duration::from_secs(5));
///
///     hotmap.set("token", "s3cr3t");
///     assert_eq!(hotmap.get("token"), Some("s3cr3t".to_string()));
///     // Second read: already consumed
///     assert_eq!(hotmap.get("token"), None);
///
///     hotmap.close();
/// }
/// ```
#[derive(Clone)]
pub struct Hotmap {
    inner: Arc<HotmapInner>,
}

impl Hotmap {
    /// Creates a new hotmap with the default TTL of 30 seconds
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. Use
    /// [`Hotmap::try_with_config`] or [`Hotmap::with_handle`] to avoid this.
    pub fn new() -> Self {
        Self::with_config(HotmapConfig::default())
    }

    /// Creates a new hotmap with custom configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn with_config(config: HotmapConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(hotmap) => hotmap,
            Err(err) => panic!(
                "{err}. Create the hotmap from within a #[tokio::main] or \
                 #[tokio::test] context, or pass a runtime handle to Hotmap::with_handle()."
            ),
        }
    }

    /// Creates a new hotmap bound to the current Tokio runtime
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`] when there is no runtime in context.
    pub fn try_with_config(config: HotmapConfig) -> Result<Self, Error> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_handle(config, runtime))
    }

    /// Creates a new hotmap whose watchers run on the given runtime
    ///
    /// The returned hotmap may be used from any thread, inside or outside
    /// the runtime.
    pub fn with_handle(config: HotmapConfig, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(HotmapInner {
                slots: DashMap::new(),
                closed: RwLock::new(false),
                default_ttl: RwLock::new(config.default_ttl),
                next_generation: AtomicU64::new(0),
                runtime,
            }),
        }
    }

    /// Stores `value` under `key` using the current default TTL
    ///
    /// An existing entry for `key` is replaced and its watcher stopped, so the
    /// TTL clock starts over. Does nothing once the hotmap is closed.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let ttl = self.duration();
        self.set_with_ttl(key, value, ttl);
    }

    /// Stores `value` under `key` with an explicit TTL
    ///
    /// The default TTL is left untouched.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        let key = key.into();
        let value = value.into();

        let closed = self.inner.closed.read();
        if *closed {
            tracing::warn!(key = %key, "set on a closed hotmap ignored");
            return;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + ttl.min(MAX_TTL);

        match self.inner.slots.entry(key) {
            Entry::Occupied(mut occupied) => {
                let stop = self.spawn_watcher(occupied.key().clone(), generation, deadline);
                let previous = occupied.insert(Slot::new(value, generation, stop));
                // Still under the shard lock: the old watcher can no longer match.
                previous.cancel();
                tracing::debug!(key = %occupied.key(), generation, ?ttl, "entry replaced");
            }
            Entry::Vacant(vacant) => {
                let stop = self.spawn_watcher(vacant.key().clone(), generation, deadline);
                tracing::debug!(key = %vacant.key(), generation, ?ttl, "entry set");
                vacant.insert(Slot::new(value, generation, stop));
            }
        }
    }

    fn spawn_watcher(&self, key: String, generation: u64, deadline: Instant) -> oneshot::Sender<()> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let target = Arc::downgrade(&self.inner);
        self.inner
            .runtime
            .spawn(watcher::watch(target, key, generation, deadline, stop_rx));
        stop_tx
    }

    /// Consumes the entry stored under `key`
    ///
    /// Returns the value and removes the entry, or `None` if the key is
    /// absent, expired, already consumed or the hotmap is closed.
    pub fn get(&self, key: &str) -> Option<String> {
        let closed = self.inner.closed.read();
        if *closed {
            return None;
        }

        let (_, slot) = self.inner.slots.remove(key)?;
        tracing::debug!(key = %key, generation = slot.generation(), "entry consumed");
        Some(slot.consume())
    }

    /// Removes the entry stored under `key`, if any
    ///
    /// Idempotent: deleting an absent or already expired key is a no-op.
    pub fn delete(&self, key: &str) {
        let closed = self.inner.closed.read();
        if *closed {
            return;
        }

        if let Some((_, slot)) = self.inner.slots.remove(key) {
            tracing::debug!(key = %key, generation = slot.generation(), "entry deleted");
            slot.cancel();
        }
    }

    /// Returns the number of live entries
    ///
    /// Under concurrent use this is only a snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    /// Returns `true` if the hotmap holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Replaces the default TTL used by future `set` calls
    ///
    /// Entries already stored keep their deadline. A zero duration makes new
    /// entries expire almost immediately unless they are read first.
    pub fn set_duration(&self, ttl: Duration) {
        *self.inner.default_ttl.write() = ttl;
    }

    /// Returns the default TTL used by `set`
    pub fn duration(&self) -> Duration {
        *self.inner.default_ttl.read()
    }

    /// Stops every watcher and removes every entry
    ///
    /// Does not wait for the watchers to finish; each one observes its stop
    /// signal and exits without touching the hotmap. Afterwards `set`,
    /// `get` and `delete` are no-ops. Calling `close` again has no effect.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Returns `true` once [`Hotmap::close`] has been called
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.read()
    }
}

impl Default for Hotmap {
    fn default() -> Self {
        Self::new()
    }
}
