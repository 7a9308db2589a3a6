//! Build-session type cache
//!
//! Every synthesized type is produced through [`TypeCache::get_or_create`].
//! The first caller for a key claims it and runs the producer; concurrent
//! callers for the same key block on the slot's condition variable until
//! the entry completes or fails, the session is cancelled, or the wait
//! bound elapses. A completed entry is never rebound.
//!
//! A producer may finish with "no type created" (`None`); that outcome is
//! cached like any other so the zero-member check runs once per key.

use crate::error::{SynthesisError, SynthesisResult};
use crate::synth::{SynthKind, SynthesizedType};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache key: what is produced, and under which canonical name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Kind of type produced
    pub kind: SynthKind,
    /// Canonical name of the produced type
    pub name: String,
}

impl CacheKey {
    /// Create a key
    pub fn new(kind: SynthKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Outcome of a cache lookup
pub type CachedType = Option<Arc<SynthesizedType>>;

#[derive(Debug)]
enum SlotState {
    InProgress(ThreadId),
    Complete(CachedType),
    Failed(String),
}

#[derive(Debug)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn claimed() -> Self {
        Self {
            state: Mutex::new(SlotState::InProgress(thread::current().id())),
            ready: Condvar::new(),
        }
    }
}

/// Write-once map from [`CacheKey`] to synthesized types
#[derive(Debug)]
pub struct TypeCache {
    slots: DashMap<CacheKey, Arc<Slot>>,
    /// Completed types in completion order; dependencies precede dependents
    completed: Mutex<Vec<Arc<SynthesizedType>>>,
    cancelled: AtomicBool,
    wait_timeout: Duration,
}

impl TypeCache {
    /// Create an empty cache whose waits are bounded by `wait_timeout`
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            completed: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
            wait_timeout,
        }
    }

    /// Return the entry for `key`, running `produce` if nobody has claimed it
    ///
    /// Exactly one caller per key runs `produce`. Other callers wait for its
    /// outcome and never observe a partially built type. A producer error is
    /// returned to the producer as is and to waiters as
    /// [`SynthesisError::DependencyFailed`]; the key is released so a later
    /// request may try again.
    pub fn get_or_create<F>(&self, key: &CacheKey, produce: F) -> SynthesisResult<CachedType>
    where
        F: FnOnce() -> SynthesisResult<Option<SynthesizedType>>,
    {
        let (slot, claimed) = match self.slots.entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let slot = Arc::new(Slot::claimed());
                entry.insert(slot.clone());
                (slot, true)
            }
        };

        if !claimed {
            return self.wait(key, &slot);
        }

        debug!(key = %key, "claimed cache entry");
        let mut guard = ClaimGuard {
            cache: self,
            key,
            slot,
            armed: true,
        };
        match produce() {
            Ok(ty) => Ok(guard.complete(ty.map(Arc::new))),
            Err(err) => {
                guard.fail(err.to_string());
                Err(err)
            }
        }
    }

    /// Completed entry for `key`, without waiting
    pub fn get(&self, key: &CacheKey) -> Option<Arc<SynthesizedType>> {
        let slot = self.slots.get(key)?.clone();
        let state = slot.state.lock();
        match &*state {
            SlotState::Complete(ty) => ty.clone(),
            _ => None,
        }
    }

    /// Check if `key` is claimed, complete or in progress
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of completed types
    pub fn len(&self) -> usize {
        self.completed.lock().len()
    }

    /// Check if no type has completed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Completed types in completion order
    pub fn types(&self) -> Vec<Arc<SynthesizedType>> {
        self.completed.lock().clone()
    }

    /// Release every waiter with [`SynthesisError::Cancelled`]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let slots: Vec<Arc<Slot>> = self.slots.iter().map(|entry| entry.value().clone()).collect();
        for slot in slots {
            // Notify under the lock so a waiter between its flag check and
            // its wait cannot miss the wakeup
            let _state = slot.state.lock();
            slot.ready.notify_all();
        }
        debug!("type cache cancelled");
    }

    /// Check if [`cancel`](Self::cancel) was called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Bound on waits for in-progress entries
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    // ===== Internals =====

    fn wait(&self, key: &CacheKey, slot: &Slot) -> SynthesisResult<CachedType> {
        let started = Instant::now();
        let deadline = started + self.wait_timeout;
        let mut state = slot.state.lock();
        loop {
            match &*state {
                SlotState::Complete(ty) => {
                    debug!(key = %key, "cache hit");
                    return Ok(ty.clone());
                }
                SlotState::Failed(reason) => {
                    return Err(SynthesisError::DependencyFailed {
                        name: key.to_string(),
                        reason: reason.clone(),
                    });
                }
                SlotState::InProgress(owner) if *owner == thread::current().id() => {
                    return Err(SynthesisError::DependencyFailed {
                        name: key.to_string(),
                        reason: "re-entered while its synthesis is in progress".to_string(),
                    });
                }
                SlotState::InProgress(_) => {}
            }

            if self.is_cancelled() {
                return Err(SynthesisError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SynthesisError::WaitTimeout {
                    name: key.to_string(),
                    waited: now - started,
                });
            }
            debug!(key = %key, "waiting for in-progress entry");
            slot.ready.wait_for(&mut state, deadline - now);
        }
    }

    fn publish(&self, key: &CacheKey, slot: &Slot, ty: CachedType) {
        if let Some(ty) = &ty {
            self.completed.lock().push(ty.clone());
        }
        let mut state = slot.state.lock();
        *state = SlotState::Complete(ty);
        slot.ready.notify_all();
        debug!(key = %key, "completed cache entry");
    }

    fn release(&self, key: &CacheKey, slot: &Arc<Slot>, reason: String) {
        self.slots.remove_if(key, |_, current| Arc::ptr_eq(current, slot));
        let mut state = slot.state.lock();
        *state = SlotState::Failed(reason);
        slot.ready.notify_all();
        debug!(key = %key, "released failed cache entry");
    }
}

/// Fails the claimed slot if the producer unwinds without finishing
struct ClaimGuard<'a> {
    cache: &'a TypeCache,
    key: &'a CacheKey,
    slot: Arc<Slot>,
    armed: bool,
}

impl ClaimGuard<'_> {
    fn complete(&mut self, ty: CachedType) -> CachedType {
        self.armed = false;
        self.cache.publish(self.key, &self.slot, ty.clone());
        ty
    }

    fn fail(&mut self, reason: String) {
        self.armed = false;
        self.cache.release(self.key, &self.slot, reason);
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache
                .release(self.key, &self.slot, "producer did not finish".to_string());
        }
    }
}
