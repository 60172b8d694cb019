//! Cancellation for page render requests
//!
//! Rasterization is cooperative: a backend polls its token and stops early
//! once it trips. Tokens are tracked per destination surface so that issuing
//! a new render request always cancels the previous uncompleted one for the
//! same surface before starting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::surface::SurfaceId;

/// Cancellation token for cooperative render cancellation
///
/// All clones share the same underlying flag. Cancelling is idempotent.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token and every clone of it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether `cancel()` was called on this token or any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn shares_flag(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Active-render registry keyed by destination surface
///
/// Holds at most one live token per surface. `begin` enforces the
/// cancel-before-start invariant: whatever render was previously issued for
/// the surface is cancelled before the new token is handed out.
pub struct SurfaceRenders {
    active: Mutex<HashMap<SurfaceId, CancellationToken>>,
}

impl SurfaceRenders {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Start a render for `surface`, cancelling its predecessor
    ///
    /// Returns the fresh token the new render must poll.
    pub fn begin(&self, surface: SurfaceId) -> CancellationToken {
        let token = CancellationToken::new();
        let mut active = self.active.lock().unwrap();
        if let Some(previous) = active.insert(surface, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Mark the render owning `token` as finished
    ///
    /// A stale completion does not evict a newer token: the entry is removed
    /// only while it still belongs to the finishing render.
    pub fn finish(&self, surface: SurfaceId, token: &CancellationToken) {
        let mut active = self.active.lock().unwrap();
        if active.get(&surface).is_some_and(|live| live.shares_flag(token)) {
            active.remove(&surface);
        }
    }

    /// Cancel the render currently registered for `surface`, if any
    ///
    /// Returns `true` if a render was found.
    pub fn cancel(&self, surface: SurfaceId) -> bool {
        let mut active = self.active.lock().unwrap();
        if let Some(token) = active.remove(&surface) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Cancel every registered render; returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let mut active = self.active.lock().unwrap();
        let count = active.len();
        for token in active.values() {
            token.cancel();
        }
        active.clear();
        count
    }

    /// Number of renders currently in flight
    pub fn len(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    /// Check whether no render is in flight
    pub fn is_empty(&self) -> bool {
        self.active.lock().unwrap().is_empty()
    }
}

impl Default for SurfaceRenders {
    fn default() -> Self {
        Self::new()
    }
}
