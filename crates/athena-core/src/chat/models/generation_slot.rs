use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct ActiveGeneration {
    id: u64,
    cancel_token: CancellationToken,
}

/// Single-slot admission for model requests.
///
/// At most one generation holds the slot. `cancel` both signals the running
/// generation and frees the slot right away, so a follow-up request does not
/// wait for the cancelled one to unwind.
#[derive(Default)]
pub struct GenerationSlot {
    active: Arc<Mutex<Option<ActiveGeneration>>>,
    next_id: AtomicU64,
}

/// Proof of holding the slot; releases it on drop.
pub struct GenerationGuard {
    id: u64,
    cancel_token: CancellationToken,
    active: Arc<Mutex<Option<ActiveGeneration>>>,
}

impl GenerationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or `None` if another generation is running
    pub fn try_begin(&self) -> Option<GenerationGuard> {
        let mut active = self.active.lock();
        if active.is_some() {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel_token = CancellationToken::new();
        *active = Some(ActiveGeneration {
            id,
            cancel_token: cancel_token.clone(),
        });

        Some(GenerationGuard {
            id,
            cancel_token,
            active: self.active.clone(),
        })
    }

    /// Cancel the running generation, if any. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        match self.active.lock().take() {
            Some(generation) => {
                generation.cancel_token.cancel();
                debug!(generation_id = generation.id, "Cancelled in-flight generation");
                true
            }
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for GenerationSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl GenerationGuard {
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        // A cancelled guard may outlive its slot entry; never clear a newer one.
        if active.as_ref().is_some_and(|generation| generation.id == self.id) {
            *active = None;
        }
    }
}
