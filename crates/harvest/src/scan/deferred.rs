use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::catalog::RefId;
use crate::sync::lock_or_recover;

/// Time a corpse needs before its contents can be trusted.
pub const DEAD_BODY_COOLDOWN: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
struct DeferredState {
    queue: VecDeque<(RefId, Instant)>,
    queued: HashSet<RefId>,
    released: HashSet<RefId>,
    looted_dynamic: HashSet<RefId>,
}

/// FIFO of freshly dead actors plus the record of dynamic containers already emptied.
/// Static containers are tracked by the session block in the state store instead.
#[derive(Debug)]
pub struct DeferredQueue {
    cooldown: Duration,
    inner: Mutex<DeferredState>,
}

impl Default for DeferredQueue {
    fn default() -> Self {
        Self::new(DEAD_BODY_COOLDOWN)
    }
}

impl DeferredQueue {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            inner: Mutex::new(DeferredState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DeferredState> {
        lock_or_recover(&self.inner, "deferred_queue")
    }

    /// Enqueues a newly seen corpse. False if it is already queued or was released.
    pub fn register(&self, actor: RefId, now: Instant) -> bool {
        let mut state = self.state();
        if state.queued.contains(&actor) || state.released.contains(&actor) {
            return false;
        }
        state.queued.insert(actor);
        state.queue.push_back((actor, now));
        debug!(actor = %actor, "dead_body_deferred");
        true
    }

    /// Pops, in insertion order, every entry whose cooldown has fully elapsed.
    pub fn drain_ready(&self, now: Instant) -> Vec<RefId> {
        let mut state = self.state();
        let mut ready = Vec::new();
        while let Some((actor, registered)) = state.queue.front().copied() {
            if now.saturating_duration_since(registered) < self.cooldown {
                break;
            }
            state.queue.pop_front();
            state.queued.remove(&actor);
            state.released.insert(actor);
            ready.push(actor);
        }
        ready
    }

    pub fn is_released(&self, actor: RefId) -> bool {
        self.state().released.contains(&actor)
    }

    pub fn queued_len(&self) -> usize {
        self.state().queue.len()
    }

    /// Only dynamic containers are recorded; the store never blocks them.
    pub fn mark_looted(&self, container: RefId) -> bool {
        container.is_dynamic() && self.state().looted_dynamic.insert(container)
    }

    pub fn is_looted(&self, container: RefId) -> bool {
        self.state().looted_dynamic.contains(&container)
    }

    /// Dynamic ids get reused, so every reset forgets them. A world reload also drops the
    /// queue and every released corpse.
    pub fn reset(&self, world_reload: bool) {
        let mut state = self.state();
        state.looted_dynamic.clear();
        if world_reload {
            state.queue.clear();
            state.queued.clear();
            state.released.clear();
        } else {
            state.released.retain(|actor| !actor.is_dynamic());
        }
    }
}
