use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::catalog::{FormId, Position, RefId};
use crate::sync::lock_or_recover;

use super::reason::LootabilityReason;

/// Feet per world unit.
pub const DISTANCE_UNIT_IN_FEET: f32 = 0.046875;
/// Per-axis movement between two scans above which ammo counts as still flying.
pub const ARROW_IN_FLIGHT_UNITS: f32 = 5.0 / DISTANCE_UNIT_IN_FEET;

/// Registry key. Instances and definitions share the registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    Reference(RefId),
    Form(FormId),
}

impl Identity {
    pub fn is_dynamic(self) -> bool {
        match self {
            Identity::Reference(id) => id.is_dynamic(),
            Identity::Form(id) => id.is_dynamic(),
        }
    }
}

impl From<RefId> for Identity {
    fn from(id: RefId) -> Self {
        Identity::Reference(id)
    }
}

impl From<FormId> for Identity {
    fn from(id: FormId) -> Self {
        Identity::Form(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowCheck {
    /// Seen at rest on two consecutive scans.
    Settled,
    /// First sighting, or moved more than the flight threshold since the last one.
    InFlight,
    /// Reported at the world origin, which only happens for broken references.
    CorruptPosition,
}

#[derive(Debug, Default)]
struct StoreState {
    session: HashMap<Identity, LootabilityReason>,
    permanent: HashMap<Identity, LootabilityReason>,
    blacklist: HashSet<Identity>,
    /// Resource nodes that may be exploited once per full session.
    reloot_markers: HashSet<RefId>,
    off_limits: HashSet<Identity>,
    quest_targets: HashSet<FormId>,
    arrow_positions: HashMap<RefId, Position>,
    pending_actions: HashMap<RefId, Instant>,
    glow_expiry: HashMap<RefId, Instant>,
}

impl StoreState {
    fn block(&mut self, identity: Identity, reason: LootabilityReason) -> bool {
        if identity.is_dynamic() {
            return false;
        }
        match self.session.entry(identity) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(reason);
                true
            }
        }
    }

    fn reset_session(&mut self, preserve_special_cases: bool) {
        self.arrow_positions.clear();
        self.pending_actions.clear();
        self.glow_expiry.clear();
        if !preserve_special_cases {
            self.blacklist.clear();
            self.reloot_markers.clear();
        }
        self.session = self.permanent.clone();
        for marker in &self.reloot_markers {
            self.session
                .entry(Identity::Reference(*marker))
                .or_insert(LootabilityReason::CannotRelootFirehoseSource);
        }
        for container in &self.off_limits {
            self.session
                .entry(*container)
                .or_insert(LootabilityReason::ContainerPermanentlyOffLimits);
        }
    }
}

/// Exclusion registries with session, permanent and blacklist lifetimes, plus the per-visit
/// scan bookkeeping that is discarded with them. Every operation takes the one lock once.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: Mutex<StoreState>,
}

impl StateStore {
    /// `off_limits` is computed once at load and re-blocked by every reset.
    pub fn new(off_limits: HashSet<Identity>, quest_targets: HashSet<FormId>) -> Self {
        let mut state = StoreState {
            off_limits: off_limits
                .into_iter()
                .filter(|identity| !identity.is_dynamic())
                .collect(),
            quest_targets,
            ..StoreState::default()
        };
        state.reset_session(false);
        info!(
            off_limits = state.off_limits.len(),
            quest_targets = state.quest_targets.len(),
            "state_store_initialized"
        );
        Self {
            inner: Mutex::new(state),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        lock_or_recover(&self.inner, "state_store")
    }

    /// Session-blocks `identity`. False for dynamic identities or an existing entry.
    pub fn block(&self, identity: impl Into<Identity>, reason: LootabilityReason) -> bool {
        self.state().block(identity.into(), reason)
    }

    pub fn is_blocked(&self, identity: impl Into<Identity>) -> LootabilityReason {
        let identity = identity.into();
        if identity.is_dynamic() {
            return LootabilityReason::Lootable;
        }
        self.state()
            .session
            .get(&identity)
            .copied()
            .unwrap_or(LootabilityReason::Lootable)
    }

    /// Writes both the session and permanent registries. Returns whether the permanent
    /// entry is new.
    pub fn block_permanently(&self, identity: impl Into<Identity>, reason: LootabilityReason) -> bool {
        let identity = identity.into();
        if identity.is_dynamic() {
            return false;
        }
        let mut state = self.state();
        state.block(identity, reason);
        match state.permanent.entry(identity) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(reason);
                true
            }
        }
    }

    /// Drops a permanent entry and its session copy.
    pub fn unblock_permanently(&self, identity: impl Into<Identity>) -> bool {
        let identity = identity.into();
        let mut state = self.state();
        let removed = state.permanent.remove(&identity);
        if let Some(reason) = removed {
            if state.session.get(&identity) == Some(&reason) {
                state.session.remove(&identity);
            }
        }
        removed.is_some()
    }

    pub fn blacklist(&self, identity: impl Into<Identity>) -> bool {
        let identity = identity.into();
        if identity.is_dynamic() {
            return false;
        }
        self.state().blacklist.insert(identity)
    }

    pub fn is_blacklisted(&self, identity: impl Into<Identity>) -> bool {
        let identity = identity.into();
        if identity.is_dynamic() {
            return false;
        }
        self.state().blacklist.contains(&identity)
    }

    pub fn quest_target_lootability(&self, form: Option<FormId>) -> LootabilityReason {
        let Some(form) = form else {
            return LootabilityReason::NoBaseObject;
        };
        if form.is_dynamic() {
            return LootabilityReason::Lootable;
        }
        if self.state().quest_targets.contains(&form) {
            LootabilityReason::CannotLootQuestTarget
        } else {
            LootabilityReason::Lootable
        }
    }

    /// Marks a resource node as exploited for the rest of the session. Survives
    /// `reset_session(true)`.
    pub fn block_firehose_source(&self, reference: RefId) -> bool {
        if reference.is_dynamic() {
            return false;
        }
        let mut state = self.state();
        state.block(
            Identity::Reference(reference),
            LootabilityReason::CannotRelootFirehoseSource,
        );
        state.reloot_markers.insert(reference)
    }

    /// Compares against the position recorded on the previous scan. A reference at rest is
    /// forgotten so the next sighting starts over.
    pub fn check_arrow(&self, reference: RefId, position: Position) -> ArrowCheck {
        let mut state = self.state();
        if position.is_origin() {
            state.block(
                Identity::Reference(reference),
                LootabilityReason::CorruptArrowPosition,
            );
            return ArrowCheck::CorruptPosition;
        }
        let Some(previous) = state.arrow_positions.get(&reference).copied() else {
            state.arrow_positions.insert(reference, position);
            return ArrowCheck::InFlight;
        };
        let moved = (position.x - previous.x).abs() > ARROW_IN_FLIGHT_UNITS
            || (position.y - previous.y).abs() > ARROW_IN_FLIGHT_UNITS
            || (position.z - previous.z).abs() > ARROW_IN_FLIGHT_UNITS;
        if moved {
            state.arrow_positions.insert(reference, position);
            ArrowCheck::InFlight
        } else {
            state.arrow_positions.remove(&reference);
            ArrowCheck::Settled
        }
    }

    /// Locks `reference` for one outbound action and session-blocks it in the same critical
    /// section. False when an action is already pending.
    pub fn claim_for_action(&self, reference: RefId, now: Instant) -> bool {
        let mut state = self.state();
        if state.pending_actions.contains_key(&reference) {
            return false;
        }
        state.pending_actions.insert(reference, now);
        state.block(
            Identity::Reference(reference),
            LootabilityReason::AlreadyProcessedThisVisit,
        );
        true
    }

    pub fn is_pending(&self, reference: RefId) -> bool {
        self.state().pending_actions.contains_key(&reference)
    }

    /// Acknowledgement from the action collaborator.
    pub fn complete(&self, reference: RefId) -> bool {
        self.state().pending_actions.remove(&reference).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending_actions.len()
    }

    /// Releases locks never acknowledged within `timeout`. Returns how many were dropped.
    pub fn expire_pending(&self, now: Instant, timeout: Duration) -> usize {
        let mut state = self.state();
        let before = state.pending_actions.len();
        state
            .pending_actions
            .retain(|_, claimed| now.saturating_duration_since(*claimed) < timeout);
        let expired = before - state.pending_actions.len();
        if expired > 0 {
            debug!(expired, "pending_actions_expired");
        }
        expired
    }

    /// True if `reference` may glow now, in which case its glow is recorded until
    /// `now + duration`.
    pub fn try_glow(&self, reference: RefId, now: Instant, duration: Duration) -> bool {
        let mut state = self.state();
        if state
            .glow_expiry
            .get(&reference)
            .is_some_and(|expiry| *expiry > now)
        {
            return false;
        }
        state.glow_expiry.insert(reference, now + duration);
        true
    }

    /// Clears the session registry and reseeds it from the permanent registry and the
    /// off-limits containers. A full reset (`false`) also forgets the blacklist and the
    /// resource-node markers.
    pub fn reset_session(&self, preserve_special_cases: bool) {
        let mut state = self.state();
        state.reset_session(preserve_special_cases);
        info!(
            preserve_special_cases,
            session = state.session.len(),
            permanent = state.permanent.len(),
            markers = state.reloot_markers.len(),
            "lootability_reset"
        );
    }

    pub fn session_len(&self) -> usize {
        self.state().session.len()
    }
}
