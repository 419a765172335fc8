//! # Simulation Cache
//!
//! Fixed-size store for generated simulation images, one slot per
//! option × style × angle (12 slots). Every slot is independent: filling or
//! clearing one never touches another.
//!
//! ```text
//!            front   side-left   side-right
//! option1 ┌ realistic  [ ]      [ ]         [ ]
//!         └ 3d-mesh    [ ]      [ ]         [ ]
//! option2 ┌ realistic  [ ]      [ ]         [ ]
//!         └ 3d-mesh    [ ]      [ ]         [ ]
//! ```
//!
//! The cache carries an epoch that moves on every [`SimulationCache::reset`].
//! Callers capture it before an await and hand it back on completion, so a
//! result that lands after a new submission is discarded instead of being
//! written into the fresh cache.

use std::array;

use crate::model::SlotKey;

/// Contents of one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Absent,
    Pending,
    /// Encoded image bytes
    Ready(Vec<u8>),
}

impl SlotState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SlotState::Ready(_))
    }

    pub fn image(&self) -> Option<&[u8]> {
        match self {
            SlotState::Ready(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Indexed `[option][style][angle]`.
type Slots = [[[SlotState; 3]; 2]; 2];

/// In-memory simulation slots for one consultation.
#[derive(Debug)]
pub struct SimulationCache {
    slots: Slots,
    epoch: u64,
}

impl Default for SimulationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationCache {
    pub fn new() -> Self {
        Self {
            slots: array::from_fn(|_| array::from_fn(|_| array::from_fn(|_| SlotState::Absent))),
            epoch: 0,
        }
    }

    fn slot(&self, key: SlotKey) -> &SlotState {
        &self.slots[key.option.index()][key.style.index()][key.angle.index()]
    }

    fn slot_mut(&mut self, key: SlotKey) -> &mut SlotState {
        &mut self.slots[key.option.index()][key.style.index()][key.angle.index()]
    }

    pub fn get(&self, key: SlotKey) -> &SlotState {
        self.slot(key)
    }

    /// Current epoch; changes on every reset.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Mark a slot as awaiting a generation. Any previous image is dropped.
    pub fn mark_pending(&mut self, key: SlotKey) {
        *self.slot_mut(key) = SlotState::Pending;
    }

    /// Store a generated image if `epoch` is still current.
    ///
    /// Returns `false` when the result is stale and was dropped.
    pub fn fill(&mut self, key: SlotKey, epoch: u64, bytes: Vec<u8>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        *self.slot_mut(key) = SlotState::Ready(bytes);
        true
    }

    /// Revert a slot to absent after a failed generation, if `epoch` is current.
    pub fn clear(&mut self, key: SlotKey, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        *self.slot_mut(key) = SlotState::Absent;
        true
    }

    /// Drop every slot and start a new epoch.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut().flatten().flatten() {
            *slot = SlotState::Absent;
        }
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// The slot currently awaiting a generation, if any.
    pub fn pending(&self) -> Option<SlotKey> {
        SlotKey::all().find(|key| *self.slot(*key) == SlotState::Pending)
    }

    pub fn ready_count(&self) -> usize {
        self.iter().filter(|(_, state)| state.is_ready()).count()
    }

    /// Every slot with its key, option-major.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &SlotState)> + '_ {
        SlotKey::all().map(move |key| (key, self.slot(key)))
    }
}
