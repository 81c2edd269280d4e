// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hysteresis over per-tick verdicts.
//!
//! Converts noisy wall/not-wall verdicts into stable show/hide + opacity
//! output for the renderer. A surface that was visible and is not
//! reprocessed this tick (all samples off-screen, or skipped by the
//! per-tick budget without reconfirmation) keeps its state for exactly
//! one tick of grace; a second consecutive miss evicts the record,
//! defaulting back to hidden.

use crate::classifier::ClassificationVerdict;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use wallsense_core::SurfaceId;

/// Renderer-facing visibility decision for one surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityRecord {
    pub surface_id: SurfaceId,
    pub visible: bool,
    /// Meaningful only while `visible` is true.
    pub opacity: f32,
}

#[derive(Debug, Clone)]
struct SurfaceVisibility {
    visible: bool,
    opacity: f32,
    /// Consecutive ticks without a fresh verdict or reconfirmation.
    missed_ticks: u32,
    /// Touched this tick; cleared by `finish_tick`.
    touched: bool,
    last_verdict: ClassificationVerdict,
}

/// Per-surface visibility records with one-tick grace hysteresis.
#[derive(Debug)]
pub struct VisibilityStateMachine {
    base_opacity: f32,
    states: FxHashMap<SurfaceId, SurfaceVisibility>,
}

impl VisibilityStateMachine {
    pub fn new(base_opacity: f32) -> Self {
        Self {
            base_opacity,
            states: FxHashMap::default(),
        }
    }

    /// Fold this tick's verdict for a surface into its record.
    ///
    /// Visible exactly when the verdict says wall; opacity rises with
    /// confidence above the configured floor.
    pub fn apply_verdict(&mut self, verdict: &ClassificationVerdict) {
        let opacity = if verdict.is_wall {
            self.base_opacity + verdict.confidence * (1.0 - self.base_opacity)
        } else {
            0.0
        };
        self.states.insert(
            verdict.surface_id,
            SurfaceVisibility {
                visible: verdict.is_wall,
                opacity,
                missed_ticks: 0,
                touched: true,
                last_verdict: *verdict,
            },
        );
    }

    /// Cheap reconfirmation for a budget-skipped surface: keeps the prior
    /// decision alive without resampling. Returns `false` for unknown ids.
    pub fn reconfirm(&mut self, id: SurfaceId) -> bool {
        match self.states.get_mut(&id) {
            Some(state) => {
                state.missed_ticks = 0;
                state.touched = true;
                true
            }
            None => false,
        }
    }

    /// Immediate eviction when a surface leaves the registry.
    pub fn remove(&mut self, id: SurfaceId) {
        self.states.remove(&id);
    }

    /// Close out the tick: untouched records accrue a miss, and a second
    /// consecutive miss evicts the record.
    pub fn finish_tick(&mut self) {
        self.states.retain(|id, state| {
            if state.touched {
                state.touched = false;
                return true;
            }
            state.missed_ticks += 1;
            if state.missed_ticks >= 2 {
                tracing::debug!(id = %id, "evicted visibility record after missed grace tick");
                return false;
            }
            true
        });
    }

    /// Current record for one surface, if any.
    pub fn record(&self, id: SurfaceId) -> Option<VisibilityRecord> {
        self.states.get(&id).map(|state| VisibilityRecord {
            surface_id: id,
            visible: state.visible,
            opacity: state.opacity,
        })
    }

    /// Whether a surface currently shows as a wall.
    pub fn is_visible(&self, id: SurfaceId) -> bool {
        self.states.get(&id).map_or(false, |s| s.visible)
    }

    /// Previous verdict retained for hysteresis, if the surface has one.
    pub fn last_verdict(&self, id: SurfaceId) -> Option<&ClassificationVerdict> {
        self.states.get(&id).map(|s| &s.last_verdict)
    }

    /// All current records, one per known surface.
    pub fn records(&self) -> impl Iterator<Item = VisibilityRecord> + '_ {
        self.states.iter().map(|(id, state)| VisibilityRecord {
            surface_id: *id,
            visible: state.visible,
            opacity: state.opacity,
        })
    }

    /// Number of surfaces currently visible as walls.
    pub fn visible_count(&self) -> usize {
        self.states.values().filter(|s| s.visible).count()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
