// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single source of truth for the live set of tracked surfaces.
//!
//! The registry is mutated only through the three delta entry points
//! (`apply_added` / `apply_updated` / `apply_removed`) plus the per-tick
//! stopped-surface eviction; classification and visibility stages only
//! read.

use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use wallsense_core::{Surface, SurfaceDelta, SurfaceId, TrackingState};

/// Live surfaces keyed by their stable tracking id.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: FxHashMap<SurfaceId, Surface>,
    /// Ticks each surface has been observed in `Stopped` state.
    stopped_ticks: FxHashMap<SurfaceId, u32>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly tracked surface.
    ///
    /// A duplicate id indicates a tracking-subsystem contract violation
    /// and is surfaced as an error rather than silently overwriting.
    pub fn apply_added(&mut self, surface: Surface) -> Result<()> {
        use std::collections::hash_map::Entry;
        match self.surfaces.entry(surface.id) {
            Entry::Occupied(_) => Err(Error::DuplicateSurface(surface.id)),
            Entry::Vacant(entry) => {
                entry.insert(surface);
                Ok(())
            }
        }
    }

    /// Replace the geometric state of an existing surface.
    ///
    /// An unknown id is tolerated as an implicit add; tracking updates
    /// can outrun their add event across the delivery boundary.
    pub fn apply_updated(&mut self, surface: Surface) {
        if !self.surfaces.contains_key(&surface.id) {
            tracing::debug!(id = %surface.id, "update for unknown surface, treating as add");
        }
        self.stopped_ticks.remove(&surface.id);
        self.surfaces.insert(surface.id, surface);
    }

    /// Remove a surface. Returns `true` when a surface actually left so
    /// the caller can evict its downstream verdict/visibility state.
    pub fn apply_removed(&mut self, id: SurfaceId) -> bool {
        self.stopped_ticks.remove(&id);
        self.surfaces.remove(&id).is_some()
    }

    /// Apply one batch of tracking deltas in added/updated/removed order.
    pub fn apply_delta(&mut self, delta: SurfaceDelta) -> Result<Vec<SurfaceId>> {
        for surface in delta.added {
            self.apply_added(surface)?;
        }
        for surface in delta.updated {
            self.apply_updated(surface);
        }
        let mut removed = Vec::with_capacity(delta.removed.len());
        for id in delta.removed {
            if self.apply_removed(id) {
                removed.push(id);
            }
        }
        Ok(removed)
    }

    /// Drop surfaces that have sat in `Stopped` for longer than one full
    /// update cycle. Run once per tick; returns the evicted ids.
    pub fn evict_stopped(&mut self) -> Vec<SurfaceId> {
        let stopped: Vec<SurfaceId> = self
            .surfaces
            .values()
            .filter(|s| s.tracking_state == TrackingState::Stopped)
            .map(|s| s.id)
            .collect();

        let mut evicted = Vec::new();
        for id in stopped {
            let ticks = self.stopped_ticks.entry(id).or_insert(0);
            *ticks += 1;
            if *ticks > 1 {
                self.surfaces.remove(&id);
                self.stopped_ticks.remove(&id);
                tracing::debug!(id = %id, "evicted surface stopped for more than one cycle");
                evicted.push(id);
            }
        }
        evicted
    }

    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Restartable iterator over surfaces currently in `Tracking` state.
    pub fn all_tracking(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces
            .values()
            .filter(|s| s.tracking_state == TrackingState::Tracking)
    }
}
