//! Per-connection chunk visibility cache.
//!
//! Tracks which chunk columns the client holds (`known`) and which have been
//! requested from the world service but not delivered yet (`pending`). Every
//! generation result is matched against the world and epoch it was requested
//! under, so answers for an old world or an old position are thrown away.

use std::collections::HashSet;

use ember_proto::types::ChunkPos;

use crate::config::DistanceMetric;

/// What [`RegionCache::recenter`] wants the caller to do.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecenterPlan {
    /// Chunks the client holds that fell out of range; send unload frames.
    pub unload: Vec<ChunkPos>,
    /// Chunks newly in range, nearest first; request them.
    pub load: Vec<ChunkPos>,
}

/// Outcome of matching a generation response against the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Added to the known set; send the chunk.
    Deliver,
    /// Requested under a different world or epoch.
    Stale,
    /// No longer wanted: out of range or already resolved.
    NotPending,
    /// Generation failed; the chunk will be requested again on the next recenter.
    Failed,
}

#[derive(Debug)]
pub struct RegionCache {
    radius: i32,
    metric: DistanceMetric,
    world: String,
    epoch: u64,
    center: Option<ChunkPos>,
    known: HashSet<ChunkPos>,
    pending: HashSet<ChunkPos>,
}

impl RegionCache {
    pub fn new(world: impl Into<String>, radius: i32, metric: DistanceMetric) -> Self {
        Self {
            radius,
            metric,
            world: world.into(),
            epoch: 0,
            center: None,
            known: HashSet::new(),
            pending: HashSet::new(),
        }
    }

    pub fn in_range(&self, center: ChunkPos, pos: ChunkPos) -> bool {
        match self.metric {
            DistanceMetric::Square => center.chebyshev_distance(&pos) <= self.radius,
            DistanceMetric::Circle => {
                center.distance_squared(&pos) <= (self.radius as i64) * (self.radius as i64)
            }
        }
    }

    /// Move the view to `center`.
    ///
    /// Out-of-range chunks leave both sets immediately. Only chunks the client
    /// actually holds are returned for unloading; pending ones are forgotten
    /// and their responses will resolve to [`Resolution::NotPending`].
    pub fn recenter(&mut self, center: ChunkPos) -> RecenterPlan {
        self.center = Some(center);

        let mut unload: Vec<ChunkPos> = self
            .known
            .iter()
            .copied()
            .filter(|pos| !self.in_range(center, *pos))
            .collect();
        for pos in &unload {
            self.known.remove(pos);
        }
        unload.sort();

        let stale: Vec<ChunkPos> = self
            .pending
            .iter()
            .copied()
            .filter(|pos| !self.in_range(center, *pos))
            .collect();
        for pos in &stale {
            self.pending.remove(pos);
        }

        let r = self.radius;
        let mut load = Vec::new();
        for dx in -r..=r {
            for dz in -r..=r {
                let pos = ChunkPos::new(center.x + dx, center.z + dz);
                if self.in_range(center, pos)
                    && !self.known.contains(&pos)
                    && !self.pending.contains(&pos)
                {
                    load.push(pos);
                }
            }
        }
        load.sort_by_key(|pos| (center.distance_squared(pos), pos.x, pos.z));
        self.pending.extend(load.iter().copied());

        RecenterPlan { unload, load }
    }

    /// Match a generation response for `pos`, requested under `world`/`epoch`.
    pub fn resolve(&mut self, world: &str, epoch: u64, pos: ChunkPos, ok: bool) -> Resolution {
        if epoch != self.epoch || world != self.world {
            return Resolution::Stale;
        }
        if !self.pending.remove(&pos) {
            return Resolution::NotPending;
        }
        if !ok {
            return Resolution::Failed;
        }
        self.known.insert(pos);
        Resolution::Deliver
    }

    /// Forget everything and start a new epoch. Returns the chunks the client held.
    pub fn clear(&mut self) -> Vec<ChunkPos> {
        self.epoch += 1;
        self.center = None;
        self.pending.clear();
        let mut dropped: Vec<ChunkPos> = self.known.drain().collect();
        dropped.sort();
        dropped
    }

    /// Switch to another world. Implies [`clear`](Self::clear).
    pub fn set_world(&mut self, world: impl Into<String>) -> Vec<ChunkPos> {
        self.world = world.into();
        self.clear()
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn center(&self) -> Option<ChunkPos> {
        self.center
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn is_known(&self, pos: &ChunkPos) -> bool {
        self.known.contains(pos)
    }

    pub fn known(&self) -> impl Iterator<Item = &ChunkPos> {
        self.known.iter()
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deliver_all(cache: &mut RegionCache, plan: &RecenterPlan) {
        let (world, epoch) = (cache.world().to_string(), cache.epoch());
        for pos in &plan.load {
            assert_eq!(cache.resolve(&world, epoch, *pos, true), Resolution::Deliver);
        }
    }

    #[test]
    fn initial_load_is_full_square_nearest_first() {
        let mut cache = RegionCache::new("world", 2, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        assert!(plan.unload.is_empty());
        assert_eq!(plan.load.len(), 25);
        assert_eq!(plan.load[0], ChunkPos::new(0, 0));
        // Distances never decrease along the plan.
        let d: Vec<i64> = plan
            .load
            .iter()
            .map(|p| p.distance_squared(&ChunkPos::new(0, 0)))
            .collect();
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(cache.pending_len(), 25);
    }

    #[test]
    fn circle_metric_is_smaller() {
        let mut cache = RegionCache::new("world", 2, DistanceMetric::Circle);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        // (±2,±2) and (±1,±2)/(±2,±1) lie outside a radius-2 disc.
        assert_eq!(plan.load.len(), 13);
    }

    #[test]
    fn recenter_far_unloads_everything_out_of_range() {
        let mut cache = RegionCache::new("world", 5, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        deliver_all(&mut cache, &plan);
        assert_eq!(cache.known_len(), 121);

        let center = ChunkPos::new(20, 0);
        let plan = cache.recenter(center);
        assert_eq!(plan.unload.len(), 121);
        for pos in &plan.unload {
            assert!(pos.chebyshev_distance(&center) > 5);
        }
        deliver_all(&mut cache, &plan);
        assert_eq!(cache.known_len(), 121);
        assert!(cache.known().all(|p| p.chebyshev_distance(&center) <= 5));
    }

    #[test]
    fn small_move_only_touches_the_edge() {
        let mut cache = RegionCache::new("world", 5, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        deliver_all(&mut cache, &plan);

        let plan = cache.recenter(ChunkPos::new(1, 0));
        assert_eq!(plan.unload.len(), 11);
        assert!(plan.unload.iter().all(|p| p.x == -5));
        assert_eq!(plan.load.len(), 11);
        assert!(plan.load.iter().all(|p| p.x == 6));
    }

    #[test]
    fn stale_epoch_is_discarded() {
        let mut cache = RegionCache::new("world", 1, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        let old_epoch = cache.epoch();
        cache.clear();
        assert_eq!(
            cache.resolve("world", old_epoch, plan.load[0], true),
            Resolution::Stale
        );
        assert_eq!(cache.known_len(), 0);
    }

    #[test]
    fn other_world_is_discarded() {
        let mut cache = RegionCache::new("world", 1, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        let epoch = cache.epoch();
        assert_eq!(
            cache.resolve("nether", epoch, plan.load[0], true),
            Resolution::Stale
        );
    }

    #[test]
    fn out_of_range_response_is_discarded() {
        let mut cache = RegionCache::new("world", 1, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        cache.recenter(ChunkPos::new(10, 10));
        let epoch = cache.epoch();
        assert_eq!(
            cache.resolve("world", epoch, plan.load[0], true),
            Resolution::NotPending
        );
        assert!(!cache.is_known(&plan.load[0]));
    }

    #[test]
    fn never_delivered_twice() {
        let mut cache = RegionCache::new("world", 1, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        let pos = plan.load[0];
        assert_eq!(cache.resolve("world", 0, pos, true), Resolution::Deliver);
        assert_eq!(cache.resolve("world", 0, pos, true), Resolution::NotPending);
        // The other eight are still pending; nothing is requested twice.
        assert!(cache.recenter(ChunkPos::new(0, 0)).load.is_empty());
    }

    #[test]
    fn failure_is_requested_again() {
        let mut cache = RegionCache::new("world", 0, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(0, 0));
        assert_eq!(plan.load, vec![ChunkPos::new(0, 0)]);
        assert_eq!(
            cache.resolve("world", 0, ChunkPos::new(0, 0), false),
            Resolution::Failed
        );
        let plan = cache.recenter(ChunkPos::new(0, 0));
        assert_eq!(plan.load, vec![ChunkPos::new(0, 0)]);
    }

    #[test]
    fn set_world_returns_held_chunks() {
        let mut cache = RegionCache::new("world", 0, DistanceMetric::Square);
        let plan = cache.recenter(ChunkPos::new(3, 3));
        deliver_all(&mut cache, &plan);
        let dropped = cache.set_world("nether");
        assert_eq!(dropped, vec![ChunkPos::new(3, 3)]);
        assert_eq!(cache.world(), "nether");
        assert_eq!(cache.epoch(), 1);
        assert_eq!(cache.known_len(), 0);
    }
}
