//! Pluggable policies for dropping cached chunks.
//!
//! The streamer only ever offers chunks that are ready and hidden, so a
//! policy can never drop a chunk with a request in flight.

use strata_terrain::ChunkCoord;

/// Chooses which cached chunks to drop after a tick.
pub trait EvictionPolicy {
    /// `tracked` is the total number of chunk records; `candidates` are the
    /// evictable ones, sorted by coordinate.
    fn select_victims(
        &mut self,
        observer: ChunkCoord,
        tracked: usize,
        candidates: &[ChunkCoord],
    ) -> Vec<ChunkCoord>;
}

/// Keeps every chunk forever. Memory grows with the explored area.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverEvict;

impl EvictionPolicy for NeverEvict {
    fn select_victims(&mut self, _: ChunkCoord, _: usize, _: &[ChunkCoord]) -> Vec<ChunkCoord> {
        Vec::new()
    }
}

/// Caps the cache at `capacity` records, dropping the candidates farthest
/// from the observer first.
#[derive(Clone, Copy, Debug)]
pub struct FarthestFirst {
    pub capacity: usize,
}

impl FarthestFirst {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl EvictionPolicy for FarthestFirst {
    fn select_victims(
        &mut self,
        observer: ChunkCoord,
        tracked: usize,
        candidates: &[ChunkCoord],
    ) -> Vec<ChunkCoord> {
        let excess = tracked.saturating_sub(self.capacity);
        if excess == 0 {
            return Vec::new();
        }
        let mut ranked = candidates.to_vec();
        // Farthest first; ties broken by coordinate so the choice is stable.
        ranked.sort_by(|a, b| {
            b.distance_sq(observer)
                .cmp(&a.distance_sq(observer))
                .then(a.cmp(b))
        });
        ranked.truncate(excess);
        ranked
    }
}
