//! Observer-driven chunk streaming.
//!
//! Each tick hides last tick's visible chunks, walks the square neighborhood
//! of chunk coordinates around the observer, refreshes visibility of tracked
//! chunks, and creates (and requests data for) chunks seen for the first
//! time. Completed map data is merged back in by [`ChunkStreamer::sync`].

use std::sync::Arc;

use glam::Vec2;
use rustc_hash::FxHashMap;
use strata_terrain::{AsyncComputeQueue, ChunkCoord, ComputeError, MapData, MapSource};
use tracing::{debug, trace, warn};

use crate::chunk::{ChunkState, TerrainChunk};
use crate::eviction::{EvictionPolicy, NeverEvict};

/// Errors raised while constructing a [`ChunkStreamer`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Compute(#[from] ComputeError),
}

/// Configuration for the chunk streamer.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamerConfig {
    /// Side length of a chunk in world units. Values below 1 act as 1.
    pub chunk_size: u32,
    /// Chunks whose square lies within this distance of the observer are visible.
    pub max_view_distance: f32,
    /// Generation worker threads; `0` picks a default from the CPU count.
    pub worker_threads: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 128,
            max_view_distance: 600.0,
            worker_threads: 0,
        }
    }
}

/// Summary of one [`ChunkStreamer::tick`] or [`ChunkStreamer::update`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamTickReport {
    /// Chunks created (and requested) this tick.
    pub created: u32,
    /// Chunks visible after the tick.
    pub visible: u32,
    /// Chunks dropped by the eviction policy.
    pub evicted: u32,
    /// Map payloads merged in before the tick (only set by `update`).
    pub delivered: u32,
}

/// Chunk-grid coordinate containing `position`, rounding half to even.
pub fn observer_chunk(position: Vec2, chunk_size: u32) -> ChunkCoord {
    let size = chunk_size.max(1) as f32;
    ChunkCoord::new(
        (position.x / size).round_ties_even() as i32,
        (position.y / size).round_ties_even() as i32,
    )
}

/// Consumer-side chunk state. Generation callbacks receive it mutably.
#[derive(Debug)]
pub struct ChunkSet {
    chunks: FxHashMap<ChunkCoord, TerrainChunk>,
    visible_last_tick: Vec<ChunkCoord>,
    observer: Vec2,
    max_view_distance: f32,
}

impl ChunkSet {
    fn new(max_view_distance: f32) -> Self {
        Self {
            chunks: FxHashMap::default(),
            visible_last_tick: Vec::new(),
            observer: Vec2::ZERO,
            max_view_distance,
        }
    }

    fn hide_visible(&mut self) {
        for coord in self.visible_last_tick.drain(..) {
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                chunk.set_visible(false);
            }
        }
    }

    /// Returns a chunk whose generation failed to `Unrequested`. It is not
    /// requested again automatically.
    fn reset_failed(&mut self, coord: ChunkCoord) {
        if let Some(chunk) = self.chunks.get_mut(&coord)
            && chunk.clear_request()
        {
            warn!(?coord, "chunk generation failed; chunk left without data");
        }
    }

    /// Attaches delivered data and shows the chunk if it is in view of the
    /// last known observer position.
    fn attach(&mut self, coord: ChunkCoord, data: MapData) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            warn!(?coord, "map data arrived for an untracked chunk");
            return;
        };
        if !chunk.attach(data) {
            return;
        }
        let visible = chunk.update_visibility(self.observer, self.max_view_distance);
        if visible && !self.visible_last_tick.contains(&coord) {
            self.visible_last_tick.push(coord);
        }
        trace!(?coord, visible, "chunk ready");
    }
}

/// Streams chunks around a moving observer.
///
/// Chunk records are created on first sight and kept until the eviction
/// policy drops them (never, by default).
pub struct ChunkStreamer {
    config: StreamerConfig,
    visible_radius: i32,
    set: ChunkSet,
    queue: AsyncComputeQueue<ChunkSet>,
    eviction: Box<dyn EvictionPolicy>,
}

impl ChunkStreamer {
    /// Creates a streamer whose chunk data comes from `source`.
    pub fn new<S: MapSource>(config: StreamerConfig, source: Arc<S>) -> Result<Self, StreamError> {
        let config = StreamerConfig {
            chunk_size: config.chunk_size.max(1),
            ..config
        };
        let queue = if config.worker_threads == 0 {
            AsyncComputeQueue::with_defaults(source)?
        } else {
            AsyncComputeQueue::new(source, config.worker_threads)?
        };
        let visible_radius =
            ((config.max_view_distance / config.chunk_size as f32).round_ties_even() as i32).max(0);
        debug!(
            chunk_size = config.chunk_size,
            max_view_distance = config.max_view_distance,
            visible_radius,
            "created chunk streamer"
        );

        Ok(Self {
            set: ChunkSet::new(config.max_view_distance),
            config,
            visible_radius,
            queue,
            eviction: Box::new(NeverEvict),
        })
    }

    /// Replaces the eviction policy.
    pub fn with_eviction(mut self, policy: impl EvictionPolicy + 'static) -> Self {
        self.eviction = Box::new(policy);
        self
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Neighborhood radius walked each tick, in chunks.
    pub fn visible_radius(&self) -> i32 {
        self.visible_radius
    }

    /// Runs one visibility pass for the observer at `observer`.
    pub fn tick(&mut self, observer: Vec2) -> StreamTickReport {
        let mut report = StreamTickReport::default();
        self.set.observer = observer;
        self.set.hide_visible();

        let center = observer_chunk(observer, self.config.chunk_size);
        let r = self.visible_radius;
        for dx in -r..=r {
            for dy in -r..=r {
                let coord = center.offset(dx, dy);
                if let Some(chunk) = self.set.chunks.get_mut(&coord) {
                    if chunk.update_visibility(observer, self.config.max_view_distance) {
                        self.set.visible_last_tick.push(coord);
                    }
                } else {
                    self.create_chunk(coord);
                    report.created += 1;
                }
            }
        }

        report.evicted = self.evict(center);
        report.visible = self.set.visible_last_tick.len() as u32;
        if report.created > 0 || report.evicted > 0 {
            debug!(
                ?center,
                created = report.created,
                evicted = report.evicted,
                tracked = self.set.chunks.len(),
                "stream tick"
            );
        }
        report
    }

    /// Merges every finished payload into its chunk. Returns how many were
    /// delivered. Chunks whose generation failed go back to `Unrequested`.
    pub fn sync(&mut self) -> usize {
        let delivered = self.queue.drain_and_dispatch(&mut self.set);
        for coord in self.queue.take_failed() {
            self.set.reset_failed(coord);
        }
        delivered
    }

    /// [`sync`](Self::sync) followed by [`tick`](Self::tick).
    pub fn update(&mut self, observer: Vec2) -> StreamTickReport {
        // Deliveries use the previous observer position; the tick then refreshes it.
        let delivered = self.sync() as u32;
        StreamTickReport {
            delivered,
            ..self.tick(observer)
        }
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        let mut chunk = TerrainChunk::new(coord, self.config.chunk_size);
        chunk.mark_requested();
        let center = chunk.world_position();
        self.set.chunks.insert(coord, chunk);

        self.queue
            .request_generation(coord, center, move |set: &mut ChunkSet, data| {
                set.attach(coord, data)
            });
        trace!(?coord, "created chunk");
    }

    fn evict(&mut self, center: ChunkCoord) -> u32 {
        let r = self.visible_radius;
        // Chunks inside the walked square would be recreated next tick.
        let in_neighborhood =
            |c: ChunkCoord| (c.x - center.x).abs() <= r && (c.y - center.y).abs() <= r;
        let mut candidates: Vec<ChunkCoord> = self
            .set
            .chunks
            .values()
            .filter(|c| c.state() == ChunkState::Ready && !c.is_visible())
            .map(TerrainChunk::coord)
            .filter(|&c| !in_neighborhood(c))
            .collect();
        if candidates.is_empty() {
            return 0;
        }
        candidates.sort();

        let victims =
            self.eviction
                .select_victims(center, self.set.chunks.len(), &candidates);
        let mut evicted = 0;
        for coord in victims {
            // Only offered candidates may go; anything else would break a pending request.
            if candidates.binary_search(&coord).is_ok() && self.set.chunks.remove(&coord).is_some() {
                evicted += 1;
            }
        }
        evicted
    }

    /// The chunk record at `coord`, if tracked.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.set.chunks.get(&coord)
    }

    /// Lifecycle state of `coord`; untracked coordinates are `Unrequested`.
    pub fn state(&self, coord: ChunkCoord) -> ChunkState {
        self.chunk(coord)
            .map_or(ChunkState::Unrequested, TerrainChunk::state)
    }

    pub fn tracked_count(&self) -> usize {
        self.set.chunks.len()
    }

    /// All tracked coordinates, sorted.
    pub fn tracked_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.set.chunks.keys().copied().collect();
        coords.sort();
        coords
    }

    /// Currently visible coordinates, sorted.
    pub fn visible_coords(&self) -> Vec<ChunkCoord> {
        let mut coords = self.set.visible_last_tick.clone();
        coords.sort();
        coords
    }

    /// Tracked chunks that already hold map data.
    pub fn ready_count(&self) -> usize {
        self.set
            .chunks
            .values()
            .filter(|c| c.state() == ChunkState::Ready)
            .count()
    }

    /// Generation requests not yet appended to the result buffer.
    pub fn in_flight(&self) -> u64 {
        self.queue.in_flight()
    }

    /// Requests whose data has not been merged yet.
    pub fn undelivered(&self) -> usize {
        self.queue.undelivered()
    }
}
