//! Per-chunk record tracked by the streamer.

use glam::Vec2;
use strata_terrain::{ChunkCoord, MapData};
use tracing::warn;

/// Lifecycle of a chunk. Transitions only move forward, except that a
/// failed generation returns a chunk to `Unrequested`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Not tracked, or tracked without a request yet.
    Unrequested,
    /// A generation request is in flight.
    Requested,
    /// Map data has been attached.
    Ready,
}

/// Axis-aligned square covering one chunk in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkBounds {
    pub center: Vec2,
    pub half_extent: f32,
}

impl ChunkBounds {
    pub fn new(center: Vec2, size: f32) -> Self {
        Self {
            center,
            half_extent: size * 0.5,
        }
    }

    /// Squared distance from `point` to the nearest point of the square.
    /// Zero inside the square.
    pub fn distance_sq(&self, point: Vec2) -> f32 {
        let d = ((point - self.center).abs() - Vec2::splat(self.half_extent)).max(Vec2::ZERO);
        d.length_squared()
    }

    pub fn distance(&self, point: Vec2) -> f32 {
        self.distance_sq(point).sqrt()
    }
}

/// One chunk of streamed terrain.
///
/// The map data is attached at most once and never replaced.
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    world_position: Vec2,
    bounds: ChunkBounds,
    visible: bool,
    pending_request: bool,
    data: Option<MapData>,
}

impl TerrainChunk {
    /// A hidden chunk with no data and no request.
    pub fn new(coord: ChunkCoord, chunk_size: u32) -> Self {
        let world_position = coord.world_position(chunk_size);
        Self {
            coord,
            world_position,
            bounds: ChunkBounds::new(world_position, chunk_size as f32),
            visible: false,
            pending_request: false,
            data: None,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// World-space center of the chunk.
    pub fn world_position(&self) -> Vec2 {
        self.world_position
    }

    pub fn bounds(&self) -> &ChunkBounds {
        &self.bounds
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending_request
    }

    pub fn data(&self) -> Option<&MapData> {
        self.data.as_ref()
    }

    pub fn state(&self) -> ChunkState {
        match (&self.data, self.pending_request) {
            (Some(_), _) => ChunkState::Ready,
            (None, true) => ChunkState::Requested,
            (None, false) => ChunkState::Unrequested,
        }
    }

    /// Moves `Unrequested -> Requested`. Returns `false` if the chunk was
    /// already requested or ready.
    pub fn mark_requested(&mut self) -> bool {
        if self.state() != ChunkState::Unrequested {
            return false;
        }
        self.pending_request = true;
        true
    }

    /// Moves `Requested -> Unrequested` after a failed generation. Returns
    /// `false` if the chunk was not waiting on a request.
    pub fn clear_request(&mut self) -> bool {
        if self.state() != ChunkState::Requested {
            return false;
        }
        self.pending_request = false;
        true
    }

    /// Attaches generated data. Returns `false` and leaves the chunk
    /// untouched if data was already attached.
    pub fn attach(&mut self, data: MapData) -> bool {
        if self.data.is_some() {
            warn!(coord = ?self.coord, "ignoring second map data for chunk");
            return false;
        }
        self.data = Some(data);
        self.pending_request = false;
        true
    }

    /// Sets visibility from the distance between `observer` and the chunk's
    /// square, and returns the new value.
    pub fn update_visibility(&mut self, observer: Vec2, max_view_distance: f32) -> bool {
        self.visible = self.bounds.distance(observer) <= max_view_distance;
        self.visible
    }
}
