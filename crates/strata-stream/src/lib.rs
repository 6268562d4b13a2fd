//! Observer-centered chunk streaming on top of `strata-terrain`.
//!
//! Chunks are created the first time they come into range, filled in by the
//! background generation queue, and shown or hidden every tick by distance.

pub mod chunk;
pub mod eviction;
pub mod streamer;

pub use chunk::{ChunkBounds, ChunkState, TerrainChunk};
pub use eviction::{EvictionPolicy, FarthestFirst, NeverEvict};
pub use streamer::{
    ChunkSet, ChunkStreamer, StreamError, StreamTickReport, StreamerConfig, observer_chunk,
};
