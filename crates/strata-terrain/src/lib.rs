//! Layered noise-to-biome terrain synthesis: fractal noise fields, remap
//! curves, biome classification, and an off-thread generation queue.

pub mod async_generation;
pub mod biome;
pub mod curve;
pub mod map;
pub mod noise_field;
pub mod profile;
pub mod synthesizer;
pub mod texture;

pub use async_generation::{
    AsyncComputeQueue, ComputeError, MapSource, PendingResult, Ticket, default_worker_count,
};
pub use biome::{Biome, classify, find_biome};
pub use curve::{Curve, Keyframe};
pub use map::{ChunkCoord, MapData, Rgba, ScalarField};
pub use noise_field::{NoiseKind, NoiseSettings, sample_field};
pub use profile::{ProfileError, WorldProfile};
pub use synthesizer::{MapSynthesizer, WorldSettings};
pub use texture::{DrawMode, TextureData, color_texture, height_texture, texture_for};
