//! `strata walk`: moves an observer across the world at a fixed timestep and
//! streams chunks around it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use strata_config::StreamingConfig;
use strata_stream::{ChunkStreamer, FarthestFirst, StreamTickReport, StreamerConfig};
use strata_terrain::MapSynthesizer;
use tracing::{info, warn};

use crate::error::AppError;

/// Simulation step, in seconds.
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// How long to keep syncing after the last tick for outstanding chunks.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Parameters of one walk.
#[derive(Clone, Copy, Debug)]
pub struct WalkPlan {
    pub ticks: u32,
    /// Observer speed in world units per second.
    pub speed: f32,
    /// Unit direction of travel.
    pub heading: Vec2,
    /// Log a progress line every this many ticks (0 disables).
    pub report_every: u32,
}

/// Totals over a walk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WalkSummary {
    pub ticks: u32,
    pub created: u64,
    pub delivered: u64,
    pub evicted: u64,
    pub tracked: usize,
    pub ready: usize,
    pub visible: usize,
    pub final_position: Vec2,
}

/// Builds a streamer for `synthesizer` from the streaming config.
pub fn build_streamer(
    streaming: &StreamingConfig,
    synthesizer: Arc<MapSynthesizer>,
) -> Result<ChunkStreamer, AppError> {
    let config = StreamerConfig {
        chunk_size: synthesizer.settings().chunk_size,
        max_view_distance: streaming.max_view_distance,
        worker_threads: streaming.worker_threads,
    };
    let streamer = ChunkStreamer::new(config, synthesizer)?;
    Ok(match streaming.max_resident_chunks {
        Some(capacity) => streamer.with_eviction(FarthestFirst::new(capacity)),
        None => streamer,
    })
}

/// Runs the walk, then waits (bounded) for outstanding chunk data.
pub fn run(streamer: &mut ChunkStreamer, plan: &WalkPlan) -> WalkSummary {
    let mut summary = WalkSummary::default();
    let velocity = plan.heading.normalize_or_zero() * plan.speed;
    let mut position = Vec2::ZERO;

    for tick in 0..plan.ticks {
        let report = streamer.update(position);
        accumulate(&mut summary, &report);

        if plan.report_every > 0 && tick % plan.report_every == 0 {
            info!(
                tick,
                x = position.x,
                y = position.y,
                tracked = streamer.tracked_count(),
                visible = report.visible,
                in_flight = streamer.in_flight(),
                "walk progress"
            );
        }
        position += velocity * FIXED_DT;
    }
    summary.ticks = plan.ticks;

    let deadline = Instant::now() + SETTLE_TIMEOUT;
    while streamer.undelivered() > 0 {
        if Instant::now() >= deadline {
            warn!(outstanding = streamer.undelivered(), "gave up waiting for chunk data");
            break;
        }
        summary.delivered += streamer.sync() as u64;
        std::thread::sleep(Duration::from_millis(5));
    }

    summary.tracked = streamer.tracked_count();
    summary.ready = streamer.ready_count();
    summary.visible = streamer.visible_coords().len();
    summary.final_position = position;
    info!(
        ticks = summary.ticks,
        created = summary.created,
        delivered = summary.delivered,
        evicted = summary.evicted,
        tracked = summary.tracked,
        ready = summary.ready,
        "walk finished"
    );
    summary
}

fn accumulate(summary: &mut WalkSummary, report: &StreamTickReport) {
    summary.created += u64::from(report.created);
    summary.delivered += u64::from(report.delivered);
    summary.evicted += u64::from(report.evicted);
}
