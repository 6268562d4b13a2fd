//! Off-thread map generation with single-consumer result delivery.
//!
//! A pool of named worker threads pulls jobs from an unbounded channel and
//! runs a [`MapSource`] for each one. Finished payloads are appended to one
//! mutex-guarded buffer. The consumer calls
//! [`AsyncComputeQueue::drain_and_dispatch`] once per tick: the buffer is
//! swapped out under the lock and each request's callback then runs outside
//! the lock, in append order.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use glam::Vec2;
use rustc_hash::FxHashMap;
use tracing::{debug, error, trace, warn};

use crate::map::{ChunkCoord, MapData};

/// Anything that can synthesize a chunk payload from a world-space center.
///
/// Implementations must be pure with respect to shared state: they are
/// called concurrently from every worker.
pub trait MapSource: Send + Sync + 'static {
    fn generate(&self, center: Vec2) -> MapData;
}

/// Handle identifying one generation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

/// A finished payload waiting in the result buffer.
#[derive(Debug)]
pub struct PendingResult {
    pub ticket: Ticket,
    /// Chunk the payload was generated for.
    pub coord: ChunkCoord,
    pub payload: MapData,
    /// Generation time in microseconds (for profiling).
    pub generation_time_us: u64,
}

/// Errors raised while setting up the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    /// The OS refused to start a worker thread.
    #[error("failed to spawn generation worker: {0}")]
    Spawn(#[source] std::io::Error),
}

struct GenerationJob {
    ticket: Ticket,
    coord: ChunkCoord,
    center: Vec2,
}

type Callback<Ctx> = Box<dyn FnOnce(&mut Ctx, MapData)>;

/// What a worker appends for each job.
enum Completion {
    Ready(PendingResult),
    /// The source panicked; there is no payload.
    Failed { ticket: Ticket, coord: ChunkCoord },
}

impl Completion {
    fn coord(&self) -> ChunkCoord {
        match self {
            Self::Ready(result) => result.coord,
            Self::Failed { coord, .. } => *coord,
        }
    }
}

type ResultBuffer = Arc<Mutex<Vec<Completion>>>;

fn lock_buffer(buffer: &Mutex<Vec<Completion>>) -> MutexGuard<'_, Vec<Completion>> {
    // Workers only push whole values, so a poisoned buffer is still consistent.
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Default worker count: all cores but two, and at least one.
pub fn default_worker_count() -> usize {
    let cpus = num_cpus::get().max(2);
    (cpus - 2).max(1)
}

/// Dispatches generation jobs to a worker pool and hands results back to a
/// single consumer.
///
/// `Ctx` is the consumer-side state each callback receives mutably when it
/// fires, typically the owner of the chunk records.
pub struct AsyncComputeQueue<Ctx> {
    job_sender: Option<Sender<GenerationJob>>,
    results: ResultBuffer,
    callbacks: FxHashMap<Ticket, Callback<Ctx>>,
    failed: Vec<ChunkCoord>,
    in_flight: Arc<AtomicU64>,
    next_ticket: u64,
    workers: Vec<JoinHandle<()>>,
}

impl<Ctx> AsyncComputeQueue<Ctx> {
    /// Starts `thread_count` workers (at least one) that run `source`.
    pub fn new<S: MapSource>(source: Arc<S>, thread_count: usize) -> Result<Self, ComputeError> {
        let (job_sender, job_receiver) = unbounded::<GenerationJob>();
        let results: ResultBuffer = Arc::new(Mutex::new(Vec::new()));
        let in_flight = Arc::new(AtomicU64::new(0));

        let thread_count = thread_count.max(1);
        let mut workers = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let receiver = job_receiver.clone();
            let source = Arc::clone(&source);
            let results = Arc::clone(&results);
            let in_flight = Arc::clone(&in_flight);

            let handle = std::thread::Builder::new()
                .name(format!("map-gen-worker-{index}"))
                .spawn(move || run_worker(receiver, source, results, in_flight))
                .map_err(ComputeError::Spawn)?;
            workers.push(handle);
        }
        debug!(workers = thread_count, "started map generation pool");

        Ok(Self {
            job_sender: Some(job_sender),
            results,
            callbacks: FxHashMap::default(),
            failed: Vec::new(),
            in_flight,
            next_ticket: 0,
            workers,
        })
    }

    /// Starts a pool sized by [`default_worker_count`].
    pub fn with_defaults<S: MapSource>(source: Arc<S>) -> Result<Self, ComputeError> {
        Self::new(source, default_worker_count())
    }

    /// Schedules generation of the chunk `coord`, centered at `center`.
    ///
    /// `on_complete` runs on the consumer thread during a later
    /// [`drain_and_dispatch`](Self::drain_and_dispatch). There is no limit
    /// on outstanding requests; callers bound them.
    pub fn request_generation<F>(&mut self, coord: ChunkCoord, center: Vec2, on_complete: F) -> Ticket
    where
        F: FnOnce(&mut Ctx, MapData) + 'static,
    {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        self.callbacks.insert(ticket, Box::new(on_complete));
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        let job = GenerationJob {
            ticket,
            coord,
            center,
        };
        // The receiver lives as long as the workers, which outlive `job_sender`.
        if let Some(sender) = &self.job_sender
            && sender.send(job).is_err()
        {
            warn!(?coord, "generation pool is gone; request dropped");
            self.callbacks.remove(&ticket);
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
        }
        trace!(?coord, ?ticket, "requested map generation");
        ticket
    }

    /// Swaps out every finished result and runs its callback with `ctx`.
    ///
    /// The buffer lock is held only for the swap. Callbacks fire in the
    /// order results were appended. Returns the number dispatched.
    ///
    /// A request whose generation panicked has its callback dropped and its
    /// coordinate queued for [`take_failed`](Self::take_failed).
    pub fn drain_and_dispatch(&mut self, ctx: &mut Ctx) -> usize {
        let completed = std::mem::take(&mut *lock_buffer(&self.results));
        let mut count = 0;

        for completion in completed {
            match completion {
                Completion::Ready(result) => match self.callbacks.remove(&result.ticket) {
                    Some(callback) => {
                        trace!(
                            coord = ?result.coord,
                            generation_time_us = result.generation_time_us,
                            "dispatching map data"
                        );
                        callback(ctx, result.payload);
                        count += 1;
                    }
                    None => warn!(coord = ?result.coord, "result without a callback"),
                },
                Completion::Failed { ticket, coord } => {
                    self.callbacks.remove(&ticket);
                    self.failed.push(coord);
                }
            }
        }

        if count > 0 {
            debug!(count, "drained completed map data");
        }
        count
    }

    /// Requests dispatched but not yet appended to the result buffer.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Coordinates whose generation panicked, in drain order. Clears the list.
    pub fn take_failed(&mut self) -> Vec<ChunkCoord> {
        std::mem::take(&mut self.failed)
    }

    /// Results (including failures) waiting in the buffer for the next drain.
    pub fn pending_results(&self) -> usize {
        lock_buffer(&self.results).len()
    }

    /// Requests whose callback has not fired yet.
    pub fn undelivered(&self) -> usize {
        self.callbacks.len()
    }

    /// Coordinates of buffered results, in append order.
    pub fn pending_coords(&self) -> Vec<ChunkCoord> {
        lock_buffer(&self.results).iter().map(Completion::coord).collect()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl<Ctx> Drop for AsyncComputeQueue<Ctx> {
    fn drop(&mut self) {
        // Closing the channel lets each worker finish its current job and exit.
        self.job_sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("map generation worker panicked");
            }
        }
    }
}

fn run_worker<S: MapSource>(
    receiver: Receiver<GenerationJob>,
    source: Arc<S>,
    results: ResultBuffer,
    in_flight: Arc<AtomicU64>,
) {
    while let Ok(job) = receiver.recv() {
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| source.generate(job.center)));
        let generation_time_us = start.elapsed().as_micros() as u64;

        let completion = match outcome {
            Ok(payload) => Completion::Ready(PendingResult {
                ticket: job.ticket,
                coord: job.coord,
                payload,
                generation_time_us,
            }),
            Err(panic) => {
                error!(
                    coord = ?job.coord,
                    reason = panic_message(panic.as_ref()),
                    "map generation panicked"
                );
                Completion::Failed {
                    ticket: job.ticket,
                    coord: job.coord,
                }
            }
        };
        lock_buffer(&results).push(completion);
        in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Rgba, ScalarField};
    use crossbeam_channel::bounded;
    use std::time::Duration;

    /// Returns a 1x1 map whose height encodes the requested center's x.
    struct EchoSource;

    impl MapSource for EchoSource {
        fn generate(&self, center: Vec2) -> MapData {
            let mut field = ScalarField::new(1, 1);
            field.set(0, 0, center.x);
            MapData::new(field, vec![Rgba::ZERO])
        }
    }

    /// Blocks each job until the test opens the gate for its center.x.
    struct GatedSource {
        gates: FxHashMap<i32, Receiver<()>>,
    }

    impl MapSource for GatedSource {
        fn generate(&self, center: Vec2) -> MapData {
            if let Some(gate) = self.gates.get(&(center.x as i32)) {
                let _ = gate.recv_timeout(Duration::from_secs(10));
            }
            EchoSource.generate(center)
        }
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(done(), "timed out waiting for workers");
    }

    #[test]
    fn test_all_requests_delivered_exactly_once() {
        let mut queue = AsyncComputeQueue::<Vec<ChunkCoord>>::new(Arc::new(EchoSource), 4).unwrap();

        for x in 0..8 {
            for y in 0..8 {
                let coord = ChunkCoord::new(x, y);
                queue.request_generation(coord, Vec2::new(x as f32, y as f32), move |seen, _| {
                    seen.push(coord)
                });
            }
        }

        let mut seen = Vec::new();
        wait_until(|| {
            queue.drain_and_dispatch(&mut seen);
            seen.len() == 64
        });

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 64);
        assert_eq!(queue.undelivered(), 0);
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(queue.drain_and_dispatch(&mut seen), 0);
    }

    #[test]
    fn test_payload_reaches_its_own_callback() {
        let mut queue = AsyncComputeQueue::<Vec<(ChunkCoord, f32)>>::new(Arc::new(EchoSource), 2).unwrap();
        for x in 0..5 {
            let coord = ChunkCoord::new(x, 0);
            queue.request_generation(coord, Vec2::new(x as f32, 0.0), move |out, data| {
                out.push((coord, data.height_field().get(0, 0)))
            });
        }

        let mut out = Vec::new();
        wait_until(|| {
            queue.drain_and_dispatch(&mut out);
            out.len() == 5
        });
        for (coord, h) in out {
            assert_eq!(coord.x as f32, h);
        }
    }

    #[test]
    fn test_drain_follows_append_order_not_dispatch_order() {
        let mut senders = FxHashMap::default();
        let mut gates = FxHashMap::default();
        for x in 1..=3 {
            let (tx, rx) = bounded::<()>(1);
            senders.insert(x, tx);
            gates.insert(x, rx);
        }
        let mut queue =
            AsyncComputeQueue::<Vec<ChunkCoord>>::new(Arc::new(GatedSource { gates }), 3).unwrap();

        let c1 = ChunkCoord::new(1, 0);
        let c2 = ChunkCoord::new(2, 0);
        let c3 = ChunkCoord::new(3, 0);
        for coord in [c1, c2, c3] {
            queue.request_generation(coord, Vec2::new(coord.x as f32, 0.0), move |seen, _| {
                seen.push(coord)
            });
        }

        // Finish in the order C3, C1, C2.
        for (released, x) in [3, 1, 2].into_iter().enumerate() {
            senders[&x].send(()).unwrap();
            wait_until(|| queue.pending_results() == released + 1);
        }
        assert_eq!(queue.pending_coords(), vec![c3, c1, c2]);

        let mut seen = Vec::new();
        assert_eq!(queue.drain_and_dispatch(&mut seen), 3);
        assert_eq!(seen, vec![c3, c1, c2]);
    }

    #[test]
    fn test_in_flight_count() {
        let (tx, rx) = bounded::<()>(1);
        let mut gates = FxHashMap::default();
        gates.insert(0, rx);
        let mut queue = AsyncComputeQueue::<()>::new(Arc::new(GatedSource { gates }), 1).unwrap();

        assert_eq!(queue.in_flight(), 0);
        queue.request_generation(ChunkCoord::new(0, 0), Vec2::ZERO, |_, _| {});
        assert_eq!(queue.in_flight(), 1);
        assert_eq!(queue.undelivered(), 1);

        tx.send(()).unwrap();
        wait_until(|| queue.in_flight() == 0);
        assert_eq!(queue.pending_results(), 1);
        assert_eq!(queue.drain_and_dispatch(&mut ()), 1);
        assert_eq!(queue.undelivered(), 0);
    }

    /// Panics for the chunk centered at the origin.
    struct FaultySource;

    impl MapSource for FaultySource {
        fn generate(&self, center: Vec2) -> MapData {
            assert!(center != Vec2::ZERO, "cannot generate the origin");
            EchoSource.generate(center)
        }
    }

    #[test]
    fn test_panicking_job_does_not_strand_queue() {
        let mut queue = AsyncComputeQueue::<Vec<ChunkCoord>>::new(Arc::new(FaultySource), 1).unwrap();
        for x in 0..5 {
            let coord = ChunkCoord::new(x, 0);
            queue.request_generation(coord, Vec2::new(x as f32, 0.0), move |seen, _| {
                seen.push(coord)
            });
        }

        wait_until(|| queue.in_flight() == 0);
        assert_eq!(queue.pending_results(), 5);

        let mut seen = Vec::new();
        assert_eq!(queue.drain_and_dispatch(&mut seen), 4);
        seen.sort();
        assert_eq!(seen, (1..5).map(|x| ChunkCoord::new(x, 0)).collect::<Vec<_>>());
        assert_eq!(queue.undelivered(), 0);
        assert_eq!(queue.take_failed(), vec![ChunkCoord::new(0, 0)]);
        assert!(queue.take_failed().is_empty());
        assert_eq!(queue.worker_count(), 1);
    }

    #[test]
    fn test_tickets_are_unique() {
        let mut queue = AsyncComputeQueue::<()>::new(Arc::new(EchoSource), 1).unwrap();
        let a = queue.request_generation(ChunkCoord::new(0, 0), Vec2::ZERO, |_, _| {});
        let b = queue.request_generation(ChunkCoord::new(0, 0), Vec2::ZERO, |_, _| {});
        assert_ne!(a, b);
        assert_eq!(queue.worker_count(), 1);
    }

    #[test]
    fn test_default_worker_count_is_positive() {
        assert!(default_worker_count() >= 1);
    }
}
