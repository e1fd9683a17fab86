//! Patch grid orchestration: per-patch LOD requests on a worker pool, mesh hand-off to the owning thread.
#![forbid(unsafe_code)]

mod apply;
mod lod_key;
mod patch;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::HashMap;
use quilt_geom::Vec3;
use quilt_mesh_cpu::MeshError;
use quilt_world::{ConfigError, ElevationSource, PatchSettings, TerrainConfig};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

pub use apply::{ApplyCommand, MeshSlots, PatchId, ShownMesh};
pub use lod_key::{LodKey, RequestTicket, canonical_reference};
pub use patch::{LodOutcome, Patch, PatchStats};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Tally of one `request_all` sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestSummary {
    pub unchanged: usize,
    pub cache_hits: usize,
    pub built: usize,
    pub stale: usize,
}

impl RequestSummary {
    fn count(&mut self, outcome: &LodOutcome) {
        match outcome {
            LodOutcome::Unchanged(_) => self.unchanged += 1,
            LodOutcome::CacheHit(_) => self.cache_hits += 1,
            LodOutcome::Built(_) => self.built += 1,
            LodOutcome::Stale(_) => self.stale += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unchanged + self.cache_hits + self.built + self.stale
    }
}

/// Summed counters over every patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub patches: usize,
    pub requests: u64,
    pub unchanged: u64,
    pub cache_hits: u64,
    pub generated: u64,
    pub stale: u64,
    pub cache_entries: usize,
}

/// A square grid of patches around the origin sharing one elevation source.
pub struct Runtime<E: ElevationSource + ?Sized + 'static> {
    settings: PatchSettings,
    patches: Vec<Arc<Patch<E>>>,
    index: HashMap<PatchId, usize>,
    pool: ThreadPool,
    apply_rx: Receiver<ApplyCommand>,
    inflight: Arc<AtomicUsize>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
    workers: usize,
}

impl<E: ElevationSource + ?Sized + 'static> Runtime<E> {
    /// Builds patches for every tile in `[-grid_radius, grid_radius]^2` and a
    /// pool of `runtime.workers` threads (`0` picks the available parallelism).
    pub fn new(config: &TerrainConfig, source: Arc<E>) -> Result<Self, RuntimeError> {
        config.validate()?;
        let settings = config.patch_settings()?;
        let (apply_tx, apply_rx) = unbounded::<ApplyCommand>();
        let (done_tx, done_rx) = unbounded::<()>();

        let workers = match config.runtime.workers {
            0 => thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            n => n,
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("quilt-lod-{i}"))
            .build()?;

        let r = config.runtime.grid_radius.max(0);
        let mut patches = Vec::new();
        let mut index = HashMap::new();
        for z in -r..=r {
            for x in -r..=r {
                let id = PatchId::new(x, z);
                index.insert(id, patches.len());
                patches.push(Arc::new(Patch::new(
                    id,
                    settings,
                    Arc::clone(&source),
                    apply_tx.clone(),
                )));
            }
        }
        log::info!(
            target: "lod",
            "runtime: {} patches (radius {}), max_detail={} scale={} workers={}",
            patches.len(),
            r,
            settings.max_detail(),
            settings.scale(),
            workers
        );
        Ok(Self {
            settings,
            patches,
            index,
            pool,
            apply_rx,
            inflight: Arc::new(AtomicUsize::new(0)),
            done_tx,
            done_rx,
            workers,
        })
    }

    #[inline]
    pub fn settings(&self) -> &PatchSettings {
        &self.settings
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patch(&self, id: PatchId) -> Option<&Arc<Patch<E>>> {
        self.index.get(&id).map(|&i| &self.patches[i])
    }

    pub fn patches(&self) -> impl Iterator<Item = &Arc<Patch<E>>> {
        self.patches.iter()
    }

    /// Requests the LOD for `reference` on every patch in parallel and waits.
    /// Every patch is attempted; the first generation error is returned.
    pub fn request_all(&self, reference: Vec3) -> Result<RequestSummary, RuntimeError> {
        let t0 = Instant::now();
        let results: Vec<Result<LodOutcome, MeshError>> = self.pool.install(|| {
            self.patches
                .par_iter()
                .map(|p| p.request_lod(reference))
                .collect()
        });
        let mut summary = RequestSummary::default();
        let mut first_err = None;
        for res in results {
            match res {
                Ok(outcome) => summary.count(&outcome),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        log::info!(
            target: "perf",
            "ms={:.2} request_all ref=({:.2}, {:.2}, {:.2}) built={} hits={} unchanged={} stale={}",
            t0.elapsed().as_secs_f64() * 1000.0,
            reference.x,
            reference.y,
            reference.z,
            summary.built,
            summary.cache_hits,
            summary.unchanged,
            summary.stale
        );
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(summary),
        }
    }

    /// Queues a request for every patch without waiting. Failures are logged.
    pub fn submit_all(&self, reference: Vec3) {
        for p in &self.patches {
            let p = Arc::clone(p);
            let inflight = Arc::clone(&self.inflight);
            let done = self.done_tx.clone();
            inflight.fetch_add(1, Ordering::SeqCst);
            self.pool.spawn(move || {
                if let Err(e) = p.request_lod(reference) {
                    let id = p.id();
                    log::warn!(target: "lod", "patch=({}, {}) request failed: {}", id.x, id.z, e);
                }
                inflight.fetch_sub(1, Ordering::SeqCst);
                let _ = done.send(());
            });
        }
    }

    /// Requests queued by `submit_all` that have not finished yet.
    pub fn pending(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    /// Blocks until every request queued by `submit_all` has finished.
    pub fn wait_idle(&self) {
        // Each finished task signals once after leaving the in-flight count.
        while self.pending() > 0 {
            if self.done_rx.recv().is_err() {
                break;
            }
        }
    }

    /// Commands committed since the last drain, in commit order per patch.
    pub fn drain_apply_commands(&self) -> Vec<ApplyCommand> {
        self.apply_rx.try_iter().collect()
    }

    pub fn stats(&self) -> RuntimeStats {
        self.patches
            .iter()
            .map(|p| p.stats())
            .fold(
                RuntimeStats {
                    patches: self.patches.len(),
                    ..Default::default()
                },
                |mut acc, s| {
                    acc.requests += s.requests;
                    acc.unchanged += s.unchanged;
                    acc.cache_hits += s.cache_hits;
                    acc.generated += s.generated;
                    acc.stale += s.stale;
                    acc.cache_entries += s.cache_entries;
                    acc
                },
            )
    }
}
