use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crossbeam_channel::Sender;
use hashbrown::HashMap;
use quilt_geom::Vec3;
use quilt_mesh_cpu::{MeshError, PatchMesh, build_patch_mesh, clamp_level, select_level};
use quilt_world::{ElevationSource, PatchSettings};

use crate::apply::{ApplyCommand, PatchId};
use crate::lod_key::{LodKey, RequestTicket, canonical_reference};

/// What a single `request_lod` call ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodOutcome {
    /// The applied mesh already matches the requested key.
    Unchanged(LodKey),
    /// A cached mesh was applied without generating.
    CacheHit(RequestTicket),
    /// A new mesh was generated, cached and applied.
    Built(RequestTicket),
    /// A newer request superseded this one while it was generating. The mesh
    /// went nowhere.
    Stale(RequestTicket),
}

impl LodOutcome {
    pub fn key(&self) -> LodKey {
        match *self {
            LodOutcome::Unchanged(key) => key,
            LodOutcome::CacheHit(t) | LodOutcome::Built(t) | LodOutcome::Stale(t) => t.key,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub requests: u64,
    pub unchanged: u64,
    pub cache_hits: u64,
    pub generated: u64,
    pub stale: u64,
    pub cache_entries: usize,
}

#[derive(Default)]
struct PatchState {
    // Append-only: entries are never replaced or evicted.
    cache: HashMap<LodKey, Arc<PatchMesh>>,
    current: Option<RequestTicket>,
    applied: Option<RequestTicket>,
    next_version: u64,
}

/// One square tile of terrain. Owns its mesh cache and the bookkeeping that
/// keeps slow generations from overwriting newer results.
pub struct Patch<E: ElevationSource + ?Sized> {
    id: PatchId,
    anchor: Vec3,
    settings: PatchSettings,
    source: Arc<E>,
    apply_tx: Sender<ApplyCommand>,
    state: Mutex<PatchState>,
    requests: AtomicU64,
    unchanged: AtomicU64,
    cache_hits: AtomicU64,
    generated: AtomicU64,
    stale: AtomicU64,
}

impl<E: ElevationSource + ?Sized> Patch<E> {
    pub fn new(
        id: PatchId,
        settings: PatchSettings,
        source: Arc<E>,
        apply_tx: Sender<ApplyCommand>,
    ) -> Self {
        let s = settings.scale();
        Self {
            id,
            anchor: Vec3::new(id.x as f32 * s, 0.0, id.z as f32 * s),
            settings,
            source,
            apply_tx,
            state: Mutex::new(PatchState::default()),
            requests: AtomicU64::new(0),
            unchanged: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            generated: AtomicU64::new(0),
            stale: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn id(&self) -> PatchId {
        self.id
    }

    #[inline]
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    #[inline]
    pub fn settings(&self) -> &PatchSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, PatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Level this patch selects for `reference`.
    pub fn level_for(&self, reference: Vec3) -> u32 {
        let reference = canonical_reference(reference, self.settings.scale());
        let level = select_level(
            self.anchor,
            reference,
            self.settings.max_detail(),
            self.settings.scale(),
        );
        clamp_level(level, self.settings.max_detail())
    }

    /// Brings the patch to the detail appropriate for `reference`.
    ///
    /// Reuses the applied or a cached mesh when the key matches, otherwise
    /// generates one outside the lock. A result is only applied if no newer
    /// request arrived in the meantime. Generation errors leave the applied
    /// mesh and the cache untouched.
    pub fn request_lod(&self, reference: Vec3) -> Result<LodOutcome, MeshError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let scale = self.settings.scale();
        let reference = canonical_reference(reference, scale);
        let level = clamp_level(
            select_level(self.anchor, reference, self.settings.max_detail(), scale),
            self.settings.max_detail(),
        );
        let key = LodKey::new(level, reference, scale);

        let ticket = {
            let mut st = self.lock();
            if let Some(applied) = st.applied.filter(|t| t.key == key) {
                // Builds still running for another key are now superseded.
                st.current = Some(applied);
                self.unchanged.fetch_add(1, Ordering::Relaxed);
                return Ok(LodOutcome::Unchanged(key));
            }
            st.next_version += 1;
            let ticket = RequestTicket {
                version: st.next_version,
                key,
            };
            st.current = Some(ticket);
            if let Some(mesh) = st.cache.get(&key).cloned() {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                self.apply_locked(&mut st, ticket, mesh);
                log::trace!(
                    target: "lod",
                    "patch=({}, {}) cache hit level={} v{}",
                    self.id.x,
                    self.id.z,
                    level,
                    ticket.version
                );
                return Ok(LodOutcome::CacheHit(ticket));
            }
            ticket
        };

        let t0 = Instant::now();
        let mesh = build_patch_mesh(&*self.source, self.anchor, &self.settings, level, reference)
            .inspect_err(|e| {
                log::warn!(
                    target: "lod",
                    "patch=({}, {}) level={} generation failed: {}",
                    self.id.x,
                    self.id.z,
                    level,
                    e
                );
            })?;
        let ms = t0.elapsed().as_secs_f64() * 1000.0;

        let mut st = self.lock();
        let current = match st.current {
            Some(cur) if cur.key == key => cur,
            _ => {
                self.stale.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    target: "lod",
                    "patch=({}, {}) drop stale level={} v{}",
                    self.id.x,
                    self.id.z,
                    level,
                    ticket.version
                );
                return Ok(LodOutcome::Stale(ticket));
            }
        };
        self.generated.fetch_add(1, Ordering::Relaxed);
        let mesh = st.cache.entry(key).or_insert_with(|| Arc::new(mesh)).clone();
        self.apply_locked(&mut st, current, mesh);
        log::debug!(
            target: "perf",
            "ms={:.2} patch_lod patch=({}, {}) level={} v{}",
            ms,
            self.id.x,
            self.id.z,
            level,
            current.version
        );
        Ok(LodOutcome::Built(current))
    }

    // Sends the mesh to the owning thread. Skips tickets already applied so
    // concurrent builders of one key produce a single command.
    fn apply_locked(&self, st: &mut PatchState, ticket: RequestTicket, mesh: Arc<PatchMesh>) {
        if st.applied == Some(ticket) {
            return;
        }
        st.applied = Some(ticket);
        let cmd = ApplyCommand {
            patch: self.id,
            version: ticket.version,
            key: ticket.key,
            mesh,
        };
        if let Err(e) = self.apply_tx.send(cmd) {
            log::warn!(
                target: "lod",
                "patch=({}, {}) apply channel closed, dropping v{}",
                self.id.x,
                self.id.z,
                e.0.version
            );
        }
    }

    pub fn applied_key(&self) -> Option<LodKey> {
        self.lock().applied.map(|t| t.key)
    }

    pub fn current_ticket(&self) -> Option<RequestTicket> {
        self.lock().current
    }

    pub fn cache_len(&self) -> usize {
        self.lock().cache.len()
    }

    pub fn cached(&self, key: &LodKey) -> Option<Arc<PatchMesh>> {
        self.lock().cache.get(key).cloned()
    }

    pub fn stats(&self) -> PatchStats {
        PatchStats {
            requests: self.requests.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            generated: self.generated.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            cache_entries: self.cache_len(),
        }
    }
}
