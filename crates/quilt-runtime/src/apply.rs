use std::sync::Arc;

use hashbrown::HashMap;
use quilt_mesh_cpu::PatchMesh;

use crate::lod_key::LodKey;

/// Integer tile coordinate of a patch on the terrain grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId {
    pub x: i32,
    pub z: i32,
}

impl PatchId {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// A committed mesh, handed to whoever owns render submission. Generation may
/// run on any thread; commands are meant to be drained and applied on the
/// owning thread.
#[derive(Clone, Debug)]
pub struct ApplyCommand {
    pub patch: PatchId,
    pub version: u64,
    pub key: LodKey,
    pub mesh: Arc<PatchMesh>,
}

#[derive(Clone, Debug)]
pub struct ShownMesh {
    pub version: u64,
    pub key: LodKey,
    pub mesh: Arc<PatchMesh>,
}

/// Owner-side view of what each patch currently displays.
#[derive(Default)]
pub struct MeshSlots {
    shown: HashMap<PatchId, ShownMesh>,
    applied: u64,
    ignored: u64,
}

impl MeshSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `cmd.mesh` for its patch unless a newer version is already shown.
    /// Returns whether the slot changed.
    pub fn apply(&mut self, cmd: ApplyCommand) -> bool {
        if let Some(cur) = self.shown.get(&cmd.patch) {
            if cur.version >= cmd.version {
                self.ignored += 1;
                log::trace!(
                    target: "lod",
                    "ignore apply patch=({}, {}) v{} <= shown v{}",
                    cmd.patch.x,
                    cmd.patch.z,
                    cmd.version,
                    cur.version
                );
                return false;
            }
        }
        self.shown.insert(
            cmd.patch,
            ShownMesh {
                version: cmd.version,
                key: cmd.key,
                mesh: cmd.mesh,
            },
        );
        self.applied += 1;
        true
    }

    /// Applies every command in order; returns how many changed a slot.
    pub fn apply_all(&mut self, cmds: impl IntoIterator<Item = ApplyCommand>) -> usize {
        cmds.into_iter().map(|c| self.apply(c) as usize).sum()
    }

    pub fn get(&self, id: PatchId) -> Option<&ShownMesh> {
        self.shown.get(&id)
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PatchId, &ShownMesh)> {
        self.shown.iter()
    }

    pub fn total_triangles(&self) -> usize {
        self.shown.values().map(|s| s.mesh.triangle_count()).sum()
    }

    /// Largest height mismatch along the border shared by the shown meshes of
    /// `a` and `b`, where `b` is the +X or +Z neighbor of `a`. `None` if either
    /// patch shows nothing or they are not adjacent that way.
    pub fn seam_gap(&self, a: PatchId, b: PatchId) -> Option<f32> {
        let ma = &self.shown.get(&a)?.mesh;
        let mb = &self.shown.get(&b)?.mesh;
        let along_x = match (b.x - a.x, b.z - a.z) {
            (1, 0) => true,
            (0, 1) => false,
            _ => return None,
        };
        let edge = |m: &PatchMesh, at: u32| -> Vec<f32> {
            (0..=m.level)
                .map(|i| if along_x { m.height_at(at, i) } else { m.height_at(i, at) })
                .collect()
        };
        Some(profile_gap(&edge(ma, ma.level), &edge(mb, 0)))
    }

    /// (applied, ignored) command counts.
    pub fn counts(&self) -> (u64, u64) {
        (self.applied, self.ignored)
    }
}

// Compares two edge profiles spanning the same border; the denser one is
// checked against the piecewise-linear interpolation of the coarser one.
fn profile_gap(a: &[f32], b: &[f32]) -> f32 {
    let (dense, coarse) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if dense.len() < 2 || coarse.len() < 2 {
        return 0.0;
    }
    let n = (dense.len() - 1) as f32;
    let segs = coarse.len() - 1;
    dense
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let p = i as f32 / n * segs as f32;
            let j = (p.floor() as usize).min(segs - 1);
            let f = p - j as f32;
            let want = coarse[j] + (coarse[j + 1] - coarse[j]) * f;
            (h - want).abs()
        })
        .fold(0.0, f32::max)
}
