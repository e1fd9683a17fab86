use std::time::Instant;

use quilt_geom::Vec3;
use quilt_world::{ElevationSource, PatchSettings};

use crate::MeshError;
use crate::edge::classify;
use crate::lod::clamp_level;
use crate::mesh_build::PatchMesh;
use crate::seam::PatchSampler;

/// Builds the mesh of the patch anchored at `anchor` subdivided `level` times
/// (clamped into `[1, max_detail]`), with unaligned border vertices corrected
/// against the levels neighbors select for `reference`.
pub fn build_patch_mesh<E: ElevationSource + ?Sized>(
    source: &E,
    anchor: Vec3,
    settings: &PatchSettings,
    level: u32,
    reference: Vec3,
) -> Result<PatchMesh, MeshError> {
    let t0 = Instant::now();
    let level = clamp_level(level, settings.max_detail());
    let step = 1.0 / level as f32;
    let scale = settings.scale();
    let sampler = PatchSampler::new(source, anchor, *settings);

    let mut mesh = PatchMesh::with_level(level, anchor);
    for z in 0..=level {
        for x in 0..=level {
            let tag = classify(x, z, level);
            let y = sampler.adjusted_elevation(x, z, tag, step, level, reference)?;
            mesh.push_vertex(Vec3::new(
                x as f32 * step * scale,
                y,
                z as f32 * step * scale,
            ));
        }
    }
    for z in 0..level {
        for x in 0..level {
            let i00 = mesh.grid_index(x, z);
            let i01 = mesh.grid_index(x, z + 1);
            let i10 = mesh.grid_index(x + 1, z);
            let i11 = mesh.grid_index(x + 1, z + 1);
            mesh.add_cell(i00, i01, i10, i11);
        }
    }

    let us = t0.elapsed().as_micros();
    log::debug!(
        target: "perf",
        "us={} patch_build level={} anchor=({:.2}, {:.2}) verts={} tris={}",
        us,
        level,
        anchor.x,
        anchor.z,
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}
