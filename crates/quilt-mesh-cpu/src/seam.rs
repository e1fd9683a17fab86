use quilt_geom::Vec3;
use quilt_world::{ElevationSource, PatchSettings};

use crate::MeshError;
use crate::edge::EdgeTag;
use crate::lod::select_level;

/// Elevation sampling for one patch, including seam correction on unaligned
/// border vertices.
pub struct PatchSampler<'a, E: ElevationSource + ?Sized> {
    source: &'a E,
    anchor: Vec3,
    settings: PatchSettings,
}

impl<'a, E: ElevationSource + ?Sized> PatchSampler<'a, E> {
    pub fn new(source: &'a E, anchor: Vec3, settings: PatchSettings) -> Self {
        Self {
            source,
            anchor,
            settings,
        }
    }

    #[inline]
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// World-space (x, z) of grid coordinate `(x, z)` with the given step.
    #[inline]
    pub fn world_xz(&self, x: u32, z: u32, step: f32) -> (f32, f32) {
        let scale = self.settings.scale();
        (
            self.anchor.x + x as f32 * step * scale,
            self.anchor.z + z as f32 * step * scale,
        )
    }

    /// Raw elevation at a grid coordinate. Non-finite samples fail fast.
    pub fn sample(&self, x: u32, z: u32, step: f32) -> Result<f32, MeshError> {
        let (wx, wz) = self.world_xz(x, z, step);
        let value = self.source.elevation(wx, wz);
        if !value.is_finite() {
            return Err(MeshError::NonFiniteElevation { x: wx, z: wz, value });
        }
        Ok(value)
    }

    /// Level the adjacent patch across `tag` picks for `reference`, assuming it
    /// shares this patch's settings. `None` for untagged vertices.
    pub fn neighbor_level(&self, tag: EdgeTag, reference: Vec3) -> Option<u32> {
        if !tag.is_border() {
            return None;
        }
        let (dx, dz) = tag.neighbor_offset();
        let scale = self.settings.scale();
        let neighbor = self.anchor + Vec3::new(dx as f32 * scale, 0.0, dz as f32 * scale);
        Some(select_level(
            neighbor,
            reference,
            self.settings.max_detail(),
            scale,
        ))
    }

    /// Elevation of grid vertex `(x, z)` after seam correction. `tag` must be
    /// the classification of `(x, z)` at `level`.
    ///
    /// When the neighbor across the tagged border is coarser, the vertex is
    /// placed on the straight line between its two aligned border neighbors,
    /// which is exactly where the coarser patch's edge runs.
    pub fn adjusted_elevation(
        &self,
        x: u32,
        z: u32,
        tag: EdgeTag,
        step: f32,
        level: u32,
        reference: Vec3,
    ) -> Result<f32, MeshError> {
        let (lo, hi) = match tag {
            EdgeTag::None => return self.sample(x, z, step),
            EdgeTag::Left | EdgeTag::Right => ((x, z - 1), (x, z + 1)),
            EdgeTag::Up | EdgeTag::Down => ((x - 1, z), (x + 1, z)),
        };
        let coarser = matches!(self.neighbor_level(tag, reference), Some(n) if n < level);
        if !coarser {
            return self.sample(x, z, step);
        }
        let a = self.sample(lo.0, lo.1, step)?;
        let b = self.sample(hi.0, hi.1, step)?;
        Ok(a + (b - a) * 0.5)
    }
}
