use quilt_geom::{Aabb, Vec3};

/// Triangulated patch surface on a shared `(level + 1)^2` vertex grid.
///
/// Positions are patch-local (relative to `origin`), x/z in `[0, scale]`
/// and y the elevation. Vertex `(x, z)` lives at index `z * (level + 1) + x`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatchMesh {
    pub pos: Vec<f32>,
    pub idx: Vec<u32>,
    pub level: u32,
    pub origin: Vec3,
    pub bbox: Aabb,
}

impl PatchMesh {
    pub fn with_level(level: u32, origin: Vec3) -> Self {
        let side = (level + 1) as usize;
        let cells = (level as usize) * (level as usize);
        Self {
            pos: Vec::with_capacity(side * side * 3),
            idx: Vec::with_capacity(cells * 6),
            level,
            origin,
            bbox: Aabb::empty(),
        }
    }

    #[inline]
    pub fn grid_index(&self, x: u32, z: u32) -> u32 {
        z * (self.level + 1) + x
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, p: Vec3) -> u32 {
        let i = (self.pos.len() / 3) as u32;
        self.pos.extend_from_slice(&[p.x, p.y, p.z]);
        self.bbox.include(p);
        i
    }

    /// Emits the two triangles of one grid cell from its corners
    /// `00 = (x, z)`, `01 = (x, z + 1)`, `10 = (x + 1, z)`, `11 = (x + 1, z + 1)`.
    /// Both triangles wind counter-clockwise seen from +Y.
    #[inline]
    pub fn add_cell(&mut self, i00: u32, i01: u32, i10: u32, i11: u32) {
        self.idx.extend_from_slice(&[i00, i01, i10, i11, i10, i01]);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    #[inline]
    pub fn vertex(&self, i: u32) -> Vec3 {
        let o = i as usize * 3;
        Vec3::new(self.pos[o], self.pos[o + 1], self.pos[o + 2])
    }

    /// Elevation of grid vertex `(x, z)`.
    #[inline]
    pub fn height_at(&self, x: u32, z: u32) -> f32 {
        self.vertex(self.grid_index(x, z)).y
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.idx
            .chunks_exact(3)
            .map(|t| [self.vertex(t[0]), self.vertex(t[1]), self.vertex(t[2])])
    }

    /// Vertex positions translated into world space.
    pub fn world_positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.pos
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]) + self.origin)
    }

    pub fn world_bbox(&self) -> Aabb {
        self.bbox.translated(self.origin)
    }

    /// Returns a slice of interleaved vertex positions (x,y,z per vertex).
    pub fn positions(&self) -> &[f32] {
        &self.pos
    }

    pub fn indices(&self) -> &[u32] {
        &self.idx
    }
}
