use quilt_geom::{GridPos, Vec3};

/// Cache and request key: subdivision level plus the reference point
/// quantized to half a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LodKey {
    pub level: u32,
    pub reference: GridPos,
}

impl LodKey {
    #[inline]
    pub fn new(level: u32, reference: Vec3, scale: f32) -> Self {
        Self {
            level,
            reference: reference.snap(key_cell(scale)),
        }
    }
}

/// One accepted LOD request. `version` grows by one per request that was not
/// short-circuited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub version: u64,
    pub key: LodKey,
}

#[inline]
fn key_cell(scale: f32) -> f32 {
    scale * 0.5
}

/// Snaps `reference` onto the half-patch grid used for cache keys. Every patch
/// of a terrain canonicalizes the same way, so the level a patch predicts for
/// its neighbor matches what that neighbor selects for itself, and a cached
/// mesh depends on nothing but its key.
#[inline]
pub fn canonical_reference(reference: Vec3, scale: f32) -> Vec3 {
    reference.snapped(key_cell(scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_references_share_a_key() {
        let a = LodKey::new(4, Vec3::new(1.1, 0.0, -2.2), 1.0);
        let b = LodKey::new(4, Vec3::new(0.9, 0.1, -2.05), 1.0);
        assert_eq!(a, b);
        assert_eq!(a.reference, GridPos::new(2, 0, -4));
    }

    #[test]
    fn level_is_part_of_the_key() {
        let a = LodKey::new(4, Vec3::ZERO, 1.0);
        let b = LodKey::new(8, Vec3::ZERO, 1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_reference_is_a_fixed_point() {
        let r = canonical_reference(Vec3::new(3.3, 1.2, -0.7), 2.0);
        assert_eq!(r, Vec3::new(3.0, 1.0, -1.0));
        assert_eq!(canonical_reference(r, 2.0), r);
        assert_eq!(LodKey::new(2, r, 2.0).reference, GridPos::new(3, 1, -1));
    }
}
