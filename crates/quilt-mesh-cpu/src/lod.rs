//! Distance-based subdivision selection.
//!
//! Levels are powers of two so the grid lines of two adjacent patches either
//! coincide or one set is a strict superset of the other. Anchors one patch
//! apart differ in snapped distance by at most one patch unit, so neighboring
//! levels never differ by more than a factor of two.

use quilt_geom::Vec3;

/// Rounds `v` up to the next power of two (`0` and `1` map to `1`).
#[inline]
pub const fn round_up_pow2(v: u32) -> u32 {
    if v <= 1 {
        return 1;
    }
    let mut v = v - 1;
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v.wrapping_add(1)
}

/// Largest power of two not above `v`; `0` for `0`.
#[inline]
pub const fn floor_pow2(v: u32) -> u32 {
    if v == 0 { 0 } else { 1 << (31 - v.leading_zeros()) }
}

#[inline]
pub const fn is_pow2(v: u32) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

#[inline]
pub fn clamp_level(level: u32, max_detail: u32) -> u32 {
    level.clamp(1, max_detail.max(1))
}

/// Picks the subdivision level for the patch anchored at `anchor` as seen from
/// `reference`.
///
/// Both points are snapped to the patch grid first so sub-patch movement of
/// the reference does not change the result. Detail falls off linearly with
/// distance (in patch units), never drops below one quad, is rounded up to a
/// power of two and capped at the largest power of two within `max_detail`.
pub fn select_level(anchor: Vec3, reference: Vec3, max_detail: u32, scale: f32) -> u32 {
    let max_detail = max_detail.max(1);
    let distance = anchor.snap(scale).distance(reference.snap(scale));
    let raw = (max_detail as f32 - distance).floor().max(1.0) as u32;
    round_up_pow2(raw).min(floor_pow2(max_detail))
}
