/// Border classification of a grid vertex.
///
/// A tagged vertex sits strictly inside one border at an odd index; a
/// neighbor with half the subdivision has no vertex there. `Left`/`Right` are
/// the `x == 0` / `x == level` borders, `Down`/`Up` the `z == 0` / `z == level`
/// borders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeTag {
    None,
    Left,
    Right,
    Up,
    Down,
}

impl EdgeTag {
    pub const BORDERS: [EdgeTag; 4] = [EdgeTag::Left, EdgeTag::Right, EdgeTag::Down, EdgeTag::Up];

    #[inline]
    pub fn is_border(self) -> bool {
        self != EdgeTag::None
    }

    /// Direction to the adjacent patch in patch units `(dx, dz)`.
    #[inline]
    pub fn neighbor_offset(self) -> (i32, i32) {
        match self {
            EdgeTag::None => (0, 0),
            EdgeTag::Left => (-1, 0),
            EdgeTag::Right => (1, 0),
            EdgeTag::Down => (0, -1),
            EdgeTag::Up => (0, 1),
        }
    }
}

/// Classifies grid coordinate `(x, z)` of a patch subdivided `level` times.
/// Corners are never tagged.
pub fn classify(x: u32, z: u32, level: u32) -> EdgeTag {
    let unaligned = |i: u32| i > 0 && i < level && (i & 1) == 1;
    if x == 0 && unaligned(z) {
        EdgeTag::Left
    } else if x == level && unaligned(z) {
        EdgeTag::Right
    } else if z == 0 && unaligned(x) {
        EdgeTag::Down
    } else if z == level && unaligned(x) {
        EdgeTag::Up
    } else {
        EdgeTag::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_has_no_unaligned_vertices() {
        for z in 0..=1 {
            for x in 0..=1 {
                assert_eq!(classify(x, z, 1), EdgeTag::None);
            }
        }
    }

    #[test]
    fn level_four_border_pattern() {
        assert_eq!(classify(1, 0, 4), EdgeTag::Down);
        assert_eq!(classify(2, 0, 4), EdgeTag::None);
        assert_eq!(classify(3, 0, 4), EdgeTag::Down);
        assert_eq!(classify(1, 4, 4), EdgeTag::Up);
        assert_eq!(classify(0, 3, 4), EdgeTag::Left);
        assert_eq!(classify(4, 1, 4), EdgeTag::Right);
        assert_eq!(classify(1, 1, 4), EdgeTag::None);
        assert_eq!(classify(0, 2, 4), EdgeTag::None);
    }

    #[test]
    fn offsets_point_at_neighbors() {
        assert_eq!(EdgeTag::Left.neighbor_offset(), (-1, 0));
        assert_eq!(EdgeTag::Right.neighbor_offset(), (1, 0));
        assert_eq!(EdgeTag::Down.neighbor_offset(), (0, -1));
        assert_eq!(EdgeTag::Up.neighbor_offset(), (0, 1));
        assert_eq!(EdgeTag::None.neighbor_offset(), (0, 0));
        assert!(EdgeTag::BORDERS.iter().all(|t| t.is_border()));
        assert!(!EdgeTag::None.is_border());
    }
}
