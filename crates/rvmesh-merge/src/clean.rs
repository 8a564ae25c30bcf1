//! Degenerate triangle removal.

use rvmesh_math::Vec3f;

/// Counts of triangles dropped by [`remove_degenerate`], by cause.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DegenerateStats {
    /// Triangles referencing the same vertex index twice.
    pub duplicate_index: usize,
    /// Triangles with two bitwise identical corner positions.
    pub coincident: usize,
    /// Triangles with near-zero area.
    pub zero_area: usize,
}

impl DegenerateStats {
    /// Total triangles removed.
    pub fn total(&self) -> usize {
        self.duplicate_index + self.coincident + self.zero_area
    }
}

const MIN_AREA: f32 = 1e-8;

/// Drops triangles that cannot contribute to the rendered surface.
///
/// Welding and simplification both produce collapsed triangles; removing
/// them here keeps the exported buffers clean.
pub fn remove_degenerate(indices: &[u32], positions: &[f32]) -> (Vec<u32>, DegenerateStats) {
    let mut out = Vec::with_capacity(indices.len());
    let mut stats = DegenerateStats::default();

    let point = |i: u32| {
        let p = &positions[3 * i as usize..3 * i as usize + 3];
        Vec3f::new(p[0], p[1], p[2])
    };

    for t in indices.chunks_exact(3) {
        let (i0, i1, i2) = (t[0], t[1], t[2]);
        if i0 == i1 || i1 == i2 || i2 == i0 {
            stats.duplicate_index += 1;
            continue;
        }
        let (a, b, c) = (point(i0), point(i1), point(i2));
        if a == b || b == c || c == a {
            stats.coincident += 1;
            continue;
        }
        let area = 0.5 * (b - a).cross(&(c - a)).norm();
        if area < MIN_AREA {
            stats.zero_area += 1;
            continue;
        }
        out.extend_from_slice(t);
    }
    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_index_triangle_is_removed() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let (out, stats) = remove_degenerate(&[0, 1, 2, 1, 1, 2], &positions);
        assert_eq!(out, vec![0, 1, 2]);
        assert_eq!(stats.duplicate_index, 1);
        assert_eq!(stats.total(), 1);
    }

    #[test]
    fn coincident_positions_are_removed() {
        // Distinct indices, identical coordinates.
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let (out, stats) = remove_degenerate(&[0, 1, 2], &positions);
        assert!(out.is_empty());
        assert_eq!(stats.coincident, 1);
    }

    #[test]
    fn sliver_triangle_is_removed() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.5, 1e-9, 0.0];
        let (out, stats) = remove_degenerate(&[0, 1, 2], &positions);
        assert!(out.is_empty());
        assert_eq!(stats.zero_area, 1);
    }

    #[test]
    fn unit_triangle_survives() {
        let positions = [0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let (out, stats) = remove_degenerate(&[0, 1, 2], &positions);
        assert_eq!(out.len(), 3);
        assert_eq!(stats.total(), 0);
    }
}
