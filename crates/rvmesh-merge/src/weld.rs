//! Vertex welding by coordinate quantization.

use std::collections::HashMap;

/// Rewrites `indices` against a deduplicated vertex list.
///
/// Positions are quantized to `10^-precision` units; vertices landing on the
/// same quantized point merge into one. Only vertices actually referenced by
/// `indices` are emitted, so welding also compacts away unused vertices.
pub fn weld(indices: &[u32], positions: &[f32], precision: u8) -> (Vec<u32>, Vec<f32>) {
    let scale = 10f64.powi(precision as i32);
    let quantize = |v: f32| (v as f64 * scale).round() as i64;

    let mut lookup: HashMap<[i64; 3], u32> = HashMap::new();
    let mut out_positions: Vec<f32> = Vec::new();
    let mut out_indices = Vec::with_capacity(indices.len());

    for &i in indices {
        let p = &positions[3 * i as usize..3 * i as usize + 3];
        let key = [quantize(p[0]), quantize(p[1]), quantize(p[2])];
        let next = (out_positions.len() / 3) as u32;
        let id = *lookup.entry(key).or_insert_with(|| {
            out_positions.extend_from_slice(p);
            next
        });
        out_indices.push(id);
    }
    (out_indices, out_positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coincident_vertices_merge() {
        // Two triangles sharing an edge, stored unshared.
        let positions = [
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
            1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let indices = [0, 1, 2, 3, 4, 5];
        let (idx, pos) = weld(&indices, &positions, 3);
        assert_eq!(pos.len() / 3, 4);
        assert_eq!(idx, vec![0, 1, 2, 1, 3, 2]);
    }

    #[test]
    fn weld_is_idempotent() {
        let positions = [
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
            1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let indices = [0, 1, 2, 3, 4, 5];
        let (idx1, pos1) = weld(&indices, &positions, 3);
        let (idx2, pos2) = weld(&idx1, &pos1, 3);
        assert_eq!(idx1, idx2);
        assert_eq!(pos1, pos2);
    }

    #[test]
    fn nearby_vertices_merge_at_coarse_precision() {
        let positions = [0.0, 0.0, 0.0, 0.0004, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices = [0, 1, 2];
        let (_, pos) = weld(&indices, &positions, 3);
        assert_eq!(pos.len() / 3, 2);
        let (_, pos) = weld(&indices, &positions, 6);
        assert_eq!(pos.len() / 3, 3);
    }

    #[test]
    fn unreferenced_vertices_are_dropped() {
        let positions = [
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 9.0, 9.0, 9.0,
        ];
        let indices = [0, 1, 2];
        let (_, pos) = weld(&indices, &positions, 3);
        assert_eq!(pos.len() / 3, 3);
    }
}
