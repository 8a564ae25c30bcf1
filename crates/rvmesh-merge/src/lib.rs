//! Consolidates tessellated nodes into per-color mesh batches.
//!
//! Every node with the same packed color lands in one vertex/index buffer
//! pair, with a draw range per node so viewers can still pick and hide
//! individual groups. Welding, simplification and degenerate removal run
//! per node before its buffers are appended, so node seams stay put.
//! Coordinates rotate from the source Z-up convention into glTF Y-up here.

#![warn(missing_docs)]

mod clean;
mod simplify;
mod weld;

use std::collections::{BTreeMap, BTreeSet};

use rvmesh_math::{rotate_z_up_to_y_up, Vec3f};
use rvmesh_model::{FinalizedNode, TriangulationStore};

pub use clean::{remove_degenerate, DegenerateStats};
pub use simplify::{simplify, SimplifyResult};
pub use weld::weld;

/// Knobs for the consolidation pass.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Drop childless nodes without geometry before batching.
    pub prune_empty: bool,
    /// Weld and clean each node's buffers.
    pub weld: bool,
    /// Weld quantization, decimal digits.
    pub weld_precision: u8,
    /// Target triangle ratio for simplification; 0 disables it.
    pub simplify_ratio: f32,
    /// Simplification error bound in world units; 0 means unbounded.
    pub simplify_target_error: f32,
}

/// One draw range inside a color batch, in index units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    /// Node the range belongs to.
    pub node_id: u32,
    /// First index of the range.
    pub start: u32,
    /// Number of indices.
    pub count: u32,
}

/// All geometry of one packed color, merged into single buffers.
#[derive(Debug, Clone)]
pub struct ColorBatch {
    /// Packed 0xAARRGGBB color shared by every range in the batch.
    pub color_with_alpha: u32,
    /// Flat xyz positions, Y-up.
    pub positions: Vec<f32>,
    /// Triangle indices into `positions`.
    pub indices: Vec<u32>,
    /// Per-node ranges covering `indices` end to end.
    pub draw_ranges: Vec<DrawRange>,
    /// Position minimum per axis.
    pub min: [f32; 3],
    /// Position maximum per axis.
    pub max: [f32; 3],
}

impl ColorBatch {
    fn new(color_with_alpha: u32) -> Self {
        ColorBatch {
            color_with_alpha,
            positions: Vec::new(),
            indices: Vec::new(),
            draw_ranges: Vec::new(),
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }
}

/// Removes nodes that have no geometry and no remaining children.
///
/// Runs to a fixed point so empty branches disappear wholesale. Returns the
/// number of nodes removed.
pub fn prune_empty_nodes(nodes: &mut BTreeMap<u32, FinalizedNode>) -> usize {
    let mut removed = 0;
    loop {
        let parents: BTreeSet<u32> = nodes
            .values()
            .filter_map(|n| n.parent_id)
            .collect();
        let empty: Vec<u32> = nodes
            .values()
            .filter(|n| n.primitives.is_empty() && !parents.contains(&n.id))
            .map(|n| n.id)
            .collect();
        if empty.is_empty() {
            return removed;
        }
        for id in empty {
            nodes.remove(&id);
            removed += 1;
        }
    }
}

/// Merges all nodes of one root into per-color batches.
///
/// `colors` is the set of packed colors seen while reading the root; colors
/// without any surviving geometry yield no batch.
pub fn consolidate(
    nodes: &mut BTreeMap<u32, FinalizedNode>,
    store: &TriangulationStore,
    colors: &BTreeSet<u32>,
    opts: &MergeOptions,
) -> Vec<ColorBatch> {
    if opts.prune_empty {
        let removed = prune_empty_nodes(nodes);
        if removed > 0 {
            tracing::debug!(removed, "pruned empty nodes");
        }
    }

    let mut batches = Vec::new();
    for &color in colors {
        let mut batch = ColorBatch::new(color);
        for node in nodes.values() {
            if node.color_with_alpha != color || node.primitives.is_empty() {
                continue;
            }
            let (indices, positions) = node_buffers(node, store, opts);
            if indices.is_empty() {
                continue;
            }
            append_node(&mut batch, node.id, &indices, &positions);
        }
        if !batch.indices.is_empty() {
            batches.push(batch);
        }
    }
    batches
}

/// Concatenates one node's triangulations, rotating into Y-up, then welds
/// and cleans when enabled.
fn node_buffers(
    node: &FinalizedNode,
    store: &TriangulationStore,
    opts: &MergeOptions,
) -> (Vec<u32>, Vec<f32>) {
    let mut positions: Vec<f32> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    for prim in &node.primitives {
        let tri = store.get(prim.triangulation);
        let base = (positions.len() / 3) as u32;
        for v in tri.vertices.chunks_exact(3) {
            let p = rotate_z_up_to_y_up(Vec3f::new(v[0], v[1], v[2]));
            positions.extend_from_slice(&[p.x, p.y, p.z]);
        }
        indices.extend(tri.indices.iter().map(|&i| i + base));
    }

    if !opts.weld {
        return (indices, positions);
    }

    let (mut indices, positions) = weld(&indices, &positions, opts.weld_precision);
    if opts.simplify_ratio > 0.0 && opts.simplify_ratio < 1.0 {
        let result = simplify(
            &indices,
            &positions,
            opts.simplify_ratio,
            opts.simplify_target_error,
        );
        tracing::trace!(
            node = node.id,
            before = indices.len() / 3,
            after = result.indices.len() / 3,
            error = result.error,
            "simplified node"
        );
        indices = result.indices;
    }
    let (cleaned, stats) = remove_degenerate(&indices, &positions);
    if stats.total() > 0 {
        tracing::trace!(
            node = node.id,
            duplicate_index = stats.duplicate_index,
            coincident = stats.coincident,
            zero_area = stats.zero_area,
            "dropped degenerate triangles"
        );
    }
    // Rewelding compacts away vertices orphaned by the cleanup.
    let (indices, positions) = weld(&cleaned, &positions, opts.weld_precision);
    (indices, positions)
}

fn append_node(batch: &mut ColorBatch, node_id: u32, indices: &[u32], positions: &[f32]) {
    let base = (batch.positions.len() / 3) as u32;
    let start = batch.indices.len() as u32;
    batch.positions.extend_from_slice(positions);
    batch.indices.extend(indices.iter().map(|&i| i + base));
    batch.draw_ranges.push(DrawRange {
        node_id,
        start,
        count: indices.len() as u32,
    });
    for p in positions.chunks_exact(3) {
        for a in 0..3 {
            batch.min[a] = batch.min[a].min(p[a]);
            batch.max[a] = batch.max[a].max(p[a]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvmesh_model::{GeometryType, NodePrim, Triangulation};

    fn options() -> MergeOptions {
        MergeOptions {
            prune_empty: true,
            weld: true,
            weld_precision: 3,
            simplify_ratio: 0.0,
            simplify_target_error: 0.0,
        }
    }

    fn triangle(store: &mut TriangulationStore, z: f32) -> NodePrim {
        let id = store.push(Triangulation {
            vertices: vec![0.0, 0.0, z, 1.0, 0.0, z, 0.0, 1.0, z],
            indices: vec![0, 1, 2],
            error: 0.0,
        });
        NodePrim {
            geo_type: GeometryType::Primitive,
            opacity: 100,
            triangulation: id,
        }
    }

    fn node(id: u32, parent: Option<u32>, color: u32, prims: Vec<NodePrim>) -> FinalizedNode {
        FinalizedNode {
            id,
            parent_id: parent,
            name: format!("group {id}"),
            material_rgb: color & 0x00ff_ffff,
            opacity: 100,
            color_with_alpha: color,
            primitives: prims,
        }
    }

    #[test]
    fn batches_partition_by_color() {
        let mut store = TriangulationStore::new();
        let p1 = triangle(&mut store, 0.0);
        let p2 = triangle(&mut store, 1.0);
        let mut nodes = BTreeMap::new();
        nodes.insert(1, node(1, None, 0xffcc0000, vec![p1]));
        nodes.insert(2, node(2, Some(1), 0xff00cc00, vec![p2]));
        let colors = BTreeSet::from([0xffcc0000, 0xff00cc00]);

        let batches = consolidate(&mut nodes, &store, &colors, &options());
        assert_eq!(batches.len(), 2);
        // BTreeSet iteration is ascending by packed value.
        assert_eq!(batches[0].color_with_alpha, 0xff00cc00);
        assert_eq!(batches[1].color_with_alpha, 0xffcc0000);
        for batch in &batches {
            assert_eq!(batch.draw_ranges.len(), 1);
            assert_eq!(batch.indices.len(), 3);
        }
    }

    #[test]
    fn draw_ranges_cover_indices_end_to_end() {
        let mut store = TriangulationStore::new();
        let p1 = triangle(&mut store, 0.0);
        let p2 = triangle(&mut store, 2.0);
        let mut nodes = BTreeMap::new();
        nodes.insert(1, node(1, None, 0xffcc0000, vec![p1]));
        nodes.insert(2, node(2, Some(1), 0xffcc0000, vec![p2]));
        let colors = BTreeSet::from([0xffcc0000]);

        let batches = consolidate(&mut nodes, &store, &colors, &options());
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.draw_ranges.len(), 2);
        assert_eq!(batch.draw_ranges[0], DrawRange { node_id: 1, start: 0, count: 3 });
        assert_eq!(batch.draw_ranges[1], DrawRange { node_id: 2, start: 3, count: 3 });
        assert_eq!(batch.indices.len(), 6);
        let bound = (batch.positions.len() / 3) as u32;
        assert!(batch.indices.iter().all(|&i| i < bound));
    }

    #[test]
    fn vertices_rotate_into_y_up() {
        let mut store = TriangulationStore::new();
        let id = store.push(Triangulation {
            vertices: vec![1.0, 2.0, 3.0, 4.0, 2.0, 3.0, 1.0, 5.0, 3.0],
            indices: vec![0, 1, 2],
            error: 0.0,
        });
        let prim = NodePrim {
            geo_type: GeometryType::Primitive,
            opacity: 100,
            triangulation: id,
        };
        let mut nodes = BTreeMap::new();
        nodes.insert(1, node(1, None, 0xffcc0000, vec![prim]));
        let colors = BTreeSet::from([0xffcc0000]);

        let batches = consolidate(&mut nodes, &store, &colors, &options());
        let p = &batches[0].positions[0..3];
        assert_eq!(p, &[1.0, 3.0, -2.0]);
    }

    #[test]
    fn shared_prim_vertices_weld_within_a_node() {
        let mut store = TriangulationStore::new();
        // Two prims sharing the edge (1,0,0)-(0,1,0).
        let a = store.push(Triangulation {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            error: 0.0,
        });
        let b = store.push(Triangulation {
            vertices: vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            error: 0.0,
        });
        let prims = vec![
            NodePrim { geo_type: GeometryType::Primitive, opacity: 100, triangulation: a },
            NodePrim { geo_type: GeometryType::Primitive, opacity: 100, triangulation: b },
        ];
        let mut nodes = BTreeMap::new();
        nodes.insert(1, node(1, None, 0xffcc0000, prims));
        let colors = BTreeSet::from([0xffcc0000]);

        let batches = consolidate(&mut nodes, &store, &colors, &options());
        assert_eq!(batches[0].positions.len() / 3, 4);
        assert_eq!(batches[0].indices.len(), 6);
    }

    #[test]
    fn empty_leaves_prune_recursively() {
        let mut nodes = BTreeMap::new();
        nodes.insert(1, node(1, None, 0, vec![]));
        nodes.insert(2, node(2, Some(1), 0, vec![]));
        nodes.insert(3, node(3, Some(2), 0, vec![]));
        let removed = prune_empty_nodes(&mut nodes);
        assert_eq!(removed, 3);
        assert!(nodes.is_empty());
    }

    #[test]
    fn parent_of_surviving_child_is_kept() {
        let mut store = TriangulationStore::new();
        let p = triangle(&mut store, 0.0);
        let mut nodes = BTreeMap::new();
        nodes.insert(1, node(1, None, 0xffcc0000, vec![]));
        nodes.insert(2, node(2, Some(1), 0xffcc0000, vec![p]));
        nodes.insert(3, node(3, Some(1), 0xffcc0000, vec![]));
        let removed = prune_empty_nodes(&mut nodes);
        assert_eq!(removed, 1);
        assert!(nodes.contains_key(&1));
        assert!(nodes.contains_key(&2));
        assert!(!nodes.contains_key(&3));
    }

    #[test]
    fn batch_bounds_cover_all_positions() {
        let mut store = TriangulationStore::new();
        let p = triangle(&mut store, 5.0);
        let mut nodes = BTreeMap::new();
        nodes.insert(1, node(1, None, 0xffcc0000, vec![p]));
        let colors = BTreeSet::from([0xffcc0000]);
        let batches = consolidate(&mut nodes, &store, &colors, &options());
        let batch = &batches[0];
        // Y-up: z = 5 becomes y = 5, y extent becomes -z.
        assert_eq!(batch.min, [0.0, 5.0, -1.0]);
        assert_eq!(batch.max, [1.0, 5.0, 0.0]);
    }
}
