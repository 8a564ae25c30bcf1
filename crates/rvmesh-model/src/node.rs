//! Scene nodes produced by the group traversal.

use crate::geometry::GeometryType;
use crate::triangulation::TriId;

/// One tessellated primitive attached to a node.
#[derive(Debug, Clone, Copy)]
pub struct NodePrim {
    /// Record family of the source primitive.
    pub geo_type: GeometryType,
    /// Opacity in percent, 0..=100.
    pub opacity: u8,
    /// Handle to the triangulated surface in the per-root store.
    pub triangulation: TriId,
}

/// A finished scene node, ready for merging and export.
///
/// A source group yields one node per record family present in it, so the
/// primitives of a node all share a [`GeometryType`].
#[derive(Debug, Clone)]
pub struct FinalizedNode {
    /// Node id, unique within the root and used in the exported hierarchy.
    pub id: u32,
    /// Parent node id; `None` for the root group.
    pub parent_id: Option<u32>,
    /// Group name, suffixed for obstruction and insulation partitions.
    pub name: String,
    /// Material color as 0xRRGGBB.
    pub material_rgb: u32,
    /// Opacity in percent, 0..=100.
    pub opacity: u8,
    /// Opacity and color packed as 0xAARRGGBB; one exported mesh batch is
    /// produced per distinct value.
    pub color_with_alpha: u32,
    /// Tessellated primitives belonging to this node.
    pub primitives: Vec<NodePrim>,
}

/// Packs a percent opacity and an RGB color into the 0xAARRGGBB batch key.
pub fn pack_color_with_alpha(opacity: u8, rgb: u32) -> u32 {
    let alpha = (opacity as u32 * 255) / 100;
    (alpha << 24) | (rgb & 0x00ff_ffff)
}
