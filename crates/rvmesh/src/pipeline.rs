//! Group traversal: turns the record stream into per-root exports.
//!
//! Groups at the export level become roots; everything below a root is
//! tessellated into its node tree, and when the root's group closes the tree
//! is consolidated and written out as one glTF binary. State is per root, so
//! arbitrarily many roots stream through constant memory plus one root's
//! worth of geometry.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use serde::Serialize;
use tracing::{debug, info, warn};

use rvmesh_merge::{consolidate, MergeOptions};
use rvmesh_model::{
    pack_color_with_alpha, FinalizedNode, GeometryType, NodePrim, TriangulationStore,
};
use rvmesh_rvm::{CntbBlock, Record, RvmReader};
use rvmesh_tessellate::TriangulationFactory;

use crate::{glb, ConvertError, ConvertOptions};

/// One exported root, as recorded in the status file.
#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
    /// Name of the root group.
    pub root_name: String,
    /// Hex digest of the root's record bytes.
    pub digest: String,
    /// Name of the written glTF binary.
    pub file_name: String,
}

/// Outcome of one conversion.
#[derive(Debug, Default)]
pub struct ConvertReport {
    /// Exported roots, in file order.
    pub models: Vec<ModelEntry>,
    /// Non-fatal problems encountered along the way.
    pub warnings: Vec<String>,
}

/// An open group below the export level.
struct GroupFrame {
    id: u32,
    name: String,
    material_rgb: u32,
    opacity: u8,
    prims: Vec<NodePrim>,
}

impl GroupFrame {
    fn new(id: u32, block: CntbBlock) -> Self {
        GroupFrame {
            id,
            name: block.name,
            material_rgb: block.material_rgb,
            opacity: block.opacity,
            prims: Vec::new(),
        }
    }
}

pub(crate) fn run<R: Read>(
    reader: &mut RvmReader<R>,
    opts: &ConvertOptions,
    report: &mut ConvertReport,
) -> Result<(), ConvertError> {
    let merge_opts = MergeOptions {
        prune_empty: opts.remove_empty,
        weld: opts.weld,
        weld_precision: opts.weld_precision,
        simplify_ratio: opts.simplify_ratio,
        simplify_target_error: opts.simplify_target_error,
    };
    let mut factory = TriangulationFactory::new(opts.tolerance);

    let mut level: u32 = 0;
    let mut frames: Vec<GroupFrame> = Vec::new();
    let mut nodes: BTreeMap<u32, FinalizedNode> = BTreeMap::new();
    let mut store = TriangulationStore::new();
    let mut colors: BTreeSet<u32> = BTreeSet::new();
    let mut next_id: u32 = 0;
    let mut exported: BTreeSet<String> = BTreeSet::new();

    loop {
        match reader.next_record()? {
            Record::ContainerBegin(block) => {
                level += 1;
                if level == opts.export_level + 1 {
                    // A new root: per-root state restarts and the digest
                    // covers everything from here to the matching group end.
                    reader.digest_reset();
                    nodes.clear();
                    store.clear();
                    colors.clear();
                    frames.clear();
                    next_id = 1;
                    debug!(name = %block.name, "root group begins");
                    frames.push(GroupFrame::new(1, block));
                } else if level > opts.export_level + 1 {
                    next_id += 1;
                    frames.push(GroupFrame::new(next_id, block));
                }
            }
            Record::Primitive { geometry, opacity } => {
                let Some(frame) = frames.last_mut() else {
                    warn!(
                        at = reader.position(),
                        "primitive outside any exported group, ignored"
                    );
                    continue;
                };
                if let Some(tri) = factory.tessellate(&geometry) {
                    if tri.vertices.is_empty() {
                        debug!(kind = geometry.kind.name(), "primitive tessellated to nothing");
                    } else {
                        let id = store.push(tri);
                        frame.prims.push(NodePrim {
                            geo_type: geometry.geo_type,
                            opacity,
                            triangulation: id,
                        });
                    }
                }
            }
            Record::Color(block) => {
                warn!(
                    index = block.index,
                    "color definition ignored, built-in table is authoritative"
                );
            }
            Record::ContainerEnd => {
                if level == 0 {
                    return Err(ConvertError::UnbalancedGroupEnd {
                        at: reader.position(),
                    });
                }
                if level > opts.export_level {
                    let Some(frame) = frames.pop() else {
                        return Err(ConvertError::UnbalancedGroupEnd {
                            at: reader.position(),
                        });
                    };
                    let parent = frames.last().map(|f| f.id);
                    finalize_group(frame, parent, &mut nodes, &mut colors, &mut next_id);
                    if level == opts.export_level + 1 {
                        let digest = reader.digest_hex();
                        export_root(
                            digest,
                            &mut nodes,
                            &store,
                            &colors,
                            &merge_opts,
                            opts,
                            &mut exported,
                            report,
                        )?;
                    }
                }
                level -= 1;
            }
            Record::End => break,
        }
    }

    info!(
        models = report.models.len(),
        warnings = report.warnings.len(),
        discarded_caps = factory.discarded_caps,
        "conversion finished"
    );
    Ok(())
}

/// Closes a group: its primitives partition by record family into up to
/// three nodes. The plain node always exists (it anchors the hierarchy);
/// insulation and obstruction partitions get fresh ids and suffixed names.
fn finalize_group(
    frame: GroupFrame,
    parent: Option<u32>,
    nodes: &mut BTreeMap<u32, FinalizedNode>,
    colors: &mut BTreeSet<u32>,
    next_id: &mut u32,
) {
    let mut plain = Vec::new();
    let mut insulation = Vec::new();
    let mut obstruction = Vec::new();
    for p in frame.prims {
        match p.geo_type {
            GeometryType::Primitive => plain.push(p),
            GeometryType::Insulation => insulation.push(p),
            GeometryType::Obstruction => obstruction.push(p),
        }
    }

    let (material_rgb, color_with_alpha) = if plain.is_empty() {
        (0, 0)
    } else {
        let cwa = pack_color_with_alpha(frame.opacity, frame.material_rgb);
        colors.insert(cwa);
        (frame.material_rgb, cwa)
    };
    nodes.insert(
        frame.id,
        FinalizedNode {
            id: frame.id,
            parent_id: parent,
            name: frame.name.clone(),
            material_rgb,
            opacity: frame.opacity,
            color_with_alpha,
            primitives: plain,
        },
    );

    for (suffix, prims) in [("(INSU)", insulation), ("(OBST)", obstruction)] {
        if prims.is_empty() {
            continue;
        }
        *next_id += 1;
        let opacity = prims[0].opacity;
        let cwa = pack_color_with_alpha(opacity, frame.material_rgb);
        colors.insert(cwa);
        nodes.insert(
            *next_id,
            FinalizedNode {
                id: *next_id,
                parent_id: parent,
                name: format!("{}{}", frame.name, suffix),
                material_rgb: frame.material_rgb,
                opacity,
                color_with_alpha: cwa,
                primitives: prims,
            },
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn export_root(
    digest: String,
    nodes: &mut BTreeMap<u32, FinalizedNode>,
    store: &TriangulationStore,
    colors: &BTreeSet<u32>,
    merge_opts: &MergeOptions,
    opts: &ConvertOptions,
    exported: &mut BTreeSet<String>,
    report: &mut ConvertReport,
) -> Result<(), ConvertError> {
    // The root group is the first finalized node of its tree.
    let root_name = nodes
        .get(&1)
        .map(|n| n.name.clone())
        .unwrap_or_default();

    let batches = consolidate(nodes, store, colors, merge_opts);
    if batches.is_empty() {
        let message = format!("group '{root_name}' has no triangles, skipped");
        warn!("{message}");
        report.warnings.push(message);
        return Ok(());
    }

    let file_name = sanitize_file_name(&root_name);
    if !exported.insert(file_name.clone()) {
        let message = format!("duplicate root group '{root_name}', keeping the first");
        warn!("{message}");
        report.warnings.push(message);
        return Ok(());
    }

    if !opts.dry_run {
        std::fs::create_dir_all(&opts.output_dir)?;
        let path = opts.output_dir.join(&file_name);
        glb::write_glb(&path, &batches, nodes)?;
        info!(
            file = %path.display(),
            batches = batches.len(),
            triangles = batches.iter().map(|b| b.indices.len() / 3).sum::<usize>(),
            "wrote model"
        );
    }
    report.models.push(ModelEntry {
        root_name,
        digest,
        file_name,
    });
    Ok(())
}

/// Root group names become file names; characters that are unsafe in any of
/// the common filesystems are replaced.
fn sanitize_file_name(root_name: &str) -> String {
    let mut out: String = root_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '"' | '<' | '>' | '|' => '$',
            c => c,
        })
        .collect();
    out.push_str(".glb");
    out
}
