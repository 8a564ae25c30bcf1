//! glTF binary writer.
//!
//! One GLB per root group: a mesh per color batch, draw ranges and the group
//! hierarchy tucked into the scene extras so viewers can pick individual
//! groups back out of the merged buffers. Each `draw_ranges_node<i>` entry
//! maps a node id to its `[start, count]` span of the batch's index buffer.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use gltf::json;
use json::validation::Checked::Valid;
use json::validation::USize64;

use rvmesh_merge::ColorBatch;
use rvmesh_model::FinalizedNode;

use crate::ConvertError;

fn extras(value: serde_json::Value) -> Result<json::Extras, ConvertError> {
    Ok(Some(serde_json::value::to_raw_value(&value)?))
}

pub(crate) fn write_glb(
    path: &Path,
    batches: &[ColorBatch],
    nodes: &BTreeMap<u32, FinalizedNode>,
) -> Result<(), ConvertError> {
    let mut root = json::Root {
        asset: json::Asset {
            version: "2.0".to_string(),
            generator: Some("rvmesh".to_string()),
            extras: extras(serde_json::json!({ "web3dversion": 2 }))?,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut bin: Vec<u8> = Vec::new();
    let mut scene_nodes = Vec::with_capacity(batches.len());
    let mut scene_extras = serde_json::Map::new();

    for (i, batch) in batches.iter().enumerate() {
        let index_view = push_view(
            &mut root,
            &mut bin,
            index_bytes(&batch.indices),
            json::buffer::Target::ElementArrayBuffer,
        );
        let position_view = push_view(
            &mut root,
            &mut bin,
            position_bytes(&batch.positions),
            json::buffer::Target::ArrayBuffer,
        );

        let vertex_count = batch.positions.len() / 3;
        let index_accessor = json::Index::new(root.accessors.len() as u32);
        root.accessors.push(json::Accessor {
            buffer_view: Some(index_view),
            byte_offset: Some(USize64(0)),
            count: USize64(batch.indices.len() as u64),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::U32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Scalar),
            min: Some(serde_json::json!([0])),
            max: Some(serde_json::json!([vertex_count as u64 - 1])),
            name: None,
            normalized: false,
            sparse: None,
        });
        let position_accessor = json::Index::new(root.accessors.len() as u32);
        root.accessors.push(json::Accessor {
            buffer_view: Some(position_view),
            byte_offset: Some(USize64(0)),
            count: USize64(vertex_count as u64),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Vec3),
            min: Some(serde_json::json!(batch.min)),
            max: Some(serde_json::json!(batch.max)),
            name: None,
            normalized: false,
            sparse: None,
        });

        let material = json::Index::new(root.materials.len() as u32);
        root.materials.push(batch_material(batch.color_with_alpha));

        let mesh = json::Index::new(root.meshes.len() as u32);
        root.meshes.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(format!("mesh{i}")),
            primitives: vec![json::mesh::Primitive {
                attributes: [(Valid(json::mesh::Semantic::Positions), position_accessor)]
                    .into_iter()
                    .collect(),
                extensions: Default::default(),
                extras: Default::default(),
                indices: Some(index_accessor),
                material: Some(material),
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
            }],
            weights: None,
        });

        let node = json::Index::new(root.nodes.len() as u32);
        root.nodes.push(json::Node {
            camera: None,
            children: None,
            extensions: Default::default(),
            extras: Default::default(),
            matrix: None,
            mesh: Some(mesh),
            name: Some(format!("node{i}")),
            rotation: None,
            scale: None,
            translation: None,
            skin: None,
            weights: None,
        });
        scene_nodes.push(node);

        let mut ranges = serde_json::Map::new();
        for r in &batch.draw_ranges {
            ranges.insert(r.node_id.to_string(), serde_json::json!([r.start, r.count]));
        }
        scene_extras.insert(format!("draw_ranges_node{i}"), ranges.into());
    }

    scene_extras.insert("id_hierarchy".to_string(), id_hierarchy(nodes));

    root.buffers.push(json::Buffer {
        byte_length: USize64(bin.len() as u64),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: None,
    });

    root.scenes.push(json::Scene {
        extensions: Default::default(),
        extras: extras(scene_extras.into())?,
        name: None,
        nodes: scene_nodes,
    });
    root.scene = Some(json::Index::new(0));

    let json_string = json::serialize::to_string(&root)?;
    write_container(path, json_string.into_bytes(), bin)
}

/// Scene-extras map from node id to `[name, parent id]`, the root parent
/// spelled `*`.
fn id_hierarchy(nodes: &BTreeMap<u32, FinalizedNode>) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for node in nodes.values() {
        let parent = match node.parent_id {
            Some(p) => p.to_string(),
            None => "*".to_string(),
        };
        map.insert(
            node.id.to_string(),
            serde_json::json!([node.name, parent]),
        );
    }
    map.into()
}

fn batch_material(color_with_alpha: u32) -> json::Material {
    let r = ((color_with_alpha >> 16) & 0xff) as f32 / 255.0;
    let g = ((color_with_alpha >> 8) & 0xff) as f32 / 255.0;
    let b = (color_with_alpha & 0xff) as f32 / 255.0;
    let alpha = (color_with_alpha >> 24) as f32 / 255.0;
    // Translucent batches store the transmission, not the coverage.
    let (alpha_mode, base_alpha) = if alpha < 1.0 {
        (json::material::AlphaMode::Blend, 1.0 - alpha)
    } else {
        (json::material::AlphaMode::Opaque, 1.0)
    };
    json::Material {
        alpha_cutoff: None,
        alpha_mode: Valid(alpha_mode),
        double_sided: true,
        name: None,
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor([r, g, b, base_alpha]),
            base_color_texture: None,
            metallic_factor: json::material::StrengthFactor(0.0),
            roughness_factor: json::material::StrengthFactor(1.0),
            metallic_roughness_texture: None,
            extensions: Default::default(),
            extras: Default::default(),
        },
        normal_texture: None,
        occlusion_texture: None,
        emissive_texture: None,
        emissive_factor: Default::default(),
        extensions: Default::default(),
        extras: Default::default(),
    }
}

fn index_bytes(indices: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 * indices.len());
    for &i in indices {
        out.extend_from_slice(&i.to_le_bytes());
    }
    out
}

fn position_bytes(positions: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 * positions.len());
    for &v in positions {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn push_view(
    root: &mut json::Root,
    bin: &mut Vec<u8>,
    bytes: Vec<u8>,
    target: json::buffer::Target,
) -> json::Index<json::buffer::View> {
    let offset = bin.len();
    bin.extend_from_slice(&bytes);
    let index = json::Index::new(root.buffer_views.len() as u32);
    root.buffer_views.push(json::buffer::View {
        buffer: json::Index::new(0),
        byte_length: USize64(bytes.len() as u64),
        byte_offset: Some(USize64(offset as u64)),
        byte_stride: None,
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: Some(Valid(target)),
    });
    index
}

/// Assembles the two-chunk GLB container. GLB requires 4-byte alignment;
/// the JSON chunk pads with spaces, the binary chunk with zeros.
fn write_container(path: &Path, mut json: Vec<u8>, mut bin: Vec<u8>) -> Result<(), ConvertError> {
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut file = File::create(path)?;
    file.write_all(b"glTF")?;
    file.write_all(&2u32.to_le_bytes())?;
    file.write_all(&(total as u32).to_le_bytes())?;
    file.write_all(&(json.len() as u32).to_le_bytes())?;
    file.write_all(b"JSON")?;
    file.write_all(&json)?;
    file.write_all(&(bin.len() as u32).to_le_bytes())?;
    file.write_all(b"BIN\0")?;
    file.write_all(&bin)?;
    Ok(())
}
