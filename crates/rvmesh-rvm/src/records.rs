//! Record body decoders.
//!
//! Each function decodes one record body; chunk framing around the bodies is
//! handled by [`crate::reader::RvmReader`].

use std::io::Read;

use rvmesh_math::{BBox3f, Mat3x4f, Vec3f};
use rvmesh_model::{
    material_rgb, Contour, FacetGroup, Geometry, GeometryType, Polygon, PrimitiveKind,
};

use crate::cursor::ByteCursor;
use crate::error::RvmError;

/// File header record.
#[derive(Debug, Clone, Default)]
pub struct HeadBlock {
    /// Format revision.
    pub version: u32,
    /// Exporting application banner.
    pub info: String,
    /// Free-form note.
    pub note: String,
    /// Export date.
    pub date: String,
    /// Exporting user.
    pub user: String,
    /// Text encoding name; only present from revision 2 on.
    pub encoding: String,
}

/// Model record following the header.
#[derive(Debug, Clone, Default)]
pub struct ModlBlock {
    /// Record revision.
    pub version: u32,
    /// Project name.
    pub project: String,
    /// Model name.
    pub name: String,
}

/// Group-begin record.
#[derive(Debug, Clone, Default)]
pub struct CntbBlock {
    /// Record revision; revision 4 records may be padded past their body.
    pub version: u32,
    /// Group name.
    pub name: String,
    /// Group translation hint; informational only.
    pub translation: [f32; 3],
    /// Material color resolved through the PDMS table, 0xRRGGBB.
    pub material_rgb: u32,
    /// Opacity in percent; revisions up to 2 have no opacity field and
    /// default to opaque.
    pub opacity: u8,
}

/// Color-definition record. Decoded and skipped; the built-in table is
/// authoritative.
#[derive(Debug, Clone, Default)]
pub struct ColrBlock {
    /// Record revision.
    pub version: u32,
    /// Material index being redefined.
    pub index: u32,
    /// RGB triple.
    pub color: [u8; 3],
}

/// Decodes a HEAD record body.
pub fn head<R: Read>(cur: &mut ByteCursor<R>) -> Result<HeadBlock, RvmError> {
    let mut block = HeadBlock {
        version: cur.read_u32()?,
        ..Default::default()
    };
    block.info = cur.read_string()?;
    block.note = cur.read_string()?;
    block.date = cur.read_string()?;
    block.user = cur.read_string()?;
    if block.version >= 2 {
        block.encoding = cur.read_string()?;
    }
    Ok(block)
}

/// Decodes a MODL record body.
pub fn modl<R: Read>(cur: &mut ByteCursor<R>) -> Result<ModlBlock, RvmError> {
    Ok(ModlBlock {
        version: cur.read_u32()?,
        project: cur.read_string()?,
        name: cur.read_string()?,
    })
}

/// Decodes a CNTB record body.
pub fn cntb<R: Read>(cur: &mut ByteCursor<R>) -> Result<CntbBlock, RvmError> {
    let version = cur.read_u32()?;
    let name = cur.read_string()?;
    let translation = [cur.read_f32()?, cur.read_f32()?, cur.read_f32()?];
    let material_rgb = material_rgb(cur.read_u32()?);
    let mut opacity = 100;
    if version > 2 {
        opacity = cur.read_u8()?;
        cur.skip(3)?;
    }
    Ok(CntbBlock {
        version,
        name,
        translation,
        material_rgb,
        opacity,
    })
}

/// Decodes a COLR record body.
pub fn colr<R: Read>(cur: &mut ByteCursor<R>) -> Result<ColrBlock, RvmError> {
    let version = cur.read_u32()?;
    let index = cur.read_u32()?;
    let color = [cur.read_u8()?, cur.read_u8()?, cur.read_u8()?];
    cur.read_u8()?;
    Ok(ColrBlock {
        version,
        index,
        color,
    })
}

/// Decodes a PRIM, OBST or INSU record body into a placed primitive plus
/// its opacity in percent.
pub fn primitive<R: Read>(
    cur: &mut ByteCursor<R>,
    geo_type: GeometryType,
) -> Result<(Geometry, u8), RvmError> {
    let _version = cur.read_u32()?;
    let kind_at = cur.position();
    let kind_id = cur.read_u32()?;

    let mut matrix = Mat3x4f::identity();
    for v in matrix.data.iter_mut() {
        *v = cur.read_f32()?;
    }
    let bbox_local = BBox3f::new(
        Vec3f::new(cur.read_f32()?, cur.read_f32()?, cur.read_f32()?),
        Vec3f::new(cur.read_f32()?, cur.read_f32()?, cur.read_f32()?),
    );

    // Obstruction and insulation records carry an opacity byte and three
    // reserved bytes between the box and the shape parameters.
    let mut opacity = 100;
    if geo_type != GeometryType::Primitive {
        opacity = cur.read_u8()?;
        cur.skip(3)?;
    }

    let kind = match kind_id {
        1 => PrimitiveKind::Pyramid {
            bottom: [cur.read_f32()?, cur.read_f32()?],
            top: [cur.read_f32()?, cur.read_f32()?],
            offset: [cur.read_f32()?, cur.read_f32()?],
            height: cur.read_f32()?,
        },
        2 => PrimitiveKind::Box {
            lengths: [cur.read_f32()?, cur.read_f32()?, cur.read_f32()?],
        },
        3 => PrimitiveKind::RectangularTorus {
            inner_radius: cur.read_f32()?,
            outer_radius: cur.read_f32()?,
            height: cur.read_f32()?,
            angle: cur.read_f32()?,
        },
        4 => PrimitiveKind::CircularTorus {
            offset: cur.read_f32()?,
            radius: cur.read_f32()?,
            angle: cur.read_f32()?,
        },
        5 => PrimitiveKind::EllipticalDish {
            base_radius: cur.read_f32()?,
            height: cur.read_f32()?,
        },
        6 => PrimitiveKind::SphericalDish {
            base_radius: cur.read_f32()?,
            height: cur.read_f32()?,
        },
        7 => PrimitiveKind::Snout {
            radius_b: cur.read_f32()?,
            radius_t: cur.read_f32()?,
            height: cur.read_f32()?,
            offset: [cur.read_f32()?, cur.read_f32()?],
            bshear: [cur.read_f32()?, cur.read_f32()?],
            tshear: [cur.read_f32()?, cur.read_f32()?],
        },
        8 => PrimitiveKind::Cylinder {
            radius: cur.read_f32()?,
            height: cur.read_f32()?,
        },
        9 => PrimitiveKind::Sphere {
            diameter: cur.read_f32()?,
        },
        10 => PrimitiveKind::Line {
            a: cur.read_f32()?,
            b: cur.read_f32()?,
        },
        11 => PrimitiveKind::FacetGroup(facet_group(cur)?),
        other => {
            return Err(RvmError::UnknownPrimitiveKind {
                kind: other,
                at: kind_at,
            })
        }
    };

    Ok((Geometry::new(kind, geo_type, matrix, bbox_local), opacity))
}

fn facet_group<R: Read>(cur: &mut ByteCursor<R>) -> Result<FacetGroup, RvmError> {
    let polygon_count = cur.read_u32()?;
    let mut group = FacetGroup::default();
    for _ in 0..polygon_count {
        let contour_count = cur.read_u32()?;
        let mut polygon = Polygon::default();
        for _ in 0..contour_count {
            let vertex_count = cur.read_u32()?;
            let mut contour = Contour::default();
            for _ in 0..vertex_count {
                let p = Vec3f::new(cur.read_f32()?, cur.read_f32()?, cur.read_f32()?);
                // Each vertex carries a normal triple we have no use for.
                cur.skip(12)?;
                contour.vertices.push(p);
            }
            polygon.contours.push(contour);
        }
        group.polygons.push(polygon);
    }
    Ok(group)
}
