//! Parametric primitives and their placement.

use rvmesh_math::{BBox3f, Mat3x4f, Vec3f};

use crate::connection::Connection;

/// Which record family a primitive came from.
///
/// Regular geometry, obstruction volumes and insulation volumes share the
/// same wire layout but are exported into separate nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    /// Regular geometry.
    Primitive,
    /// Obstruction volume.
    Obstruction,
    /// Insulation volume.
    Insulation,
}

/// One contour of a facet-group polygon. The first contour of a polygon is
/// its outer boundary; any further contours are holes.
#[derive(Debug, Clone, Default)]
pub struct Contour {
    /// Contour vertices in local coordinates.
    pub vertices: Vec<Vec3f>,
}

/// A planar polygon with optional holes.
#[derive(Debug, Clone, Default)]
pub struct Polygon {
    /// Boundary followed by hole contours.
    pub contours: Vec<Contour>,
}

/// Arbitrary faceted geometry, one polygon per face.
#[derive(Debug, Clone, Default)]
pub struct FacetGroup {
    /// The faces.
    pub polygons: Vec<Polygon>,
}

/// The parametric shape of a primitive, in local coordinates.
///
/// Lengths are full extents unless named a radius; heights extend
/// symmetrically from z = -h/2 to z = +h/2 for the swept shapes.
#[derive(Debug, Clone)]
pub enum PrimitiveKind {
    /// Frustum with rectangular cross sections and an apex offset.
    Pyramid {
        /// Bottom extents in x and y.
        bottom: [f32; 2],
        /// Top extents in x and y.
        top: [f32; 2],
        /// Offset of the top face center relative to the bottom.
        offset: [f32; 2],
        /// Full height.
        height: f32,
    },
    /// Axis-aligned box.
    Box {
        /// Full side lengths in x, y, z.
        lengths: [f32; 3],
    },
    /// Torus segment with a rectangular cross section.
    RectangularTorus {
        /// Distance from the sweep axis to the inner wall.
        inner_radius: f32,
        /// Distance from the sweep axis to the outer wall.
        outer_radius: f32,
        /// Cross-section height.
        height: f32,
        /// Sweep angle in radians.
        angle: f32,
    },
    /// Torus segment with a circular cross section.
    CircularTorus {
        /// Major radius, sweep axis to tube center.
        offset: f32,
        /// Tube radius.
        radius: f32,
        /// Sweep angle in radians.
        angle: f32,
    },
    /// Half-ellipsoid cap.
    EllipticalDish {
        /// Radius of the rim circle.
        base_radius: f32,
        /// Height of the cap above the rim plane.
        height: f32,
    },
    /// Spherical cap.
    SphericalDish {
        /// Radius of the rim circle.
        base_radius: f32,
        /// Height of the cap above the rim plane.
        height: f32,
    },
    /// Truncated cone with offset and sheared end planes.
    Snout {
        /// Bottom radius.
        radius_b: f32,
        /// Top radius.
        radius_t: f32,
        /// Full height.
        height: f32,
        /// Offset of the top center relative to the bottom, in x and y.
        offset: [f32; 2],
        /// Bottom end-plane shear angles about x and y, radians.
        bshear: [f32; 2],
        /// Top end-plane shear angles about x and y, radians.
        tshear: [f32; 2],
    },
    /// Right circular cylinder.
    Cylinder {
        /// Radius.
        radius: f32,
        /// Full height.
        height: f32,
    },
    /// Sphere.
    Sphere {
        /// Full diameter.
        diameter: f32,
    },
    /// Line segment along z; carries no surface and is never tessellated.
    Line {
        /// Start z.
        a: f32,
        /// End z.
        b: f32,
    },
    /// Faceted geometry.
    FacetGroup(FacetGroup),
}

impl PrimitiveKind {
    /// Short name used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Pyramid { .. } => "pyramid",
            PrimitiveKind::Box { .. } => "box",
            PrimitiveKind::RectangularTorus { .. } => "rectangular torus",
            PrimitiveKind::CircularTorus { .. } => "circular torus",
            PrimitiveKind::EllipticalDish { .. } => "elliptical dish",
            PrimitiveKind::SphericalDish { .. } => "spherical dish",
            PrimitiveKind::Snout { .. } => "snout",
            PrimitiveKind::Cylinder { .. } => "cylinder",
            PrimitiveKind::Sphere { .. } => "sphere",
            PrimitiveKind::Line { .. } => "line",
            PrimitiveKind::FacetGroup(_) => "facet group",
        }
    }
}

/// Maximum number of connectable faces on any primitive (a box or pyramid
/// has six; swept shapes use the first one or two slots).
pub const MAX_FACES: usize = 6;

/// A placed primitive.
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Shape parameters.
    pub kind: PrimitiveKind,
    /// Record family the primitive came from.
    pub geo_type: GeometryType,
    /// Local-to-world transform.
    pub matrix: Mat3x4f,
    /// Bounding box in local coordinates, as stored in the file.
    pub bbox_local: BBox3f,
    /// Local box mapped through `matrix`.
    pub bbox_world: BBox3f,
    /// Rotational phase for swept shapes, so adjoining segments share
    /// sample positions.
    pub sample_start_angle: f32,
    /// Per-face connections to adjoining primitives.
    pub connections: [Option<Connection>; MAX_FACES],
}

impl Geometry {
    /// Creates a placed primitive with no connections.
    pub fn new(
        kind: PrimitiveKind,
        geo_type: GeometryType,
        matrix: Mat3x4f,
        bbox_local: BBox3f,
    ) -> Self {
        let bbox_world = bbox_local.transformed_by(&matrix);
        Geometry {
            kind,
            geo_type,
            matrix,
            bbox_local,
            bbox_world,
            sample_start_angle: 0.0,
            connections: Default::default(),
        }
    }
}
