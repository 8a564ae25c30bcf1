//! Face connections between adjoining primitives.
//!
//! When two primitives butt up against each other (a cylinder feeding a
//! torus elbow, say) the shared end caps are invisible and can be skipped
//! during tessellation. A [`Connection`] on a face records what kind of side
//! the neighbor claims to present plus the neighbor's actual world-space
//! interface, so the match test needs no access to the neighboring geometry.

use rvmesh_math::Vec3f;

use crate::geometry::{Geometry, PrimitiveKind};

/// The kind of side a connection claims to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSide {
    /// Both faces are circular.
    Circular,
    /// Both faces are rectangular.
    Rectangular,
}

/// World-space shape of one primitive face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interface {
    /// Face kind that never participates in cap elision.
    None,
    /// Circular face; radius is in world units.
    Circular {
        /// World-space radius.
        radius: f32,
    },
    /// Rectangular face given by its four world-space corners.
    Rectangular {
        /// World-space corners, in face order.
        corners: [Vec3f; 4],
    },
}

/// A connection installed on one face of a primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Claimed side kind. Cap elision only considers a connection whose
    /// claim matches the cap being generated.
    pub side: ConnectionSide,
    /// The neighbor face's world-space interface.
    pub neighbor: Interface,
}

/// Computes the world-space interface presented by face `face` of `geo`.
///
/// Faces are numbered per kind: swept shapes use 0 for the start/bottom cap
/// and 1 for the end/top cap; pyramids use 0..4 for the side quads and 4/5
/// for bottom/top; boxes use the -x, +x, -y, +y, -z, +z order.
pub fn face_interface(geo: &Geometry, face: usize) -> Interface {
    let scale = geo.matrix.scale();
    match &geo.kind {
        PrimitiveKind::Pyramid {
            bottom,
            top,
            offset,
            height,
        } => {
            let (bx, by) = (0.5 * bottom[0], 0.5 * bottom[1]);
            let (tx, ty) = (0.5 * top[0], 0.5 * top[1]);
            let (ox, oy) = (0.5 * offset[0], 0.5 * offset[1]);
            let h2 = 0.5 * height;
            let quad = [
                [
                    Vec3f::new(-bx - ox, -by - oy, -h2),
                    Vec3f::new(bx - ox, -by - oy, -h2),
                    Vec3f::new(bx - ox, by - oy, -h2),
                    Vec3f::new(-bx - ox, by - oy, -h2),
                ],
                [
                    Vec3f::new(-tx + ox, -ty + oy, h2),
                    Vec3f::new(tx + ox, -ty + oy, h2),
                    Vec3f::new(tx + ox, ty + oy, h2),
                    Vec3f::new(-tx + ox, ty + oy, h2),
                ],
            ];
            let corners = if face < 4 {
                let next = (face + 1) & 3;
                [
                    geo.matrix.transform_point(quad[0][face]),
                    geo.matrix.transform_point(quad[0][next]),
                    geo.matrix.transform_point(quad[1][next]),
                    geo.matrix.transform_point(quad[1][face]),
                ]
            } else {
                let q = &quad[face - 4];
                [
                    geo.matrix.transform_point(q[0]),
                    geo.matrix.transform_point(q[1]),
                    geo.matrix.transform_point(q[2]),
                    geo.matrix.transform_point(q[3]),
                ]
            };
            Interface::Rectangular { corners }
        }
        PrimitiveKind::Box { lengths } => {
            let xp = 0.5 * lengths[0];
            let yp = 0.5 * lengths[1];
            let zp = 0.5 * lengths[2];
            let (xm, ym, zm) = (-xp, -yp, -zp);
            let faces = [
                [
                    Vec3f::new(xm, ym, zp),
                    Vec3f::new(xm, yp, zp),
                    Vec3f::new(xm, yp, zm),
                    Vec3f::new(xm, ym, zm),
                ],
                [
                    Vec3f::new(xp, ym, zm),
                    Vec3f::new(xp, yp, zm),
                    Vec3f::new(xp, yp, zp),
                    Vec3f::new(xp, ym, zp),
                ],
                [
                    Vec3f::new(xp, ym, zm),
                    Vec3f::new(xp, ym, zp),
                    Vec3f::new(xm, ym, zp),
                    Vec3f::new(xm, ym, zm),
                ],
                [
                    Vec3f::new(xm, yp, zm),
                    Vec3f::new(xm, yp, zp),
                    Vec3f::new(xp, yp, zp),
                    Vec3f::new(xp, yp, zm),
                ],
                [
                    Vec3f::new(xm, yp, zm),
                    Vec3f::new(xp, yp, zm),
                    Vec3f::new(xp, ym, zm),
                    Vec3f::new(xm, ym, zm),
                ],
                [
                    Vec3f::new(xm, ym, zp),
                    Vec3f::new(xp, ym, zp),
                    Vec3f::new(xp, yp, zp),
                    Vec3f::new(xm, yp, zp),
                ],
            ];
            let q = &faces[face];
            Interface::Rectangular {
                corners: [
                    geo.matrix.transform_point(q[0]),
                    geo.matrix.transform_point(q[1]),
                    geo.matrix.transform_point(q[2]),
                    geo.matrix.transform_point(q[3]),
                ],
            }
        }
        PrimitiveKind::RectangularTorus {
            inner_radius,
            outer_radius,
            height,
            angle,
        } => {
            let h2 = 0.5 * height;
            let square = [
                (*outer_radius, -h2),
                (*inner_radius, -h2),
                (*inner_radius, h2),
                (*outer_radius, h2),
            ];
            let mut corners = [Vec3f::zeros(); 4];
            for (k, &(r, z)) in square.iter().enumerate() {
                let p = if face == 0 {
                    Vec3f::new(r, 0.0, z)
                } else {
                    Vec3f::new(r * angle.cos(), r * angle.sin(), z)
                };
                corners[k] = geo.matrix.transform_point(p);
            }
            Interface::Rectangular { corners }
        }
        PrimitiveKind::CircularTorus { radius, .. } => Interface::Circular {
            radius: scale * radius,
        },
        PrimitiveKind::EllipticalDish { base_radius, .. } => Interface::Circular {
            radius: scale * base_radius,
        },
        PrimitiveKind::SphericalDish {
            base_radius,
            height,
        } => {
            let r_sphere =
                (base_radius * base_radius + height * height) / (2.0 * height);
            Interface::Circular {
                radius: scale * r_sphere,
            }
        }
        PrimitiveKind::Snout {
            radius_b, radius_t, ..
        } => Interface::Circular {
            radius: scale * if face == 0 { *radius_b } else { *radius_t },
        },
        PrimitiveKind::Cylinder { radius, .. } => Interface::Circular {
            radius: scale * radius,
        },
        PrimitiveKind::Sphere { .. }
        | PrimitiveKind::Line { .. }
        | PrimitiveKind::FacetGroup(_) => Interface::None,
    }
}

/// True if this face sits flush against the neighbor so its cap can be
/// skipped.
///
/// Circular faces match when this radius does not stick out past the
/// neighbor by more than 5%. Rectangular faces match when every corner
/// coincides with some neighbor corner within a millimeter.
pub fn interfaces_match(this: &Interface, neighbor: &Interface) -> bool {
    match (this, neighbor) {
        (Interface::Circular { radius: r0 }, Interface::Circular { radius: r1 }) => {
            *r0 <= 1.05 * r1
        }
        (
            Interface::Rectangular { corners: a },
            Interface::Rectangular { corners: b },
        ) => a.iter().all(|pa| {
            b.iter()
                .any(|pb| (pa - pb).norm_squared() < 0.001 * 0.001)
        }),
        _ => false,
    }
}

/// Installs a symmetric connection between face `face_a` of `a` and face
/// `face_b` of `b`.
pub fn connect(a: &mut Geometry, face_a: usize, b: &mut Geometry, face_b: usize, side: ConnectionSide) {
    let ia = face_interface(a, face_a);
    let ib = face_interface(b, face_b);
    a.connections[face_a] = Some(Connection { side, neighbor: ib });
    b.connections[face_b] = Some(Connection { side, neighbor: ia });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryType;
    use rvmesh_math::{BBox3f, Mat3x4f};

    fn cylinder(radius: f32, height: f32, z: f32) -> Geometry {
        Geometry::new(
            PrimitiveKind::Cylinder { radius, height },
            GeometryType::Primitive,
            Mat3x4f::from_translation(Vec3f::new(0.0, 0.0, z)),
            BBox3f::new(
                Vec3f::new(-radius, -radius, -0.5 * height),
                Vec3f::new(radius, radius, 0.5 * height),
            ),
        )
    }

    #[test]
    fn equal_radius_cylinders_match() {
        let a = cylinder(1.0, 2.0, 0.0);
        let b = cylinder(1.0, 2.0, 2.0);
        assert!(interfaces_match(
            &face_interface(&a, 1),
            &face_interface(&b, 0)
        ));
    }

    #[test]
    fn wider_face_does_not_match_into_narrower() {
        let a = cylinder(2.0, 2.0, 0.0);
        let b = cylinder(1.0, 2.0, 2.0);
        // The wide cap sticks out past the narrow neighbor.
        assert!(!interfaces_match(
            &face_interface(&a, 1),
            &face_interface(&b, 0)
        ));
        // The narrow cap is covered by the wide neighbor.
        assert!(interfaces_match(
            &face_interface(&b, 0),
            &face_interface(&a, 1)
        ));
    }

    #[test]
    fn connect_installs_both_directions() {
        let mut a = cylinder(1.0, 2.0, 0.0);
        let mut b = cylinder(1.0, 2.0, 2.0);
        connect(&mut a, 1, &mut b, 0, ConnectionSide::Circular);
        assert!(a.connections[1].is_some());
        assert!(b.connections[0].is_some());
        assert!(a.connections[0].is_none());
    }

    #[test]
    fn circular_face_never_matches_rectangular() {
        let cyl = cylinder(1.0, 2.0, 0.0);
        let bx = Geometry::new(
            PrimitiveKind::Box {
                lengths: [2.0, 2.0, 2.0],
            },
            GeometryType::Primitive,
            Mat3x4f::identity(),
            BBox3f::new(Vec3f::new(-1.0, -1.0, -1.0), Vec3f::new(1.0, 1.0, 1.0)),
        );
        assert!(!interfaces_match(
            &face_interface(&cyl, 1),
            &face_interface(&bx, 5)
        ));
    }
}
