//! Turns parametric plant primitives into triangle meshes.
//!
//! Curved shapes are sampled so the sagitta (the largest gap between a chord
//! and its arc, in world units) stays within a tolerance; flat shapes
//! tessellate exactly. Caps that sit flush against a connected neighbor are
//! skipped, since they can never be seen.
//!
//! All generators emit local coordinates and the factory applies the
//! primitive's world transform as a final step, in f64 to survive large
//! site offsets.

#![warn(missing_docs)]

mod polygon;

use std::f32::consts::PI;

use rvmesh_math::Vec3f;
use rvmesh_model::{
    face_interface, interfaces_match, ConnectionSide, FacetGroup, Geometry, PrimitiveKind,
    Triangulation,
};

pub use polygon::triangulate_polygon;

const TWO_PI: f32 = 2.0 * PI;

/// Tessellates primitives at a fixed tolerance, counting elided caps.
pub struct TriangulationFactory {
    tolerance: f32,
    min_samples: u32,
    max_samples: u32,
    /// Caps skipped because a connected neighbor covers them.
    pub discarded_caps: u32,
}

impl TriangulationFactory {
    /// Creates a factory with the given sagitta tolerance in world units.
    pub fn new(tolerance: f32) -> Self {
        TriangulationFactory {
            tolerance,
            min_samples: 3,
            max_samples: 100,
            discarded_caps: 0,
        }
    }

    /// Number of segments needed to keep the sagitta of `arc` within
    /// tolerance, clamped to 3..=100.
    pub fn segment_count(&self, arc: f32, radius: f32, scale: f32) -> u32 {
        let samples = arc / (1.0 - self.tolerance / (scale * radius)).max(-1.0).acos();
        (samples.ceil().max(self.min_samples as f32) as u32).min(self.max_samples)
    }

    /// Actual sagitta when `arc` is divided into `segments` chords.
    pub fn sagitta_error(arc: f32, radius: f32, scale: f32, segments: u32) -> f32 {
        scale * radius * (1.0 - (arc / segments as f32).cos())
    }

    /// Tessellates one primitive into world coordinates. Lines carry no
    /// surface and yield `None`.
    pub fn tessellate(&mut self, geo: &Geometry) -> Option<Triangulation> {
        let scale = geo.matrix.scale();
        let mut tri = match &geo.kind {
            PrimitiveKind::Line { .. } => return None,
            PrimitiveKind::Pyramid { .. } => self.pyramid(geo),
            PrimitiveKind::Box { .. } => self.box_faces(geo),
            PrimitiveKind::RectangularTorus { .. } => self.rectangular_torus(geo, scale),
            PrimitiveKind::CircularTorus { .. } => self.circular_torus(geo, scale),
            PrimitiveKind::EllipticalDish {
                base_radius,
                height,
            } => self.sphere_based_shape(
                geo,
                *base_radius,
                0.5 * PI,
                0.0,
                height / base_radius,
                scale,
            ),
            PrimitiveKind::SphericalDish {
                base_radius,
                height,
            } => {
                let (r, h) = (*base_radius, *height);
                let r_sphere = (r * r + h * h) / (2.0 * h);
                let mut arc = (r / r_sphere).clamp(-1.0, 1.0).asin();
                if r < h {
                    arc = PI - arc;
                }
                self.sphere_based_shape(geo, r_sphere, arc, h - r_sphere, 1.0, scale)
            }
            PrimitiveKind::Snout { .. } => self.snout(geo, scale),
            PrimitiveKind::Cylinder { .. } => self.cylinder(geo, scale),
            PrimitiveKind::Sphere { diameter } => {
                self.sphere_based_shape(geo, 0.5 * diameter, PI, 0.0, 1.0, scale)
            }
            PrimitiveKind::FacetGroup(group) => facet_group(group),
        };

        for chunk in tri.vertices.chunks_exact_mut(3) {
            let p = geo
                .matrix
                .transform_point_f64(Vec3f::new(chunk[0], chunk[1], chunk[2]));
            chunk[0] = p.x;
            chunk[1] = p.y;
            chunk[2] = p.z;
        }
        Some(tri)
    }

    /// True when the cap on `face` is covered by its connected neighbor.
    fn cap_elided(&mut self, geo: &Geometry, face: usize, required: ConnectionSide) -> bool {
        if let Some(con) = &geo.connections[face] {
            if con.side == required
                && interfaces_match(&face_interface(geo, face), &con.neighbor)
            {
                self.discarded_caps += 1;
                return true;
            }
        }
        false
    }

    fn pyramid(&mut self, geo: &Geometry) -> Triangulation {
        let PrimitiveKind::Pyramid {
            bottom,
            top,
            offset,
            height,
        } = &geo.kind
        else {
            unreachable!()
        };
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

        let mut cap = [
            true,
            true,
            true,
            true,
            1e-7 <= bottom[0].abs().min(bottom[1].abs()),
            1e-7 <= top[0].abs().min(top[1].abs()),
        ];
        for (i, c) in cap.iter_mut().enumerate() {
            if *c && self.cap_elided(geo, i, ConnectionSide::Rectangular) {
                *c = false;
            }
        }

        let caps = cap.iter().filter(|&&c| c).count();
        let mut tri = Triangulation::with_capacity(4 * caps, 2 * caps);

        let mut o = 0;
        for i in 0..4 {
            if !cap[i] {
                continue;
            }
            let ii = (i + 1) & 3;
            push_vertex(&mut tri.vertices, quad[0][i]);
            push_vertex(&mut tri.vertices, quad[0][ii]);
            push_vertex(&mut tri.vertices, quad[1][ii]);
            push_vertex(&mut tri.vertices, quad[1][i]);
            quad_indices(&mut tri.indices, o, 0, 1, 2, 3);
            o += 4;
        }
        if cap[4] {
            for p in quad[0] {
                push_vertex(&mut tri.vertices, p);
            }
            quad_indices(&mut tri.indices, o, 3, 2, 1, 0);
            o += 4;
        }
        if cap[5] {
            for p in quad[1] {
                push_vertex(&mut tri.vertices, p);
            }
            quad_indices(&mut tri.indices, o, 0, 1, 2, 3);
        }
        tri
    }

    fn box_faces(&mut self, geo: &Geometry) -> Triangulation {
        let PrimitiveKind::Box { lengths } = &geo.kind else {
            unreachable!()
        };
        let xp = 0.5 * lengths[0];
        let yp = 0.5 * lengths[1];
        let zp = 0.5 * lengths[2];
        let (xm, ym, zm) = (-xp, -yp, -zp);

        let corners = [
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

        let mut faces = [
            1e-5 <= lengths[0],
            1e-5 <= lengths[0],
            1e-5 <= lengths[1],
            1e-5 <= lengths[1],
            1e-5 <= lengths[2],
            1e-5 <= lengths[2],
        ];
        for (i, f) in faces.iter_mut().enumerate() {
            if *f && self.cap_elided(geo, i, ConnectionSide::Rectangular) {
                *f = false;
            }
        }

        let count = faces.iter().filter(|&&f| f).count();
        let mut tri = Triangulation::with_capacity(4 * count, 2 * count);
        let mut o = 0;
        for (f, quad) in corners.iter().enumerate() {
            if !faces[f] {
                continue;
            }
            for &p in quad {
                push_vertex(&mut tri.vertices, p);
            }
            quad_indices(&mut tri.indices, o, 0, 1, 2, 3);
            o += 4;
        }
        tri
    }

    fn rectangular_torus(&mut self, geo: &Geometry, scale: f32) -> Triangulation {
        let PrimitiveKind::RectangularTorus {
            inner_radius,
            outer_radius,
            height,
            angle,
        } = &geo.kind
        else {
            unreachable!()
        };
        let segments = self.segment_count(*angle, *outer_radius, scale);
        // Open sweep, one more sample than segments.
        let samples = segments as usize + 1;

        let mut cap = [true, true];
        for (i, c) in cap.iter_mut().enumerate() {
            if self.cap_elided(geo, i, ConnectionSide::Rectangular) {
                *c = false;
            }
        }

        let h2 = 0.5 * height;
        let square = [
            (*outer_radius, -h2),
            (*inner_radius, -h2),
            (*inner_radius, h2),
            (*outer_radius, h2),
        ];

        let angles: Vec<(f32, f32)> = (0..samples)
            .map(|i| {
                let a = (angle / segments as f32) * i as f32;
                (a.cos(), a.sin())
            })
            .collect();

        let vertex_count =
            8 * samples + if cap[0] { 4 } else { 0 } + if cap[1] { 4 } else { 0 };
        let triangle_count = 8 * (samples - 1)
            + if cap[0] { 2 } else { 0 }
            + if cap[1] { 2 } else { 0 };
        let mut tri = Triangulation::with_capacity(vertex_count, triangle_count);
        tri.error = Self::sagitta_error(*angle, *outer_radius, scale, segments);

        // Shell: each sample emits the four sweep edges twice so the faces
        // stay flat-shaded after welding.
        for &(c, s) in &angles {
            for k in 0..4 {
                let kk = (k + 1) & 3;
                push_vertex(
                    &mut tri.vertices,
                    Vec3f::new(square[k].0 * c, square[k].0 * s, square[k].1),
                );
                push_vertex(
                    &mut tri.vertices,
                    Vec3f::new(square[kk].0 * c, square[kk].0 * s, square[kk].1),
                );
            }
        }
        if cap[0] {
            let (c, s) = angles[0];
            for &(r, z) in &square {
                push_vertex(&mut tri.vertices, Vec3f::new(r * c, r * s, z));
            }
        }
        if cap[1] {
            let (c, s) = angles[samples - 1];
            for &(r, z) in &square {
                push_vertex(&mut tri.vertices, Vec3f::new(r * c, r * s, z));
            }
        }

        for i in 0..samples - 1 {
            for k in 0..4 {
                let a = (8 * i + 2 * k) as u32;
                let b = (8 * (i + 1) + 2 * k) as u32;
                tri.indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
            }
        }
        let mut o = 8 * samples as u32;
        if cap[0] {
            tri.indices
                .extend_from_slice(&[o, o + 2, o + 1, o + 2, o, o + 3]);
            o += 4;
        }
        if cap[1] {
            tri.indices
                .extend_from_slice(&[o, o + 1, o + 2, o + 2, o + 3, o]);
        }
        tri
    }

    fn circular_torus(&mut self, geo: &Geometry, scale: f32) -> Triangulation {
        let PrimitiveKind::CircularTorus {
            offset,
            radius,
            angle,
        } = &geo.kind
        else {
            unreachable!()
        };
        // Toroidal sweep is open, poloidal profile is closed.
        let segments_l = self.segment_count(*angle, offset + radius, scale);
        let segments_s = self.segment_count(TWO_PI, *radius, scale);
        let samples_l = segments_l as usize + 1;
        let samples_s = segments_s as usize;

        let mut cap = [true, true];
        for (i, c) in cap.iter_mut().enumerate() {
            if self.cap_elided(geo, i, ConnectionSide::Circular) {
                *c = false;
            }
        }

        let sweep: Vec<(f32, f32)> = (0..samples_l)
            .map(|i| {
                let a = (angle / segments_l as f32) * i as f32;
                (a.cos(), a.sin())
            })
            .collect();
        let profile: Vec<(f32, f32)> = (0..samples_s)
            .map(|i| {
                let a = (TWO_PI / samples_s as f32) * i as f32 + geo.sample_start_angle;
                (a.cos(), a.sin())
            })
            .collect();

        let ring_count =
            samples_l + if cap[0] { 1 } else { 0 } + if cap[1] { 1 } else { 0 };
        let mut tri = Triangulation::with_capacity(
            ring_count * samples_s,
            2 * (samples_l - 1) * samples_s
                + (samples_s - 2) * (cap.iter().filter(|&&c| c).count()),
        );
        tri.error = Self::sagitta_error(*angle, offset + radius, scale, segments_l)
            .max(Self::sagitta_error(TWO_PI, *radius, scale, segments_s));

        let ring = |tri: &mut Triangulation, sweep_cs: (f32, f32)| {
            for &(pc, ps) in &profile {
                push_vertex(
                    &mut tri.vertices,
                    Vec3f::new(
                        (radius * pc + offset) * sweep_cs.0,
                        (radius * pc + offset) * sweep_cs.1,
                        radius * ps,
                    ),
                );
            }
        };
        for &cs in &sweep {
            ring(&mut tri, cs);
        }
        if cap[0] {
            ring(&mut tri, sweep[0]);
        }
        if cap[1] {
            ring(&mut tri, sweep[samples_l - 1]);
        }

        let ss = samples_s as u32;
        for u in 0..(samples_l - 1) as u32 {
            for v in 0..ss - 1 {
                tri.indices.extend_from_slice(&[
                    ss * u + v,
                    ss * (u + 1) + v,
                    ss * (u + 1) + v + 1,
                    ss * (u + 1) + v + 1,
                    ss * u + v + 1,
                    ss * u + v,
                ]);
            }
            tri.indices.extend_from_slice(&[
                ss * u + (ss - 1),
                ss * (u + 1) + (ss - 1),
                ss * (u + 1),
                ss * (u + 1),
                ss * u,
                ss * u + (ss - 1),
            ]);
        }
        let mut o = (samples_l as u32) * ss;
        if cap[0] {
            let ring: Vec<u32> = (0..ss).map(|i| o + i).collect();
            fan_circle(&mut tri.indices, &ring);
            o += ss;
        }
        if cap[1] {
            let ring: Vec<u32> = (0..ss).map(|i| o + (ss - 1) - i).collect();
            fan_circle(&mut tri.indices, &ring);
        }
        tri
    }

    fn snout(&mut self, geo: &Geometry, scale: f32) -> Triangulation {
        let PrimitiveKind::Snout {
            radius_b,
            radius_t,
            height,
            offset,
            bshear,
            tshear,
        } = &geo.kind
        else {
            unreachable!()
        };
        let radius_max = radius_b.max(*radius_t);
        let segments = self.segment_count(TWO_PI, radius_max, scale);
        let samples = segments as usize;

        let mut cap = [true, true];
        for (i, c) in cap.iter_mut().enumerate() {
            if self.cap_elided(geo, i, ConnectionSide::Circular) {
                *c = false;
            }
        }

        let unit: Vec<(f32, f32)> = (0..samples)
            .map(|i| {
                let a = (TWO_PI / samples as f32) * i as f32 + geo.sample_start_angle;
                (a.cos(), a.sin())
            })
            .collect();

        let h2 = 0.5 * height;
        let ox = 0.5 * offset[0];
        let oy = 0.5 * offset[1];
        let mb = (bshear[0].tan(), bshear[1].tan());
        let mt = (tshear[0].tan(), tshear[1].tan());
        let bottom = |cs: (f32, f32)| {
            let (x, y) = (radius_b * cs.0, radius_b * cs.1);
            Vec3f::new(x - ox, y - oy, -h2 + mb.0 * x + mb.1 * y)
        };
        let top = |cs: (f32, f32)| {
            let (x, y) = (radius_t * cs.0, radius_t * cs.1);
            Vec3f::new(x + ox, y + oy, h2 + mt.0 * x + mt.1 * y)
        };

        let cap_count = cap.iter().filter(|&&c| c).count();
        let mut tri = Triangulation::with_capacity(
            (2 + cap_count) * samples,
            2 * samples + cap_count * (samples - 2),
        );
        tri.error = Self::sagitta_error(TWO_PI, radius_max, scale, segments);

        for &cs in &unit {
            push_vertex(&mut tri.vertices, bottom(cs));
            push_vertex(&mut tri.vertices, top(cs));
        }
        if cap[0] {
            for &cs in &unit {
                push_vertex(&mut tri.vertices, bottom(cs));
            }
        }
        if cap[1] {
            for &cs in &unit {
                push_vertex(&mut tri.vertices, top(cs));
            }
        }

        for i in 0..samples as u32 {
            let ii = (i + 1) % samples as u32;
            quad_indices(&mut tri.indices, 0, 2 * i, 2 * ii, 2 * ii + 1, 2 * i + 1);
        }
        let n = samples as u32;
        let mut o = 2 * n;
        if cap[0] {
            let ring: Vec<u32> = (0..n).map(|i| o + (n - 1) - i).collect();
            fan_circle(&mut tri.indices, &ring);
            o += n;
        }
        if cap[1] {
            let ring: Vec<u32> = (0..n).map(|i| o + i).collect();
            fan_circle(&mut tri.indices, &ring);
        }
        tri
    }

    fn cylinder(&mut self, geo: &Geometry, scale: f32) -> Triangulation {
        let PrimitiveKind::Cylinder { radius, height } = &geo.kind else {
            unreachable!()
        };
        let segments = self.segment_count(TWO_PI, *radius, scale);
        let samples = segments as usize;

        let mut cap = [true, true];
        for (i, c) in cap.iter_mut().enumerate() {
            if self.cap_elided(geo, i, ConnectionSide::Circular) {
                *c = false;
            }
        }

        let unit: Vec<(f32, f32)> = (0..samples)
            .map(|i| {
                let a = (TWO_PI / samples as f32) * i as f32 + geo.sample_start_angle;
                (radius * a.cos(), radius * a.sin())
            })
            .collect();

        let h2 = 0.5 * height;
        let cap_count = cap.iter().filter(|&&c| c).count();
        let mut tri = Triangulation::with_capacity(
            (2 + cap_count) * samples,
            2 * samples + cap_count * (samples - 2),
        );
        tri.error = Self::sagitta_error(TWO_PI, *radius, scale, segments);

        for &(x, y) in &unit {
            push_vertex(&mut tri.vertices, Vec3f::new(x, y, -h2));
            push_vertex(&mut tri.vertices, Vec3f::new(x, y, h2));
        }
        if cap[0] {
            for &(x, y) in &unit {
                push_vertex(&mut tri.vertices, Vec3f::new(x, y, -h2));
            }
        }
        if cap[1] {
            for &(x, y) in &unit {
                push_vertex(&mut tri.vertices, Vec3f::new(x, y, h2));
            }
        }

        for i in 0..samples as u32 {
            let ii = (i + 1) % samples as u32;
            quad_indices(&mut tri.indices, 0, 2 * i, 2 * ii, 2 * ii + 1, 2 * i + 1);
        }
        let n = samples as u32;
        let mut o = 2 * n;
        if cap[0] {
            let ring: Vec<u32> = (0..n).map(|i| o + (n - 1) - i).collect();
            fan_circle(&mut tri.indices, &ring);
            o += n;
        }
        if cap[1] {
            let ring: Vec<u32> = (0..n).map(|i| o + i).collect();
            fan_circle(&mut tri.indices, &ring);
        }
        tri
    }

    /// Shared generator for spheres and dishes: a sphere of `radius` swept
    /// through `arc` from the +z pole, scaled along z and shifted.
    fn sphere_based_shape(
        &mut self,
        geo: &Geometry,
        radius: f32,
        arc: f32,
        shift_z: f32,
        scale_z: f32,
        scale: f32,
    ) -> Triangulation {
        let scale_z = if scale_z.is_finite() { scale_z } else { 0.0 };
        let segments = self.segment_count(TWO_PI, radius, scale);
        let samples = segments;

        let mut arc = arc;
        let is_sphere = PI - 1e-3 <= arc;
        if is_sphere {
            arc = PI;
        }

        let min_rings = 3u32;
        let rings = (scale_z * samples as f32 * arc * (1.0 / TWO_PI))
            .max(min_rings as f32) as usize;

        // Per-ring latitude and sample count; poles collapse to one sample.
        let theta_scale = arc / (rings - 1) as f32;
        let mut lat = Vec::with_capacity(rings);
        let mut counts = Vec::with_capacity(rings);
        for r in 0..rings {
            let theta = theta_scale * r as f32;
            lat.push((theta.cos(), theta.sin()));
            counts.push((theta.sin() * samples as f32).max(3.0) as u32);
        }
        counts[0] = 1;
        if is_sphere {
            counts[rings - 1] = 1;
        }

        let total: u32 = counts.iter().sum();
        let mut tri = Triangulation::with_capacity(total as usize, 2 * total as usize);
        tri.error = Self::sagitta_error(TWO_PI, radius, scale, samples);

        for r in 0..rings {
            let (nz, w) = lat[r];
            let z = radius * scale_z * nz + shift_z;
            let n = counts[r];
            let phi_scale = TWO_PI / n as f32;
            for i in 0..n {
                let phi = phi_scale * i as f32 + geo.sample_start_angle;
                push_vertex(
                    &mut tri.vertices,
                    Vec3f::new(radius * w * phi.cos(), radius * w * phi.sin(), z),
                );
            }
        }

        // Stitch adjacent rings with differing sample counts.
        let mut o_c = 0u32;
        for r in 0..rings - 1 {
            let n_c = counts[r];
            let n_n = counts[r + 1];
            let o_n = o_c + n_c;

            if n_c < n_n {
                for i_n in 0..n_n {
                    let ii_n = i_n + 1;
                    let mut i_c = (n_c * (i_n + 1)) / n_n;
                    let mut ii_c = (n_c * (ii_n + 1)) / n_n;
                    i_c %= n_c;
                    ii_c %= n_c;
                    let ii_n = ii_n % n_n;
                    if i_c != ii_c {
                        tri.indices
                            .extend_from_slice(&[o_c + i_c, o_n + ii_n, o_c + ii_c]);
                    }
                    tri.indices
                        .extend_from_slice(&[o_c + i_c, o_n + i_n, o_n + ii_n]);
                }
            } else {
                for i_c in 0..n_c {
                    let ii_c = i_c + 1;
                    let mut i_n = (n_n * i_c) / n_c;
                    let mut ii_n = (n_n * ii_c) / n_c;
                    i_n %= n_n;
                    ii_n %= n_n;
                    let ii_c = ii_c % n_c;
                    tri.indices
                        .extend_from_slice(&[o_c + i_c, o_n + ii_n, o_c + ii_c]);
                    if i_n != ii_n {
                        tri.indices
                            .extend_from_slice(&[o_c + i_c, o_n + i_n, o_n + ii_n]);
                    }
                }
            }
            o_c = o_n;
        }
        tri
    }
}

fn push_vertex(vertices: &mut Vec<f32>, p: Vec3f) {
    vertices.extend_from_slice(&[p.x, p.y, p.z]);
}

fn quad_indices(indices: &mut Vec<u32>, o: u32, v0: u32, v1: u32, v2: u32, v3: u32) {
    indices.extend_from_slice(&[o + v0, o + v1, o + v2, o + v2, o + v3, o + v0]);
}

/// Triangulates a closed vertex ring into a disk by repeatedly connecting
/// alternating vertices, halving the ring each pass. Emits `len - 2`
/// triangles with strip-like connectivity.
fn fan_circle(indices: &mut Vec<u32>, ring: &[u32]) {
    let mut src = ring.to_vec();
    let mut tmp = Vec::with_capacity(src.len() / 2 + 1);
    while src.len() >= 3 {
        tmp.clear();
        let n = src.len();
        let mut i = 0;
        while i + 2 < n {
            indices.extend_from_slice(&[src[i], src[i + 1], src[i + 2]]);
            tmp.push(src[i]);
            i += 2;
        }
        while i < n {
            tmp.push(src[i]);
            i += 1;
        }
        std::mem::swap(&mut src, &mut tmp);
    }
}

/// Triangulates a facet group. Triangles pass through, quads split along
/// the diagonal that folds least, anything else goes through the general
/// polygon tessellator. Polygons with non-finite coordinates are skipped.
fn facet_group(group: &FacetGroup) -> Triangulation {
    let mut tri = Triangulation::default();
    'polygons: for poly in &group.polygons {
        for contour in &poly.contours {
            for p in &contour.vertices {
                if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                    tracing::warn!("skipping facet polygon with non-finite vertex");
                    continue 'polygons;
                }
            }
        }

        if poly.contours.len() == 1 && poly.contours[0].vertices.len() == 3 {
            let vo = (tri.vertices.len() / 3) as u32;
            for &p in &poly.contours[0].vertices {
                push_vertex(&mut tri.vertices, p);
            }
            tri.indices.extend_from_slice(&[vo, vo + 1, vo + 2]);
        } else if poly.contours.len() == 1 && poly.contours[0].vertices.len() == 4 {
            let v = &poly.contours[0].vertices;
            let vo = (tri.vertices.len() / 3) as u32;
            for &p in v {
                push_vertex(&mut tri.vertices, p);
            }
            let v01 = v[1] - v[0];
            let v12 = v[2] - v[1];
            let v23 = v[3] - v[2];
            let v30 = v[0] - v[3];
            let n0 = v01.cross(&v30);
            let n1 = v12.cross(&v01);
            let n2 = v23.cross(&v12);
            let n3 = v30.cross(&v23);
            if n0.dot(&n2) < n1.dot(&n3) {
                tri.indices
                    .extend_from_slice(&[vo, vo + 1, vo + 2, vo + 2, vo + 3, vo]);
            } else {
                tri.indices
                    .extend_from_slice(&[vo + 3, vo, vo + 1, vo + 1, vo + 2, vo + 3]);
            }
        } else if let Some((points, indices)) = triangulate_polygon(&poly.contours) {
            let vo = (tri.vertices.len() / 3) as u32;
            for p in points {
                push_vertex(&mut tri.vertices, p);
            }
            tri.indices.extend(indices.iter().map(|i| i + vo));
        }
    }
    tri
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rvmesh_math::{BBox3f, Mat3x4f};
    use rvmesh_model::{connect, Contour, Geometry, GeometryType, Polygon};

    fn placed(kind: PrimitiveKind) -> Geometry {
        placed_at(kind, Vec3f::zeros())
    }

    fn placed_at(kind: PrimitiveKind, t: Vec3f) -> Geometry {
        Geometry::new(
            kind,
            GeometryType::Primitive,
            Mat3x4f::from_translation(t),
            BBox3f::new(Vec3f::new(-1.0, -1.0, -1.0), Vec3f::new(1.0, 1.0, 1.0)),
        )
    }

    #[test]
    fn box_emits_six_quads() {
        let mut factory = TriangulationFactory::new(0.01);
        let geo = placed(PrimitiveKind::Box {
            lengths: [1.0, 2.0, 3.0],
        });
        let tri = factory.tessellate(&geo).unwrap();
        assert_eq!(tri.num_vertices(), 24);
        assert_eq!(tri.num_triangles(), 12);
        assert_eq!(tri.error, 0.0);
    }

    #[test]
    fn degenerate_box_axis_drops_faces() {
        let mut factory = TriangulationFactory::new(0.01);
        let geo = placed(PrimitiveKind::Box {
            lengths: [1.0, 2.0, 1e-6],
        });
        let tri = factory.tessellate(&geo).unwrap();
        assert_eq!(tri.num_vertices(), 16);
    }

    #[test]
    fn box_vertices_are_world_transformed() {
        let mut factory = TriangulationFactory::new(0.01);
        let geo = placed_at(
            PrimitiveKind::Box {
                lengths: [2.0, 2.0, 2.0],
            },
            Vec3f::new(100.0, 0.0, 0.0),
        );
        let tri = factory.tessellate(&geo).unwrap();
        let xs: Vec<f32> = tri.vertices.chunks(3).map(|v| v[0]).collect();
        assert!(xs.iter().all(|&x| (99.0..=101.0).contains(&x)));
    }

    #[test]
    fn pyramid_with_point_top_has_no_top_cap() {
        let mut factory = TriangulationFactory::new(0.01);
        let geo = placed(PrimitiveKind::Pyramid {
            bottom: [2.0, 2.0],
            top: [0.0, 0.0],
            offset: [0.0, 0.0],
            height: 1.0,
        });
        let tri = factory.tessellate(&geo).unwrap();
        // Four sides plus the bottom.
        assert_eq!(tri.num_vertices(), 20);
        assert_eq!(tri.num_triangles(), 10);
    }

    #[test]
    fn segment_count_clamps_to_bounds() {
        let fine = TriangulationFactory::new(1e-9);
        assert_eq!(fine.segment_count(TWO_PI, 1000.0, 1.0), 100);
        let coarse = TriangulationFactory::new(100.0);
        assert_eq!(coarse.segment_count(TWO_PI, 0.01, 1.0), 3);
    }

    #[test]
    fn segment_count_grows_as_tolerance_shrinks() {
        let mut last = 0;
        for tol in [0.1, 0.05, 0.01, 0.005, 0.001] {
            let f = TriangulationFactory::new(tol);
            let n = f.segment_count(TWO_PI, 1.0, 1.0);
            assert!(n >= last, "tolerance {tol} gave {n} < {last}");
            last = n;
        }
    }

    #[test]
    fn reported_error_is_within_tolerance() {
        let tol = 0.01;
        let mut factory = TriangulationFactory::new(tol);
        let geo = placed(PrimitiveKind::Cylinder {
            radius: 1.0,
            height: 2.0,
        });
        let tri = factory.tessellate(&geo).unwrap();
        assert!(tri.error > 0.0);
        assert!(tri.error <= tol + 1e-6, "error {} above tolerance", tri.error);
    }

    #[test]
    fn cylinder_vertex_count_follows_samples() {
        let mut factory = TriangulationFactory::new(0.01);
        let geo = placed(PrimitiveKind::Cylinder {
            radius: 1.0,
            height: 2.0,
        });
        let samples = factory.segment_count(TWO_PI, 1.0, 1.0) as usize;
        let tri = factory.tessellate(&geo).unwrap();
        assert_eq!(tri.num_vertices(), 4 * samples);
        assert_eq!(tri.num_triangles(), 2 * samples + 2 * (samples - 2));
    }

    #[test]
    fn connected_cylinders_skip_shared_caps() {
        let mut factory = TriangulationFactory::new(0.01);
        let kind = PrimitiveKind::Cylinder {
            radius: 1.0,
            height: 2.0,
        };
        let samples = factory.segment_count(TWO_PI, 1.0, 1.0) as usize;

        let mut a = placed_at(kind.clone(), Vec3f::zeros());
        let mut b = placed_at(kind.clone(), Vec3f::new(0.0, 0.0, 2.0));
        connect(&mut a, 1, &mut b, 0, ConnectionSide::Circular);

        let ta = factory.tessellate(&a).unwrap();
        let tb = factory.tessellate(&b).unwrap();
        assert_eq!(factory.discarded_caps, 2);
        // Each cylinder loses exactly one cap ring of vertices.
        assert_eq!(ta.num_vertices(), 3 * samples);
        assert_eq!(tb.num_vertices(), 3 * samples);
        assert_eq!(ta.num_triangles(), 2 * samples + (samples - 2));
        assert_eq!(tb.num_triangles(), ta.num_triangles());
    }

    #[test]
    fn mismatched_connection_keeps_caps() {
        let mut factory = TriangulationFactory::new(0.01);
        let mut a = placed_at(
            PrimitiveKind::Cylinder {
                radius: 2.0,
                height: 2.0,
            },
            Vec3f::zeros(),
        );
        let mut b = placed_at(
            PrimitiveKind::Cylinder {
                radius: 1.0,
                height: 2.0,
            },
            Vec3f::new(0.0, 0.0, 2.0),
        );
        connect(&mut a, 1, &mut b, 0, ConnectionSide::Circular);

        let samples_a = factory.segment_count(TWO_PI, 2.0, 1.0) as usize;
        let ta = factory.tessellate(&a).unwrap();
        // The wide cylinder sticks out, so its cap survives.
        assert_eq!(ta.num_vertices(), 4 * samples_a);
        // The narrow one is covered and loses its cap.
        let samples_b = factory.segment_count(TWO_PI, 1.0, 1.0) as usize;
        let tb = factory.tessellate(&b).unwrap();
        assert_eq!(tb.num_vertices(), 3 * samples_b);
        assert_eq!(factory.discarded_caps, 1);
    }

    #[test]
    fn sphere_is_closed_and_indices_valid() {
        let mut factory = TriangulationFactory::new(0.01);
        let geo = placed(PrimitiveKind::Sphere { diameter: 2.0 });
        let tri = factory.tessellate(&geo).unwrap();
        assert!(tri.num_vertices() > 0);
        let n = tri.num_vertices() as u32;
        assert!(tri.indices.iter().all(|&i| i < n));
        // Closed surface: every edge must be shared by exactly two
        // triangles.
        let mut edges = std::collections::HashMap::new();
        for t in tri.indices.chunks(3) {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let key = (a.min(b), a.max(b));
                *edges.entry(key).or_insert(0u32) += 1;
            }
        }
        assert!(edges.values().all(|&c| c == 2));
    }

    #[test]
    fn circular_torus_cap_elision() {
        let mut factory = TriangulationFactory::new(0.01);
        let kind = PrimitiveKind::CircularTorus {
            offset: 4.0,
            radius: 1.0,
            angle: PI / 2.0,
        };
        let open = factory.tessellate(&placed(kind.clone())).unwrap();

        let mut elbow = placed(kind);
        let mut pipe = placed_at(
            PrimitiveKind::Cylinder {
                radius: 1.0,
                height: 2.0,
            },
            Vec3f::new(4.0, 0.0, 5.0),
        );
        connect(&mut elbow, 0, &mut pipe, 0, ConnectionSide::Circular);
        let joined = factory.tessellate(&elbow).unwrap();

        let samples_s = factory.segment_count(TWO_PI, 1.0, 1.0) as usize;
        assert_eq!(open.num_vertices() - joined.num_vertices(), samples_s);
    }

    #[test]
    fn facet_group_triangle_passthrough() {
        let mut factory = TriangulationFactory::new(0.01);
        let group = FacetGroup {
            polygons: vec![Polygon {
                contours: vec![Contour {
                    vertices: vec![
                        Vec3f::new(0.0, 0.0, 0.0),
                        Vec3f::new(1.0, 0.0, 0.0),
                        Vec3f::new(0.0, 1.0, 0.0),
                    ],
                }],
            }],
        };
        let geo = placed(PrimitiveKind::FacetGroup(group));
        let tri = factory.tessellate(&geo).unwrap();
        assert_eq!(tri.num_vertices(), 3);
        assert_eq!(tri.num_triangles(), 1);
    }

    #[test]
    fn facet_group_skips_non_finite_polygons() {
        let mut factory = TriangulationFactory::new(0.01);
        let group = FacetGroup {
            polygons: vec![
                Polygon {
                    contours: vec![Contour {
                        vertices: vec![
                            Vec3f::new(0.0, 0.0, 0.0),
                            Vec3f::new(f32::NAN, 0.0, 0.0),
                            Vec3f::new(0.0, 1.0, 0.0),
                        ],
                    }],
                },
                Polygon {
                    contours: vec![Contour {
                        vertices: vec![
                            Vec3f::new(0.0, 0.0, 1.0),
                            Vec3f::new(1.0, 0.0, 1.0),
                            Vec3f::new(0.0, 1.0, 1.0),
                        ],
                    }],
                },
            ],
        };
        let geo = placed(PrimitiveKind::FacetGroup(group));
        let tri = factory.tessellate(&geo).unwrap();
        assert_eq!(tri.num_triangles(), 1);
    }

    #[test]
    fn facet_group_quad_splits_on_flattest_diagonal() {
        let mut factory = TriangulationFactory::new(0.01);
        let group = FacetGroup {
            polygons: vec![Polygon {
                contours: vec![Contour {
                    vertices: vec![
                        Vec3f::new(0.0, 0.0, 0.0),
                        Vec3f::new(1.0, 0.0, 0.0),
                        Vec3f::new(1.0, 1.0, 0.0),
                        Vec3f::new(0.0, 1.0, 0.0),
                    ],
                }],
            }],
        };
        let geo = placed(PrimitiveKind::FacetGroup(group));
        let tri = factory.tessellate(&geo).unwrap();
        assert_eq!(tri.num_vertices(), 4);
        assert_eq!(tri.num_triangles(), 2);
    }

    #[test]
    fn elliptical_dish_rim_radius_matches() {
        let mut factory = TriangulationFactory::new(0.001);
        let geo = placed(PrimitiveKind::EllipticalDish {
            base_radius: 2.0,
            height: 1.0,
        });
        let tri = factory.tessellate(&geo).unwrap();
        // Rim vertices sit at z = 0 and at most base_radius from the axis.
        let max_r = tri
            .vertices
            .chunks(3)
            .map(|v| (v[0] * v[0] + v[1] * v[1]).sqrt())
            .fold(0.0f32, f32::max);
        assert_relative_eq!(max_r, 2.0, epsilon = 1e-2);
        let max_z = tri.vertices.chunks(3).map(|v| v[2]).fold(0.0f32, f32::max);
        assert_relative_eq!(max_z, 1.0, epsilon = 1e-2);
    }

    #[test]
    fn spherical_dish_cap_height() {
        let mut factory = TriangulationFactory::new(0.001);
        let geo = placed(PrimitiveKind::SphericalDish {
            base_radius: 2.0,
            height: 0.5,
        });
        let tri = factory.tessellate(&geo).unwrap();
        let max_z = tri.vertices.chunks(3).map(|v| v[2]).fold(f32::MIN, f32::max);
        assert_relative_eq!(max_z, 0.5, epsilon = 1e-2);
    }

    #[test]
    fn rectangular_torus_open_sweep() {
        let mut factory = TriangulationFactory::new(0.01);
        let geo = placed(PrimitiveKind::RectangularTorus {
            inner_radius: 1.0,
            outer_radius: 2.0,
            height: 0.5,
            angle: PI / 2.0,
        });
        let samples = factory.segment_count(PI / 2.0, 2.0, 1.0) as usize + 1;
        let tri = factory.tessellate(&geo).unwrap();
        assert_eq!(tri.num_vertices(), 8 * samples + 8);
        assert_eq!(tri.num_triangles(), 8 * (samples - 1) + 4);
    }

    #[test]
    fn snout_shear_moves_end_planes() {
        let mut factory = TriangulationFactory::new(0.01);
        let geo = placed(PrimitiveKind::Snout {
            radius_b: 1.0,
            radius_t: 1.0,
            height: 2.0,
            offset: [0.0, 0.0],
            bshear: [0.0, 0.0],
            tshear: [0.3, 0.0],
        });
        let tri = factory.tessellate(&geo).unwrap();
        // Top rim is no longer planar in z = 1.
        let top_z: Vec<f32> = tri
            .vertices
            .chunks(3)
            .filter(|v| v[2] > 0.0)
            .map(|v| v[2])
            .collect();
        let spread = top_z.iter().fold(f32::MIN, |a, &b| a.max(b))
            - top_z.iter().fold(f32::MAX, |a, &b| a.min(b));
        assert!(spread > 0.1);
    }
}
