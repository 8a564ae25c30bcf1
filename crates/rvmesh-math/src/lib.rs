//! Math primitives shared across the rvmesh pipeline.
//!
//! Plant models use single-precision coordinates with a column-major 3x4
//! affine transform per primitive. Coordinates are Z-up in the source data;
//! [`rotate_z_up_to_y_up`] maps them into the glTF convention at merge time.

#![warn(missing_docs)]

use nalgebra::{Vector2, Vector3};

/// 2D vector of f32.
pub type Vec2f = Vector2<f32>;

/// 3D vector of f32.
pub type Vec3f = Vector3<f32>;

/// 3D vector of f64, used where large site coordinates would lose
/// precision in f32.
pub type Vec3d = Vector3<f64>;

/// Column-major 3x4 affine transform as stored in plant model files.
///
/// `data[3 * c + r]` holds row `r` of column `c`; columns 0..3 are the
/// linear part and column 3 is the translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3x4f {
    /// Column-major coefficients.
    pub data: [f32; 12],
}

impl Mat3x4f {
    /// The identity transform.
    pub fn identity() -> Self {
        let mut data = [0.0; 12];
        data[0] = 1.0;
        data[4] = 1.0;
        data[8] = 1.0;
        Mat3x4f { data }
    }

    /// Builds a transform from a translation, with an identity linear part.
    pub fn from_translation(t: Vec3f) -> Self {
        let mut m = Mat3x4f::identity();
        m.data[9] = t.x;
        m.data[10] = t.y;
        m.data[11] = t.z;
        m
    }

    /// Column `c` of the linear part (`c < 4` gives the translation).
    pub fn column(&self, c: usize) -> Vec3f {
        Vec3f::new(self.data[3 * c], self.data[3 * c + 1], self.data[3 * c + 2])
    }

    /// Applies the transform to a point.
    pub fn transform_point(&self, p: Vec3f) -> Vec3f {
        let d = &self.data;
        Vec3f::new(
            d[0] * p.x + d[3] * p.y + d[6] * p.z + d[9],
            d[1] * p.x + d[4] * p.y + d[7] * p.z + d[10],
            d[2] * p.x + d[5] * p.y + d[8] * p.z + d[11],
        )
    }

    /// Applies the transform to a point in f64.
    ///
    /// Site models place geometry far from the origin, so the final
    /// local-to-world multiply is done in double precision before rounding
    /// back to f32.
    pub fn transform_point_f64(&self, p: Vec3f) -> Vec3f {
        let d = self.data.map(|v| v as f64);
        let (x, y, z) = (p.x as f64, p.y as f64, p.z as f64);
        Vec3f::new(
            (d[0] * x + d[3] * y + d[6] * z + d[9]) as f32,
            (d[1] * x + d[4] * y + d[7] * z + d[10]) as f32,
            (d[2] * x + d[5] * y + d[8] * z + d[11]) as f32,
        )
    }

    /// Applies only the linear part (no translation) to a direction.
    pub fn transform_direction(&self, v: Vec3f) -> Vec3f {
        let d = &self.data;
        Vec3f::new(
            d[0] * v.x + d[3] * v.y + d[6] * v.z,
            d[1] * v.x + d[4] * v.y + d[7] * v.z,
            d[2] * v.x + d[5] * v.y + d[8] * v.z,
        )
    }

    /// Largest basis column norm, used to scale tessellation tolerances
    /// from local into world units.
    pub fn scale(&self) -> f32 {
        let a = self.column(0).norm();
        let b = self.column(1).norm();
        let c = self.column(2).norm();
        a.max(b).max(c)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox3f {
    /// Minimum corner.
    pub min: Vec3f,
    /// Maximum corner.
    pub max: Vec3f,
}

impl BBox3f {
    /// An inverted box that engulfs nothing.
    pub fn empty() -> Self {
        BBox3f {
            min: Vec3f::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vec3f::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Box spanning the two given corners (assumed already ordered).
    pub fn new(min: Vec3f, max: Vec3f) -> Self {
        BBox3f { min, max }
    }

    /// True if no point has been engulfed yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grows the box to contain `p`.
    pub fn engulf(&mut self, p: Vec3f) {
        self.min = self.min.inf(&p);
        self.max = self.max.sup(&p);
    }

    /// Grows the box to contain another box.
    pub fn engulf_bbox(&mut self, other: &BBox3f) {
        if !other.is_empty() {
            self.engulf(other.min);
            self.engulf(other.max);
        }
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3f; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3f::new(lo.x, lo.y, lo.z),
            Vec3f::new(hi.x, lo.y, lo.z),
            Vec3f::new(lo.x, hi.y, lo.z),
            Vec3f::new(hi.x, hi.y, lo.z),
            Vec3f::new(lo.x, lo.y, hi.z),
            Vec3f::new(hi.x, lo.y, hi.z),
            Vec3f::new(lo.x, hi.y, hi.z),
            Vec3f::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Axis-aligned box containing this box mapped through `m`.
    pub fn transformed_by(&self, m: &Mat3x4f) -> BBox3f {
        let mut out = BBox3f::empty();
        if self.is_empty() {
            return out;
        }
        for corner in self.corners() {
            out.engulf(m.transform_point(corner));
        }
        out
    }
}

/// Rotates a Z-up point into the glTF Y-up convention.
pub fn rotate_z_up_to_y_up(p: Vec3f) -> Vec3f {
    Vec3f::new(p.x, p.z, -p.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn transform_point_applies_translation_last() {
        let mut m = Mat3x4f::identity();
        // 90 degree rotation about z: x -> y.
        m.data[0] = 0.0;
        m.data[1] = 1.0;
        m.data[3] = -1.0;
        m.data[4] = 0.0;
        m.data[9] = 10.0;
        let p = m.transform_point(Vec3f::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 10.0);
        assert_relative_eq!(p.y, 1.0);
        assert_relative_eq!(p.z, 0.0);
    }

    #[test]
    fn scale_picks_largest_column() {
        let mut m = Mat3x4f::identity();
        m.data[4] = 3.0;
        assert_relative_eq!(m.scale(), 3.0);
    }

    #[test]
    fn bbox_transform_stays_axis_aligned() {
        let bb = BBox3f::new(Vec3f::new(-1.0, -2.0, -3.0), Vec3f::new(1.0, 2.0, 3.0));
        let m = Mat3x4f::from_translation(Vec3f::new(5.0, 0.0, 0.0));
        let out = bb.transformed_by(&m);
        assert_relative_eq!(out.min.x, 4.0);
        assert_relative_eq!(out.max.x, 6.0);
        assert_relative_eq!(out.min.y, -2.0);
    }

    #[test]
    fn empty_bbox_engulfs_first_point() {
        let mut bb = BBox3f::empty();
        assert!(bb.is_empty());
        bb.engulf(Vec3f::new(1.0, 2.0, 3.0));
        assert!(!bb.is_empty());
        assert_eq!(bb.min, bb.max);
    }

    #[test]
    fn y_up_rotation_preserves_handedness() {
        let p = rotate_z_up_to_y_up(Vec3f::new(1.0, 2.0, 3.0));
        assert_eq!(p, Vec3f::new(1.0, 3.0, -2.0));
    }
}
