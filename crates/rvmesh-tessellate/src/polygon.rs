//! Planar polygon triangulation with hole support.
//!
//! Facet-group faces are planar polygons with optional hole contours. Holes
//! are bridged into the outer boundary with a doubled edge and the merged
//! polygon is ear clipped.

use rvmesh_math::{Vec2f, Vec3f};
use rvmesh_model::Contour;

/// Triangulates one polygon. Returns the emitted vertices and triangle
/// indices into them, or `None` if no contour has enough vertices.
pub fn triangulate_polygon(contours: &[Contour]) -> Option<(Vec<Vec3f>, Vec<u32>)> {
    let valid: Vec<&Contour> = contours
        .iter()
        .filter(|c| c.vertices.len() >= 3)
        .collect();
    let (outer, holes) = valid.split_first()?;

    // Work relative to the polygon center; facet groups sit at full site
    // coordinates where f32 cross products get noisy.
    let mut center = Vec3f::zeros();
    let mut n = 0;
    for c in &valid {
        for p in &c.vertices {
            center += p;
            n += 1;
        }
    }
    center /= n as f32;

    let normal = newell_normal(&outer.vertices);
    if normal.norm_squared() < f32::EPSILON {
        return None;
    }
    let (e1, e2) = plane_basis(normal);
    let project = |p: &Vec3f| {
        let q = p - center;
        Vec2f::new(q.dot(&e1), q.dot(&e2))
    };

    // Emitted vertex list plus the merged boundary referencing it.
    let mut points: Vec<Vec3f> = Vec::new();
    let mut merged: Vec<(Vec2f, u32)> = Vec::new();

    let mut outer2: Vec<(Vec2f, u32)> = outer
        .vertices
        .iter()
        .map(|p| {
            points.push(*p);
            (project(p), (points.len() - 1) as u32)
        })
        .collect();
    if signed_area(&outer2) < 0.0 {
        outer2.reverse();
    }
    merged.extend(outer2);

    for hole in holes {
        let mut hole2: Vec<(Vec2f, u32)> = hole
            .vertices
            .iter()
            .map(|p| {
                points.push(*p);
                (project(p), (points.len() - 1) as u32)
            })
            .collect();
        // Holes wind opposite to the boundary so the merged polygon stays
        // simple after bridging.
        if signed_area(&hole2) > 0.0 {
            hole2.reverse();
        }
        bridge_hole(&mut merged, &hole2);
    }

    let indices = ear_clip(&merged);
    if indices.is_empty() {
        return None;
    }
    Some((points, indices))
}

/// Newell's method; robust against collinear leading vertices.
fn newell_normal(vertices: &[Vec3f]) -> Vec3f {
    let mut n = Vec3f::zeros();
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[(i + 1) % vertices.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

fn plane_basis(normal: Vec3f) -> (Vec3f, Vec3f) {
    let up = if normal.x.abs() < normal.z.abs().max(normal.y.abs()) {
        Vec3f::new(1.0, 0.0, 0.0)
    } else {
        Vec3f::new(0.0, 0.0, 1.0)
    };
    let e1 = normal.cross(&up).normalize();
    let e2 = normal.cross(&e1).normalize();
    (e1, e2)
}

fn signed_area(poly: &[(Vec2f, u32)]) -> f32 {
    let mut a = 0.0;
    for i in 0..poly.len() {
        let p = poly[i].0;
        let q = poly[(i + 1) % poly.len()].0;
        a += p.x * q.y - q.x * p.y;
    }
    0.5 * a
}

fn cross2(o: Vec2f, a: Vec2f, b: Vec2f) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Proper segment intersection, endpoints excluded.
fn segments_cross(a0: Vec2f, a1: Vec2f, b0: Vec2f, b1: Vec2f) -> bool {
    let d1 = cross2(b0, b1, a0);
    let d2 = cross2(b0, b1, a1);
    let d3 = cross2(a0, a1, b0);
    let d4 = cross2(a0, a1, b1);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Splices a hole into the merged boundary along the closest mutually
/// visible vertex pair. The bridge edge appears twice, once per direction,
/// keeping the merged polygon simple.
fn bridge_hole(merged: &mut Vec<(Vec2f, u32)>, hole: &[(Vec2f, u32)]) {
    let mut best: Option<(usize, usize)> = None;
    let mut best_d = f32::INFINITY;
    for (i, &(pm, _)) in merged.iter().enumerate() {
        for (j, &(ph, _)) in hole.iter().enumerate() {
            let d = (pm - ph).norm_squared();
            if d >= best_d {
                continue;
            }
            if bridge_is_clear(merged, hole, pm, ph) {
                best = Some((i, j));
                best_d = d;
            }
        }
    }
    // Fall back to the globally closest pair on malformed input.
    let (i, j) = best.unwrap_or_else(|| {
        let mut fallback = (0, 0);
        let mut d_min = f32::INFINITY;
        for (i, &(pm, _)) in merged.iter().enumerate() {
            for (j, &(ph, _)) in hole.iter().enumerate() {
                let d = (pm - ph).norm_squared();
                if d < d_min {
                    d_min = d;
                    fallback = (i, j);
                }
            }
        }
        fallback
    });

    let mut spliced = Vec::with_capacity(merged.len() + hole.len() + 2);
    spliced.extend_from_slice(&merged[..=i]);
    spliced.extend_from_slice(&hole[j..]);
    spliced.extend_from_slice(&hole[..=j]);
    spliced.push(merged[i]);
    spliced.extend_from_slice(&merged[i + 1..]);
    *merged = spliced;
}

fn bridge_is_clear(
    merged: &[(Vec2f, u32)],
    hole: &[(Vec2f, u32)],
    pm: Vec2f,
    ph: Vec2f,
) -> bool {
    let edges = merged
        .iter()
        .enumerate()
        .map(|(k, &(p, _))| (p, merged[(k + 1) % merged.len()].0))
        .chain(
            hole.iter()
                .enumerate()
                .map(|(k, &(p, _))| (p, hole[(k + 1) % hole.len()].0)),
        );
    for (q0, q1) in edges {
        if segments_cross(pm, ph, q0, q1) {
            return false;
        }
    }
    true
}

/// Ear clipping over the merged counter-clockwise polygon. Returns emitted
/// vertex indices, three per triangle.
fn ear_clip(polygon: &[(Vec2f, u32)]) -> Vec<u32> {
    let mut remaining: Vec<usize> = (0..polygon.len()).collect();
    let mut indices = Vec::with_capacity(3 * polygon.len().saturating_sub(2));

    while remaining.len() > 3 {
        let n = remaining.len();
        let mut clipped = false;
        for k in 0..n {
            let ia = remaining[(k + n - 1) % n];
            let ib = remaining[k];
            let ic = remaining[(k + 1) % n];
            let (a, b, c) = (polygon[ia].0, polygon[ib].0, polygon[ic].0);
            if cross2(a, b, c) <= 0.0 {
                continue;
            }
            let blocked = remaining.iter().any(|&m| {
                let p = polygon[m].0;
                m != ia
                    && m != ib
                    && m != ic
                    && p != a
                    && p != b
                    && p != c
                    && point_in_triangle(p, a, b, c)
            });
            if blocked {
                continue;
            }
            indices.push(polygon[ia].1);
            indices.push(polygon[ib].1);
            indices.push(polygon[ic].1);
            remaining.remove(k);
            clipped = true;
            break;
        }
        if !clipped {
            // Degenerate leftovers; cut at an arbitrary corner so the loop
            // always terminates.
            let ia = remaining[remaining.len() - 1];
            let ib = remaining[0];
            let ic = remaining[1];
            indices.push(polygon[ia].1);
            indices.push(polygon[ib].1);
            indices.push(polygon[ic].1);
            remaining.remove(0);
        }
    }
    if remaining.len() == 3 {
        for &k in &remaining {
            indices.push(polygon[k].1);
        }
    }
    indices
}

fn point_in_triangle(p: Vec2f, a: Vec2f, b: Vec2f, c: Vec2f) -> bool {
    let d1 = cross2(a, b, p);
    let d2 = cross2(b, c, p);
    let d3 = cross2(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn contour(points: &[[f32; 3]]) -> Contour {
        Contour {
            vertices: points.iter().map(|p| Vec3f::new(p[0], p[1], p[2])).collect(),
        }
    }

    fn triangle_area_sum(points: &[Vec3f], indices: &[u32]) -> f32 {
        indices
            .chunks(3)
            .map(|t| {
                let a = points[t[0] as usize];
                let b = points[t[1] as usize];
                let c = points[t[2] as usize];
                0.5 * (b - a).cross(&(c - a)).norm()
            })
            .sum()
    }

    #[test]
    fn convex_polygon_area_is_preserved() {
        let square = contour(&[
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 2.0, 0.0],
            [0.0, 2.0, 0.0],
        ]);
        let (points, indices) = triangulate_polygon(&[square]).unwrap();
        assert_eq!(indices.len(), 6);
        assert_relative_eq!(triangle_area_sum(&points, &indices), 4.0, epsilon = 1e-5);
    }

    #[test]
    fn concave_polygon_triangulates() {
        let l_shape = contour(&[
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 2.0, 0.0],
            [0.0, 2.0, 0.0],
        ]);
        let (points, indices) = triangulate_polygon(&[l_shape]).unwrap();
        assert_eq!(indices.len() / 3, 4);
        assert_relative_eq!(triangle_area_sum(&points, &indices), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn hole_is_subtracted() {
        let outer = contour(&[
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [4.0, 4.0, 0.0],
            [0.0, 4.0, 0.0],
        ]);
        let hole = contour(&[
            [1.0, 1.0, 0.0],
            [3.0, 1.0, 0.0],
            [3.0, 3.0, 0.0],
            [1.0, 3.0, 0.0],
        ]);
        let (points, indices) = triangulate_polygon(&[outer, hole]).unwrap();
        assert_relative_eq!(triangle_area_sum(&points, &indices), 12.0, epsilon = 1e-4);
    }

    #[test]
    fn tilted_plane_is_handled() {
        // Unit square in the x = y plane.
        let quad = contour(&[
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 1.0, 1.0],
            [0.0, 0.0, 1.0],
        ]);
        let (points, indices) = triangulate_polygon(&[quad]).unwrap();
        assert_relative_eq!(
            triangle_area_sum(&points, &indices),
            2.0f32.sqrt(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn short_contours_are_rejected() {
        let degenerate = contour(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(triangulate_polygon(&[degenerate]).is_none());
    }
}
