//! Quadric edge-collapse mesh simplification.
//!
//! Half-edge collapses only: a collapse moves one vertex onto another, so
//! the position buffer never changes and the result is just a smaller index
//! list into it. Border vertices are locked, keeping the seams between
//! separately simplified nodes watertight.

use std::collections::HashMap;

use rvmesh_math::Vec3f;

/// Output of [`simplify`]. `indices` reference the caller's unchanged
/// position buffer.
#[derive(Debug, Clone)]
pub struct SimplifyResult {
    /// Simplified triangle list.
    pub indices: Vec<u32>,
    /// Largest collapse error applied, as a world-space distance.
    pub error: f32,
}

/// Error quadric for one vertex, accumulated from the planes of its
/// incident triangles. Evaluation gives the sum of squared plane distances.
#[derive(Debug, Clone, Copy, Default)]
struct Quadric {
    a00: f64,
    a01: f64,
    a02: f64,
    a11: f64,
    a12: f64,
    a22: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    c: f64,
}

impl Quadric {
    fn from_plane(n: Vec3f, d: f32, weight: f32) -> Self {
        let (nx, ny, nz, d, w) = (n.x as f64, n.y as f64, n.z as f64, d as f64, weight as f64);
        Quadric {
            a00: w * nx * nx,
            a01: w * nx * ny,
            a02: w * nx * nz,
            a11: w * ny * ny,
            a12: w * ny * nz,
            a22: w * nz * nz,
            b0: w * d * nx,
            b1: w * d * ny,
            b2: w * d * nz,
            c: w * d * d,
        }
    }

    fn add(&mut self, o: &Quadric) {
        self.a00 += o.a00;
        self.a01 += o.a01;
        self.a02 += o.a02;
        self.a11 += o.a11;
        self.a12 += o.a12;
        self.a22 += o.a22;
        self.b0 += o.b0;
        self.b1 += o.b1;
        self.b2 += o.b2;
        self.c += o.c;
    }

    fn eval(&self, p: Vec3f) -> f64 {
        let (x, y, z) = (p.x as f64, p.y as f64, p.z as f64);
        self.a00 * x * x
            + self.a11 * y * y
            + self.a22 * z * z
            + 2.0 * (self.a01 * x * y + self.a02 * x * z + self.a12 * y * z)
            + 2.0 * (self.b0 * x + self.b1 * y + self.b2 * z)
            + self.c
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    error: f64,
    from: u32,
    to: u32,
}

/// Reduces the triangle count towards `target_ratio` of the input without
/// exceeding `target_error` (world-space distance; non-positive means
/// unbounded). Returns the surviving triangles, still indexed into the
/// caller's position buffer.
pub fn simplify(
    indices: &[u32],
    positions: &[f32],
    target_ratio: f32,
    target_error: f32,
) -> SimplifyResult {
    let triangle_count = indices.len() / 3;
    if target_ratio >= 1.0 || triangle_count == 0 {
        return SimplifyResult {
            indices: indices.to_vec(),
            error: 0.0,
        };
    }
    let target = ((triangle_count as f32 * target_ratio.max(0.0)).ceil() as usize).max(1);
    let error_limit = if target_error > 0.0 {
        (target_error as f64) * (target_error as f64)
    } else {
        f64::INFINITY
    };

    let vertex_count = positions.len() / 3;
    let point = |i: u32| {
        let p = &positions[3 * i as usize..3 * i as usize + 3];
        Vec3f::new(p[0], p[1], p[2])
    };

    let mut remap: Vec<u32> = (0..vertex_count as u32).collect();
    let resolve = |remap: &[u32], mut v: u32| {
        while remap[v as usize] != v {
            v = remap[v as usize];
        }
        v
    };

    let mut current: Vec<u32> = indices.to_vec();
    let mut max_error = 0f64;

    loop {
        if current.len() / 3 <= target {
            break;
        }

        // Per-pass quadrics, borders and adjacency over the current mesh.
        let mut quadrics = vec![Quadric::default(); vertex_count];
        let mut adjacency: HashMap<u32, Vec<usize>> = HashMap::new();
        let mut edge_count: HashMap<(u32, u32), u32> = HashMap::new();
        for (t, tri) in current.chunks_exact(3).enumerate() {
            let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
            let (a, b, c) = (point(i0), point(i1), point(i2));
            let cross = (b - a).cross(&(c - a));
            let area = 0.5 * cross.norm();
            if area > 0.0 {
                let n = cross.normalize();
                let q = Quadric::from_plane(n, -n.dot(&a), area);
                for &i in tri {
                    quadrics[i as usize].add(&q);
                }
            }
            for &i in tri {
                adjacency.entry(i).or_default().push(t);
            }
            for (u, v) in [(i0, i1), (i1, i2), (i2, i0)] {
                let key = (u.min(v), u.max(v));
                *edge_count.entry(key).or_insert(0) += 1;
            }
        }

        let mut locked = vec![false; vertex_count];
        for (&(u, v), &n) in &edge_count {
            if n != 2 {
                locked[u as usize] = true;
                locked[v as usize] = true;
            }
        }

        let mut candidates = Vec::with_capacity(2 * edge_count.len());
        for &(u, v) in edge_count.keys() {
            let mut q = quadrics[u as usize];
            q.add(&quadrics[v as usize]);
            if !locked[u as usize] {
                candidates.push(Candidate {
                    error: q.eval(point(v)),
                    from: u,
                    to: v,
                });
            }
            if !locked[v as usize] {
                candidates.push(Candidate {
                    error: q.eval(point(u)),
                    from: v,
                    to: u,
                });
            }
        }
        candidates.sort_by(|a, b| a.error.total_cmp(&b.error));

        let mut touched = vec![false; vertex_count];
        let mut applied = 0usize;
        let mut remaining = current.len() / 3;
        for cand in candidates {
            if cand.error > error_limit || remaining <= target {
                break;
            }
            let (from, to) = (cand.from, cand.to);
            if touched[from as usize] || touched[to as usize] {
                continue;
            }
            if collapse_flips_triangle(&current, &adjacency, point, from, to) {
                continue;
            }
            remap[from as usize] = to;
            touched[from as usize] = true;
            touched[to as usize] = true;
            max_error = max_error.max(cand.error);
            applied += 1;
            // A collapse retires at least the triangles sharing the edge.
            remaining = remaining.saturating_sub(1);
        }
        if applied == 0 {
            break;
        }

        // Rebuild the triangle list through the remap, dropping collapsed
        // triangles.
        let mut next = Vec::with_capacity(current.len());
        for tri in current.chunks_exact(3) {
            let i0 = resolve(&remap, tri[0]);
            let i1 = resolve(&remap, tri[1]);
            let i2 = resolve(&remap, tri[2]);
            if i0 != i1 && i1 != i2 && i2 != i0 {
                next.extend_from_slice(&[i0, i1, i2]);
            }
        }
        current = next;
    }

    SimplifyResult {
        indices: current,
        error: max_error.sqrt() as f32,
    }
}

/// True if moving `from` onto `to` would flip the orientation of any
/// surviving triangle around `from`.
fn collapse_flips_triangle(
    current: &[u32],
    adjacency: &HashMap<u32, Vec<usize>>,
    point: impl Fn(u32) -> Vec3f,
    from: u32,
    to: u32,
) -> bool {
    let Some(tris) = adjacency.get(&from) else {
        return false;
    };
    for &t in tris {
        let tri = &current[3 * t..3 * t + 3];
        if tri.contains(&to) {
            // Shares the collapse edge; it degenerates and is removed.
            continue;
        }
        let old: Vec<Vec3f> = tri.iter().map(|&i| point(i)).collect();
        let new: Vec<Vec3f> = tri
            .iter()
            .map(|&i| if i == from { point(to) } else { point(i) })
            .collect();
        let n_old = (old[1] - old[0]).cross(&(old[2] - old[0]));
        let n_new = (new[1] - new[0]).cross(&(new[2] - new[0]));
        if n_old.dot(&n_new) <= 0.0 {
            return true;
        }
    }
    false
}
