//! Triangulated surface buffers and the per-root store that owns them.

/// A triangulated surface with flat vertex and index buffers.
///
/// `vertices` holds xyz triples, `indices` holds triangle corner triples
/// into the vertex list.
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    /// Flat xyz vertex positions.
    pub vertices: Vec<f32>,
    /// Triangle corner indices, three per triangle.
    pub indices: Vec<u32>,
    /// Worst-case world-space deviation from the exact surface.
    pub error: f32,
}

impl Triangulation {
    /// Creates an empty triangulation with pre-allocated buffers.
    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Triangulation {
            vertices: Vec::with_capacity(3 * vertex_count),
            indices: Vec::with_capacity(3 * triangle_count),
            error: 0.0,
        }
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Handle to a [`Triangulation`] in a [`TriangulationStore`].
///
/// Handles are only meaningful against the store that issued them and are
/// invalidated by [`TriangulationStore::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriId(u32);

/// Append-only store owning the triangulations of one root group.
///
/// Tessellation results for a root accumulate here and are dropped in one
/// sweep when the next root begins.
#[derive(Debug, Default)]
pub struct TriangulationStore {
    items: Vec<Triangulation>,
}

impl TriangulationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        TriangulationStore::default()
    }

    /// Adds a triangulation and returns its handle.
    pub fn push(&mut self, tri: Triangulation) -> TriId {
        let id = TriId(self.items.len() as u32);
        self.items.push(tri);
        id
    }

    /// Looks up a triangulation by handle.
    pub fn get(&self, id: TriId) -> &Triangulation {
        &self.items[id.0 as usize]
    }

    /// Number of stored triangulations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops all triangulations, invalidating outstanding handles.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_round_trip() {
        let mut store = TriangulationStore::new();
        let a = store.push(Triangulation {
            vertices: vec![0.0; 9],
            indices: vec![0, 1, 2],
            error: 0.1,
        });
        let b = store.push(Triangulation::default());
        assert_eq!(store.get(a).num_triangles(), 1);
        assert_eq!(store.get(b).num_vertices(), 0);
        assert_ne!(a, b);
        store.clear();
        assert!(store.is_empty());
    }
}
