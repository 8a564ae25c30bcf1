//! In-memory model for plant geometry.
//!
//! A plant file is a tree of named groups; leaves carry parametric
//! primitives (cylinders, snouts, dishes, facet groups and so on), each with
//! a local-to-world transform. This crate holds those types plus the
//! triangulation store the tessellation and merge stages hand buffers
//! through, and the classic PDMS material color table.

#![warn(missing_docs)]

mod color;
mod connection;
mod geometry;
mod node;
mod triangulation;

pub use color::material_rgb;
pub use connection::{connect, face_interface, interfaces_match, Connection, ConnectionSide, Interface};
pub use geometry::{
    Contour, FacetGroup, Geometry, GeometryType, Polygon, PrimitiveKind, MAX_FACES,
};
pub use node::{pack_color_with_alpha, FinalizedNode, NodePrim};
pub use triangulation::{TriId, Triangulation, TriangulationStore};
