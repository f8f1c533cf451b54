//! Vertex normals for continuous shading.
//!
//! Vertices are grouped by exact coordinate equality. Meshes are expected to repeat
//! shared vertices bit-for-bit across adjacent facets, so no tolerance is applied.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::geom::Mesh;


/// Hashable key for exact positional equality. Negative zero is folded onto
/// positive zero so that keys agree with `==` on coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey([u64; 3]);

impl VertexKey {
    fn new(vertex: &Point3<f64>) -> Self {
        Self([
            (vertex.x + 0.0).to_bits(),
            (vertex.y + 0.0).to_bits(),
            (vertex.z + 0.0).to_bits(),
        ])
    }
}

/// Returns, for each facet, the averaged unit normal at each of its three vertices.
///
/// A vertex normal is the re-normalised mean of the unit normals of every
/// non-degenerate facet sharing that vertex, back-facing facets included.
/// It is the zero vector if no facet contributes or the normals cancel.
pub fn vertex_normals(mesh: &Mesh) -> Vec<[Vector3<f64>; 3]> {
    let mut classes: HashMap<VertexKey, Vector3<f64>> = HashMap::new();

    for facet in mesh.facets.iter() {
        let normal = facet.raw_normal();
        let norm = normal.norm();
        if norm == 0.0 || !norm.is_finite() {
            continue;
        }
        let unit = normal / norm;
        for vertex in facet.vertices.iter() {
            *classes.entry(VertexKey::new(vertex)).or_insert_with(Vector3::zeros) += unit;
        }
    }

    let lookup = |vertex: &Point3<f64>| {
        classes
            .get(&VertexKey::new(vertex))
            .and_then(|sum| sum.try_normalize(0.0))
            .unwrap_or_else(Vector3::zeros)
    };

    mesh.facets
        .iter()
        .map(|facet| facet.vertices.each_ref().map(|v| lookup(v)))
        .collect()
}
