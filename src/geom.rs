use anyhow::Context;
use itertools::{Itertools, MinMaxResult};
use log::info;
use nalgebra::{Point3, Vector3};

use crate::error::HologramError;
use crate::settings::Settings;


/// Represents a triangular facet in a 3D surface mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub vertices: [Point3<f64>; 3],
}

impl Facet {
    pub fn new(v1: Point3<f64>, v2: Point3<f64>, v3: Point3<f64>) -> Self {
        Self {
            vertices: [v1, v2, v3],
        }
    }

    /// Compute the unnormalised normal `(V1 - V2) x (V3 - V2)`.
    /// Its length is twice the facet area, so a zero vector flags a degenerate facet.
    pub fn raw_normal(&self) -> Vector3<f64> {
        let [v1, v2, v3] = &self.vertices;
        (v1 - v2).cross(&(v3 - v2))
    }

    fn map(&self, f: impl Fn(&Point3<f64>) -> Point3<f64>) -> Self {
        Self {
            vertices: [
                f(&self.vertices[0]),
                f(&self.vertices[1]),
                f(&self.vertices[2]),
            ],
        }
    }
}

/// Represents a triangle mesh, as an ordered list of facets.
/// Vertices are stored per facet, adjacent facets repeat shared coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub facets: Vec<Facet>,
}

impl Mesh {
    pub fn new(facets: Vec<Facet>) -> Self {
        Self { facets }
    }

    /// Builds a mesh from a flat coordinate buffer holding 9 reals per facet.
    pub fn from_flat(coords: &[f64]) -> Result<Self, HologramError> {
        if coords.len() % 9 != 0 {
            return Err(HologramError::InvalidMesh(format!(
                "facet buffer holds {} values, expected a multiple of 9",
                coords.len()
            )));
        }
        let facets = coords
            .chunks_exact(9)
            .map(|c| {
                Facet::new(
                    Point3::new(c[0], c[1], c[2]),
                    Point3::new(c[3], c[4], c[5]),
                    Point3::new(c[6], c[7], c[8]),
                )
            })
            .collect();
        Ok(Self { facets })
    }

    /// Loads every model in a Wavefront OBJ file into a single mesh.
    /// Polygons are triangulated on load.
    pub fn from_obj(filename: &str) -> anyhow::Result<Mesh> {
        let options = tobj::LoadOptions {
            triangulate: true,
            ..Default::default()
        };
        let (models, _) = tobj::load_obj(filename, &options)
            .with_context(|| format!("failed to load OBJ file {}", filename))?;

        let mut facets = Vec::new();
        for model in models.iter() {
            let mesh = &model.mesh;
            let vertex = |i: u32| {
                let i = 3 * i as usize;
                Point3::new(
                    mesh.positions[i] as f64,
                    mesh.positions[i + 1] as f64,
                    mesh.positions[i + 2] as f64,
                )
            };
            for tri in mesh.indices.chunks_exact(3) {
                facets.push(Facet::new(vertex(tri[0]), vertex(tri[1]), vertex(tri[2])));
            }
        }
        info!("loaded {} facets from {}", facets.len(), filename);

        Ok(Mesh { facets })
    }

    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Iterates over the vertices of every facet, shared vertices included once per facet.
    pub fn vertices(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.facets.iter().flat_map(|facet| facet.vertices.iter())
    }

    /// Returns the axis-aligned bounding box as (min, max), or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut min = Point3::origin();
        let mut max = Point3::origin();
        for axis in 0..3 {
            match self
                .vertices()
                .map(|v| v[axis])
                .minmax_by(|a, b| a.total_cmp(b))
            {
                MinMaxResult::NoElements => return None,
                MinMaxResult::OneElement(x) => {
                    min[axis] = x;
                    max[axis] = x;
                }
                MinMaxResult::MinMax(lo, hi) => {
                    min[axis] = lo;
                    max[axis] = hi;
                }
            }
        }
        Some((min, max))
    }

    /// Centres the mesh on its bounding box midpoint and divides by the largest
    /// axis extent, so the mesh fits a unit cube with its aspect ratio kept.
    pub fn normalized(&self) -> Result<Mesh, HologramError> {
        if self.is_empty() {
            return Err(HologramError::InvalidMesh("mesh has no facets".to_string()));
        }
        if self.vertices().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(HologramError::InvalidMesh(
                "mesh has non-finite vertex coordinates".to_string(),
            ));
        }
        let (min, max) = self
            .bounds()
            .ok_or_else(|| HologramError::InvalidMesh("mesh has no vertices".to_string()))?;

        let centre = nalgebra::center(&min, &max);
        let extent = (max - min).max();
        if extent <= 0.0 {
            return Err(HologramError::InvalidMesh(
                "mesh has zero bounding-box extent".to_string(),
            ));
        }

        Ok(self.map_vertices(|v| Point3::from((v - centre) / extent)))
    }

    /// Perspective-like viewing window transform through a field lens at depth `field_lens`.
    /// Expects normalised coordinates.
    pub fn viewing_window(&self, field_lens: f64) -> Result<Mesh, HologramError> {
        if self.vertices().any(|v| v.z == field_lens) {
            return Err(HologramError::InvalidMesh(format!(
                "vertex lies on the viewing window pole z = {}",
                field_lens
            )));
        }
        Ok(self.map_vertices(|v| {
            let fac = -field_lens / (v.z - field_lens);
            Point3::from(v.coords * fac)
        }))
    }

    /// Multiplies each vertex component-wise by `scale` and adds `shift`.
    pub fn scaled(&self, scale: &Vector3<f64>, shift: &Vector3<f64>) -> Mesh {
        self.map_vertices(|v| Point3::from(v.coords.component_mul(scale) + shift))
    }

    /// Normalises the mesh, applies the optional viewing window and moves it into scene space.
    pub fn to_scene(&self, settings: &Settings) -> Result<Mesh, HologramError> {
        let normalized = self.normalized()?;
        let normalized = if settings.viewing_window {
            normalized.viewing_window(settings.field_lens)?
        } else {
            normalized
        };
        let scene = normalized.scaled(&settings.object_scale(), &settings.object_shift());
        info!(
            "object scaled and shifted ({} facets, viewing window {})",
            scene.num_facets(),
            if settings.viewing_window { "on" } else { "off" }
        );
        Ok(scene)
    }

    fn map_vertices(&self, f: impl Fn(&Point3<f64>) -> Point3<f64>) -> Mesh {
        Mesh {
            facets: self.facets.iter().map(|facet| facet.map(&f)).collect(),
        }
    }
}
