//! Local geometry of a single facet.
//!
//! Each valid facet is rotated so its normal lies along +z, shifted so its first
//! vertex sits at the origin, and then related to the reference triangle by a
//! 2x2 affine map. The analytic spectra are only known for the reference
//! triangle, so this change of basis is what lets every facet reuse them.

use nalgebra::{Matrix2, Matrix3, Point2, Vector3};

use crate::config::REFERENCE_TRIANGLE;
use crate::geom::Facet;

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{Point3, Vector2};

    const TOL: f64 = 1e-12;

    fn tilted_facet() -> Facet {
        Facet::new(
            Point3::new(0.3, -0.2, 0.1),
            Point3::new(0.1, 0.6, 0.4),
            Point3::new(0.9, 0.1, 0.3),
        )
    }

    #[test]
    fn rotation_sends_normal_to_z() {
        let facet = tilted_facet();
        let n = facet.raw_normal().normalize();
        assert!(n.z > 0.0);
        let rot = rotation_to_local(&n);
        assert!((rot * n - Vector3::z()).norm() < TOL);
        assert!((rot * rot.transpose() - Matrix3::identity()).norm() < TOL);
    }

    #[test]
    fn rotation_for_normal_in_yz_plane() {
        let n = Vector3::new(0.0, 1.0, 0.0);
        let rot = rotation_to_local(&n);
        assert!((rot * n - Vector3::z()).norm() < TOL);
    }

    #[test]
    fn local_frame_is_planar_and_anchored() {
        let facet = tilted_facet();
        let geometry = FacetGeometry::solve(&facet).unwrap();
        for vertex in facet.vertices.iter() {
            let local = geometry.rotation * vertex.coords + geometry.shift;
            assert!(local.z.abs() < TOL, "local z: {}", local.z);
        }
        let origin = geometry.rotation * facet.vertices[0].coords + geometry.shift;
        assert!(origin.norm() < TOL);
    }

    #[test]
    fn affine_maps_onto_reference_triangle() {
        let facet = tilted_facet();
        let geometry = FacetGeometry::solve(&facet).unwrap();
        let reference = reference_vertices();
        for (vertex, target) in facet.vertices.iter().zip(reference.iter()) {
            let local = geometry.rotation * vertex.coords + geometry.shift;
            let mapped = geometry.affine * Vector2::new(local.x, local.y);
            assert!((mapped - target.coords).norm() < 1e-10, "{} vs {}", mapped, target);
        }
        assert!((geometry.det - geometry.affine.determinant()).abs() < TOL);
    }

    #[test]
    fn frequency_map_preserves_phase() {
        // f_local . x_local must equal (u, v) . x_reference
        let facet = tilted_facet();
        let geometry = FacetGeometry::solve(&facet).unwrap();
        let f = Vector2::new(1.7, -0.4);
        let uv = geometry.frequency_map * f;
        let local = geometry.rotation * facet.vertices[1].coords + geometry.shift;
        let x_local = Vector2::new(local.x, local.y);
        let x_ref = geometry.affine * x_local;
        assert!((f.dot(&x_local) - uv.dot(&x_ref)).abs() < 1e-10);
    }

    #[test]
    fn back_facing_is_rejected() {
        let facet = Facet::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(
            FacetGeometry::solve(&facet).unwrap_err(),
            FacetRejection::BackFacing
        );
    }

    #[test]
    fn zero_area_is_rejected() {
        let facet = Facet::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        );
        assert_eq!(
            FacetGeometry::solve(&facet).unwrap_err(),
            FacetRejection::ZeroNormal
        );
    }

    #[test]
    fn edge_on_facet_is_accepted() {
        // normal along +x, nz = 0 is not back-facing
        let facet = Facet::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        );
        let n = facet.raw_normal();
        assert_eq!(n.z, 0.0);
        assert!(FacetGeometry::solve(&facet).is_ok());
    }
}

/// Why a facet was excluded from the angular spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetRejection {
    /// Degenerate facet, the cross product of its edges vanishes.
    ZeroNormal,
    /// Normal points away from the hologram plane (negative z).
    BackFacing,
    /// The rotated facet is collinear in its own plane.
    CollinearProjection,
    /// The affine map onto the reference triangle is not invertible.
    SingularAffine,
}

/// Per-facet geometry, recomputed on every generation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetGeometry {
    /// Unnormalised normal `(V1 - V2) x (V3 - V2)`.
    pub normal: Vector3<f64>,
    pub unit_normal: Vector3<f64>,
    /// Global to local rotation, sends `unit_normal` to +z.
    pub rotation: Matrix3<f64>,
    /// Local shift that moves the rotated first vertex to the origin.
    pub shift: Vector3<f64>,
    /// Maps local in-plane coordinates onto the reference triangle.
    pub affine: Matrix2<f64>,
    /// Inverse transpose of `affine`, maps local frequencies to reference frequencies.
    pub frequency_map: Matrix2<f64>,
    /// Determinant of `affine`.
    pub det: f64,
}

impl FacetGeometry {
    /// Solves the facet's local frame, or reports why it cannot contribute.
    pub fn solve(facet: &Facet) -> Result<Self, FacetRejection> {
        let normal = facet.raw_normal();
        check_validity(&normal)?;
        let unit_normal = normal.normalize();

        let rotation = rotation_to_local(&unit_normal);
        let rotated = facet.vertices.map(|v| rotation * v.coords);
        let shift = -rotated[0];
        let local = rotated.map(|v| v + shift);

        let (x2, y2) = (local[1].x, local[1].y);
        let (x3, y3) = (local[2].x, local[2].y);
        if x3 * y2 == y3 * x2 {
            return Err(FacetRejection::CollinearProjection);
        }

        // columns are the local coordinates of V2 and V3
        let local_edges = Matrix2::new(x2, x3, y2, y3);
        let reference = reference_vertices();
        let reference_edges = Matrix2::new(
            reference[1].x,
            reference[2].x,
            reference[1].y,
            reference[2].y,
        );
        let local_inv = local_edges
            .try_inverse()
            .ok_or(FacetRejection::CollinearProjection)?;
        let affine = reference_edges * local_inv;

        let det = affine.determinant();
        if det == 0.0 {
            return Err(FacetRejection::SingularAffine);
        }
        let frequency_map = affine
            .try_inverse()
            .ok_or(FacetRejection::SingularAffine)?
            .transpose();

        Ok(Self {
            normal,
            unit_normal,
            rotation,
            shift,
            affine,
            frequency_map,
            det,
        })
    }
}

/// A facet contributes only if its normal is non-zero and does not face away
/// from the hologram plane.
pub fn check_validity(normal: &Vector3<f64>) -> Result<(), FacetRejection> {
    if normal.x == 0.0 && normal.y == 0.0 && normal.z == 0.0 {
        Err(FacetRejection::ZeroNormal)
    } else if normal.z < 0.0 {
        Err(FacetRejection::BackFacing)
    } else {
        Ok(())
    }
}

/// Returns the rotation taking the unit normal `n` onto +z.
/// Built from the spherical angles theta = atan(nx / nz) and phi = atan(ny / sqrt(nx^2 + nz^2)).
pub fn rotation_to_local(n: &Vector3<f64>) -> Matrix3<f64> {
    let theta = if n.x == 0.0 && n.z == 0.0 {
        0.0
    } else {
        (n.x / n.z).atan()
    };
    let phi = (n.y / (n.x * n.x + n.z * n.z).sqrt()).atan();
    let (sin_th, cos_th) = theta.sin_cos();
    let (sin_ph, cos_ph) = phi.sin_cos();

    Matrix3::new(
        cos_th,
        0.0,
        -sin_th,
        -sin_ph * sin_th,
        cos_ph,
        -sin_ph * cos_th,
        cos_ph * sin_th,
        sin_ph,
        cos_ph * cos_th,
    )
}

/// Vertices of the reference triangle.
pub fn reference_vertices() -> [Point2<f64>; 3] {
    let r = REFERENCE_TRIANGLE;
    [
        Point2::new(r[0], r[1]),
        Point2::new(r[2], r[3]),
        Point2::new(r[4], r[5]),
    ]
}
