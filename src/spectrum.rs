use std::f64::consts::PI;
use std::ops::{Add, AddAssign};

use nalgebra::Vector3;
use ndarray::{Array2, Zip};
use num_complex::Complex64;

use crate::config::NEGLIGIBLE_AMPLITUDE;
use crate::facet::FacetGeometry;
use crate::frequency::{propagates, FrequencyGrid, LocalFrequencies};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::analytic::{reference_spectrum, FacetShading};
    use crate::geom::Facet;
    use nalgebra::Point3;

    fn facet_at(z: f64) -> Facet {
        Facet::new(
            Point3::new(-1e-4, -1e-4, z),
            Point3::new(-1e-4, 1e-4, z),
            Point3::new(1e-4, -1e-4, z),
        )
    }

    fn accumulate(spectrum: &mut AngularSpectrum, grid: &FrequencyGrid, facet: &Facet) -> bool {
        accumulate_with_carrier(spectrum, grid, facet, &Vector3::z())
    }

    fn accumulate_with_carrier(
        spectrum: &mut AngularSpectrum,
        grid: &FrequencyGrid,
        facet: &Facet,
        carrier: &Vector3<f64>,
    ) -> bool {
        let geometry = FacetGeometry::solve(facet).unwrap();
        let local = LocalFrequencies::new(grid, &geometry, carrier);
        let reference = reference_spectrum(&local, &FacetShading::Flat(1.0));
        spectrum.add_facet(grid, &geometry, &local, &reference, carrier)
    }

    fn max_norm(values: &Array2<Complex64>) -> f64 {
        values.iter().map(|v| v.norm()).fold(0.0, f64::max)
    }

    #[test]
    fn starts_at_zero() {
        let spectrum = AngularSpectrum::zeros((4, 6));
        assert_eq!(spectrum.shape(), (4, 6));
        assert!(spectrum.values.iter().all(|c| *c == Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn centre_value_is_the_facet_area() {
        // at zero frequency the contribution is ref / det, with ref = 1/2 and
        // 1 / det the area ratio between facet and reference triangle
        let grid = FrequencyGrid::new([8, 8], [1e-5, 1e-5], 633e-9);
        let mut spectrum = AngularSpectrum::zeros(grid.shape());
        assert!(accumulate(&mut spectrum, &grid, &facet_at(0.0)));
        let area = 0.5 * 2e-4 * 2e-4;
        let centre = spectrum.values[[4, 4]];
        assert!((centre.re - area).abs() < 1e-12 * area.max(1.0), "centre: {}", centre);
        assert!(centre.im.abs() < 1e-3 * area);
    }

    #[test]
    fn depth_only_changes_phase() {
        let grid = FrequencyGrid::new([8, 8], [1e-5, 1e-5], 633e-9);
        let mut near = AngularSpectrum::zeros(grid.shape());
        let mut far = AngularSpectrum::zeros(grid.shape());
        accumulate(&mut near, &grid, &facet_at(0.0));
        accumulate(&mut far, &grid, &facet_at(1e-3));
        for (a, b) in near.values.iter().zip(far.values.iter()) {
            assert!((a.norm() - b.norm()).abs() <= 1e-9 * a.norm().max(1e-30));
        }
    }

    #[test]
    fn evanescent_points_stay_zero() {
        let grid = FrequencyGrid::new([16, 16], [1e-6, 1e-6], 3e-6);
        let mut spectrum = AngularSpectrum::zeros(grid.shape());
        accumulate(&mut spectrum, &grid, &facet_at(0.0));
        for (index, value) in spectrum.values.indexed_iter() {
            if !grid.is_propagating(index) {
                assert_eq!(*value, Complex64::new(0.0, 0.0));
            }
        }
    }

    #[test]
    fn carrier_tilt_of_one_step_moves_spectrum_one_column() {
        let wavelength = 633e-9;
        let grid = FrequencyGrid::new([8, 8], [1e-5, 1e-5], wavelength);
        let (dfx, _) = grid.increments;
        let sin = wavelength * dfx;
        let tilted = Vector3::new(sin, 0.0, (1.0 - sin * sin).sqrt());

        // V1 sits off the origin, so both the carrier phase and the shift phase matter
        let facet = facet_at(0.0);
        let mut plain = AngularSpectrum::zeros(grid.shape());
        let mut shifted = AngularSpectrum::zeros(grid.shape());
        accumulate(&mut plain, &grid, &facet);
        accumulate_with_carrier(&mut shifted, &grid, &facet, &tilted);

        let scale = max_norm(&plain.values);
        assert!(scale > 0.0);
        for row in 0..8 {
            for col in 0..7 {
                let a = plain.values[[row, col]];
                let b = shifted.values[[row, col + 1]];
                assert!((a - b).norm() < 1e-9 * scale, "({}, {}): {} vs {}", row, col, a, b);
            }
        }
    }

    #[test]
    fn translated_facet_picks_up_carrier_relative_phase() {
        // moving a facet by d multiplies its spectrum by exp(-i 2π (f - c/λ)·d)
        let wavelength = 633e-9;
        let grid = FrequencyGrid::new([8, 8], [1e-5, 1e-5], wavelength);
        let carrier = Vector3::new(0.05, -0.03, 1.0).normalize();
        let facet = Facet::new(
            Point3::new(0.3e-4, -0.2e-4, 0.1e-4),
            Point3::new(0.1e-4, 0.6e-4, 0.4e-4),
            Point3::new(0.9e-4, 0.1e-4, 0.3e-4),
        );
        let d = Vector3::new(3e-5, -2e-5, 5e-5);
        let moved = Facet::new(
            facet.vertices[0] + d,
            facet.vertices[1] + d,
            facet.vertices[2] + d,
        );

        let mut base = AngularSpectrum::zeros(grid.shape());
        let mut translated = AngularSpectrum::zeros(grid.shape());
        assert!(accumulate_with_carrier(&mut base, &grid, &facet, &carrier));
        assert!(accumulate_with_carrier(&mut translated, &grid, &moved, &carrier));

        let k = 1.0 / wavelength;
        let scale = max_norm(&base.values);
        assert!(scale > 0.0);
        for ((row, col), value) in base.values.indexed_iter() {
            let f = Vector3::new(grid.fx[[row, col]], grid.fy[[row, col]], grid.fz[[row, col]]);
            let phase = -2.0 * PI * (f - carrier * k).dot(&d);
            let expected = value * Complex64::from_polar(1.0, phase);
            let actual = translated.values[[row, col]];
            assert!(
                (expected - actual).norm() < 1e-8 * scale,
                "({}, {}): {} vs {}",
                row,
                col,
                expected,
                actual
            );
        }
    }

    #[test]
    fn merge_is_elementwise_sum() {
        let grid = FrequencyGrid::new([8, 8], [1e-5, 1e-5], 633e-9);
        let mut a = AngularSpectrum::zeros(grid.shape());
        let mut b = AngularSpectrum::zeros(grid.shape());
        let mut both = AngularSpectrum::zeros(grid.shape());
        accumulate(&mut a, &grid, &facet_at(0.0));
        accumulate(&mut b, &grid, &facet_at(2e-4));
        accumulate(&mut both, &grid, &facet_at(0.0));
        accumulate(&mut both, &grid, &facet_at(2e-4));
        let merged = a.merge(b);
        assert_eq!(merged, both);
    }
}

/// Global angular spectrum accumulator.
///
/// Facets are added with plain complex addition, so partial spectra built on
/// different workers can be merged in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularSpectrum {
    pub values: Array2<Complex64>,
}

impl AngularSpectrum {
    pub fn zeros(shape: (usize, usize)) -> Self {
        Self {
            values: Array2::zeros(shape),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Maps a facet's reference spectrum back to the global frame and adds it.
    /// Returns whether any grid point received a non-negligible contribution.
    pub fn add_facet(
        &mut self,
        grid: &FrequencyGrid,
        geometry: &FacetGeometry,
        local: &LocalFrequencies,
        reference: &Array2<Complex64>,
        carrier: &Vector3<f64>,
    ) -> bool {
        let shift = &geometry.shift;
        let global_shift = geometry.rotation.transpose() * shift;
        let carrier_phase = Complex64::from_polar(
            1.0 / geometry.det,
            -2.0 * PI / grid.wavelength * carrier.dot(&global_shift),
        );

        let mut contributed = false;
        Zip::from(&mut self.values)
            .and(reference)
            .and(&local.terms)
            .and(&grid.fz)
            .for_each(|acc, &value, term, &fz| {
                if !propagates(fz) {
                    return;
                }
                let shift_phase = 2.0 * PI * (term.flx * shift.x + term.fly * shift.y + term.flz * shift.z);
                let contribution =
                    value * carrier_phase * (term.flz / fz) * Complex64::from_polar(1.0, shift_phase);
                if contribution.norm() > NEGLIGIBLE_AMPLITUDE {
                    *acc += contribution;
                    contributed = true;
                }
            });
        contributed
    }

    /// Adds another partial spectrum of the same shape.
    pub fn merge(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for AngularSpectrum {
    fn add_assign(&mut self, other: Self) {
        self.values += &other.values;
    }
}

impl Add for AngularSpectrum {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.merge(other)
    }
}
