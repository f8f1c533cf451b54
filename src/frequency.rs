use nalgebra::{Vector2, Vector3};
use ndarray::{Array2, Zip};

use crate::facet::FacetGeometry;


/// Whether a longitudinal frequency belongs to a propagating plane wave.
pub fn propagates(fz: f64) -> bool {
    fz.is_finite() && fz > 0.0
}

/// Spatial-frequency lattice of the hologram plane for one wavelength.
///
/// Arrays are (rows, columns) = (pnY, pnX). Column `c` holds `fx = (c - pnX/2) * dfx`,
/// row `r` holds `fy = (pnY/2 - r) * dfy`. Evanescent points store `fz = NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyGrid {
    pub wavelength: f64,
    /// Frequency increments (dfx, dfy).
    pub increments: (f64, f64),
    pub fx: Array2<f64>,
    pub fy: Array2<f64>,
    pub fz: Array2<f64>,
}

impl FrequencyGrid {
    /// Builds the grid for a resolution (pnX, pnY), pixel pitch and wavelength.
    pub fn new(resolution: [usize; 2], pixel_pitch: [f64; 2], wavelength: f64) -> Self {
        let [nx, ny] = resolution;
        let dfx = 1.0 / (pixel_pitch[0] * nx as f64);
        let dfy = 1.0 / (pixel_pitch[1] * ny as f64);
        let (cx, cy) = ((nx / 2) as f64, (ny / 2) as f64);
        let k2 = 1.0 / (wavelength * wavelength);

        let fx = Array2::from_shape_fn((ny, nx), |(_, col)| (col as f64 - cx) * dfx);
        let fy = Array2::from_shape_fn((ny, nx), |(row, _)| (cy - row as f64) * dfy);
        let fz = Zip::from(&fx).and(&fy).map_collect(|&fx, &fy| {
            let radicand = k2 - fx * fx - fy * fy;
            if radicand < 0.0 {
                f64::NAN
            } else {
                radicand.sqrt()
            }
        });

        Self {
            wavelength,
            increments: (dfx, dfy),
            fx,
            fy,
            fz,
        }
    }

    /// Returns the grid shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        self.fz.dim()
    }

    pub fn is_propagating(&self, index: (usize, usize)) -> bool {
        propagates(self.fz[index])
    }
}

/// Frequencies of one grid point seen from a facet's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrequency {
    pub flx: f64,
    pub fly: f64,
    pub flz: f64,
    /// Frequency terms on the reference triangle.
    pub u: f64,
    pub v: f64,
}

impl LocalFrequency {
    const NON_PROPAGATING: Self = Self {
        flx: f64::NAN,
        fly: f64::NAN,
        flz: f64::NAN,
        u: f64::NAN,
        v: f64::NAN,
    };
}

/// Per-facet view of the frequency grid, dropped once the facet is accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFrequencies {
    pub terms: Array2<LocalFrequency>,
}

impl LocalFrequencies {
    /// Rotates the grid into the facet frame, removes the carrier and maps the result
    /// onto the reference triangle.
    pub fn new(grid: &FrequencyGrid, geometry: &FacetGeometry, carrier: &Vector3<f64>) -> Self {
        let k = 1.0 / grid.wavelength;
        let rotation = &geometry.rotation;
        let carrier_local = (rotation * carrier) * k;
        let carrier_shift = Vector2::new(carrier_local.x, carrier_local.y);

        let terms = Zip::from(&grid.fx)
            .and(&grid.fy)
            .and(&grid.fz)
            .map_collect(|&fx, &fy, &fz| {
                if !propagates(fz) {
                    return LocalFrequency::NON_PROPAGATING;
                }
                let fl = rotation * Vector3::new(fx, fy, fz);
                let flz = (k * k - fl.x * fl.x - fl.y * fl.y).max(0.0).sqrt();
                let uv = geometry.frequency_map * (Vector2::new(fl.x, fl.y) - carrier_shift);
                LocalFrequency {
                    flx: fl.x,
                    fly: fl.y,
                    flz,
                    u: uv.x,
                    v: uv.y,
                }
            });

        Self { terms }
    }
}
