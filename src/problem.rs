use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, trace, warn};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::{
    analytic::{reference_spectrum, FacetShading},
    error::HologramError,
    facet::{FacetGeometry, FacetRejection},
    frequency::{FrequencyGrid, LocalFrequencies},
    geom::{Facet, Mesh},
    normals::vertex_normals,
    propagation::propagate,
    result::{Channel, Hologram},
    settings::{Settings, ShadingMode},
    spectrum::AngularSpectrum,
    stats::FacetStats,
};


/// A hologram generation problem: a mesh and the settings to render it with.
#[derive(Debug, Clone)]
pub struct Problem {
    pub mesh: Mesh,
    pub settings: Settings,
}

impl Problem {
    pub fn new(mesh: Mesh, settings: Settings) -> Self {
        Self { mesh, settings }
    }

    /// Generates one hologram channel per configured wavelength.
    pub fn generate_hologram(&self) -> Result<Hologram, HologramError> {
        self.generate_hologram_with_cancel(&AtomicBool::new(false))
    }

    /// As [`Problem::generate_hologram`], polling `cancel` before each facet. Once it is
    /// raised the remaining facets are skipped, the partial spectra are still
    /// propagated and the hologram is flagged as cancelled.
    pub fn generate_hologram_with_cancel(
        &self,
        cancel: &AtomicBool,
    ) -> Result<Hologram, HologramError> {
        let start = Instant::now();
        let context = GenerationContext::new(&self.mesh, &self.settings)?;

        let mut channels = Vec::with_capacity(self.settings.wavelengths.len());
        for &wavelength in self.settings.wavelengths.iter() {
            info!("generating channel at {:.1} nm", wavelength * 1e9);
            let (spectrum, stats) = context.accumulate(wavelength, cancel);
            debug!("{}", stats);
            let field = propagate(&spectrum.values);
            channels.push(Channel {
                wavelength,
                field,
                stats,
            });
        }

        let cancelled = channels.iter().any(|channel| channel.stats.cancelled > 0);
        if cancelled {
            warn!("hologram generation cancelled, fields hold partial spectra");
        }

        let elapsed = start.elapsed();
        info!("hologram generated in {:.2?}", elapsed);

        Ok(Hologram {
            channels,
            elapsed,
            cancelled,
        })
    }

    /// Accumulated angular spectrum for one wavelength, before propagation.
    pub fn angular_spectrum(
        &self,
        wavelength: f64,
    ) -> Result<(AngularSpectrum, FacetStats), HologramError> {
        if !(wavelength.is_finite() && wavelength > 0.0) {
            return Err(HologramError::InvalidSettings(format!(
                "wavelength must be positive, got {}",
                wavelength
            )));
        }
        let context = GenerationContext::new(&self.mesh, &self.settings)?;
        Ok(context.accumulate(wavelength, &AtomicBool::new(false)))
    }
}

/// Everything derived from the mesh for one generation pass. Dropped when the
/// pass returns, per-wavelength buffers live only inside `accumulate`.
struct GenerationContext {
    scene: Mesh,
    /// Per-facet vertex normals, continuous shading only.
    vertex_normals: Option<Vec<[Vector3<f64>; 3]>>,
    resolution: [usize; 2],
    pixel_pitch: [f64; 2],
    illumination: Vector3<f64>,
    carrier: Vector3<f64>,
    parallel: bool,
    progress: bool,
}

impl GenerationContext {
    fn new(mesh: &Mesh, settings: &Settings) -> Result<Self, HologramError> {
        settings.validate()?;
        let scene = mesh.to_scene(settings)?;
        let vertex_normals = match settings.shading {
            ShadingMode::Flat => None,
            ShadingMode::Continuous => Some(vertex_normals(&scene)),
        };

        Ok(Self {
            scene,
            vertex_normals,
            resolution: settings.resolution,
            pixel_pitch: settings.pixel_pitch,
            illumination: settings.illumination(),
            carrier: settings.carrier_wave(),
            parallel: settings.parallel,
            progress: settings.progress,
        })
    }

    /// Builds the frequency grid for `wavelength` and sums every facet into one spectrum.
    fn accumulate(&self, wavelength: f64, cancel: &AtomicBool) -> (AngularSpectrum, FacetStats) {
        let grid = FrequencyGrid::new(self.resolution, self.pixel_pitch, wavelength);
        let shape = grid.shape();
        let pb = self.progress_bar();

        let (spectrum, stats) = if self.parallel {
            self.scene
                .facets
                .par_iter()
                .enumerate()
                .fold(
                    || (AngularSpectrum::zeros(shape), FacetStats::new()),
                    |(mut spectrum, mut stats), (index, facet)| {
                        self.visit(index, facet, &grid, cancel, &mut spectrum, &mut stats);
                        pb.inc(1);
                        (spectrum, stats)
                    },
                )
                .reduce(
                    || (AngularSpectrum::zeros(shape), FacetStats::new()),
                    |(a, a_stats), (b, b_stats)| (a + b, a_stats + b_stats),
                )
        } else {
            // fixed summation order, bit-for-bit reproducible
            let mut spectrum = AngularSpectrum::zeros(shape);
            let mut stats = FacetStats::new();
            for (index, facet) in self.scene.facets.iter().enumerate() {
                self.visit(index, facet, &grid, cancel, &mut spectrum, &mut stats);
                pb.inc(1);
            }
            (spectrum, stats)
        };

        pb.finish_and_clear();
        info!(
            "accumulated {} of {} facets",
            stats.contributed,
            self.scene.num_facets()
        );
        (spectrum, stats)
    }

    fn visit(
        &self,
        index: usize,
        facet: &Facet,
        grid: &FrequencyGrid,
        cancel: &AtomicBool,
        spectrum: &mut AngularSpectrum,
        stats: &mut FacetStats,
    ) {
        if cancel.load(Ordering::Relaxed) {
            stats.cancelled += 1;
            return;
        }
        let outcome = self.add_facet(index, facet, grid, spectrum);
        if let Err(rejection) = outcome {
            trace!("facet {} skipped: {:?}", index, rejection);
        }
        stats.record(outcome);
    }

    fn add_facet(
        &self,
        index: usize,
        facet: &Facet,
        grid: &FrequencyGrid,
        spectrum: &mut AngularSpectrum,
    ) -> Result<bool, FacetRejection> {
        let geometry = FacetGeometry::solve(facet)?;
        let local = LocalFrequencies::new(grid, &geometry, &self.carrier);
        let shading = match &self.vertex_normals {
            None => FacetShading::flat(&geometry.unit_normal, &self.illumination),
            Some(normals) => FacetShading::continuous(&normals[index], &self.illumination),
        };
        let reference = reference_spectrum(&local, &shading);
        Ok(spectrum.add_facet(grid, &geometry, &local, &reference, &self.carrier))
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(self.scene.num_facets() as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁");
        pb.set_style(style);
        pb.set_message("facets".to_string());
        pb
    }
}
