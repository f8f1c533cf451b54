//! Facet bookkeeping for a generation pass.
//!
//! Rejected facets never abort a pass, they are only counted here so that a
//! caller can see how much of the mesh actually reached the spectrum.

use std::{fmt, ops::*};

use serde::Serialize;

use crate::facet::FacetRejection;


/// Counts of facet outcomes for one wavelength channel.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct FacetStats {
    pub processed: usize,       // facets that reached the geometry solver
    pub contributed: usize,     // facets that added at least one non-negligible value
    pub zero_normal: usize,     // degenerate facets
    pub back_facing: usize,     // normal z < 0
    pub collinear: usize,       // collinear in the local frame
    pub singular_affine: usize, // non-invertible map onto the reference triangle
    pub cancelled: usize,       // facets not visited after cancellation
}

impl FacetStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one facet. `Ok(false)` is a valid facet whose
    /// contribution was negligible everywhere.
    pub fn record(&mut self, outcome: Result<bool, FacetRejection>) {
        self.processed += 1;
        match outcome {
            Ok(true) => self.contributed += 1,
            Ok(false) => {}
            Err(FacetRejection::ZeroNormal) => self.zero_normal += 1,
            Err(FacetRejection::BackFacing) => self.back_facing += 1,
            Err(FacetRejection::CollinearProjection) => self.collinear += 1,
            Err(FacetRejection::SingularAffine) => self.singular_affine += 1,
        }
    }

    /// Facets that were processed but excluded from the spectrum.
    pub fn skipped(&self) -> usize {
        self.zero_normal + self.back_facing + self.collinear + self.singular_affine
    }
}

impl Add for FacetStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            processed: self.processed + other.processed,
            contributed: self.contributed + other.contributed,
            zero_normal: self.zero_normal + other.zero_normal,
            back_facing: self.back_facing + other.back_facing,
            collinear: self.collinear + other.collinear,
            singular_affine: self.singular_affine + other.singular_affine,
            cancelled: self.cancelled + other.cancelled,
        }
    }
}

impl AddAssign for FacetStats {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl fmt::Display for FacetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Facets:")?;
        writeln!(f, "  Processed:        {}", self.processed)?;
        writeln!(f, "  Contributed:      {}", self.contributed)?;
        writeln!(f, "  Zero normal:      {}", self.zero_normal)?;
        writeln!(f, "  Back-facing:      {}", self.back_facing)?;
        writeln!(f, "  Collinear:        {}", self.collinear)?;
        writeln!(f, "  Singular affine:  {}", self.singular_affine)?;
        write!(f, "  Cancelled:        {}", self.cancelled)
    }
}
