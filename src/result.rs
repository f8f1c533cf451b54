use std::{fmt, time::Duration};

use ndarray::Array2;
use num_complex::Complex64;

use crate::stats::FacetStats;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn field_summaries() {
        let mut field = Array2::zeros((2, 2));
        field[[0, 1]] = Complex64::new(3.0, 4.0);
        field[[1, 0]] = Complex64::new(0.0, -1.0);
        let channel = Channel {
            wavelength: 532e-9,
            field,
            stats: FacetStats::new(),
        };
        assert_eq!(channel.peak_amplitude(), 5.0);
        assert_eq!(channel.energy(), 26.0);
    }
}

/// Hologram field for one wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub wavelength: f64,
    /// Complex field on the hologram plane, (rows, columns) = (pnY, pnX).
    pub field: Array2<Complex64>,
    pub stats: FacetStats,
}

impl Channel {
    pub fn peak_amplitude(&self) -> f64 {
        self.field.iter().map(|v| v.norm()).fold(0.0, f64::max)
    }

    /// Sum of |field|² over the plane.
    pub fn energy(&self) -> f64 {
        self.field.iter().map(|v| v.norm_sqr()).sum()
    }
}

/// Output of one generation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Hologram {
    pub channels: Vec<Channel>,
    pub elapsed: Duration,
    /// Set when the pass was aborted between facets. The fields then hold the
    /// propagated partial spectra.
    pub cancelled: bool,
}

impl fmt::Display for Hologram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hologram:")?;
        for channel in self.channels.iter() {
            let (rows, cols) = channel.field.dim();
            writeln!(f, "  Wavelength:       {:.1} nm", channel.wavelength * 1e9)?;
            writeln!(f, "  Resolution:       {} x {}", cols, rows)?;
            writeln!(f, "  Peak amplitude:   {:.6e}", channel.peak_amplitude())?;
            writeln!(f, "  Energy:           {:.6e}", channel.energy())?;
            writeln!(f, "{}", channel.stats)?;
        }
        if self.cancelled {
            writeln!(f, "  (cancelled)")?;
        }
        write!(f, "  Elapsed:          {:.2?}", self.elapsed)
    }
}
