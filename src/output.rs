use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{result::Hologram, settings::Settings, stats::FacetStats};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::result::Channel;
    use ndarray::Array2;
    use num_complex::Complex64;
    use std::time::Duration;

    #[test]
    fn summary_is_written_as_json() {
        let settings = crate::settings::load_default_config().unwrap();
        let mut field = Array2::zeros((2, 2));
        field[[1, 1]] = Complex64::new(0.0, 2.0);
        let mut stats = FacetStats::new();
        stats.record(Ok(true));
        let hologram = Hologram {
            channels: vec![Channel {
                wavelength: 532e-9,
                field,
                stats,
            }],
            elapsed: Duration::from_millis(1500),
            cancelled: false,
        };

        let dir = std::env::temp_dir().join(format!("mesh_cgh_summary_{}", std::process::id()));
        let path = write_summary(&hologram, &settings, &dir).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["cancelled"], false);
        assert_eq!(json["elapsed_seconds"], 1.5);
        assert_eq!(json["channels"][0]["peak_amplitude"], 2.0);
        assert_eq!(json["channels"][0]["energy"], 4.0);
        assert_eq!(json["channels"][0]["stats"]["contributed"], 1);
        assert_eq!(json["settings"]["resolution"][0], settings.resolution[0]);

        fs::remove_dir_all(&dir).unwrap();
    }
}

/// Name of the run summary inside the output directory.
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Serialize)]
struct ChannelSummary {
    wavelength: f64,
    resolution: [usize; 2],
    peak_amplitude: f64,
    energy: f64,
    stats: FacetStats,
}

#[derive(Serialize)]
struct Summary<'a> {
    settings: &'a Settings,
    channels: Vec<ChannelSummary>,
    elapsed_seconds: f64,
    cancelled: bool,
}

/// Writes a JSON summary of a generation pass to `directory/summary.json` and
/// returns the file path. The directory is created if needed.
pub fn write_summary(hologram: &Hologram, settings: &Settings, directory: &Path) -> Result<PathBuf> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create output directory {:?}", directory))?;

    let summary = Summary {
        settings,
        channels: hologram
            .channels
            .iter()
            .map(|channel| {
                let (rows, cols) = channel.field.dim();
                ChannelSummary {
                    wavelength: channel.wavelength,
                    resolution: [cols, rows],
                    peak_amplitude: channel.peak_amplitude(),
                    energy: channel.energy(),
                    stats: channel.stats,
                }
            })
            .collect(),
        elapsed_seconds: hologram.elapsed.as_secs_f64(),
        cancelled: hologram.cancelled,
    };

    let path = directory.join(SUMMARY_FILE);
    let file = File::create(&path).with_context(|| format!("failed to create {:?}", path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &summary)?;

    info!("summary written to {:?}", path);
    Ok(path)
}
