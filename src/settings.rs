use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use config::{Config, Environment, File};
use log::info;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

use crate::config::MIN_FIELD_LENS;
use crate::error::HologramError;


/// Shading model used to weight each facet's reference spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShadingMode {
    /// One reflectance per facet, from the facet normal.
    Flat,
    /// Reflectance interpolated across the facet from vertex-averaged normals.
    Continuous,
}

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// Number of pixels along x and y.
    pub resolution: [usize; 2],
    /// Pixel pitch along x and y, in metres.
    pub pixel_pitch: [f64; 2],
    /// One hologram channel is generated per wavelength.
    pub wavelengths: Vec<f64>,
    pub object_scale: [f64; 3],
    pub object_shift: [f64; 3],
    /// Lamp direction. The zero vector disables flat shading.
    pub illumination: [f64; 3],
    #[serde(default = "default_carrier_wave")]
    pub carrier_wave: [f64; 3],
    pub shading: ShadingMode,
    #[serde(default)]
    pub viewing_window: bool,
    #[serde(default = "default_field_lens")]
    pub field_lens: f64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub progress: bool,
    #[serde(default)]
    pub geom_name: String,
    #[serde(default = "default_directory")]
    pub directory: String,
}

fn default_carrier_wave() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

fn default_field_lens() -> f64 {
    1.0
}

fn default_parallel() -> bool {
    true
}

fn default_directory() -> String {
    "output".to_string()
}

impl Settings {
    pub fn object_scale(&self) -> Vector3<f64> {
        Vector3::from(self.object_scale)
    }

    pub fn object_shift(&self) -> Vector3<f64> {
        Vector3::from(self.object_shift)
    }

    pub fn illumination(&self) -> Vector3<f64> {
        Vector3::from(self.illumination)
    }

    pub fn carrier_wave(&self) -> Vector3<f64> {
        Vector3::from(self.carrier_wave)
    }

    /// Checks the global preconditions of a generation pass.
    pub fn validate(&self) -> Result<(), HologramError> {
        let invalid = |msg: String| Err(HologramError::InvalidSettings(msg));

        if self.resolution.iter().any(|&n| n == 0) {
            return invalid(format!("resolution must be positive, got {:?}", self.resolution));
        }
        if self.pixel_pitch.iter().any(|&p| !(p.is_finite() && p > 0.0)) {
            return invalid(format!(
                "pixel pitch must be positive, got {:?}",
                self.pixel_pitch
            ));
        }
        if self.wavelengths.is_empty() {
            return invalid("at least one wavelength is required".to_string());
        }
        if let Some(w) = self
            .wavelengths
            .iter()
            .find(|w| !(w.is_finite() && **w > 0.0))
        {
            return invalid(format!("wavelength must be positive, got {}", w));
        }
        let vectors = [
            ("object scale", &self.object_scale),
            ("object shift", &self.object_shift),
            ("illumination", &self.illumination),
            ("carrier wave", &self.carrier_wave),
        ];
        for (name, v) in vectors {
            if v.iter().any(|c| !c.is_finite()) {
                return invalid(format!("{} must be finite, got {:?}", name, v));
            }
        }
        if self.viewing_window && !(self.field_lens.abs() > MIN_FIELD_LENS) {
            return invalid(format!(
                "field lens must lie outside the normalised object (|F| > {}), got {}",
                MIN_FIELD_LENS, self.field_lens
            ));
        }
        Ok(())
    }
}

pub fn load_default_config() -> Result<Settings> {
    let root_dir = retrieve_project_root()?;
    let default_config_file = root_dir.join("config/default.toml");

    let settings = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .map_err(|err| anyhow!("error loading configuration: {}", err))?;

    let config: Settings = settings
        .try_deserialize()
        .map_err(|err| anyhow!("error deserializing configuration: {}", err))?;

    config.validate()?;

    Ok(config)
}

pub fn load_config() -> Result<Settings> {
    let root_dir = retrieve_project_root()?;

    let default_config_file = root_dir.join("config/default.toml");
    let local_config = root_dir.join("config/local.toml");

    // Check if local config exists, if not use default
    let config_file = if local_config.exists() {
        info!("using local configuration: {:?}", local_config);
        local_config
    } else {
        info!("using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(Environment::with_prefix("mesh_cgh"))
        .build()
        .map_err(|err| anyhow!("error loading configuration: {}", err))?;

    let mut config: Settings = settings
        .try_deserialize()
        .map_err(|err| anyhow!("error deserializing configuration: {}", err))?;

    // Parse command-line arguments and override values
    let args = CliArgs::parse();

    if let Some(wavelengths) = args.w {
        config.wavelengths = wavelengths;
    }
    if let Some(geo) = args.geo {
        config.geom_name = geo;
    }
    if let Some(res) = args.res {
        config.resolution = to_array(&res, "resolution")?;
    }
    if let Some(pitch) = args.pitch {
        config.pixel_pitch = to_array(&pitch, "pitch")?;
    }
    if let Some(scale) = args.scale {
        config.object_scale = to_array(&scale, "scale")?;
    }
    if let Some(shift) = args.shift {
        config.object_shift = to_array(&shift, "shift")?;
    }
    if let Some(illum) = args.illum {
        config.illumination = to_array(&illum, "illum")?;
    }
    if let Some(carrier) = args.carrier {
        config.carrier_wave = to_array(&carrier, "carrier")?;
    }
    if let Some(shading) = args.shading {
        config.shading = shading;
    }
    if let Some(field_lens) = args.vw {
        config.viewing_window = true;
        config.field_lens = field_lens;
    }
    if args.sequential {
        config.parallel = false;
    }
    if args.progress {
        config.progress = true;
    }
    if let Some(dir) = args.dir {
        config.directory = dir;
    }

    config.validate()?;

    info!("{}", config);

    Ok(config)
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the MESH_CGH_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<std::path::PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(std::path::PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("MESH_CGH_ROOT_DIR") {
        return Ok(std::path::PathBuf::from(path));
    }

    // Fallback: walk upward from the executable directory
    let exe_path = env::current_exe()?;
    let mut current_dir = exe_path.parent();
    while let Some(dir) = current_dir {
        if dir.join("config").is_dir() {
            return Ok(dir.to_path_buf());
        }
        current_dir = dir.parent();
    }
    Err(anyhow!("could not find project root directory"))
}

fn to_array<const N: usize, T: Copy>(values: &[T], name: &str) -> Result<[T; N]> {
    <[T; N]>::try_from(values)
        .map_err(|_| anyhow!("--{} expects {} values, got {}", name, N, values.len()))
}

#[derive(Parser, Debug)]
#[command(version, about = "Mesh CGH - computer-generated holograms of triangle meshes")]
pub struct CliArgs {
    /// Wavelengths in metres, separated by spaces. One hologram channel is computed per wavelength.
    #[arg(short, long, num_args = 1.., value_delimiter = ' ')]
    w: Option<Vec<f64>>,

    /// File path to the input mesh. Currently, only the Wavefront .obj format is supported.
    #[arg(short, long)]
    geo: Option<String>,

    /// Number of pixels along x and y.
    #[arg(long, num_args = 2, value_delimiter = ' ')]
    res: Option<Vec<usize>>,

    /// Pixel pitch along x and y, in metres.
    #[arg(long, num_args = 2, value_delimiter = ' ')]
    pitch: Option<Vec<f64>>,

    /// Object size along x, y and z, in metres. The mesh is normalised to a unit cube first.
    #[arg(long, num_args = 3, value_delimiter = ' ', allow_negative_numbers = true)]
    scale: Option<Vec<f64>>,

    /// Object shift along x, y and z, in metres.
    #[arg(long, num_args = 3, value_delimiter = ' ', allow_negative_numbers = true)]
    shift: Option<Vec<f64>>,

    /// Illumination direction. Use "0 0 0" to disable flat shading.
    #[arg(long, num_args = 3, value_delimiter = ' ', allow_negative_numbers = true)]
    illum: Option<Vec<f64>>,

    /// Carrier wave direction.
    #[arg(long, num_args = 3, value_delimiter = ' ', allow_negative_numbers = true)]
    carrier: Option<Vec<f64>>,

    /// Shading model.
    #[arg(long, value_enum)]
    shading: Option<ShadingMode>,

    /// Enable the viewing window transform with the given field lens (normalised units).
    #[arg(long, allow_negative_numbers = true)]
    vw: Option<f64>,

    /// Accumulate facets sequentially in mesh order.
    #[arg(long)]
    sequential: bool,

    /// Show a progress bar over the facet loop.
    #[arg(short, long)]
    progress: bool,

    /// Output directory for the run summary.
    #[arg(short, long)]
    dir: Option<String>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Resolution: {} x {}
  - Pixel Pitch: {:e} x {:e}
  - Wavelengths: {:?}
  - Object Scale: {:?}
  - Object Shift: {:?}
  - Illumination: {:?}
  - Carrier Wave: {:?}
  - Shading: {:?}
  - Viewing Window: {}
  - Parallel: {}
  ",
            self.resolution[0],
            self.resolution[1],
            self.pixel_pitch[0],
            self.pixel_pitch[1],
            self.wavelengths,
            self.object_scale,
            self.object_shift,
            self.illumination,
            self.carrier_wave,
            self.shading,
            if self.viewing_window {
                format!("on (field lens {})", self.field_lens)
            } else {
                "off".to_string()
            },
            self.parallel,
        )
    }
}
