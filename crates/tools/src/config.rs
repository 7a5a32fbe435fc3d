use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use compute::{SunParams, SunSampleSet};
use serde::{Deserialize, Serialize};

/// Everything a generator run needs, fixed before the first stage starts.
///
/// Every field has a default, so a JSON config file only lists what it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub albedo_path: Option<PathBuf>,
    pub elevation_path: Option<PathBuf>,
    pub output_root: PathBuf,

    /// Albedo texels per tile edge.
    pub albedo_tile_size: u32,
    /// Mesh quads per tile edge; must divide `albedo_tile_size` by a power
    /// of two.
    pub elevation_tile_size: u32,

    pub sun: SunConfig,
    /// Darkening of a texel whose every sun sample is blocked.
    pub shadow_strength: f32,
    pub worker_threads: usize,
    /// Width of the faded border, in level-0 albedo texels.
    pub border_margin: u32,

    pub albedo_quality: u8,
    pub elevation_preview_quality: u8,

    /// Shifts the elevation working raster right/down by this many texels
    /// to line it up with the albedo.
    pub elevation_offset: [u32; 2],
    pub index_file_name: String,

    pub stages: StageFlags,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            albedo_path: None,
            elevation_path: None,
            output_root: PathBuf::from("output"),
            albedo_tile_size: 512,
            elevation_tile_size: 128,
            sun: SunConfig::default(),
            shadow_strength: 0.40,
            worker_threads: 8,
            border_margin: 255,
            albedo_quality: 80,
            elevation_preview_quality: 70,
            elevation_offset: [0, 0],
            index_file_name: "tile.indices".to_string(),
            stages: StageFlags::default(),
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SunConfig {
    pub heading_deg: f32,
    pub pitch_deg: f32,
    pub heading_spread_deg: f32,
    pub pitch_spread_deg: f32,
}

impl Default for SunConfig {
    fn default() -> Self {
        let p = SunParams::default();
        Self {
            heading_deg: p.heading_deg,
            pitch_deg: p.pitch_deg,
            heading_spread_deg: p.heading_spread_deg,
            pitch_spread_deg: p.pitch_spread_deg,
        }
    }
}

impl SunConfig {
    pub fn params(&self) -> SunParams {
        SunParams {
            heading_deg: self.heading_deg,
            pitch_deg: self.pitch_deg,
            heading_spread_deg: self.heading_spread_deg,
            pitch_spread_deg: self.pitch_spread_deg,
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StageFlags {
    pub shadows: bool,
    pub border_gradient: bool,
    pub albedo_tiles: bool,
    pub elevation_tiles: bool,
    pub elevation_previews: bool,
    pub shared_indices: bool,
    pub manifest: bool,
}

impl Default for StageFlags {
    fn default() -> Self {
        Self {
            shadows: true,
            border_gradient: true,
            albedo_tiles: true,
            elevation_tiles: true,
            elevation_previews: false,
            shared_indices: true,
            manifest: true,
        }
    }
}

impl StageFlags {
    pub fn needs_albedo(&self) -> bool {
        self.albedo_tiles
    }

    pub fn needs_elevation(&self) -> bool {
        self.elevation_tiles || self.elevation_previews || (self.shadows && self.albedo_tiles)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "read config {path:?}: {source}"),
            ConfigError::Parse { path, source } => write!(f, "parse config {path:?}: {source}"),
            ConfigError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let payload = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&payload).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// How many times the elevation source is halved before tiling.
    pub fn elevation_shrink_steps(&self) -> u32 {
        (self.albedo_tile_size / self.elevation_tile_size).trailing_zeros()
    }

    pub fn sun_samples(&self) -> Result<SunSampleSet, ConfigError> {
        SunSampleSet::new(self.sun.params()).ok_or_else(|| {
            invalid(
                "sun",
                format!(
                    "pitch {} +/- {} must stay above the horizon",
                    self.sun.pitch_deg, self.sun.pitch_spread_deg
                ),
            )
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.albedo_tile_size == 0 {
            return Err(invalid("albedo_tile_size", "must be non-zero"));
        }
        if self.elevation_tile_size == 0 || !self.elevation_tile_size.is_power_of_two() {
            return Err(invalid(
                "elevation_tile_size",
                format!("{} is not a power of two", self.elevation_tile_size),
            ));
        }
        if self.elevation_tile_size > self.albedo_tile_size
            || self.albedo_tile_size % self.elevation_tile_size != 0
            || !(self.albedo_tile_size / self.elevation_tile_size).is_power_of_two()
        {
            return Err(invalid(
                "elevation_tile_size",
                format!(
                    "{} must divide albedo_tile_size {} by a power of two",
                    self.elevation_tile_size, self.albedo_tile_size
                ),
            ));
        }
        if self.worker_threads == 0 {
            return Err(invalid("worker_threads", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.shadow_strength) {
            return Err(invalid(
                "shadow_strength",
                format!("{} is outside 0..=1", self.shadow_strength),
            ));
        }
        if self.border_margin == 0 {
            return Err(invalid("border_margin", "must be non-zero"));
        }
        for (field, q) in [
            ("albedo_quality", self.albedo_quality),
            ("elevation_preview_quality", self.elevation_preview_quality),
        ] {
            if !(1..=100).contains(&q) {
                return Err(invalid(field, format!("{q} is outside 1..=100")));
            }
        }
        if self.index_file_name.is_empty() {
            return Err(invalid("index_file_name", "must not be empty"));
        }
        if self.stages.shadows {
            self.sun_samples()?;
        }
        Ok(())
    }
}
