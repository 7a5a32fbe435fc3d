use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: &str = "1.0";
pub const MANIFEST_FILE_NAME: &str = "tileset.json";

/// Describes one generated tile tree so a client can find every file
/// without listing directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TilesetManifest {
    pub version: String,
    /// Level 0 raster size in albedo texels.
    pub width: u32,
    pub height: u32,
    pub lod_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albedo: Option<TileLayerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<TileLayerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_preview: Option<TileLayerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TileLayerEntry {
    /// Texels (albedo) or quads (elevation) per tile edge.
    pub tile_size: u32,
    pub path_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub path: String,
    pub tile_size: u32,
    pub index_count: u32,
    /// blake3 of the index file, lets clients cache it across tile sets.
    pub content_hash: String,
}

#[derive(Debug)]
pub enum ManifestError {
    Io(std::io::Error),
    Json(serde_json::Error),
    UnsupportedVersion { found: String },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io(err) => write!(f, "I/O error: {err}"),
            ManifestError::Json(err) => write!(f, "manifest JSON error: {err}"),
            ManifestError::UnsupportedVersion { found } => {
                write!(f, "unsupported manifest version: {found}")
            }
        }
    }
}

impl std::error::Error for ManifestError {}

impl TilesetManifest {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            width,
            height,
            lod_count: 0,
            albedo: None,
            elevation: None,
            elevation_preview: None,
            indices: None,
        }
    }

    pub fn write(&self, root: &Path) -> Result<(), ManifestError> {
        let payload = serde_json::to_string_pretty(self).map_err(ManifestError::Json)?;
        fs::write(root.join(MANIFEST_FILE_NAME), payload).map_err(ManifestError::Io)
    }

    pub fn load(root: &Path) -> Result<Self, ManifestError> {
        let payload =
            fs::read_to_string(root.join(MANIFEST_FILE_NAME)).map_err(ManifestError::Io)?;
        let manifest: TilesetManifest =
            serde_json::from_str(&payload).map_err(ManifestError::Json)?;

        if manifest.version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                found: manifest.version,
            });
        }
        Ok(manifest)
    }
}

pub fn content_hash_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
