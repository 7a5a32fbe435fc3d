use std::fmt;
use std::path::PathBuf;

use compute::ShadowError;
use formats::{CodecError, ManifestError, MeshFileError};
use layers::{IndexBufferError, RasterError};
use runtime::PoolError;

use crate::config::ConfigError;

/// Anything that aborts a generator run. Input errors are raised before
/// the first file is written; there is no partial-output recovery.
#[derive(Debug)]
pub enum PipelineError {
    Config(ConfigError),
    NoInput,
    Decode { path: PathBuf, source: CodecError },
    Raster(RasterError),
    SizeMismatch { albedo: (u32, u32), elevation: (u32, u32) },
    Misaligned { width: u32, height: u32, reason: String },
    IndexBuffer(IndexBufferError),
    Pool(PoolError),
    Shadow(ShadowError),
    Io { path: PathBuf, source: std::io::Error },
    Encode { path: PathBuf, source: CodecError },
    MeshFile { path: PathBuf, source: MeshFileError },
    Manifest(ManifestError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(err) => write!(f, "{err}"),
            PipelineError::NoInput => {
                write!(f, "no input raster: enabled stages need an albedo or elevation source")
            }
            PipelineError::Decode { path, source } => write!(f, "decode {path:?}: {source}"),
            PipelineError::Raster(err) => write!(f, "{err}"),
            PipelineError::SizeMismatch { albedo, elevation } => write!(
                f,
                "albedo is {}x{} but elevation is {}x{}",
                albedo.0, albedo.1, elevation.0, elevation.1
            ),
            PipelineError::Misaligned {
                width,
                height,
                reason,
            } => write!(f, "{width}x{height} source cannot be tiled: {reason}"),
            PipelineError::IndexBuffer(err) => write!(f, "{err}"),
            PipelineError::Pool(err) => write!(f, "{err}"),
            PipelineError::Shadow(err) => write!(f, "shadow pass: {err}"),
            PipelineError::Io { path, source } => write!(f, "{path:?}: {source}"),
            PipelineError::Encode { path, source } => write!(f, "encode {path:?}: {source}"),
            PipelineError::MeshFile { path, source } => write!(f, "write {path:?}: {source}"),
            PipelineError::Manifest(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}

impl From<RasterError> for PipelineError {
    fn from(err: RasterError) -> Self {
        PipelineError::Raster(err)
    }
}

impl From<IndexBufferError> for PipelineError {
    fn from(err: IndexBufferError) -> Self {
        PipelineError::IndexBuffer(err)
    }
}

impl From<PoolError> for PipelineError {
    fn from(err: PoolError) -> Self {
        PipelineError::Pool(err)
    }
}

impl From<ShadowError> for PipelineError {
    fn from(err: ShadowError) -> Self {
        PipelineError::Shadow(err)
    }
}

impl From<ManifestError> for PipelineError {
    fn from(err: ManifestError) -> Self {
        PipelineError::Manifest(err)
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> PipelineError {
    let path = path.into();
    move |source| PipelineError::Io { path, source }
}
