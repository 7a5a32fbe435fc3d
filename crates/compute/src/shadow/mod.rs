//! Sun-shadow baking: a per-texel ray marcher plus the banded parallel pass
//! that applies it to a whole albedo raster.

pub mod pass;
pub mod raycast;
pub mod sun;

pub use pass::*;
pub use raycast::*;
pub use sun::*;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowError {
    SizeMismatch {
        albedo: (u32, u32),
        elevation: (u32, u32),
    },
    FieldTooSmall {
        width: u32,
        height: u32,
    },
}

impl fmt::Display for ShadowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShadowError::SizeMismatch { albedo, elevation } => write!(
                f,
                "albedo is {}x{} but elevation is {}x{}",
                albedo.0, albedo.1, elevation.0, elevation.1
            ),
            ShadowError::FieldTooSmall { width, height } => {
                write!(f, "{width}x{height} height field is too small to march")
            }
        }
    }
}

impl std::error::Error for ShadowError {}
