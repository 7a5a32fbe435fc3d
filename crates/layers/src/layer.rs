use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    BufferSize { expected: usize, found: usize },
    OddDimensions { width: u32, height: u32 },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::BufferSize { expected, found } => {
                write!(f, "raster buffer holds {found} values, expected {expected}")
            }
            RasterError::OddDimensions { width, height } => {
                write!(f, "cannot halve a {width}x{height} raster: dimensions must be even")
            }
        }
    }
}

impl std::error::Error for RasterError {}

/// A full-map raster that can be tiled and mip-mapped in place.
pub trait RasterLayer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Replaces the contents with a box-filtered copy at half resolution.
    fn downsample(&mut self) -> Result<(), RasterError>;

    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}
