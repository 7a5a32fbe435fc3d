//! Planet tile generator: turns an albedo and an elevation raster into a
//! pyramid of JPEG tiles and terrain meshes.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod tiler;

pub use config::*;
pub use error::*;
pub use pipeline::*;
pub use tiler::*;
