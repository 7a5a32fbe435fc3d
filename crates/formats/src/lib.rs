pub mod image_codec;
pub mod manifest;
pub mod mesh_file;
pub mod tile_path;

pub use image_codec::*;
pub use manifest::*;
pub use mesh_file::*;
pub use tile_path::*;
