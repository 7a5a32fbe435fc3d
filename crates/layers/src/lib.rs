pub mod layer;
pub mod mesh;
pub mod mip;
pub mod raster;
pub mod terrain;

pub use layer::*;
pub use mesh::*;
pub use raster::*;
pub use terrain::*;
