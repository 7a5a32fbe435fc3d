pub mod gradient;
pub mod shadow;

pub use gradient::*;
pub use shadow::*;
