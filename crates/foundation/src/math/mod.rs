pub mod morton;
pub mod vec;

pub use morton::*;
pub use vec::*;
