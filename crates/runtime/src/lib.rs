pub mod bands;
pub mod scheduler;

pub use bands::*;
pub use scheduler::*;
