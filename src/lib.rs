pub mod executor;
pub mod model;
pub mod traits;
pub mod unexport;

// Re-export common types for convenience
pub use executor::*;
pub use model::*;
pub use traits::*;
