//! Core traits and types: scalars, vectors, objectives and bounds.

pub mod bounds;
pub mod error;
pub mod objective;
pub mod types;
pub mod vector;

// Re-export core types
pub use bounds::*;
pub use error::*;
pub use objective::*;
pub use types::*;
pub use vector::*;
