//! Line searches, acceptance tests and optimization state.

pub mod curvature;
pub mod line_search;
pub mod state;

// Re-export optimization components
pub use curvature::*;
pub use line_search::*;
pub use state::*;
