//! Configuration: untyped parameter lists and the typed step configuration.

pub mod parameters;
pub mod step_config;

// Re-export key items
pub use parameters::{ParameterList, ParameterValue};
pub use step_config::{
    CurvatureCondition, DescentType, KrylovType, LineSearchType, NonlinearCgType, SecantType,
    StepConfig,
};
