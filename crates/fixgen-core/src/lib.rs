//! Core data model for synthetic measurement datasets.
//!
//! # Modules
//!
//! - [`id`]: parameter names and roles
//! - [`types`]: value-kind tags and sampling modes
//! - [`graph`]: [`DependencyGraph`] wiring dependents to independents
//! - [`array`]: [`NumericArray`], a dense row-major `f64` array
//! - [`synth`]: coordinate synthesis on a grid or scattered
//! - [`error`]: [`CoreError`]

pub mod array;
pub mod error;
pub mod graph;
pub mod id;
pub mod synth;
pub mod types;

// Re-export commonly used types
pub use array::{NumericArray, Shape};
pub use error::CoreError;
pub use graph::DependencyGraph;
pub use id::{ParamRole, ParameterName};
pub use synth::{synthesize, Column, SynthesizedDataset};
pub use types::{SampleMode, ValueKind};
