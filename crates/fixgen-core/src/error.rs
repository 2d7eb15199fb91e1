//! Core error types for fixgen-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of graph building and coordinate synthesis.

use thiserror::Error;

/// Errors produced by the fixgen-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Grid mode needs exactly one extent per independent parameter.
    #[error("shape mismatch: {dims} extent(s) given for {independents} independent parameter(s)")]
    ShapeMismatch { dims: usize, independents: usize },

    /// Dependents were requested without any independent to depend on.
    #[error("{dependents} dependent parameter(s) requested with no independent parameters")]
    DependentsWithoutIndependents { dependents: usize },

    /// The element count of a shape does not fit in `usize`.
    #[error("shape {shape:?} overflows the addressable element count")]
    ShapeOverflow { shape: Vec<usize> },

    /// Array data length does not match the element count of its shape.
    #[error("array of shape {shape:?} needs {expected} element(s), got {actual}")]
    ElementCount {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
}
