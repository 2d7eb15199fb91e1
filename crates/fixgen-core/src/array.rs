//! Dense row-major `f64` arrays.
//!
//! [`NumericArray`] is the value type synthesized for every parameter. Data
//! is stored C-contiguous: the last axis varies fastest.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;

/// Array extents, one per axis. Most fixtures are 1- or 2-dimensional.
pub type Shape = SmallVec<[usize; 4]>;

/// Number of elements addressed by `shape`. The empty shape holds one.
pub fn element_count(shape: &[usize]) -> Result<usize, CoreError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| CoreError::ShapeOverflow {
            shape: shape.to_vec(),
        })
}

/// Row-major element strides for `shape`.
pub fn row_major_strides(shape: &[usize]) -> Shape {
    let mut strides: Shape = smallvec::smallvec![0; shape.len()];
    let mut stride = 1usize;
    for (axis, &dim) in shape.iter().enumerate().rev() {
        strides[axis] = stride;
        stride = stride.saturating_mul(dim);
    }
    strides
}

/// A dense `f64` array with an explicit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericArray {
    shape: Shape,
    data: Vec<f64>,
}

impl NumericArray {
    /// Wraps `data` as an array of `shape`, checking the element count.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f64>) -> Result<Self, CoreError> {
        let expected = element_count(shape)?;
        if data.len() != expected {
            return Err(CoreError::ElementCount {
                shape: shape.to_vec(),
                expected,
                actual: data.len(),
            });
        }
        Ok(NumericArray {
            shape: Shape::from_slice(shape),
            data,
        })
    }

    /// A rank-0 array holding one value.
    pub fn scalar(value: f64) -> Self {
        NumericArray {
            shape: Shape::new(),
            data: vec![value],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat view in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Element at a full multi-index, or `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let strides = row_major_strides(&self.shape);
        let mut flat = 0usize;
        for ((&i, &dim), &stride) in index.iter().zip(self.shape.iter()).zip(strides.iter()) {
            if i >= dim {
                return None;
            }
            flat += i * stride;
        }
        self.data.get(flat).copied()
    }

    /// Little-endian byte encoding of the flat data.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}
