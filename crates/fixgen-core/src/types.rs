//! Tags that travel with synthesized data to the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage representation tag for a registered parameter.
///
/// Only affects how the store writes a value; the synthesized numbers are
/// the same for every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// One row per element.
    #[default]
    Numeric,
    /// One row per result, arrays kept whole.
    Array,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Numeric => "numeric",
            ValueKind::Array => "array",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numeric" => Ok(ValueKind::Numeric),
            "array" => Ok(ValueKind::Array),
            other => Err(format!("unknown value kind '{other}', expected numeric/array")),
        }
    }
}

/// How independent coordinates are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Rectilinear Cartesian grid with unit-step coordinates.
    OnGrid,
    /// Unstructured point cloud of uniform random samples.
    Scattered,
}
