//! Parameter naming.
//!
//! Names are positional per role so that two graphs built from the same
//! counts carry the same names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a synthesized parameter, as registered with the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterName(pub String);

/// Whether a parameter is a free coordinate or a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamRole {
    /// A setpoint the dependents are measured against.
    Independent,
    /// A value measured at every combination of setpoints.
    Dependent,
}

impl ParameterName {
    /// Name of the `index`-th independent parameter.
    pub fn independent(index: usize) -> Self {
        ParameterName(format!("param_{index}"))
    }

    /// Name of the `index`-th dependent parameter.
    pub fn dependent(index: usize) -> Self {
        ParameterName(format!("meas_param_{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParameterName {
    fn from(s: &str) -> Self {
        ParameterName(s.to_string())
    }
}

impl AsRef<str> for ParameterName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
