//! Storage-layer types: ids, parameter specs and run descriptions.

use std::fmt;

use fixgen_core::ValueKind;
use serde::{Deserialize, Serialize};

/// Row id of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExperimentId(pub i64);

/// Row id of a run. Ids start at 1 and follow insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub i64);

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registration record for one parameter of a measurement.
///
/// `depends_on` lists setpoints (the parameter is sampled over them);
/// `inferred_from` lists basis parameters it is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "paramtype")]
    pub kind: ValueKind,
    pub label: String,
    pub unit: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub inferred_from: Vec<String>,
}

impl ParamSpec {
    /// A spec with no label, unit or dependencies.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        ParamSpec {
            name: name.into(),
            kind,
            label: String::new(),
            unit: String::new(),
            depends_on: Vec::new(),
            inferred_from: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>, unit: impl Into<String>) -> Self {
        self.label = label.into();
        self.unit = unit.into();
        self
    }

    pub fn depending_on<I, S>(mut self, setpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = setpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn inferred_from<I, S>(mut self, basis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inferred_from = basis.into_iter().map(Into::into).collect();
        self
    }
}

/// Parameter interdependencies of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterDependencies {
    pub paramspecs: Vec<ParamSpec>,
}

/// The JSON stored in `runs.run_description` from schema level 3 on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDescription {
    pub interdependencies: InterDependencies,
}

impl RunDescription {
    pub fn new(paramspecs: Vec<ParamSpec>) -> Self {
        RunDescription {
            interdependencies: InterDependencies { paramspecs },
        }
    }

    /// A description with no parameters at all.
    pub fn empty() -> Self {
        RunDescription::default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_description_json() {
        let json = RunDescription::empty().to_json().unwrap();
        assert_eq!(json, r#"{"interdependencies":{"paramspecs":[]}}"#);
    }

    #[test]
    fn description_survives_json() {
        let spec = ParamSpec::new("meas_param_0", ValueKind::Array)
            .with_label("Measured", "V")
            .depending_on(["param_0", "param_1"]);
        let desc = RunDescription::new(vec![spec]);
        let json = desc.to_json().unwrap();
        assert!(json.contains(r#""paramtype":"array""#));
        assert_eq!(RunDescription::from_json(&json).unwrap(), desc);
    }
}
