//! Dependency wiring between independent and dependent parameters.
//!
//! [`DependencyGraph`] is a bipartite petgraph `DiGraph`: one node per
//! parameter, one edge from every dependent to every independent it is
//! measured against. Graphs built by [`DependencyGraph::build`] always wire
//! each dependent to the full independent set, in declaration order.

use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::{ParamRole, ParameterName};

/// Node weight: a named parameter and its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamNode {
    pub name: ParameterName,
    pub role: ParamRole,
}

/// Edge weight: the source dependent is sampled over the target setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn;

/// Flat, serializable view of a graph's names and edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wiring {
    pub independents: Vec<ParameterName>,
    pub dependents: Vec<ParameterName>,
    pub edges: IndexMap<ParameterName, IndexSet<ParameterName>>,
}

/// Bipartite dependency graph over synthesized parameters.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<ParamNode, DependsOn>,
    independents: Vec<NodeIndex>,
    dependents: Vec<NodeIndex>,
}

impl DependencyGraph {
    /// A graph with no parameters at all.
    pub fn empty() -> Self {
        DependencyGraph {
            graph: DiGraph::new(),
            independents: Vec::new(),
            dependents: Vec::new(),
        }
    }

    /// Builds `n_independent` setpoints and `n_dependent` measured
    /// parameters, each dependent depending on every setpoint.
    ///
    /// Dependents need at least one independent, otherwise their edge set
    /// would be empty.
    pub fn build(n_independent: usize, n_dependent: usize) -> Result<Self, CoreError> {
        if n_independent == 0 && n_dependent > 0 {
            return Err(CoreError::DependentsWithoutIndependents {
                dependents: n_dependent,
            });
        }

        let mut graph = DiGraph::with_capacity(
            n_independent + n_dependent,
            n_independent * n_dependent,
        );

        let independents: Vec<NodeIndex> = (0..n_independent)
            .map(|i| {
                graph.add_node(ParamNode {
                    name: ParameterName::independent(i),
                    role: ParamRole::Independent,
                })
            })
            .collect();

        let mut dependents = Vec::with_capacity(n_dependent);
        for j in 0..n_dependent {
            let node = graph.add_node(ParamNode {
                name: ParameterName::dependent(j),
                role: ParamRole::Dependent,
            });
            for &setpoint in &independents {
                graph.add_edge(node, setpoint, DependsOn);
            }
            dependents.push(node);
        }

        Ok(DependencyGraph {
            graph,
            independents,
            dependents,
        })
    }

    /// Independent parameter names in declaration order.
    pub fn independents(&self) -> impl Iterator<Item = &ParameterName> + '_ {
        self.independents.iter().map(|&idx| &self.graph[idx].name)
    }

    /// Dependent parameter names in declaration order.
    pub fn dependents(&self) -> impl Iterator<Item = &ParameterName> + '_ {
        self.dependents.iter().map(|&idx| &self.graph[idx].name)
    }

    pub fn n_independent(&self) -> usize {
        self.independents.len()
    }

    pub fn n_dependent(&self) -> usize {
        self.dependents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn find(&self, name: &ParameterName) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].name == *name)
    }

    /// Role of the named parameter, if it is part of this graph.
    pub fn role_of(&self, name: &ParameterName) -> Option<ParamRole> {
        self.find(name).map(|idx| self.graph[idx].role)
    }

    /// Setpoints the named parameter depends on, in declaration order.
    ///
    /// Independents depend on nothing; unknown names yield `None`.
    pub fn depends_on(&self, name: &ParameterName) -> Option<Vec<&ParameterName>> {
        let idx = self.find(name)?;
        // petgraph yields neighbors newest-first; sort back to insertion order.
        let mut targets: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        targets.sort_unstable();
        Some(targets.into_iter().map(|t| &self.graph[t].name).collect())
    }

    /// Mapping of every dependent to the set of independents it depends on.
    pub fn edges(&self) -> IndexMap<ParameterName, IndexSet<ParameterName>> {
        self.dependents()
            .map(|dep| {
                let setpoints = self
                    .depends_on(dep)
                    .unwrap_or_default()
                    .into_iter()
                    .cloned()
                    .collect();
                (dep.clone(), setpoints)
            })
            .collect()
    }

    /// Names and edges as one comparable, serializable value.
    pub fn wiring(&self) -> Wiring {
        Wiring {
            independents: self.independents().cloned().collect(),
            dependents: self.dependents().cloned().collect(),
            edges: self.edges(),
        }
    }
}

impl PartialEq for DependencyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.wiring() == other.wiring()
    }
}

impl Eq for DependencyGraph {}
