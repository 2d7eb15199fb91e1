//! Coordinate synthesis for a [`DependencyGraph`].
//!
//! In [`SampleMode::OnGrid`] every independent gets unit-step coordinates
//! `0..extent` along its own axis, expanded to a full Cartesian grid of the
//! requested shape. Dependents are uniform filler of the same shape and are
//! never a function of the coordinates.
//!
//! In [`SampleMode::Scattered`] the shape is flattened to one count and every
//! parameter gets its own uniform sample of that length.

use rand::Rng;

use crate::array::{element_count, NumericArray};
use crate::error::CoreError;
use crate::graph::DependencyGraph;
use crate::id::{ParamRole, ParameterName};
use crate::types::{SampleMode, ValueKind};

/// One synthesized parameter, ready to hand to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: ParameterName,
    pub role: ParamRole,
    pub kind: ValueKind,
    pub values: NumericArray,
}

/// Ordered columns: independents first, then dependents, in graph order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SynthesizedDataset {
    columns: Vec<Column>,
}

impl SynthesizedDataset {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Values for the named parameter.
    pub fn get(&self, name: &str) -> Option<&NumericArray> {
        self.columns
            .iter()
            .find(|c| c.name.as_str() == name)
            .map(|c| &c.values)
    }

    /// `(name, values)` pairs in column order.
    pub fn pairs(&self) -> impl Iterator<Item = (&ParameterName, &NumericArray)> + '_ {
        self.columns.iter().map(|c| (&c.name, &c.values))
    }
}

/// Synthesizes one array per parameter of `graph`.
///
/// Grid mode fails with [`CoreError::ShapeMismatch`] unless `shape` has one
/// extent per independent; nothing is produced in that case.
pub fn synthesize<R: Rng + ?Sized>(
    graph: &DependencyGraph,
    shape: &[usize],
    mode: SampleMode,
    kind: ValueKind,
    rng: &mut R,
) -> Result<SynthesizedDataset, CoreError> {
    let mut columns = Vec::with_capacity(graph.n_independent() + graph.n_dependent());

    match mode {
        SampleMode::OnGrid => {
            if shape.len() != graph.n_independent() {
                return Err(CoreError::ShapeMismatch {
                    dims: shape.len(),
                    independents: graph.n_independent(),
                });
            }
            let axes: Vec<Vec<f64>> = shape
                .iter()
                .map(|&extent| (0..extent).map(|v| v as f64).collect())
                .collect();
            let grids = cartesian_grid(&axes)?;

            for (name, grid) in graph.independents().zip(grids) {
                columns.push(Column {
                    name: name.clone(),
                    role: ParamRole::Independent,
                    kind,
                    values: grid,
                });
            }
            for name in graph.dependents() {
                columns.push(Column {
                    name: name.clone(),
                    role: ParamRole::Dependent,
                    kind,
                    values: uniform(shape, rng)?,
                });
            }
        }
        SampleMode::Scattered => {
            let flat = [element_count(shape)?];
            let roles = graph
                .independents()
                .map(|n| (n, ParamRole::Independent))
                .chain(graph.dependents().map(|n| (n, ParamRole::Dependent)));
            for (name, role) in roles {
                columns.push(Column {
                    name: name.clone(),
                    role,
                    kind,
                    values: uniform(&flat, rng)?,
                });
            }
        }
    }

    Ok(SynthesizedDataset { columns })
}

/// Expands per-axis coordinates into one full grid per axis.
///
/// Iteration is row-major: the multi-index advances like an odometer with
/// the last axis turning fastest, so grid `k` at flat position `p` holds
/// `axes[k][index_k(p)]`.
pub fn cartesian_grid(axes: &[Vec<f64>]) -> Result<Vec<NumericArray>, CoreError> {
    let shape: Vec<usize> = axes.iter().map(Vec::len).collect();
    let total = element_count(&shape)?;

    let mut grids: Vec<Vec<f64>> = axes.iter().map(|_| Vec::with_capacity(total)).collect();
    let mut index = vec![0usize; axes.len()];

    for _ in 0..total {
        for (axis, grid) in grids.iter_mut().enumerate() {
            grid.push(axes[axis][index[axis]]);
        }
        for axis in (0..axes.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }

    grids
        .into_iter()
        .map(|data| NumericArray::from_shape_vec(&shape, data))
        .collect()
}

/// Uniform samples in `[0, 1)` filling `shape`.
fn uniform<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Result<NumericArray, CoreError> {
    let n = element_count(shape)?;
    let data = (0..n).map(|_| rng.gen::<f64>()).collect();
    NumericArray::from_shape_vec(shape, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0)
    }

    fn numeric_grid(
        graph: &DependencyGraph,
        shape: &[usize],
    ) -> Result<SynthesizedDataset, CoreError> {
        synthesize(graph, shape, SampleMode::OnGrid, ValueKind::Numeric, &mut rng())
    }

    #[test]
    fn grid_arrays_match_requested_shape() {
        let graph = DependencyGraph::build(2, 1).unwrap();
        let data = numeric_grid(&graph, &[100, 100]).unwrap();
        assert_eq!(data.len(), 3);
        for (_, values) in data.pairs() {
            assert_eq!(values.shape(), &[100, 100]);
        }
    }

    #[test]
    fn grid_axes_vary_independently() {
        let graph = DependencyGraph::build(2, 1).unwrap();
        let data = numeric_grid(&graph, &[100, 100]).unwrap();
        let p0 = data.get("param_0").unwrap();
        let p1 = data.get("param_1").unwrap();
        for i in 0..100 {
            for j in 0..100 {
                assert_eq!(p0.get(&[i, j]), Some(i as f64));
                assert_eq!(p1.get(&[i, j]), Some(j as f64));
            }
        }
    }

    #[test]
    fn grid_ordering_is_row_major() {
        let grids = cartesian_grid(&[vec![0.0, 1.0], vec![10.0, 20.0, 30.0]]).unwrap();
        assert_eq!(grids[0].as_slice(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(grids[1].as_slice(), &[10.0, 20.0, 30.0, 10.0, 20.0, 30.0]);
        assert_eq!(grids[0].shape(), &[2, 3]);
    }

    #[test]
    fn grid_coordinates_exclude_the_extent() {
        let graph = DependencyGraph::build(1, 0).unwrap();
        let data = synthesize(&graph, &[4], SampleMode::OnGrid, ValueKind::Array, &mut rng())
            .unwrap();
        assert_eq!(data.get("param_0").unwrap().as_slice(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn grid_shape_mismatch_is_rejected() {
        let graph = DependencyGraph::build(2, 1).unwrap();
        let err = numeric_grid(&graph, &[100]).unwrap_err();
        assert_eq!(
            err,
            CoreError::ShapeMismatch {
                dims: 1,
                independents: 2
            }
        );
    }

    #[test]
    fn dependents_are_uniform_filler() {
        let graph = DependencyGraph::build(2, 2).unwrap();
        let data = numeric_grid(&graph, &[10, 10]).unwrap();
        let m0 = data.get("meas_param_0").unwrap();
        let m1 = data.get("meas_param_1").unwrap();
        assert!(m0.as_slice().iter().all(|v| (0.0..1.0).contains(v)));
        assert_ne!(m0.as_slice(), m1.as_slice());
    }

    #[test]
    fn scattered_arrays_are_flat_and_distinct() {
        let graph = DependencyGraph::build(2, 1).unwrap();
        let data = synthesize(&graph, &[10000], SampleMode::Scattered, ValueKind::Array, &mut rng())
            .unwrap();
        let columns = data.columns();
        for column in columns {
            assert_eq!(column.values.shape(), &[10000]);
            assert!(column.values.as_slice().iter().all(|v| (0.0..1.0).contains(v)));
        }
        for (i, a) in columns.iter().enumerate() {
            for b in &columns[i + 1..] {
                assert_ne!(a.values.as_slice(), b.values.as_slice());
            }
        }
    }

    #[test]
    fn scattered_flattens_multi_dimensional_shapes() {
        let graph = DependencyGraph::build(1, 1).unwrap();
        let data = synthesize(
            &graph,
            &[20, 5],
            SampleMode::Scattered,
            ValueKind::Numeric,
            &mut rng(),
        )
        .unwrap();
        for (_, values) in data.pairs() {
            assert_eq!(values.shape(), &[100]);
        }
    }

    #[test]
    fn value_kind_only_tags_columns() {
        let graph = DependencyGraph::build(2, 1).unwrap();
        let numeric = numeric_grid(&graph, &[3, 3]).unwrap();
        let array = synthesize(&graph, &[3, 3], SampleMode::OnGrid, ValueKind::Array, &mut rng())
            .unwrap();
        for (n, a) in numeric.columns().iter().zip(array.columns()) {
            assert_eq!(n.values, a.values);
            assert_eq!(n.kind, ValueKind::Numeric);
            assert_eq!(a.kind, ValueKind::Array);
        }
    }

    #[test]
    fn same_seed_same_dataset() {
        let graph = DependencyGraph::build(2, 1).unwrap();
        let a = numeric_grid(&graph, &[8, 8]).unwrap();
        let b = numeric_grid(&graph, &[8, 8]).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn grid_rejects_every_dimension_mismatch(n_ind in 1usize..5, dims in 0usize..5) {
            prop_assume!(n_ind != dims);
            let graph = DependencyGraph::build(n_ind, 1).unwrap();
            let shape = vec![2usize; dims];
            let result = numeric_grid(&graph, &shape);
            prop_assert!(
                matches!(result, Err(CoreError::ShapeMismatch { .. })),
                "expected a shape mismatch"
            );
        }

        #[test]
        fn grid_shapes_match(
            extents in proptest::collection::vec(1usize..6, 1..4),
            n_dep in 0usize..3
        ) {
            let graph = DependencyGraph::build(extents.len(), n_dep).unwrap();
            let data = numeric_grid(&graph, &extents).unwrap();
            prop_assert_eq!(data.len(), extents.len() + n_dep);
            for (_, values) in data.pairs() {
                prop_assert_eq!(values.shape(), extents.as_slice());
            }
        }
    }
}
