//! Redistribution cost estimation.
//!
//! Redistribution is the communication that transforms a tensor from one placement into another (all-gather to go
//! from sharded to replicated, all-reduce to resolve a pending partial, and so on). Strategy generation never runs
//! these collectives; it only prices them, so that the external plan optimizer can trade an expensive output
//! placement against a cheap input redistribution.
//!
//! Costs are modeled as the communication volume per rank, in bytes, summed over mesh axes. For an axis of size `k`
//! and a logical tensor of `b` bytes, the per-axis transitions cost:
//!
//! | transition | collective | cost |
//! |---|---|---|
//! | identical placements | — | `0` |
//! | `S(d)` → `S(d)` | — | `0` |
//! | `S(i)` → `S(j)`, `i != j` | all-to-all | `b * (k-1) / k²` |
//! | `S(_)` → `R` | all-gather | `b * (k-1) / k` |
//! | `R` → `S(_)` | slice + scatter bookkeeping | `b / k` |
//! | `P(op)` → `R` | all-reduce | `2 * b * (k-1) / k` |
//! | `P(op)` → `S(_)` | reduce-scatter | `b * (k-1) / k` |
//! | anything else → `P(_)` | none exists | `∞` |
//!
//! Transitions into a pending partial have no implementing collective, so they price at infinity and the optimizer
//! can never pick them. An axis of size `1` has no peers and every transition on it is free. Specs carrying no tensor
//! metadata price at `0` — nothing is known to move.

use crate::placement::{DTensorSpec, Placement};
use crate::strategy::OpStrategy;

/// Estimated cost of redistributing `current` into `target`, in bytes moved per rank.
///
/// Cross-mesh redistribution is out of scope and prices at infinity.
pub fn redistribute_cost(current: &DTensorSpec, target: &DTensorSpec) -> f64 {
    if current.mesh() != target.mesh() {
        return f64::INFINITY;
    }

    let bytes = current.tensor_meta().map_or(0.0, |meta| meta.size_in_bytes() as f64);
    let mut cost = 0.0;
    for (axis, (current_placement, target_placement)) in
        current.placements().iter().zip(target.placements().iter()).enumerate()
    {
        // Placement tuples are validated against the mesh, so the axis lookup cannot fail.
        let axis_size = current.mesh().axis_size(axis).unwrap_or(1);
        cost += transition_cost(current_placement, target_placement, axis_size, bytes);
    }
    cost
}

/// Estimated cost of redistributing each candidate in `source` into `target`.
///
/// Returns one cost per candidate, in the source strategy's order, so that entry `i` prices "pick source candidate
/// `i`, then redistribute it into `target`".
pub fn estimate_redistribute_costs(source: &OpStrategy, target: &DTensorSpec) -> Vec<f64> {
    source.strategies().iter().map(|candidate| redistribute_cost(candidate.output_spec(), target)).collect()
}

fn transition_cost(current: &Placement, target: &Placement, axis_size: usize, bytes: f64) -> f64 {
    if current == target || axis_size <= 1 {
        return 0.0;
    }
    let k = axis_size as f64;
    match (current, target) {
        // Identical replicate pairs are caught by the equality check above.
        (Placement::Replicate, Placement::Replicate) => 0.0,
        (Placement::Shard(_), Placement::Shard(_)) => bytes * (k - 1.0) / (k * k),
        (Placement::Shard(_), Placement::Replicate) => bytes * (k - 1.0) / k,
        (Placement::Replicate, Placement::Shard(_)) => bytes / k,
        (Placement::Partial(_), Placement::Replicate) => 2.0 * bytes * (k - 1.0) / k,
        (Placement::Partial(_), Placement::Shard(_)) => bytes * (k - 1.0) / k,
        (_, Placement::Partial(_)) => f64::INFINITY,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{DeviceMesh, MeshAxis};
    use crate::placement::ReduceOp;
    use crate::strategy::PlacementStrategy;
    use crate::types::{DataType, TensorMeta};

    fn test_mesh_1d(size: usize) -> DeviceMesh {
        DeviceMesh::new(vec![MeshAxis::new("dp", size).unwrap()]).unwrap()
    }

    fn spec(mesh: &DeviceMesh, placements: Vec<Placement>) -> DTensorSpec {
        // 16 x 16 f32 = 1024 bytes.
        let meta = TensorMeta::contiguous(vec![16, 16], DataType::Float32);
        DTensorSpec::new(mesh.clone(), placements, Some(meta)).unwrap()
    }

    #[test]
    fn test_identical_placements_are_free() {
        let mesh = test_mesh_1d(4);
        let sharded = spec(&mesh, vec![Placement::Shard(0)]);
        assert_eq!(redistribute_cost(&sharded, &sharded), 0.0);
    }

    #[test]
    fn test_transition_cost_ordering() {
        let mesh = test_mesh_1d(4);
        let sharded = spec(&mesh, vec![Placement::Shard(0)]);
        let resharded = spec(&mesh, vec![Placement::Shard(1)]);
        let replicated = spec(&mesh, vec![Placement::Replicate]);
        let partial = spec(&mesh, vec![Placement::Partial(ReduceOp::Sum)]);

        let all_to_all = redistribute_cost(&sharded, &resharded);
        let all_gather = redistribute_cost(&sharded, &replicated);
        let slice = redistribute_cost(&replicated, &sharded);
        let all_reduce = redistribute_cost(&partial, &replicated);
        let reduce_scatter = redistribute_cost(&partial, &sharded);

        assert_eq!(all_to_all, 1024.0 * 3.0 / 16.0);
        assert_eq!(all_gather, 1024.0 * 3.0 / 4.0);
        assert_eq!(slice, 1024.0 / 4.0);
        assert_eq!(all_reduce, 2.0 * 1024.0 * 3.0 / 4.0);
        assert_eq!(reduce_scatter, 1024.0 * 3.0 / 4.0);

        // Resolving a partial is the most expensive way to reach a replica.
        assert!(all_reduce > all_gather);
        assert!(all_to_all < all_gather);
    }

    #[test]
    fn test_transitions_into_partial_are_unreachable() {
        let mesh = test_mesh_1d(4);
        let replicated = spec(&mesh, vec![Placement::Replicate]);
        let sharded = spec(&mesh, vec![Placement::Shard(0)]);
        let partial_sum = spec(&mesh, vec![Placement::Partial(ReduceOp::Sum)]);
        let partial_max = spec(&mesh, vec![Placement::Partial(ReduceOp::Max)]);

        assert_eq!(redistribute_cost(&replicated, &partial_sum), f64::INFINITY);
        assert_eq!(redistribute_cost(&sharded, &partial_sum), f64::INFINITY);
        assert_eq!(redistribute_cost(&partial_max, &partial_sum), f64::INFINITY);
        assert_eq!(redistribute_cost(&partial_sum, &partial_sum), 0.0);
    }

    #[test]
    fn test_single_rank_axis_is_free() {
        let mesh = test_mesh_1d(1);
        let sharded = spec(&mesh, vec![Placement::Shard(0)]);
        let partial = spec(&mesh, vec![Placement::Partial(ReduceOp::Sum)]);
        assert_eq!(redistribute_cost(&partial, &sharded), 0.0);
    }

    #[test]
    fn test_cross_mesh_is_unreachable() {
        let mesh_a = test_mesh_1d(4);
        let mesh_b = test_mesh_1d(2);
        let a = spec(&mesh_a, vec![Placement::Replicate]);
        let b = spec(&mesh_b, vec![Placement::Replicate]);
        assert_eq!(redistribute_cost(&a, &b), f64::INFINITY);
    }

    #[test]
    fn test_estimate_costs_preserves_candidate_order() {
        let mesh = test_mesh_1d(4);
        let replicated = spec(&mesh, vec![Placement::Replicate]);
        let sharded = spec(&mesh, vec![Placement::Shard(0)]);
        let source = OpStrategy::new(vec![
            PlacementStrategy::from_output_spec(sharded.clone()),
            PlacementStrategy::from_output_spec(replicated.clone()),
        ]);

        let costs = estimate_redistribute_costs(&source, &sharded);
        assert_eq!(costs.len(), 2);
        assert_eq!(costs[0], 0.0);
        assert_eq!(costs[1], 1024.0 / 4.0);
    }

    #[test]
    fn test_specs_without_metadata_price_at_zero() {
        let mesh = test_mesh_1d(4);
        let sharded = DTensorSpec::new(mesh.clone(), vec![Placement::Shard(0)], None).unwrap();
        let replicated = DTensorSpec::new(mesh, vec![Placement::Replicate], None).unwrap();
        assert_eq!(redistribute_cost(&sharded, &replicated), 0.0);
    }
}
