//! Propagation rules for the softmax family.
//!
//! Softmax normalizes along one dimension, so every rank needs that dimension fully materialized: a sharding along
//! the softmax dimension cannot be computed through and is rejected with
//! [`StrategyError::IllegalShardedDimension`] — there is no automatic redistribution recovery for this class.
//! Off-axis placements are untouched, since softmax alters neither shape nor shard structure elsewhere.

use crate::errors::StrategyError;
use crate::ops::pointwise::pointwise_rule;
use crate::placement::DTensorSpec;
use crate::schema::{OpId, OpSchema};
use crate::strategy::OutputSharding;

/// Returns the sharding mesh axis of `dim` in `spec`, if `dim` resolves to a sharded dimension.
///
/// Negative dimensions index from the end. Dimensions outside the tensor's rank resolve to "not sharded" — the
/// bound guard mirrors the dimension check being scoped to the known dim map.
fn sharded_axis_at(spec: &DTensorSpec, dim: i64) -> Option<usize> {
    let dim_map = spec.dim_map();
    let adjusted = if dim < 0 { dim + dim_map.len() as i64 } else { dim };
    if adjusted < 0 || adjusted >= dim_map.len() as i64 {
        return None;
    }
    dim_map[adjusted as usize]
}

fn normalized_dim(dim: i64, rank: usize) -> usize {
    if dim < 0 { (dim + rank as i64) as usize } else { dim as usize }
}

/// Propagation rule for softmax and log-softmax.
///
/// Argument schema: `(input, dim, …)` with trailing pass-through arguments. The output sharding equals the input
/// sharding unchanged.
pub fn softmax_rule(op_schema: &OpSchema) -> Result<OutputSharding, StrategyError> {
    let input_spec = op_schema.spec_arg(0)?;
    let softmax_dim = op_schema.int_arg(1)?;
    if sharded_axis_at(input_spec, softmax_dim).is_some() {
        return Err(StrategyError::IllegalShardedDimension {
            op: op_schema.op(),
            dim: normalized_dim(softmax_dim, input_spec.rank()),
        });
    }
    Ok(OutputSharding::new(input_spec.clone()))
}

/// Propagation rule for the softmax and log-softmax backward passes.
///
/// Argument schema: `(grad_output, output, dim, …)`. Both tensor arguments must be unsharded along `dim`; the rule
/// then falls through to generic elementwise propagation over the pair.
pub fn softmax_backward_rule(op_schema: &OpSchema) -> Result<OutputSharding, StrategyError> {
    let grad_out_spec = op_schema.spec_arg(0)?;
    let out_spec = op_schema.spec_arg(1)?;
    let softmax_dim = op_schema.int_arg(2)?;
    if sharded_axis_at(grad_out_spec, softmax_dim).is_some() || sharded_axis_at(out_spec, softmax_dim).is_some() {
        return Err(StrategyError::IllegalShardedDimension {
            op: op_schema.op(),
            dim: normalized_dim(softmax_dim, grad_out_spec.rank()),
        });
    }
    pointwise_rule(op_schema)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
