//! Sharding strategies for reduction operations.
//!
//! Reductions interact with placements in two ways. A *reduction-linear* operation `f` satisfies
//! `f([f(a), f(b)]) = f([a, b])` — reducing partition-wise and then combining equals reducing the whole — so a shard
//! on a reduced dimension may simply turn into a pending [`Placement::Partial`] that the runtime resolves with one
//! collective. A non-linear reduction (variance) has no such decomposition: any pending partial, and any shard on a
//! reduced dimension, must be replicated *before* the reduction runs, at the price of an extra redistribution.
//!
//! [`common_reduction_strategy`] encodes both paths. It maps each candidate strategy of the input to exactly one
//! output candidate, preserving order, so the external optimizer can tie-break deterministically.

use crate::errors::StrategyError;
use crate::mesh::DeviceMesh;
use crate::placement::{DTensorSpec, Placement, ReduceOp};
use crate::redistribute::estimate_redistribute_costs;
use crate::schema::{DimsArg, OpId, OpSchema, SchemaArg};
use crate::strategy::{OpStrategy, PlacementStrategy};

/// Normalizes a reduction-dims argument into explicit, non-negative dimension indices.
///
/// Returns `Ok(None)` — meaning "reduce over all dimensions" — when the argument is absent, or when the tensor is
/// rank-0 and the argument is one of the trivial list selections `[0]`, `[-1]`, `[]`. Only the literal list forms
/// collapse; a bare integer dimension does not, and on a rank-0 tensor it falls through to the range check below
/// like any other explicit dimension.
///
/// Negative dimensions index from the end. Dimensions that remain out of range after normalization are rejected with
/// [`StrategyError::InvalidReductionDim`].
pub fn normalize_reduction_dims(
    dims_arg: Option<&DimsArg>,
    rank: usize,
) -> Result<Option<Vec<usize>>, StrategyError> {
    let Some(dims_arg) = dims_arg else {
        return Ok(None);
    };

    if rank == 0 {
        let trivial = matches!(dims_arg, DimsArg::Dims(dims) if dims.is_empty() || dims == &[0] || dims == &[-1]);
        if trivial {
            return Ok(None);
        }
    }

    let dims = match dims_arg {
        DimsArg::Dim(dim) => std::slice::from_ref(dim),
        DimsArg::Dims(dims) => dims.as_slice(),
    };

    let mut normalized = Vec::with_capacity(dims.len());
    for &dim in dims {
        let adjusted = if dim < 0 { dim + rank as i64 } else { dim };
        if adjusted < 0 || adjusted >= rank as i64 {
            return Err(StrategyError::InvalidReductionDim { dim, rank });
        }
        normalized.push(adjusted as usize);
    }
    Ok(Some(normalized))
}

/// Maps each input dimension to its index in the reduction output, or `None` when the dimension is reduced away.
///
/// Retained dimensions are numbered sequentially; reduced dimensions do not advance the counter. With `keep_dim`,
/// every dimension slot persists (reduced ones with size 1), so every dimension keeps an output index — but a kept
/// reduced dimension no longer carries distinguishable shard data, which
/// [`map_placements_after_reduction`] accounts for separately.
pub fn reduction_dims_map(reduce_dims: &[usize], input_rank: usize, keep_dim: bool) -> Vec<Option<usize>> {
    let mut map = Vec::with_capacity(input_rank);
    let mut new_dim_count = 0;
    for input_dim in 0..input_rank {
        if reduce_dims.contains(&input_dim) && !keep_dim {
            map.push(None);
        } else {
            map.push(Some(new_dim_count));
            new_dim_count += 1;
        }
    }
    map
}

/// Clears placements that a non-linear reduction cannot compute through: pending partials, and shards on any of the
/// reduction dimensions, both become [`Placement::Replicate`].
pub(crate) fn replicate_reduction_dims(placements: &[Placement], reduce_dims: &[usize]) -> Vec<Placement> {
    placements
        .iter()
        .map(|placement| match placement {
            Placement::Partial(_) => Placement::Replicate,
            Placement::Shard(dim) if reduce_dims.contains(dim) => Placement::Replicate,
            other => *other,
        })
        .collect()
}

/// Derives the output placement tuple from the effective input placements after reducing `reduce_dims`.
///
/// `Replicate` and `Partial` pass through. A `Shard(d)` whose dimension collapsed (`dims_map[d]` is `None`), or whose
/// dimension is among the reduction dims (the `keep_dim` case — the slot persists but holds only a local partial
/// result), becomes `Partial(reduction_op)`: the per-rank partial results must still be combined across the axis.
/// Any other shard moves to its post-reduction dimension index.
pub(crate) fn map_placements_after_reduction(
    placements: &[Placement],
    reduce_dims: &[usize],
    dims_map: &[Option<usize>],
    reduction_op: ReduceOp,
) -> Vec<Placement> {
    placements
        .iter()
        .map(|placement| match placement {
            Placement::Replicate | Placement::Partial(_) => *placement,
            Placement::Shard(dim) => match dims_map[*dim] {
                Some(new_dim) if !reduce_dims.contains(dim) => Placement::Shard(new_dim),
                _ => Placement::Partial(reduction_op),
            },
        })
        .collect()
}

/// Derives one output candidate per input candidate for a reduction over `reduce_dims`.
///
/// For each candidate of `input_strategy`, in order:
///
///   1. Determine the effective input placements — the candidate's own placements when the reduction is linear,
///      otherwise [`replicate_reduction_dims`] clears pending partials and shards on reduced dimensions first.
///   2. Build the required input spec from the effective placements and the candidate's tensor metadata.
///   3. Derive the output placements via [`reduction_dims_map`] and [`map_placements_after_reduction`].
///   4. Price redistributing every input candidate into the required input spec.
///
/// The result has exactly as many candidates as the input strategy, mirroring its order.
pub fn common_reduction_strategy(
    mesh: &DeviceMesh,
    input_strategy: &OpStrategy,
    reduce_dims: &[usize],
    keep_dim: bool,
    reduction_linear: bool,
    reduction_op: ReduceOp,
) -> Result<OpStrategy, StrategyError> {
    let mut strategies = Vec::with_capacity(input_strategy.len());
    for candidate in input_strategy.strategies() {
        let input_placements = if reduction_linear {
            candidate.output_spec().placements().to_vec()
        } else {
            replicate_reduction_dims(candidate.output_spec().placements(), reduce_dims)
        };

        let input_spec =
            DTensorSpec::new(mesh.clone(), input_placements, candidate.output_spec().tensor_meta().cloned())?;

        let dims_map = reduction_dims_map(reduce_dims, input_spec.rank(), keep_dim);
        let output_placements =
            map_placements_after_reduction(input_spec.placements(), reduce_dims, &dims_map, reduction_op);
        let output_spec = DTensorSpec::new(mesh.clone(), output_placements, None)?;

        let redistribute_cost = vec![estimate_redistribute_costs(input_strategy, &input_spec)];
        strategies.push(PlacementStrategy::with_costs(output_spec, vec![input_spec], redistribute_cost));
    }
    Ok(OpStrategy::new(strategies))
}

fn linear_reduce_op(op: OpId) -> Result<ReduceOp, StrategyError> {
    match op {
        OpId::Sum | OpId::All => Ok(ReduceOp::Sum),
        OpId::Mean => Ok(ReduceOp::Avg),
        OpId::Prod => Ok(ReduceOp::Product),
        OpId::Max => Ok(ReduceOp::Max),
        OpId::Min => Ok(ReduceOp::Min),
        other => Err(StrategyError::InvalidArgument {
            op: other,
            message: "not a linear reduction operation".to_string(),
        }),
    }
}

fn keep_dim_arg(op_schema: &OpSchema, index: usize) -> Result<bool, StrategyError> {
    match op_schema.args().get(index) {
        None | Some(SchemaArg::None) => Ok(false),
        _ => op_schema.bool_arg(index),
    }
}

/// Strategy function for the linear reductions (sum, mean, prod, max, min, all).
///
/// Argument schema: `(input, dims?, keep_dim?)` — dims default to all input dimensions, `keep_dim` to `false`.
pub fn linear_reduction_strategy(mesh: &DeviceMesh, op_schema: &OpSchema) -> Result<OpStrategy, StrategyError> {
    let input_strategy = op_schema.strategy_arg(0)?;
    let dims = normalize_reduction_dims(op_schema.dims_arg(1)?, input_strategy.output_ndim())?;
    let reduce_dims = dims.unwrap_or_else(|| (0..input_strategy.output_ndim()).collect());
    let keep_dim = keep_dim_arg(op_schema, 2)?;
    let reduction_op = linear_reduce_op(op_schema.op())?;
    common_reduction_strategy(mesh, input_strategy, &reduce_dims, keep_dim, true, reduction_op)
}

/// Strategy function for variance.
///
/// Variance does not distribute over partial results, so the non-linear path is mandatory: pending partials and
/// shards on reduced dimensions are replicated before the reduction. The reduce op passed through to placement
/// mapping can never surface in the output. `keep_dim` arrives as the `keepdim` keyword argument.
pub fn var_reduction_strategy(mesh: &DeviceMesh, op_schema: &OpSchema) -> Result<OpStrategy, StrategyError> {
    let input_strategy = op_schema.strategy_arg(0)?;
    let dims = normalize_reduction_dims(op_schema.dims_arg(1)?, input_strategy.output_ndim())?;
    let reduce_dims = dims.unwrap_or_else(|| (0..input_strategy.output_ndim()).collect());
    let keep_dim = op_schema.bool_kwarg("keepdim")?.unwrap_or(false);
    common_reduction_strategy(mesh, input_strategy, &reduce_dims, keep_dim, false, ReduceOp::Sum)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
