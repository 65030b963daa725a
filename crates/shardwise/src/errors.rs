//! Error types for strategy propagation.

use thiserror::Error;

use crate::schema::OpId;

/// Represents errors that can occur while deriving sharding strategies or propagation rules.
///
/// Every propagation function either returns a complete, valid result or fails atomically with one of these errors;
/// nothing mutates external state on the way out.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum StrategyError {
    /// Error returned when a rule requires a dimension to be fully materialized but found it sharded. There is no
    /// automatic redistribution recovery for this class — the op cannot execute correctly under the requested
    /// sharding and the failure is surfaced directly to the caller.
    #[error("cannot run {op} along sharded dimension {dim}")]
    IllegalShardedDimension { op: OpId, dim: usize },

    /// Error returned when an operation's argument schema does not have the expected shape (missing argument, or an
    /// argument of an unexpected kind).
    #[error("invalid argument schema for {op}: {message}")]
    InvalidArgument { op: OpId, message: String },

    /// Error returned when a reduction dimension is out of range for the input rank after normalization.
    #[error("reduction dimension {dim} is out of range for rank {rank}")]
    InvalidReductionDim { dim: i64, rank: usize },

    /// Error returned when a placement tuple does not have exactly one entry per mesh dimension.
    #[error("placement tuple has {placements} entries but the mesh has {mesh_ndim} dimension(s)")]
    PlacementCountMismatch { placements: usize, mesh_ndim: usize },

    /// Error returned when elementwise propagation receives tensor specs of differing rank.
    #[error("elementwise propagation requires equal ranks; got {actual} but expected {expected}")]
    RankMismatch { expected: usize, actual: usize },

    /// Error returned when dispatching an operation with no registered strategy or propagation rule.
    #[error("no strategy registered for {op}")]
    UnregisteredOp { op: OpId },

    /// Error returned when the registry builder sees two registrations for the same operation.
    #[error("duplicate registration for {op}")]
    DuplicateRegistration { op: OpId },
}
