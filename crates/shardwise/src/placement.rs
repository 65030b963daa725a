//! The placement algebra: how tensor dimensions map onto mesh dimensions.
//!
//! A tensor distributed over a [`DeviceMesh`] carries one [`Placement`] per mesh axis:
//!
//!   - [`Placement::Replicate`] — every rank along the axis holds a full copy.
//!   - [`Placement::Shard`] — the tensor is split along one logical dimension, one contiguous slice per rank.
//!   - [`Placement::Partial`] — every rank holds an un-reduced partial value that must be combined with the axis'
//!     [`ReduceOp`] before it can be treated as final.
//!
//! [`DTensorSpec`] bundles a mesh, a placement tuple, and optional [`TensorMeta`] into the full description of one
//! distributed tensor. The model follows
//! [PyTorch's DTensor placement types](https://docs.pytorch.org/docs/stable/distributed.tensor.html#placement-types),
//! expressed as a closed sum type so that every placement branch is checked exhaustively at compile time.

use std::fmt::Display;

use crate::errors::StrategyError;
use crate::mesh::DeviceMesh;
use crate::types::TensorMeta;

/// Reduction operators that a [`Placement::Partial`] value is pending.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Product,
    Avg,
    Max,
    Min,
}

impl Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceOp::Sum => write!(f, "sum"),
            ReduceOp::Product => write!(f, "product"),
            ReduceOp::Avg => write!(f, "avg"),
            ReduceOp::Max => write!(f, "max"),
            ReduceOp::Min => write!(f, "min"),
        }
    }
}

/// Placement of a tensor with respect to one mesh axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Full copy of the tensor on every rank along the axis.
    Replicate,

    /// Tensor split contiguously along the given logical tensor dimension, one slice per rank.
    Shard(usize),

    /// Un-reduced partial value; ranks along the axis must be combined with the given [`ReduceOp`] before the value
    /// is final.
    Partial(ReduceOp),
}

impl Placement {
    /// Returns `true` iff this placement is [`Placement::Replicate`].
    pub fn is_replicate(&self) -> bool {
        matches!(self, Placement::Replicate)
    }

    /// Returns `true` iff this placement shards any tensor dimension.
    pub fn is_shard(&self) -> bool {
        matches!(self, Placement::Shard(_))
    }

    /// Returns `true` iff this placement shards exactly the tensor dimension `dim`.
    pub fn is_shard_on(&self, dim: usize) -> bool {
        matches!(self, Placement::Shard(shard_dim) if *shard_dim == dim)
    }

    /// Returns `true` iff this placement is [`Placement::Partial`].
    pub fn is_partial(&self) -> bool {
        matches!(self, Placement::Partial(_))
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Replicate => write!(f, "R"),
            Placement::Shard(dim) => write!(f, "S({dim})"),
            Placement::Partial(reduce_op) => write!(f, "P({reduce_op})"),
        }
    }
}

/// Full distribution description of one tensor: a mesh, one placement per mesh axis, and optional tensor metadata.
///
/// Specs for operation inputs carry metadata; specs derived for operation outputs may omit it (the runtime fills in
/// output metadata after shape inference). A spec without metadata reports rank `0`.
#[derive(Clone, Debug, PartialEq)]
pub struct DTensorSpec {
    mesh: DeviceMesh,
    placements: Vec<Placement>,
    tensor_meta: Option<TensorMeta>,
}

impl DTensorSpec {
    /// Creates a spec, validating that there is exactly one placement per mesh dimension.
    pub fn new(
        mesh: DeviceMesh,
        placements: Vec<Placement>,
        tensor_meta: Option<TensorMeta>,
    ) -> Result<Self, StrategyError> {
        if placements.len() != mesh.ndim() {
            return Err(StrategyError::PlacementCountMismatch {
                placements: placements.len(),
                mesh_ndim: mesh.ndim(),
            });
        }
        Ok(Self { mesh, placements, tensor_meta })
    }

    /// The mesh this tensor is distributed over.
    pub fn mesh(&self) -> &DeviceMesh {
        &self.mesh
    }

    /// One placement per mesh axis, in mesh-axis order.
    pub fn placements(&self) -> &[Placement] {
        self.placements.as_slice()
    }

    /// Metadata of the global logical tensor, when known.
    pub fn tensor_meta(&self) -> Option<&TensorMeta> {
        self.tensor_meta.as_ref()
    }

    /// Rank of the logical tensor; `0` when no metadata is attached.
    pub fn rank(&self) -> usize {
        self.tensor_meta.as_ref().map_or(0, TensorMeta::rank)
    }

    /// Returns `true` iff any mesh axis holds a pending partial reduction.
    pub fn is_partial(&self) -> bool {
        self.placements.iter().any(Placement::is_partial)
    }

    /// Returns `true` iff every mesh axis replicates the tensor.
    pub fn is_replicated(&self) -> bool {
        self.placements.iter().all(Placement::is_replicate)
    }

    /// For each logical tensor dimension, the mesh axis sharding it (`None` when unsharded).
    ///
    /// Recomputed on demand — the map is a pure function of the placement tuple and the tensor rank and is never
    /// stored separately from its source.
    pub fn dim_map(&self) -> Vec<Option<usize>> {
        let mut map = vec![None; self.rank()];
        for (mesh_axis, placement) in self.placements.iter().enumerate() {
            if let Placement::Shard(dim) = placement {
                if *dim < map.len() {
                    map[*dim] = Some(mesh_axis);
                }
            }
        }
        map
    }
}

impl Display for DTensorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (axis, placement) in self.placements.iter().enumerate() {
            if axis > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{placement}")?;
        }
        write!(f, ")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
