//! Sharding-strategy propagation for distributed tensors.
//!
//! Given an operation over tensors that are sharded, replicated, or partially reduced across a logical
//! [`DeviceMesh`], this crate decides which output shardings are valid, which input redistributions each one
//! requires, and what those redistributions cost — the decision logic only; running collectives and kernels is the
//! tensor runtime's concern. The placement model follows
//! [PyTorch's DTensor](https://docs.pytorch.org/docs/stable/distributed.tensor.html).
//!
//! Everything here is pure and synchronous: each dispatch consumes an immutable [`OpSchema`] and returns a freshly
//! built result, so a built [`StrategyRegistry`] can be shared across threads freely.

pub mod errors;
pub mod mesh;
pub mod ops;
pub mod placement;
pub mod redistribute;
pub mod registry;
pub mod schema;
pub mod strategy;
pub mod types;

pub use errors::StrategyError;
pub use mesh::{DeviceMesh, MeshAxis, MeshError};
pub use placement::{DTensorSpec, Placement, ReduceOp};
pub use redistribute::{estimate_redistribute_costs, redistribute_cost};
pub use registry::{StrategyRegistry, StrategyRegistryBuilder, default_registry};
pub use schema::{DimsArg, KwargValue, OpId, OpSchema, RuntimeSchemaInfo, SchemaArg};
pub use strategy::{OpStrategy, OutputSharding, PlacementStrategy};
pub use types::{DataType, TensorMeta};
