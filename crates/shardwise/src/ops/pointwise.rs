//! Generic elementwise placement propagation.
//!
//! Elementwise operations neither move nor reduce data, so placement propagation is free: where all tensor inputs
//! already agree on a mesh axis the placement passes through, and where they disagree the axis falls back to
//! [`Placement::Replicate`]. No redistribution cost is computed — elementwise placement propagation is lossless when
//! placements agree, and disagreement is resolved by the most conservative placement rather than priced.

use crate::errors::StrategyError;
use crate::placement::{DTensorSpec, Placement};
use crate::schema::{OpSchema, SchemaArg};
use crate::strategy::OutputSharding;

/// Unifies the tensor-spec arguments of `op_schema` into one broadcast-compatible output spec.
///
/// Non-tensor arguments (dimension indices, flags) are ignored. All tensor arguments must live on the same mesh and
/// have the same rank; the output carries the first argument's tensor metadata.
pub fn pointwise_rule(op_schema: &OpSchema) -> Result<OutputSharding, StrategyError> {
    let specs: Vec<&DTensorSpec> = op_schema
        .args()
        .iter()
        .filter_map(|arg| match arg {
            SchemaArg::Spec(spec) => Some(spec),
            _ => None,
        })
        .collect();

    let Some((first, rest)) = specs.split_first() else {
        return Err(StrategyError::InvalidArgument {
            op: op_schema.op(),
            message: "elementwise propagation requires at least one tensor argument".to_string(),
        });
    };

    for spec in rest {
        if spec.mesh() != first.mesh() {
            return Err(StrategyError::InvalidArgument {
                op: op_schema.op(),
                message: "elementwise propagation requires all tensors on the same mesh".to_string(),
            });
        }
        if spec.rank() != first.rank() {
            return Err(StrategyError::RankMismatch { expected: first.rank(), actual: spec.rank() });
        }
    }

    let placements = (0..first.mesh().ndim())
        .map(|axis| {
            let placement = first.placements()[axis];
            let agree = rest.iter().all(|spec| spec.placements()[axis] == placement);
            if agree { placement } else { Placement::Replicate }
        })
        .collect();

    let output_spec = DTensorSpec::new(first.mesh().clone(), placements, first.tensor_meta().cloned())?;
    Ok(OutputSharding::new(output_spec))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{DeviceMesh, MeshAxis};
    use crate::schema::OpId;
    use crate::types::{DataType, TensorMeta};

    fn test_mesh_2d() -> DeviceMesh {
        DeviceMesh::new(vec![MeshAxis::new("dp", 2).unwrap(), MeshAxis::new("tp", 2).unwrap()]).unwrap()
    }

    fn spec(mesh: &DeviceMesh, placements: Vec<Placement>) -> DTensorSpec {
        let meta = TensorMeta::contiguous(vec![4, 8], DataType::Float32);
        DTensorSpec::new(mesh.clone(), placements, Some(meta)).unwrap()
    }

    #[test]
    fn test_agreeing_placements_pass_through() {
        let mesh = test_mesh_2d();
        let a = spec(&mesh, vec![Placement::Shard(0), Placement::Replicate]);
        let b = spec(&mesh, vec![Placement::Shard(0), Placement::Replicate]);
        let schema = OpSchema::new(OpId::SoftmaxBackward, vec![SchemaArg::Spec(a), SchemaArg::Spec(b)]);

        let sharding = pointwise_rule(&schema).unwrap();
        assert_eq!(
            sharding.output_spec().unwrap().placements(),
            &[Placement::Shard(0), Placement::Replicate],
        );
    }

    #[test]
    fn test_disagreeing_placements_replicate() {
        let mesh = test_mesh_2d();
        let a = spec(&mesh, vec![Placement::Shard(0), Placement::Replicate]);
        let b = spec(&mesh, vec![Placement::Shard(1), Placement::Replicate]);
        let schema = OpSchema::new(OpId::SoftmaxBackward, vec![SchemaArg::Spec(a), SchemaArg::Spec(b)]);

        let sharding = pointwise_rule(&schema).unwrap();
        assert_eq!(
            sharding.output_spec().unwrap().placements(),
            &[Placement::Replicate, Placement::Replicate],
        );
    }

    #[test]
    fn test_non_tensor_arguments_are_ignored() {
        let mesh = test_mesh_2d();
        let a = spec(&mesh, vec![Placement::Replicate, Placement::Shard(1)]);
        let schema = OpSchema::new(OpId::Softmax, vec![SchemaArg::Spec(a), SchemaArg::Int(1), SchemaArg::Bool(false)]);

        let sharding = pointwise_rule(&schema).unwrap();
        assert_eq!(sharding.output_spec().unwrap().placements(), &[Placement::Replicate, Placement::Shard(1)]);
    }

    #[test]
    fn test_rank_mismatch_is_rejected() {
        let mesh = test_mesh_2d();
        let a = spec(&mesh, vec![Placement::Replicate, Placement::Replicate]);
        let meta_3d = TensorMeta::contiguous(vec![4, 8, 2], DataType::Float32);
        let b = DTensorSpec::new(mesh.clone(), vec![Placement::Replicate, Placement::Replicate], Some(meta_3d)).unwrap();
        let schema = OpSchema::new(OpId::SoftmaxBackward, vec![SchemaArg::Spec(a), SchemaArg::Spec(b)]);

        assert!(matches!(pointwise_rule(&schema), Err(StrategyError::RankMismatch { expected: 2, actual: 3 })));
    }

    #[test]
    fn test_no_tensor_arguments_is_rejected() {
        let schema = OpSchema::new(OpId::Softmax, vec![SchemaArg::Int(0)]);
        assert!(matches!(pointwise_rule(&schema), Err(StrategyError::InvalidArgument { op: OpId::Softmax, .. })));
    }
}
