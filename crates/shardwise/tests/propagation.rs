//! End-to-end propagation scenarios through the default registry.

use shardwise::{
    DTensorSpec, DataType, DeviceMesh, DimsArg, MeshAxis, OpId, OpSchema, OpStrategy, Placement, PlacementStrategy,
    ReduceOp, SchemaArg, StrategyError, TensorMeta, default_registry,
};

fn mesh_2d() -> DeviceMesh {
    DeviceMesh::new(vec![MeshAxis::new("dp", 2).unwrap(), MeshAxis::new("tp", 4).unwrap()]).unwrap()
}

fn rank2_strategy(mesh: &DeviceMesh, placements: Vec<Placement>) -> OpStrategy {
    let meta = TensorMeta::contiguous(vec![16, 32], DataType::Float32);
    let spec = DTensorSpec::new(mesh.clone(), placements, Some(meta)).unwrap();
    OpStrategy::new(vec![PlacementStrategy::from_output_spec(spec)])
}

#[test]
fn sum_over_sharded_dim_yields_partial() {
    let registry = default_registry();
    let mesh = mesh_2d();
    let input = rank2_strategy(&mesh, vec![Placement::Shard(0), Placement::Replicate]);
    let schema = OpSchema::new(
        OpId::Sum,
        vec![SchemaArg::Strategy(input), SchemaArg::Dims(DimsArg::Dims(vec![0])), SchemaArg::Bool(false)],
    );

    let strategy = registry.op_strategy(&mesh, &schema).unwrap();
    assert_eq!(strategy.len(), 1);
    let candidate = &strategy.strategies()[0];
    assert_eq!(candidate.output_spec().placements(), &[Placement::Partial(ReduceOp::Sum), Placement::Replicate]);
    assert_eq!(candidate.input_specs().unwrap()[0].placements(), &[Placement::Shard(0), Placement::Replicate]);
    assert_eq!(candidate.redistribute_cost().unwrap(), &[vec![0.0]]);
}

#[test]
fn sum_over_other_dim_keeps_shard_in_place() {
    let registry = default_registry();
    let mesh = mesh_2d();
    let input = rank2_strategy(&mesh, vec![Placement::Shard(0), Placement::Replicate]);
    let schema = OpSchema::new(
        OpId::Sum,
        vec![SchemaArg::Strategy(input), SchemaArg::Dims(DimsArg::Dims(vec![1])), SchemaArg::Bool(false)],
    );

    let strategy = registry.op_strategy(&mesh, &schema).unwrap();
    // The reduction dims map is [Some(0), None]: dim 0 is untouched and no earlier dim collapsed.
    assert_eq!(
        strategy.strategies()[0].output_spec().placements(),
        &[Placement::Shard(0), Placement::Replicate],
    );
}

#[test]
fn var_replicates_what_it_cannot_compute_through() {
    let registry = default_registry();
    let mesh = mesh_2d();
    let input = rank2_strategy(&mesh, vec![Placement::Shard(0), Placement::Partial(ReduceOp::Sum)]);
    let schema = OpSchema::new(OpId::Var, vec![SchemaArg::Strategy(input), SchemaArg::Dims(DimsArg::Dims(vec![0]))]);

    let strategy = registry.op_strategy(&mesh, &schema).unwrap();
    let candidate = &strategy.strategies()[0];
    assert_eq!(candidate.input_specs().unwrap()[0].placements(), &[Placement::Replicate, Placement::Replicate]);
    assert_eq!(candidate.output_spec().placements(), &[Placement::Replicate, Placement::Replicate]);
    assert!(candidate.redistribute_cost().unwrap()[0][0] > 0.0);
}

#[test]
fn softmax_rejects_sharded_softmax_dim() {
    let registry = default_registry();
    let mesh = mesh_2d();
    let meta = TensorMeta::contiguous(vec![16, 32], DataType::Float32);
    let input = DTensorSpec::new(mesh, vec![Placement::Shard(1), Placement::Replicate], Some(meta)).unwrap();
    let schema = OpSchema::new(OpId::Softmax, vec![SchemaArg::Spec(input), SchemaArg::Int(1)]);

    assert!(matches!(
        registry.prop_rule(&schema),
        Err(StrategyError::IllegalShardedDimension { op: OpId::Softmax, dim: 1 }),
    ));
}

#[test]
fn softmax_passes_off_axis_sharding_through() {
    let registry = default_registry();
    let mesh = mesh_2d();
    let meta = TensorMeta::contiguous(vec![16, 32], DataType::Float32);
    let input = DTensorSpec::new(mesh, vec![Placement::Shard(0), Placement::Replicate], Some(meta)).unwrap();
    let schema = OpSchema::new(OpId::Softmax, vec![SchemaArg::Spec(input.clone()), SchemaArg::Int(1)]);

    let sharding = registry.prop_rule(&schema).unwrap();
    assert_eq!(sharding.output_spec(), Some(&input));
}

#[test]
fn dispatch_is_deterministic() {
    let registry = default_registry();
    let mesh = mesh_2d();
    let schema = OpSchema::new(
        OpId::Mean,
        vec![
            SchemaArg::Strategy(rank2_strategy(&mesh, vec![Placement::Shard(1), Placement::Shard(0)])),
            SchemaArg::Dims(DimsArg::Dim(-1)),
            SchemaArg::Bool(true),
        ],
    );

    let first = registry.op_strategy(&mesh, &schema).unwrap();
    let second = registry.op_strategy(&mesh, &schema).unwrap();
    assert_eq!(first, second);
    // keepdim keeps the rank, and the reduced dim's shard resolves to a pending average.
    assert_eq!(
        first.strategies()[0].output_spec().placements(),
        &[Placement::Partial(ReduceOp::Avg), Placement::Shard(0)],
    );
}
