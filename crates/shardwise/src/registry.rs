//! The strategy registry: an immutable-after-build table mapping operations to their strategy functions and
//! propagation rules.
//!
//! Registrations happen during an explicit startup phase through [`StrategyRegistryBuilder`]; the built
//! [`StrategyRegistry`] is read-only and is injected into whatever dispatches operations, rather than living as
//! ambient mutable state. The builder defers validation to [`build`][StrategyRegistryBuilder::build], which
//! guarantees all registrations are complete and conflict-free before the first dispatch. Dispatch takes `&self`
//! and is safe to call concurrently.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::StrategyError;
use crate::mesh::DeviceMesh;
use crate::ops::reduction::{linear_reduction_strategy, var_reduction_strategy};
use crate::ops::softmax::{softmax_backward_rule, softmax_rule};
use crate::schema::{OpId, OpSchema, RuntimeSchemaInfo};
use crate::strategy::{OpStrategy, OutputSharding};

/// A strategy function: derives the candidate output shardings of one operation.
pub type StrategyFn = fn(&DeviceMesh, &OpSchema) -> Result<OpStrategy, StrategyError>;

/// A propagation rule: derives the single output sharding of one operation.
pub type PropRuleFn = fn(&OpSchema) -> Result<OutputSharding, StrategyError>;

enum Registration {
    Strategy(StrategyFn),
    PropRule(PropRuleFn),
}

/// Collects registrations during startup; validation happens in [`build`][StrategyRegistryBuilder::build].
#[derive(Default)]
pub struct StrategyRegistryBuilder {
    entries: Vec<(OpId, RuntimeSchemaInfo, Registration)>,
}

impl StrategyRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `strategy` for each operation in `ops`.
    pub fn register_op_strategy(mut self, ops: &[OpId], schema_info: RuntimeSchemaInfo, strategy: StrategyFn) -> Self {
        for &op in ops {
            self.entries.push((op, schema_info.clone(), Registration::Strategy(strategy)));
        }
        self
    }

    /// Registers the propagation rule `rule` for each operation in `ops`.
    pub fn register_prop_rule(mut self, ops: &[OpId], schema_info: RuntimeSchemaInfo, rule: PropRuleFn) -> Self {
        for &op in ops {
            self.entries.push((op, schema_info.clone(), Registration::PropRule(rule)));
        }
        self
    }

    /// Builds the immutable registry, rejecting operations registered more than once (whether as a strategy, a
    /// propagation rule, or one of each).
    pub fn build(self) -> Result<StrategyRegistry, StrategyError> {
        let mut strategies = HashMap::new();
        let mut prop_rules = HashMap::new();
        for (op, schema_info, registration) in self.entries {
            if strategies.contains_key(&op) || prop_rules.contains_key(&op) {
                return Err(StrategyError::DuplicateRegistration { op });
            }
            match registration {
                Registration::Strategy(strategy) => {
                    strategies.insert(op, (schema_info, strategy));
                }
                Registration::PropRule(rule) => {
                    prop_rules.insert(op, (schema_info, rule));
                }
            }
        }
        Ok(StrategyRegistry { strategies, prop_rules })
    }
}

/// Immutable operation-to-handler table; the dispatch surface of the engine.
pub struct StrategyRegistry {
    strategies: HashMap<OpId, (RuntimeSchemaInfo, StrategyFn)>,
    prop_rules: HashMap<OpId, (RuntimeSchemaInfo, PropRuleFn)>,
}

impl StrategyRegistry {
    /// Derives the candidate strategies for `op_schema` via its registered strategy function.
    pub fn op_strategy(&self, mesh: &DeviceMesh, op_schema: &OpSchema) -> Result<OpStrategy, StrategyError> {
        let (_, strategy_fn) = self
            .strategies
            .get(&op_schema.op())
            .ok_or(StrategyError::UnregisteredOp { op: op_schema.op() })?;
        let strategy = strategy_fn(mesh, op_schema)?;
        debug!(op = %op_schema.op(), mesh = %mesh, candidates = strategy.len(), "derived op strategy");
        Ok(strategy)
    }

    /// Derives the output sharding for `op_schema` via its registered propagation rule.
    pub fn prop_rule(&self, op_schema: &OpSchema) -> Result<OutputSharding, StrategyError> {
        let (_, rule_fn) =
            self.prop_rules.get(&op_schema.op()).ok_or(StrategyError::UnregisteredOp { op: op_schema.op() })?;
        let sharding = rule_fn(op_schema)?;
        debug!(op = %op_schema.op(), recompute = sharding.output_spec().is_none(), "applied propagation rule");
        Ok(sharding)
    }

    /// Registration metadata for `op`, if registered.
    pub fn schema_info(&self, op: OpId) -> Option<&RuntimeSchemaInfo> {
        self.strategies.get(&op).map(|(info, _)| info).or_else(|| self.prop_rules.get(&op).map(|(info, _)| info))
    }

    /// Returns `true` iff `op` has a registered strategy function or propagation rule.
    pub fn is_registered(&self, op: OpId) -> bool {
        self.strategies.contains_key(&op) || self.prop_rules.contains_key(&op)
    }
}

/// Builds the registry with every operation this engine supports; the explicit startup phase.
pub fn default_registry() -> StrategyRegistry {
    StrategyRegistryBuilder::new()
        .register_op_strategy(
            &[OpId::Sum, OpId::Mean, OpId::Prod, OpId::Max, OpId::Min, OpId::All],
            RuntimeSchemaInfo::new(1),
            linear_reduction_strategy,
        )
        .register_op_strategy(&[OpId::Var], RuntimeSchemaInfo::with_kwargs(1, vec!["keepdim"]), var_reduction_strategy)
        .register_prop_rule(&[OpId::Softmax, OpId::LogSoftmax], RuntimeSchemaInfo::new(1), softmax_rule)
        .register_prop_rule(
            &[OpId::SoftmaxBackward, OpId::LogSoftmaxBackward],
            RuntimeSchemaInfo::new(2),
            softmax_backward_rule,
        )
        .build()
        .expect("default registrations are unique")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
