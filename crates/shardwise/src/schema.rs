//! Operation schemas: the read-only inputs to every strategy function and propagation rule.
//!
//! An [`OpSchema`] names the operation being dispatched and carries its heterogeneous argument list — distributed
//! tensor arguments (as [`OpStrategy`] candidate sets or concrete [`DTensorSpec`]s) mixed with plain scalars such as
//! reduction dimensions and `keepdim` flags. Typed accessors replace downcasting: a rule asks for the argument kind
//! it expects and gets a [`StrategyError::InvalidArgument`] when the schema does not match.

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::errors::StrategyError;
use crate::placement::DTensorSpec;
use crate::strategy::OpStrategy;

/// Identifiers of the operations this engine derives sharding strategies for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpId {
    Sum,
    Mean,
    Prod,
    Max,
    Min,
    All,
    Var,
    Softmax,
    LogSoftmax,
    SoftmaxBackward,
    LogSoftmaxBackward,
}

impl Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpId::Sum => write!(f, "sum"),
            OpId::Mean => write!(f, "mean"),
            OpId::Prod => write!(f, "prod"),
            OpId::Max => write!(f, "max"),
            OpId::Min => write!(f, "min"),
            OpId::All => write!(f, "all"),
            OpId::Var => write!(f, "var"),
            OpId::Softmax => write!(f, "softmax"),
            OpId::LogSoftmax => write!(f, "log_softmax"),
            OpId::SoftmaxBackward => write!(f, "softmax_backward"),
            OpId::LogSoftmaxBackward => write!(f, "log_softmax_backward"),
        }
    }
}

/// A reduction-dims argument as commonly passed: a single dimension or a dimension list.
///
/// Dimensions may be negative (indexing from the end); normalization happens in
/// [`normalize_reduction_dims`][crate::ops::reduction::normalize_reduction_dims].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DimsArg {
    Dim(i64),
    Dims(Vec<i64>),
}

/// One positional argument in an operation schema.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaArg {
    /// A distributed tensor argument described by its candidate strategy set.
    Strategy(OpStrategy),
    /// A distributed tensor argument pinned to one concrete spec.
    Spec(DTensorSpec),
    /// A reduction-dims argument.
    Dims(DimsArg),
    /// An explicitly absent optional argument.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// One keyword argument in an operation schema.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum KwargValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// The operation identity plus its argument schema; read-only input to every rule.
#[derive(Clone, Debug, PartialEq)]
pub struct OpSchema {
    op: OpId,
    args: Vec<SchemaArg>,
    kwargs: BTreeMap<String, KwargValue>,
}

impl OpSchema {
    /// Creates a schema with positional arguments only.
    pub fn new(op: OpId, args: Vec<SchemaArg>) -> Self {
        Self { op, args, kwargs: BTreeMap::new() }
    }

    /// Creates a schema with positional and keyword arguments.
    pub fn with_kwargs(op: OpId, args: Vec<SchemaArg>, kwargs: BTreeMap<String, KwargValue>) -> Self {
        Self { op, args, kwargs }
    }

    /// The operation being dispatched.
    pub fn op(&self) -> OpId {
        self.op
    }

    /// Positional arguments.
    pub fn args(&self) -> &[SchemaArg] {
        self.args.as_slice()
    }

    /// Keyword arguments.
    pub fn kwargs(&self) -> &BTreeMap<String, KwargValue> {
        &self.kwargs
    }

    /// Returns the strategy argument at `index`.
    pub fn strategy_arg(&self, index: usize) -> Result<&OpStrategy, StrategyError> {
        match self.args.get(index) {
            Some(SchemaArg::Strategy(strategy)) => Ok(strategy),
            other => Err(self.invalid_argument(index, "an op strategy", other)),
        }
    }

    /// Returns the tensor-spec argument at `index`.
    pub fn spec_arg(&self, index: usize) -> Result<&DTensorSpec, StrategyError> {
        match self.args.get(index) {
            Some(SchemaArg::Spec(spec)) => Ok(spec),
            other => Err(self.invalid_argument(index, "a tensor spec", other)),
        }
    }

    /// Returns the reduction-dims argument at `index`, treating a missing or explicitly absent argument as `None`.
    pub fn dims_arg(&self, index: usize) -> Result<Option<&DimsArg>, StrategyError> {
        match self.args.get(index) {
            Some(SchemaArg::Dims(dims)) => Ok(Some(dims)),
            Some(SchemaArg::None) | None => Ok(None),
            other => Err(self.invalid_argument(index, "a dims list", other)),
        }
    }

    /// Returns the boolean argument at `index`.
    pub fn bool_arg(&self, index: usize) -> Result<bool, StrategyError> {
        match self.args.get(index) {
            Some(SchemaArg::Bool(value)) => Ok(*value),
            other => Err(self.invalid_argument(index, "a boolean", other)),
        }
    }

    /// Returns the integer argument at `index`.
    pub fn int_arg(&self, index: usize) -> Result<i64, StrategyError> {
        match self.args.get(index) {
            Some(SchemaArg::Int(value)) => Ok(*value),
            other => Err(self.invalid_argument(index, "an integer", other)),
        }
    }

    /// Returns the boolean keyword argument `name`, if present.
    pub fn bool_kwarg(&self, name: &str) -> Result<Option<bool>, StrategyError> {
        match self.kwargs.get(name) {
            Some(KwargValue::Bool(value)) => Ok(Some(*value)),
            None => Ok(None),
            Some(other) => Err(StrategyError::InvalidArgument {
                op: self.op,
                message: format!("expected keyword argument '{name}' to be a boolean, got {other:?}"),
            }),
        }
    }

    fn invalid_argument(&self, index: usize, expected: &str, got: Option<&SchemaArg>) -> StrategyError {
        let message = match got {
            Some(arg) => format!("expected argument {index} to be {expected}, got {}", arg.kind_name()),
            None => format!("expected argument {index} to be {expected}, but only {} argument(s) given", self.args.len()),
        };
        StrategyError::InvalidArgument { op: self.op, message }
    }
}

impl SchemaArg {
    fn kind_name(&self) -> &'static str {
        match self {
            SchemaArg::Strategy(_) => "an op strategy",
            SchemaArg::Spec(_) => "a tensor spec",
            SchemaArg::Dims(_) => "a dims list",
            SchemaArg::None => "an absent argument",
            SchemaArg::Bool(_) => "a boolean",
            SchemaArg::Int(_) => "an integer",
            SchemaArg::Float(_) => "a float",
        }
    }
}

/// Registration metadata: how many leading positional arguments and which keyword arguments affect strategy
/// selection, as opposed to being pass-through for the runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeSchemaInfo {
    static_arg_count: usize,
    static_kwarg_names: Vec<&'static str>,
}

impl RuntimeSchemaInfo {
    /// Creates schema info with schema-relevant positional arguments only.
    pub fn new(static_arg_count: usize) -> Self {
        Self { static_arg_count, static_kwarg_names: Vec::new() }
    }

    /// Creates schema info with schema-relevant positional and keyword arguments.
    pub fn with_kwargs(static_arg_count: usize, static_kwarg_names: Vec<&'static str>) -> Self {
        Self { static_arg_count, static_kwarg_names }
    }

    /// Number of leading positional arguments that affect strategy selection.
    pub fn static_arg_count(&self) -> usize {
        self.static_arg_count
    }

    /// Keyword arguments that affect strategy selection.
    pub fn static_kwarg_names(&self) -> &[&'static str] {
        self.static_kwarg_names.as_slice()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
