//! Strategy result types: candidate placements for an operation's inputs and outputs.
//!
//! A strategy function answers "in which ways could this operation's result legally be sharded, and what would each
//! way require of the inputs?". The answer is an [`OpStrategy`]: an ordered list of [`PlacementStrategy`] candidates,
//! each pairing an output spec with the input specs it requires and the cost of redistributing each currently
//! available input strategy into them. Single-solution propagation rules return the simpler [`OutputSharding`]
//! instead.

use std::fmt::Display;

use crate::placement::DTensorSpec;

/// One candidate strategy: an output spec, the input specs required for it to apply, and the redistribution costs of
/// reaching those input specs from each currently available input strategy.
///
/// Immutable after construction and owned exclusively by the [`OpStrategy`] holding it. `redistribute_cost` holds one
/// inner cost sequence per operation input; each inner sequence has one entry per candidate strategy of that input,
/// in the input strategy's order, for consumption by an external plan optimizer.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementStrategy {
    output_spec: DTensorSpec,
    input_specs: Option<Vec<DTensorSpec>>,
    redistribute_cost: Option<Vec<Vec<f64>>>,
}

impl PlacementStrategy {
    /// Creates a candidate that constrains only the output placement.
    pub fn from_output_spec(output_spec: DTensorSpec) -> Self {
        Self { output_spec, input_specs: None, redistribute_cost: None }
    }

    /// Creates a candidate with required input specs and their redistribution costs.
    pub fn with_costs(
        output_spec: DTensorSpec,
        input_specs: Vec<DTensorSpec>,
        redistribute_cost: Vec<Vec<f64>>,
    ) -> Self {
        Self { output_spec, input_specs: Some(input_specs), redistribute_cost: Some(redistribute_cost) }
    }

    /// The output spec this candidate produces.
    pub fn output_spec(&self) -> &DTensorSpec {
        &self.output_spec
    }

    /// The input specs this candidate requires, when it constrains its inputs.
    pub fn input_specs(&self) -> Option<&[DTensorSpec]> {
        self.input_specs.as_deref()
    }

    /// Per-input redistribution cost sequences, when computed.
    pub fn redistribute_cost(&self) -> Option<&[Vec<f64>]> {
        self.redistribute_cost.as_deref()
    }
}

impl Display for PlacementStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.input_specs.as_deref() {
            Some(input_specs) => {
                for (index, input_spec) in input_specs.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{input_spec}")?;
                }
                write!(f, " -> {}", self.output_spec)
            }
            None => write!(f, "{}", self.output_spec),
        }
    }
}

/// An ordered sequence of candidate strategies for one operation argument or result.
///
/// Represents the set of ways the tensor could legally be sharded, not a single choice. Order is significant: earlier
/// candidates are preferred by the external optimizer when costs tie.
#[derive(Clone, Debug, PartialEq)]
pub struct OpStrategy {
    strategies: Vec<PlacementStrategy>,
}

impl OpStrategy {
    /// Creates a strategy set from an ordered candidate list.
    pub fn new(strategies: Vec<PlacementStrategy>) -> Self {
        Self { strategies }
    }

    /// The ordered candidate list.
    pub fn strategies(&self) -> &[PlacementStrategy] {
        self.strategies.as_slice()
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns `true` iff there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Rank of the tensor this strategy set describes.
    ///
    /// All candidates describe the same logical tensor, so the first candidate's output rank is authoritative.
    /// Invariant: the candidate list is non-empty whenever this is queried.
    pub fn output_ndim(&self) -> usize {
        self.strategies[0].output_spec().rank()
    }
}

impl Display for OpStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (index, strategy) in self.strategies.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{strategy}")?;
        }
        write!(f, "]")
    }
}

/// Result of a single-solution propagation rule: the output spec, or `None` to signal that the sharding must be
/// recomputed by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSharding {
    output_spec: Option<DTensorSpec>,
}

impl OutputSharding {
    /// Creates a result with a known output spec.
    pub fn new(output_spec: DTensorSpec) -> Self {
        Self { output_spec: Some(output_spec) }
    }

    /// Creates a result signalling that the output sharding must be recomputed.
    pub fn recompute() -> Self {
        Self { output_spec: None }
    }

    /// The resulting output spec, when known.
    pub fn output_spec(&self) -> Option<&DTensorSpec> {
        self.output_spec.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
