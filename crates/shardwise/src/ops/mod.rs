//! Operator-specific strategy functions and propagation rules.
//!
//! The [`reduction`] module derives candidate strategies for reductions (the linear sum/mean/prod/max/min/all family
//! and the non-linear variance). The [`softmax`] module holds single-solution propagation rules for the softmax
//! family, which reject shardings along the normalized dimension, and [`pointwise`] provides the generic elementwise
//! propagation they fall through to.

pub mod pointwise;
pub mod reduction;
pub mod softmax;
