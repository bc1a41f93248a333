// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The build graph and its constructor.
//!
//! [`BuildGraph`] stores materialized targets and the dependency edges
//! between them. [`GraphBuilder`] drives the BUILD-file evaluator on demand
//! and injects targets in post-order: dependencies strictly before their
//! dependents.

use petgraph::graph::IndexType;
use std::fmt;

mod build;
mod graph_impl;

pub use build::*;
pub use graph_impl::*;

/// Index for BuildGraph. Used for newtype wrapping.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct TargetIx(u32);

impl fmt::Display for TargetIx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// From the docs for `IndexType`:
//
// > Marked `unsafe` because: the trait must faithfully preserve and convert
// > index values.
unsafe impl IndexType for TargetIx {
    #[inline(always)]
    fn new(x: usize) -> Self {
        TargetIx(x as u32)
    }
    #[inline(always)]
    fn index(&self) -> usize {
        self.0 as usize
    }
    #[inline(always)]
    fn max() -> Self {
        TargetIx(u32::MAX)
    }
}
