// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evaluate BUILD files into a fingerprinted, dependency-resolved target
//! graph.
//!
//! `minnow` is the core of a polyglot monorepo build system: it interprets
//! declarative BUILD files, resolves symbolic target references
//! ("specs") into canonical addresses, assembles the directed dependency
//! graph of build targets, and decides -- per target -- whether cached output
//! from a prior run may be reused.
//!
//! `minnow` does not compile or package anything itself. It exposes the
//! target graph and the invalidation primitives; tasks that produce
//! artifacts consume them.
//!
//! # Examples
//!
//! Evaluate a build root and inject a target's closure into a graph:
//!
//! ```no_run
//! use minnow::{AliasRegistry, BuildFileEvaluator, BuildGraph, GraphBuilder};
//!
//! # fn main() -> Result<(), minnow::Error> {
//! let registry = AliasRegistry::standard("/repo");
//! let mut evaluator = BuildFileEvaluator::new("/repo", registry);
//! let mut graph = BuildGraph::new();
//!
//! let mut builder = GraphBuilder::new(&mut evaluator);
//! builder.inject_spec_closure("src/java/com/example/foo:foo", &mut graph)?;
//!
//! for target in graph.targets() {
//!     // Dependencies are always injected before their dependents.
//!     println!("{} ({})", target.address(), target.kind());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod address;
mod build_file;
mod cache;
mod config;
pub mod dsl;
mod evaluator;
pub mod errors;
mod filesets;
mod fingerprint;
pub mod graph;
mod invalidator;
mod payload;
mod registry;
mod sorted_vec;
mod target;
#[cfg(test)]
mod unit_tests;

pub use address::{parse_spec, Address, AddressKind};
pub use build_file::{BuildFile, BUILD_FILE_NAME};
pub use cache::{ArtifactCache, CachedArtifact, LocalArtifactCache};
pub use config::CacheConfig;
pub use errors::Error;
pub use evaluator::BuildFileEvaluator;
pub use fingerprint::{combine_cache_keys, CacheKey, CacheKeyGenerator, GENERATOR_VERSION};
pub use graph::{BuildGraph, GraphBuilder};
pub use invalidator::BuildInvalidator;
pub use payload::{FieldValue, Payload};
pub use registry::{AliasRegistry, ApplicativeUtil, PartialUtil};
pub use target::{Target, TargetKind, TargetProxy};

// Public re-exports for upstream crates used in APIs. The no_inline ensures
// that they show up as re-exports in documentation.
#[doc(no_inline)]
pub use camino::{Utf8Path, Utf8PathBuf};
