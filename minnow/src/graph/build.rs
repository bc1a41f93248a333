// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::address::{parse_spec, Address};
use crate::errors::Error;
use crate::evaluator::BuildFileEvaluator;
use crate::graph::BuildGraph;
use std::collections::HashSet;
use tracing::debug;

/// Drives the evaluator on demand and injects targets into a [`BuildGraph`]
/// in post-order.
///
/// The builder is immune to cycles between BUILD files or individual
/// targets, but it is also incapable of detecting them: a revisited address
/// simply terminates that branch of the traversal.
#[derive(Debug)]
pub struct GraphBuilder<'e> {
    evaluator: &'e mut BuildFileEvaluator,
}

impl<'e> GraphBuilder<'e> {
    /// Creates a builder that parses BUILD files through the given
    /// evaluator.
    pub fn new(evaluator: &'e mut BuildFileEvaluator) -> Self {
        Self { evaluator }
    }

    /// Ensures every BUILD file in the dependency closure of `address` has
    /// been evaluated, without materializing any targets.
    pub fn populate_transitive_closure(&mut self, address: &Address) -> Result<(), Error> {
        let mut visited = HashSet::new();
        self.populate(address, &mut visited)
    }

    fn populate(&mut self, address: &Address, visited: &mut HashSet<Address>) -> Result<(), Error> {
        if visited.contains(address) {
            return Ok(());
        }
        self.evaluator.parse_build_file_family(address.spec_path())?;
        let proxy = self.evaluator.proxy(address).ok_or_else(|| {
            Error::Resolution(format!(
                "'{}' was not found in the BUILD files of '{}'",
                address,
                address.spec_path(),
            ))
        })?;
        visited.insert(address.clone());

        let dependencies = proxy.dependency_addresses()?.to_vec();
        for dependency in &dependencies {
            self.populate(dependency, visited)?;
        }
        Ok(())
    }

    /// Resolves `spec` and ensures the target it names, along with its
    /// entire transitive dependency closure, exists in `graph`.
    ///
    /// Injection is post-order: dependencies enter the graph strictly before
    /// their dependents. Re-running injection for the same spec is
    /// idempotent.
    pub fn inject_spec_closure(&mut self, spec: &str, graph: &mut BuildGraph) -> Result<(), Error> {
        let (spec_path, name) = parse_spec(spec, None)?;
        let address = Address::build_file(&spec_path, &name);
        self.inject_address_closure(&address, graph)
    }

    /// Like [`inject_spec_closure`], for an already-resolved address.
    ///
    /// [`inject_spec_closure`]: Self::inject_spec_closure
    pub fn inject_address_closure(
        &mut self,
        address: &Address,
        graph: &mut BuildGraph,
    ) -> Result<(), Error> {
        let mut visited = HashSet::new();
        self.inject(address, graph, &mut visited)
    }

    fn inject(
        &mut self,
        address: &Address,
        graph: &mut BuildGraph,
        visited: &mut HashSet<Address>,
    ) -> Result<(), Error> {
        self.evaluator.parse_build_file_family(address.spec_path())?;
        let proxy = self.evaluator.proxy(address).ok_or_else(|| {
            Error::Resolution(format!(
                "'{}' was not found in the BUILD files of '{}'",
                address,
                address.spec_path(),
            ))
        })?;

        if graph.contains_address(address) || visited.contains(address) {
            return Ok(());
        }
        // Marking before recursing is what makes the traversal terminate in
        // the presence of declaration-level cycles.
        visited.insert(address.clone());

        let dependencies = proxy.dependency_addresses()?.to_vec();
        for dependency in &dependencies {
            self.inject(dependency, graph, visited)?;
        }

        let target = proxy.to_target(graph)?;
        let traversable_specs = target.traversable_specs().to_vec();
        debug!(address = %address, "injecting target");
        graph.inject_target(target)?;

        for spec in &traversable_specs {
            let (spec_path, name) = parse_spec(spec, Some(address.spec_path()))?;
            let traversable = Address::build_file(&spec_path, &name);
            self.inject(&traversable, graph, visited)?;
        }
        Ok(())
    }
}
