// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::address::Address;
use crate::errors::Error;
use crate::graph::TargetIx;
use crate::target::Target;
use petgraph::prelude::*;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::trace;

/// A graph of materialized targets and the dependency edges between them.
///
/// Nodes are keyed by [`Address`]. The graph is acyclic by convention: the
/// constructor injects dependencies strictly before their dependents, so
/// every edge points at a previously injected node. Declaration-level cycles
/// are silently collapsed during traversal (the offending edge is dropped);
/// the graph does not detect or report them.
#[derive(Clone, Debug)]
pub struct BuildGraph {
    dep_graph: Graph<Address, (), Directed, TargetIx>,
    targets: HashMap<Address, TargetData>,
    injection_order: Vec<Address>,
}

#[derive(Clone, Debug)]
struct TargetData {
    ix: NodeIndex<TargetIx>,
    target: Target,
}

impl BuildGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            dep_graph: Graph::with_capacity(0, 0),
            targets: HashMap::new(),
            injection_order: Vec::new(),
        }
    }

    /// Returns the number of targets in the graph.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if the graph contains no targets.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Returns true if a target has been injected at `address`.
    pub fn contains_address(&self, address: &Address) -> bool {
        self.targets.contains_key(address)
    }

    /// Returns the target at `address`, if present.
    pub fn target(&self, address: &Address) -> Option<&Target> {
        self.targets.get(address).map(|data| &data.target)
    }

    /// Returns every target in injection order: dependencies strictly before
    /// their dependents.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.injection_order
            .iter()
            .map(move |address| &self.targets[address].target)
    }

    /// Returns the addresses `address` depends on, as recorded by the edge
    /// map.
    ///
    /// This reflects the edges actually present in the graph; under a
    /// declaration-level cycle this can be a strict subset of the target's
    /// resolved dependency list.
    pub fn direct_dependencies(
        &self,
        address: &Address,
    ) -> Result<impl Iterator<Item = &Address> + '_, Error> {
        let data = self.targets.get(address).ok_or_else(|| {
            Error::GraphInternal(format!("address '{}' not found in graph", address))
        })?;
        Ok(self
            .dep_graph
            .neighbors_directed(data.ix, Outgoing)
            .map(move |ix| &self.dep_graph[ix]))
    }

    /// Injects a materialized target.
    ///
    /// Each address may be injected exactly once. Edges are added for every
    /// dependency already present in the graph; a dependency that is absent
    /// (possible only under a declaration-level cycle) is skipped, keeping
    /// the stored graph acyclic.
    pub fn inject_target(&mut self, target: Target) -> Result<(), Error> {
        let address = target.address().clone();
        if self.targets.contains_key(&address) {
            return Err(Error::GraphInternal(format!(
                "address '{}' has already been injected",
                address
            )));
        }

        let ix = self.dep_graph.add_node(address.clone());
        for dep in target.dependencies() {
            match self.targets.get(dep) {
                Some(dep_data) => {
                    // update_edge rather than add_edge: a dependency declared
                    // twice (e.g. as both `path:name` and its shorthand)
                    // produces one edge, not two.
                    self.dep_graph.update_edge(ix, dep_data.ix, ());
                }
                None => {
                    // The constructor injects dependencies first, so an
                    // absent dependency means traversal was cut short by the
                    // visited set, i.e. a declaration-level cycle.
                    trace!(
                        target = %address,
                        dependency = %dep,
                        "dependency not present at injection time, dropping edge"
                    );
                }
            }
        }

        self.injection_order.push(address.clone());
        self.targets.insert(address, TargetData { ix, target });
        Ok(())
    }

    /// Adds a label to the target at `address`. Idempotent: returns false if
    /// the label was already present.
    pub fn add_label(&mut self, address: &Address, label: impl Into<String>) -> Result<bool, Error> {
        let data = self.targets.get_mut(address).ok_or_else(|| {
            Error::GraphInternal(format!("address '{}' not found in graph", address))
        })?;
        Ok(data.target.add_label(label))
    }

    /// Verifies internal invariants on this graph. Not part of the
    /// documented API.
    #[doc(hidden)]
    pub fn verify(&self) -> Result<(), Error> {
        let node_count = self.dep_graph.node_count();
        if node_count != self.targets.len() || node_count != self.injection_order.len() {
            return Err(Error::GraphInternal(format!(
                "number of nodes = {} differs from targets = {} / injection order = {}",
                node_count,
                self.targets.len(),
                self.injection_order.len(),
            )));
        }

        for edge in self.dep_graph.edge_references() {
            let from = &self.dep_graph[edge.source()];
            let to = &self.dep_graph[edge.target()];
            if !self.targets.contains_key(from) || !self.targets.contains_key(to) {
                return Err(Error::GraphInternal(format!(
                    "edge {} -> {} references an unknown address",
                    from, to
                )));
            }
        }

        // Dependencies precede dependents in the injection order.
        let order: HashMap<&Address, usize> = self
            .injection_order
            .iter()
            .enumerate()
            .map(|(position, address)| (address, position))
            .collect();
        for data in self.targets.values() {
            let position = order[data.target.address()];
            for ix in self.dep_graph.neighbors_directed(data.ix, Outgoing) {
                let dep = &self.dep_graph[ix];
                if order[dep] >= position {
                    return Err(Error::GraphInternal(format!(
                        "dependency '{}' was injected after its dependent '{}'",
                        dep,
                        data.target.address(),
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for BuildGraph {
    fn default() -> Self {
        Self::new()
    }
}
