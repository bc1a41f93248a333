// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Address, AliasRegistry, BuildFileEvaluator, BuildGraph, GraphBuilder};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Creates an evaluator with the standard registry over the given root.
pub(crate) fn evaluator_for(root: impl AsRef<Utf8Path>) -> BuildFileEvaluator {
    let root = root.as_ref();
    BuildFileEvaluator::new(root.to_owned(), AliasRegistry::standard(root.to_owned()))
}

pub(crate) fn sample_evaluator() -> BuildFileEvaluator {
    evaluator_for(fixtures::buildroot(fixtures::SAMPLE))
}

pub(crate) fn address(spec_path: &str, name: &str) -> Address {
    Address::build_file(spec_path, name)
}

/// Injects a spec closure from the given build root into a fresh graph.
pub(crate) fn graph_for_spec(root: impl AsRef<Utf8Path>, spec: &str) -> BuildGraph {
    let mut evaluator = evaluator_for(root);
    let mut graph = BuildGraph::new();
    GraphBuilder::new(&mut evaluator)
        .inject_spec_closure(spec, &mut graph)
        .expect("closure injection should succeed");
    graph.verify().expect("graph invariants should hold");
    graph
}

/// Writes an ad-hoc build tree into a temporary directory.
///
/// The returned `TempDir` must be kept alive for the duration of the test;
/// the path is the UTF-8 build root.
pub(crate) fn temp_tree(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8");
    for (rel, contents) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("fixture paths have parents"))
            .expect("create parent dirs");
        fs::write(&path, contents).expect("write fixture file");
    }
    (dir, root)
}
