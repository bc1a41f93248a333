// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fingerprint::{combine_cache_keys, CacheKey, CacheKeyGenerator};
use crate::invalidator::BuildInvalidator;
use crate::unit_tests::fixture_helpers::{address, graph_for_spec, temp_tree};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn key_generation_is_deterministic() {
    let graph = graph_for_spec(fixtures::buildroot(fixtures::SAMPLE), "src/java/lib:lib");
    let generator = CacheKeyGenerator::new();
    let lib = graph
        .target(&address("src/java/lib", "lib"))
        .expect("lib is in the graph");

    for transitive in [false, true] {
        let first = generator
            .key_for_target(&graph, lib, transitive)
            .expect("key generation should succeed");
        let second = generator
            .key_for_target(&graph, lib, transitive)
            .expect("key generation should succeed");
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.id, second.id);
    }
}

#[test]
fn equal_payloads_hash_equal_but_keep_distinct_ids() {
    let (_dir, root) = temp_tree(&[(
        "lib/BUILD",
        "java_library(name='first', sources=[])\njava_library(name='second', sources=[])\n",
    )]);
    let mut graph = graph_for_spec(&root, "lib:first");
    {
        let root = root.clone();
        let mut evaluator = crate::unit_tests::fixture_helpers::evaluator_for(&root);
        crate::graph::GraphBuilder::new(&mut evaluator)
            .inject_spec_closure("lib:second", &mut graph)
            .expect("second injection should succeed");
    }

    let generator = CacheKeyGenerator::new();
    let first = generator
        .key_for_target(
            &graph,
            graph.target(&address("lib", "first")).expect("first exists"),
            false,
        )
        .expect("key generation should succeed");
    let second = generator
        .key_for_target(
            &graph,
            graph.target(&address("lib", "second")).expect("second exists"),
            false,
        )
        .expect("key generation should succeed");

    assert_eq!(first.hash, second.hash);
    assert_ne!(first.id, second.id);
}

#[test]
fn empty_identical_targets_are_distinguished_by_the_invalidator() {
    let (_dir, root) = temp_tree(&[(
        "lib/BUILD",
        "java_library(name='first', sources=[])\njava_library(name='second', \
         sources=[], dependencies=[':first'])\n",
    )]);
    let graph = graph_for_spec(&root, "lib:second");
    let generator = CacheKeyGenerator::new();
    let first_key = generator
        .key_for_target(
            &graph,
            graph.target(&address("lib", "first")).expect("first exists"),
            false,
        )
        .expect("key generation should succeed");
    let second_key = generator
        .key_for_target(
            &graph,
            graph.target(&address("lib", "second")).expect("second exists"),
            false,
        )
        .expect("key generation should succeed");
    assert_eq!(first_key.hash, second_key.hash);

    let (_store_dir, store_root) = temp_tree(&[]);
    let invalidator = BuildInvalidator::new(store_root.join("invalidator"), generator.version())
        .expect("invalidator should initialize");
    invalidator
        .force_invalidate_all()
        .expect("invalidation should succeed");
    invalidator.update(&first_key).expect("update should succeed");

    assert!(!invalidator
        .needs_update(&first_key)
        .expect("lookup should succeed"));
    // Same hash, different id: the second target still needs its update.
    assert!(invalidator
        .needs_update(&second_key)
        .expect("lookup should succeed"));
}

#[test]
fn transitive_keys_absorb_dependency_changes() {
    let build = |dep_sources: &str| {
        let (dir, root) = temp_tree(&[
            (
                "lib/BUILD",
                &*format!(
                    "java_library(name='top', sources=[], dependencies=[':dep'])\n\
                     java_library(name='dep', sources={})\n",
                    dep_sources
                ),
            ),
            ("lib/Dep.java", "class Dep {}\n"),
        ]);
        let graph = graph_for_spec(&root, "lib:top");
        (dir, graph)
    };

    let generator = CacheKeyGenerator::new();
    let (_dir1, graph1) = build("[]");
    let (_dir2, graph2) = build("['Dep.java']");
    let top = address("lib", "top");

    let plain1 = generator
        .key_for_target(&graph1, graph1.target(&top).expect("top exists"), false)
        .expect("key generation should succeed");
    let plain2 = generator
        .key_for_target(&graph2, graph2.target(&top).expect("top exists"), false)
        .expect("key generation should succeed");
    // The top target's own payload did not change.
    assert_eq!(plain1.hash, plain2.hash);

    let transitive1 = generator
        .key_for_target(&graph1, graph1.target(&top).expect("top exists"), true)
        .expect("key generation should succeed");
    let transitive2 = generator
        .key_for_target(&graph2, graph2.target(&top).expect("top exists"), true)
        .expect("key generation should succeed");
    assert_ne!(transitive1.hash, transitive2.hash);
}

#[test]
fn transitive_keys_are_stable_under_dependency_declaration_order() {
    let build = |deps: &str| {
        let (dir, root) = temp_tree(&[(
            "lib/BUILD",
            &*format!(
                "java_library(name='top', sources=[], dependencies={})\n\
                 java_library(name='left', sources=['a'])\n\
                 java_library(name='right', sources=['b'])\n",
                deps
            ),
        )]);
        let graph = graph_for_spec(&root, "lib:top");
        (dir, graph)
    };

    let generator = CacheKeyGenerator::new();
    let (_dir1, graph1) = build("[':left', ':right']");
    let (_dir2, graph2) = build("[':right', ':left']");
    let top = address("lib", "top");

    let key1 = generator
        .key_for_target(&graph1, graph1.target(&top).expect("top exists"), true)
        .expect("key generation should succeed");
    let key2 = generator
        .key_for_target(&graph2, graph2.target(&top).expect("top exists"), true)
        .expect("key generation should succeed");
    assert_eq!(key1.hash, key2.hash);
}

#[test]
fn the_user_version_is_mixed_into_every_key() {
    let graph = graph_for_spec(fixtures::buildroot(fixtures::SAMPLE), "proj/a:b");
    let b = graph.target(&address("proj/a", "b")).expect("b exists");

    let old = CacheKeyGenerator::with_version("v1")
        .key_for_target(&graph, b, false)
        .expect("key generation should succeed");
    let new = CacheKeyGenerator::with_version("v2")
        .key_for_target(&graph, b, false)
        .expect("key generation should succeed");
    assert_ne!(old.hash, new.hash);
}

fn test_key(id: &str, seed: &str) -> CacheKey {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    CacheKey::new(id, hex::encode(hasher.finalize()), Vec::new())
}

#[test]
fn combining_a_singleton_returns_it_unchanged() {
    let key = test_key("one", "payload");
    let combined = combine_cache_keys(vec![key.clone()]);
    assert_eq!(combined, key);
}

#[test]
fn combination_is_commutative() {
    let k1 = test_key("one", "p1");
    let k2 = test_key("two", "p2");
    let k3 = test_key("three", "p3");

    let forward = combine_cache_keys(vec![k1.clone(), k2.clone(), k3.clone()]);
    let rotated = combine_cache_keys(vec![k3, k1, k2]);
    assert_eq!(forward.hash, rotated.hash);
    assert_eq!(forward.id, rotated.id);
}

#[test]
fn combination_is_not_associative() {
    let k1 = test_key("one", "p1");
    let k2 = test_key("two", "p2");
    let k3 = test_key("three", "p3");

    let all_at_once = combine_cache_keys(vec![k1.clone(), k2.clone(), k3.clone()]);
    let incremental = combine_cache_keys(vec![combine_cache_keys(vec![k1, k2]), k3]);
    assert_ne!(all_at_once.hash, incremental.hash);
}

#[test]
fn combined_ids_are_a_readable_join() {
    let combined = combine_cache_keys(vec![test_key("beta", "1"), test_key("alpha", "2")]);
    assert_eq!(combined.id, "alpha+beta");
}

proptest! {
    #[test]
    fn combination_is_commutative_for_arbitrary_keys(
        seeds in proptest::collection::vec("[a-z]{1,8}", 1..6),
        swap_a in 0usize..6,
        swap_b in 0usize..6,
    ) {
        let keys: Vec<_> = seeds
            .iter()
            .enumerate()
            .map(|(index, seed)| test_key(&format!("id-{}", index), seed))
            .collect();

        let mut shuffled = keys.clone();
        let len = shuffled.len();
        shuffled.swap(swap_a % len, swap_b % len);

        let combined = combine_cache_keys(keys);
        let combined_shuffled = combine_cache_keys(shuffled);
        prop_assert_eq!(combined.hash, combined_shuffled.hash);
        prop_assert_eq!(combined.id, combined_shuffled.id);
    }
}
