// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fingerprint::CacheKey;
use crate::invalidator::{safe_filename, BuildInvalidator};
use crate::unit_tests::fixture_helpers::temp_tree;
use pretty_assertions::assert_eq;

fn key(id: &str, hash: &str) -> CacheKey {
    CacheKey::new(id, hash, Vec::new())
}

fn fresh_invalidator() -> (tempfile::TempDir, BuildInvalidator) {
    let (dir, root) = temp_tree(&[]);
    let invalidator =
        BuildInvalidator::new(root.join("hashes"), "1").expect("invalidator should initialize");
    (dir, invalidator)
}

#[test]
fn update_then_needs_update_round_trips() {
    let (_dir, invalidator) = fresh_invalidator();
    let first = key("proj.a.a", "aaaa");

    assert!(invalidator.needs_update(&first).expect("lookup should succeed"));
    invalidator.update(&first).expect("update should succeed");
    assert!(!invalidator.needs_update(&first).expect("lookup should succeed"));

    // A different hash for the same id supersedes the record.
    let second = key("proj.a.a", "bbbb");
    invalidator.update(&second).expect("update should succeed");
    assert!(invalidator.needs_update(&first).expect("lookup should succeed"));
    assert!(!invalidator.needs_update(&second).expect("lookup should succeed"));
}

#[test]
fn existing_hash_reads_back_the_record() {
    let (_dir, invalidator) = fresh_invalidator();
    assert_eq!(
        invalidator.existing_hash("proj.a.a").expect("lookup should succeed"),
        None
    );
    invalidator
        .update(&key("proj.a.a", "cafe"))
        .expect("update should succeed");
    assert_eq!(
        invalidator.existing_hash("proj.a.a").expect("lookup should succeed"),
        Some("cafe".to_owned())
    );
}

#[test]
fn force_invalidate_forgets_one_id() {
    let (_dir, invalidator) = fresh_invalidator();
    let target = key("proj.a.a", "aaaa");
    invalidator.update(&target).expect("update should succeed");
    invalidator
        .force_invalidate(&target)
        .expect("invalidation should succeed");
    assert!(invalidator.needs_update(&target).expect("lookup should succeed"));

    // Invalidating an absent record is not an error.
    invalidator
        .force_invalidate(&target)
        .expect("repeat invalidation should succeed");
}

#[test]
fn force_invalidate_all_forgets_everything() {
    let (_dir, invalidator) = fresh_invalidator();
    let one = key("one", "1111");
    let two = key("two", "2222");
    invalidator.update(&one).expect("update should succeed");
    invalidator.update(&two).expect("update should succeed");

    invalidator
        .force_invalidate_all()
        .expect("invalidation should succeed");
    assert!(invalidator.needs_update(&one).expect("lookup should succeed"));
    assert!(invalidator.needs_update(&two).expect("lookup should succeed"));

    // The store still works after being cleared.
    invalidator.update(&one).expect("update should succeed");
    assert!(!invalidator.needs_update(&one).expect("lookup should succeed"));
}

#[test]
fn generator_versions_partition_the_store() {
    let (_dir, root) = temp_tree(&[]);
    let v1 = BuildInvalidator::new(root.join("hashes"), "1").expect("v1 should initialize");
    let v2 = BuildInvalidator::new(root.join("hashes"), "2").expect("v2 should initialize");

    let record = key("proj.a.a", "aaaa");
    v1.update(&record).expect("update should succeed");
    assert!(!v1.needs_update(&record).expect("lookup should succeed"));
    assert!(v2.needs_update(&record).expect("lookup should succeed"));
}

#[test]
fn safe_filenames_pass_plain_ids_through() {
    assert_eq!(safe_filename("proj.a.a"), "proj.a.a");
    assert_eq!(safe_filename("with-dash_and.dot"), "with-dash_and.dot");
}

#[test]
fn safe_filenames_escape_unsafe_bytes() {
    // Uppercase must be escaped: 'A' and 'a' collide on case-insensitive
    // filesystems.
    assert_eq!(safe_filename("Ab"), "%41b");
    assert_ne!(safe_filename("a"), safe_filename("A"));
    // The escape character itself round-trips unambiguously.
    assert_eq!(safe_filename("a%b"), "a%25b");
    assert_eq!(safe_filename("a/b:c"), "a%2fb%3ac");
}

#[test]
fn overlong_ids_fall_back_to_a_digest() {
    let id = "x".repeat(500);
    let name = safe_filename(&id);
    assert_eq!(name.len(), 64);
    assert!(name.bytes().all(|b| b.is_ascii_hexdigit()));
    // Still injective for distinct ids.
    assert_ne!(name, safe_filename(&"y".repeat(500)));
}

#[test]
fn ids_with_unsafe_characters_round_trip_through_the_store() {
    let (_dir, invalidator) = fresh_invalidator();
    let exotic = key("Proj/Über:lib", "abcd");
    invalidator.update(&exotic).expect("update should succeed");
    assert!(!invalidator.needs_update(&exotic).expect("lookup should succeed"));
    assert_eq!(
        invalidator
            .existing_hash("Proj/Über:lib")
            .expect("lookup should succeed"),
        Some("abcd".to_owned())
    );
}
