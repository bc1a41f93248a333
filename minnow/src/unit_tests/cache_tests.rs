// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::cache::{ArtifactCache, LocalArtifactCache};
use crate::config::CacheConfig;
use crate::fingerprint::CacheKey;
use crate::unit_tests::fixture_helpers::temp_tree;
use camino::Utf8Path;
use pretty_assertions::assert_eq;
use std::fs;

fn key(id: &str, hash: &str) -> CacheKey {
    CacheKey::new(id, hash, Vec::new())
}

/// An artifact root with a couple of build outputs, plus an empty cache
/// root.
fn outputs_and_cache(compress: bool, read_only: bool) -> (tempfile::TempDir, LocalArtifactCache) {
    let (dir, root) = temp_tree(&[
        ("artifacts/out/one.txt", "first output\n"),
        ("artifacts/out/sub/two.txt", "second output\n"),
    ]);
    let cache = LocalArtifactCache::new(
        root.join("artifacts"),
        root.join("cache"),
        compress,
        read_only,
    )
    .expect("cache should initialize");
    (dir, cache)
}

#[test]
fn insert_extract_round_trip_compressed() {
    let (_dir, cache) = outputs_and_cache(true, false);
    let stored = key("proj.a.a", "beef");

    assert!(!cache.has(&stored));
    cache
        .try_insert(&stored, &[Utf8Path::new("out")])
        .expect("insert should succeed");
    assert!(cache.has(&stored));

    // Wipe the outputs, then restore them from the cache.
    let out_dir = cache.artifact_root().join("out");
    fs::remove_dir_all(&out_dir).expect("remove outputs");
    let artifact = cache
        .use_cached_files(&stored)
        .expect("extraction should succeed")
        .expect("entry should be present");
    assert!(artifact.archive_path().as_str().ends_with(".tar.gz"));
    assert_eq!(
        fs::read_to_string(out_dir.join("one.txt")).expect("restored file"),
        "first output\n"
    );
    assert_eq!(
        fs::read_to_string(out_dir.join("sub/two.txt")).expect("restored file"),
        "second output\n"
    );
}

#[test]
fn insert_extract_round_trip_uncompressed() {
    let (_dir, cache) = outputs_and_cache(false, false);
    let stored = key("proj.a.a", "beef");
    cache
        .try_insert(&stored, &[Utf8Path::new("out/one.txt")])
        .expect("insert should succeed");

    let out_file = cache.artifact_root().join("out/one.txt");
    fs::remove_file(&out_file).expect("remove output");
    let artifact = cache
        .use_cached_files(&stored)
        .expect("extraction should succeed")
        .expect("entry should be present");
    assert!(artifact.archive_path().as_str().ends_with(".tar"));
    assert_eq!(
        fs::read_to_string(&out_file).expect("restored file"),
        "first output\n"
    );
}

#[test]
fn missing_entries_are_a_miss() {
    let (_dir, cache) = outputs_and_cache(true, false);
    assert!(cache
        .use_cached_files(&key("proj.a.a", "0000"))
        .expect("lookup should succeed")
        .is_none());
}

#[test]
fn read_only_mode_skips_writes() {
    let (_dir, cache) = outputs_and_cache(true, true);
    let stored = key("proj.a.a", "beef");
    cache
        .try_insert(&stored, &[Utf8Path::new("out")])
        .expect("insert should be a silent no-op");
    assert!(!cache.has(&stored));
}

#[test]
fn distinct_ids_with_equal_hashes_do_not_collide() {
    let (_dir, cache) = outputs_and_cache(true, false);
    let first = key("proj.a.first", "same");
    let second = key("proj.a.second", "same");

    cache
        .try_insert(&first, &[Utf8Path::new("out/one.txt")])
        .expect("insert should succeed");
    assert!(cache.has(&first));
    assert!(!cache.has(&second));
}

#[test]
fn a_stranded_temp_file_is_not_a_cache_entry() {
    let (_dir, cache) = outputs_and_cache(true, false);
    let stored = key("proj.a.a", "beef");

    // Simulate a writer killed between the archive write and the rename: a
    // temp file exists, the final name does not.
    let entry_dir = cache
        .artifact_root()
        .parent()
        .expect("cache lives next to artifacts")
        .join("cache/proj.a.a");
    fs::create_dir_all(&entry_dir).expect("create entry dir");
    fs::write(entry_dir.join(".tmp.abandoned"), b"partial bytes").expect("write temp file");

    assert!(!cache.has(&stored));
    assert!(cache
        .use_cached_files(&stored)
        .expect("lookup should succeed")
        .is_none());

    // A retry simply succeeds.
    cache
        .try_insert(&stored, &[Utf8Path::new("out")])
        .expect("insert should succeed");
    assert!(cache.has(&stored));
}

#[test]
fn corrupt_archives_are_deleted_and_reported_as_a_miss() {
    let (_dir, cache) = outputs_and_cache(true, false);
    let stored = key("proj.a.a", "beef");
    cache
        .try_insert(&stored, &[Utf8Path::new("out")])
        .expect("insert should succeed");

    let archive_dir = cache
        .artifact_root()
        .parent()
        .expect("cache lives next to artifacts")
        .join("cache/proj.a.a");
    fs::write(archive_dir.join("beef.tar.gz"), b"not a gzip stream").expect("corrupt the entry");

    assert!(cache
        .use_cached_files(&stored)
        .expect("corruption is recovered as a miss")
        .is_none());
    assert!(!cache.has(&stored), "the corrupt entry should be deleted");
}

#[test]
fn delete_removes_the_entry() {
    let (_dir, cache) = outputs_and_cache(true, false);
    let stored = key("proj.a.a", "beef");
    cache
        .try_insert(&stored, &[Utf8Path::new("out")])
        .expect("insert should succeed");
    cache.delete(&stored).expect("delete should succeed");
    assert!(!cache.has(&stored));

    // Deleting an absent entry is not an error.
    cache.delete(&stored).expect("repeat delete should succeed");
}

#[test]
fn prune_sweeps_aged_entries_and_keeps_fresh_ones() {
    let (_dir, cache) = outputs_and_cache(true, false);
    let stored = key("proj.a.a", "beef");
    cache
        .try_insert(&stored, &[Utf8Path::new("out")])
        .expect("insert should succeed");

    cache.prune(1_000_000).expect("prune should succeed");
    assert!(cache.has(&stored), "fresh entries survive pruning");

    // An age of zero hours evicts everything.
    cache.prune(0).expect("prune should succeed");
    assert!(!cache.has(&stored));
}

#[test]
fn cache_config_parses_with_defaults() {
    let config = CacheConfig::from_toml_str(
        "cache_root = '/var/cache/artifacts'\nartifact_root = '/repo/dist'\n",
    )
    .expect("config should parse");
    assert_eq!(config.cache_root, Utf8Path::new("/var/cache/artifacts"));
    assert_eq!(config.artifact_root, Utf8Path::new("/repo/dist"));
    assert_eq!(config.generator_version, "");
    assert!(config.compress);
    assert!(!config.read_only);
}

#[test]
fn cache_config_round_trips_through_the_cache() {
    let (_dir, root) = temp_tree(&[("artifacts/out.txt", "payload\n")]);
    let config = CacheConfig::from_toml_str(&format!(
        "generator_version = 'v7'\ncache_root = '{}'\nartifact_root = '{}'\ncompress = false\n",
        root.join("cache"),
        root.join("artifacts"),
    ))
    .expect("config should parse");

    let cache = LocalArtifactCache::from_config(&config).expect("cache should initialize");
    let stored = key("t", "0a0a");
    cache
        .try_insert(&stored, &[Utf8Path::new("out.txt")])
        .expect("insert should succeed");
    assert!(cache.has(&stored));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let err = CacheConfig::from_toml_str("cache_root = 42\n").unwrap_err();
    assert!(matches!(err, crate::errors::Error::ConfigParse(_)));
}
