// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test fixtures for minnow: canned build roots with BUILD-file trees.

use camino::Utf8PathBuf;

/// Returns the directory holding all fixture build roots.
pub fn buildroots_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("buildroots")
}

/// Returns the path to the named fixture build root.
///
/// Panics if the build root does not exist, so that a typo fails loudly
/// rather than as a confusing resolution error.
pub fn buildroot(name: &str) -> Utf8PathBuf {
    let root = buildroots_dir().join(name);
    assert!(root.is_dir(), "no fixture build root named '{}'", name);
    root
}

/// A small tree with libraries, pages, and a thrift target.
pub const SAMPLE: &str = "sample";

/// A directory whose BUILD-file family spans `BUILD` and `BUILD.extra`.
pub const FAMILY: &str = "family";

/// Two sibling BUILD files declaring the same target name.
pub const DUPES: &str = "dupes";

/// Two targets that declare each other as dependencies.
pub const CYCLE: &str = "cycle";
