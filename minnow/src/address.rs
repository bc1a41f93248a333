// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical target addresses and the spec syntax that resolves to them.

use crate::errors::Error;
use camino::{Utf8Path, Utf8PathBuf};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Whether an address was declared in a BUILD file or generated internally.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressKind {
    /// The address corresponds to a target declared in a BUILD file.
    BuildFile,
    /// The address was generated internally and has no BUILD-file backing.
    Synthetic,
}

/// The canonical, repo-root-relative identifier for a target.
///
/// An address is a pair of a `spec_path` (the directory containing the
/// target's BUILD file, relative to the build root) and a `name` unique
/// within that directory. Its canonical string form is `spec_path:name`.
///
/// Addresses compare, hash, and order purely by their canonical string form;
/// the [`AddressKind`] tag records provenance and does not participate in
/// identity.
#[derive(Clone, Debug)]
pub struct Address {
    repr: Box<str>,
    // Byte offset of `name` within `repr` (one past the ':').
    name_at: usize,
    kind: AddressKind,
}

impl Address {
    /// Creates a new address for a target declared in a BUILD file.
    pub fn build_file(spec_path: impl AsRef<Utf8Path>, name: impl AsRef<str>) -> Self {
        Self::new_impl(spec_path.as_ref(), name.as_ref(), AddressKind::BuildFile)
    }

    /// Creates a new synthetic address, generated internally rather than
    /// declared by an author.
    pub fn synthetic(spec_path: impl AsRef<Utf8Path>, name: impl AsRef<str>) -> Self {
        Self::new_impl(spec_path.as_ref(), name.as_ref(), AddressKind::Synthetic)
    }

    fn new_impl(spec_path: &Utf8Path, name: &str, kind: AddressKind) -> Self {
        let repr = format!("{}:{}", spec_path, name);
        let name_at = repr.len() - name.len();
        Self {
            repr: repr.into_boxed_str(),
            name_at,
            kind,
        }
    }

    /// Returns the directory containing this target's BUILD file, relative to
    /// the build root.
    pub fn spec_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.repr[..self.name_at - 1])
    }

    /// Returns the target's name.
    pub fn name(&self) -> &str {
        &self.repr[self.name_at..]
    }

    /// Returns the canonical `spec_path:name` form of this address.
    pub fn as_str(&self) -> &str {
        &self.repr
    }

    /// Returns whether this address is BUILD-file backed or synthetic.
    pub fn kind(&self) -> AddressKind {
        self.kind
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.repr == other.repr
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repr.hash(state);
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.repr.cmp(&other.repr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}

/// Parses a spec as written in a BUILD file into a `(spec_path, name)` pair.
///
/// Three forms are accepted:
///
/// * `path:name` -- absolute, anchored at the build root;
/// * `:name` -- relative, resolved against `relative_to` (the spec path of
///   the enclosing BUILD file);
/// * `path` -- shorthand for `path:basename(path)`.
///
/// The returned pair is anchored at the build root; the spec string itself
/// is never retained.
pub fn parse_spec(
    spec: &str,
    relative_to: Option<&Utf8Path>,
) -> Result<(Utf8PathBuf, String), Error> {
    let (path, name) = match spec.split_once(':') {
        Some((path, name)) => {
            let path = if path.is_empty() {
                match relative_to {
                    Some(rel) => rel.as_str(),
                    None => {
                        return Err(Error::Resolution(format!(
                            "spec '{}' is relative but no enclosing BUILD file was supplied",
                            spec
                        )))
                    }
                }
            } else {
                path
            };
            (path, name)
        }
        None => {
            let name = Utf8Path::new(spec).file_name().ok_or_else(|| {
                Error::Resolution(format!("spec '{}' has no path basename to use as a name", spec))
            })?;
            (spec, name)
        }
    };

    if name.is_empty() {
        return Err(Error::Resolution(format!(
            "spec '{}' has an empty target name",
            spec
        )));
    }
    if name.contains(':') || name.contains('/') {
        return Err(Error::Resolution(format!(
            "spec '{}' has an invalid target name '{}'",
            spec, name
        )));
    }

    let path = Utf8Path::new(path.trim_end_matches('/'));
    if path.as_str().is_empty() {
        return Err(Error::Resolution(format!(
            "spec '{}' has an empty path",
            spec
        )));
    }
    if path.is_absolute() {
        return Err(Error::Resolution(format!(
            "spec '{}' must be relative to the build root",
            spec
        )));
    }
    // Raw string segments rather than components(): the latter silently
    // normalizes away interior '.' segments, which would let two spellings
    // of one directory produce distinct addresses.
    for segment in path.as_str().split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(Error::Resolution(format!(
                "spec '{}' may not contain empty, '.', or '..' path segments",
                spec
            )));
        }
    }

    Ok((path.to_owned(), name.to_owned()))
}
