// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handles to BUILD files on disk and discovery of BUILD-file families.

use crate::errors::Error;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::fs;

/// The canonical basename of a BUILD file.
pub const BUILD_FILE_NAME: &str = "BUILD";

/// A handle to a single BUILD file: a build root, a spec path relative to
/// that root, and a basename within the spec path's directory.
///
/// A directory may contain a *family* of BUILD files (`BUILD` plus any
/// number of `BUILD.<suffix>` siblings). The family is evaluated as a unit,
/// with address uniqueness enforced across all of its members.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BuildFile {
    root_dir: Utf8PathBuf,
    spec_path: Utf8PathBuf,
    basename: String,
}

impl BuildFile {
    /// Creates a handle to the primary BUILD file for the given spec path.
    ///
    /// `BUILD` is preferred if it exists; otherwise the lexicographically
    /// first family member is used. Returns a resolution error if the
    /// directory contains no BUILD file at all.
    pub fn new(root_dir: impl Into<Utf8PathBuf>, spec_path: impl Into<Utf8PathBuf>) -> Result<Self, Error> {
        let root_dir = root_dir.into();
        let spec_path = spec_path.into();
        let mut members = family_basenames(&root_dir, &spec_path)?;
        if members.is_empty() {
            return Err(Error::Resolution(format!(
                "no BUILD file found in directory '{}' under build root {}",
                spec_path, root_dir
            )));
        }
        // family_basenames sorts, and "BUILD" sorts before "BUILD.<suffix>".
        let basename = members.remove(0);
        Ok(Self {
            root_dir,
            spec_path,
            basename,
        })
    }

    /// Creates a handle to one specific member of a family.
    pub(crate) fn with_basename(
        root_dir: Utf8PathBuf,
        spec_path: Utf8PathBuf,
        basename: String,
    ) -> Self {
        Self {
            root_dir,
            spec_path,
            basename,
        }
    }

    /// Returns the build root this handle is anchored at.
    pub fn root_dir(&self) -> &Utf8Path {
        &self.root_dir
    }

    /// Returns the directory containing this BUILD file, relative to the
    /// build root.
    pub fn spec_path(&self) -> &Utf8Path {
        &self.spec_path
    }

    /// Returns this BUILD file's basename.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Returns the absolute path to this BUILD file.
    pub fn full_path(&self) -> Utf8PathBuf {
        self.root_dir.join(&self.spec_path).join(&self.basename)
    }

    /// Returns every member of this BUILD file's family, in lexicographic
    /// basename order.
    pub fn family(&self) -> Result<Vec<BuildFile>, Error> {
        let members = family_basenames(&self.root_dir, &self.spec_path)?;
        Ok(members
            .into_iter()
            .map(|basename| {
                BuildFile::with_basename(self.root_dir.clone(), self.spec_path.clone(), basename)
            })
            .collect())
    }

    /// Reads this BUILD file's source text.
    pub fn source(&self) -> Result<String, Error> {
        let path = self.full_path();
        fs::read_to_string(&path).map_err(|err| Error::Evaluation {
            build_file: path.to_string(),
            message: format!("failed to read BUILD file: {}", err),
        })
    }
}

impl fmt::Display for BuildFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spec_path, self.basename)
    }
}

/// Returns true if `name` names a BUILD file (`BUILD` or `BUILD.<suffix>`).
pub(crate) fn is_build_file_name(name: &str) -> bool {
    name == BUILD_FILE_NAME
        || name
            .strip_prefix("BUILD.")
            .map_or(false, |suffix| !suffix.is_empty())
}

fn family_basenames(root_dir: &Utf8Path, spec_path: &Utf8Path) -> Result<Vec<String>, Error> {
    let dir = root_dir.join(spec_path);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::Resolution(format!(
                "directory '{}' does not exist under build root {}",
                spec_path, root_dir
            )))
        }
        Err(err) => {
            return Err(Error::Resolution(format!(
                "failed to scan directory '{}': {}",
                dir, err
            )))
        }
    };

    let mut basenames = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::Resolution(format!("failed to scan directory '{}': {}", dir, err))
        })?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            // Non-UTF-8 names cannot be BUILD files.
            Err(_) => continue,
        };
        if is_build_file_name(&name) && entry.path().is_file() {
            basenames.push(name);
        }
    }
    basenames.sort();
    Ok(basenames)
}
