// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors that `minnow` methods can return.

use crate::address::Address;
use camino::{Utf8Path, Utf8PathBuf};
use std::error;
use std::fmt;
use std::io;

use Error::*;

/// Error type describing the sorts of errors `minnow` can return.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A target call in a BUILD file violated a declaration invariant: the
    /// `name` parameter was missing, a positional argument was supplied, or a
    /// reserved parameter was passed explicitly.
    InvalidDeclaration {
        /// The BUILD file containing the offending call.
        build_file: String,
        /// The target alias that was being invoked.
        target_type: String,
        /// A description of the violated invariant.
        message: String,
    },
    /// A BUILD file failed to lex, parse, or run.
    Evaluation {
        /// The BUILD file being evaluated.
        build_file: String,
        /// The underlying cause.
        message: String,
    },
    /// A spec could not be parsed, or referred to a missing BUILD file or an
    /// unknown target name.
    Resolution(String),
    /// The same address was declared more than once.
    DuplicateAddress {
        /// The address that was declared twice.
        address: Address,
        /// The BUILD file whose evaluation uncovered the duplicate.
        build_file: String,
    },
    /// Constructing a `Target` from its proxy failed.
    Materialization {
        /// The address of the target that failed to materialize.
        address: Address,
        /// A description of the failure.
        message: String,
    },
    /// A filesystem operation on the invalidator or artifact cache failed in
    /// a way that cannot be recovered as a cache miss.
    CacheIo {
        /// The path being read or written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// A cached archive failed to extract and could not be deleted.
    ///
    /// Plain corruption is recovered as a cache miss: the entry is deleted
    /// and the caller re-runs the work. This error is returned only when the
    /// corrupt entry cannot be removed.
    ArtifactCorruption {
        /// The path to the corrupt archive.
        path: Utf8PathBuf,
        /// A description of the extraction failure.
        message: String,
    },
    /// An error occurred while reading a configuration file.
    ConfigIo {
        /// The path to the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// An error occurred while parsing a configuration file.
    ConfigParse(toml::de::Error),
    /// An internal invariant of the build graph was violated.
    GraphInternal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidDeclaration {
                build_file,
                target_type,
                message,
            } => write!(
                f,
                "invalid declaration of {} target in {}: {}",
                target_type, build_file, message
            ),
            Evaluation {
                build_file,
                message,
            } => write!(f, "error evaluating {}: {}", build_file, message),
            Resolution(msg) => write!(f, "error resolving spec: {}", msg),
            DuplicateAddress {
                address,
                build_file,
            } => write!(
                f,
                "address '{}' is already declared (while evaluating {})",
                address, build_file
            ),
            Materialization { address, message } => {
                write!(f, "error materializing target '{}': {}", address, message)
            }
            CacheIo { path, source } => {
                write!(f, "cache I/O error at {}: {}", path, source)
            }
            ArtifactCorruption { path, message } => {
                write!(f, "corrupt cached artifact at {}: {}", path, message)
            }
            ConfigIo { path, source } => {
                write!(f, "error reading config file {}: {}", path, source)
            }
            ConfigParse(err) => write!(f, "error parsing config file: {}", err),
            GraphInternal(msg) => write!(f, "internal error in build graph: {}", msg),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            CacheIo { source, .. } => Some(source),
            ConfigIo { source, .. } => Some(source),
            ConfigParse(err) => Some(err),
            InvalidDeclaration { .. }
            | Evaluation { .. }
            | Resolution(_)
            | DuplicateAddress { .. }
            | Materialization { .. }
            | ArtifactCorruption { .. }
            | GraphInternal(_) => None,
        }
    }
}

impl Error {
    pub(crate) fn cache_io(path: impl AsRef<Utf8Path>, source: io::Error) -> Self {
        CacheIo {
            path: path.as_ref().to_owned(),
            source,
        }
    }
}
