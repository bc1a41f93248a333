// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for invalidation and artifact caching.

use crate::errors::Error;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;

/// Configuration knobs for the invalidation and artifact-cache core.
///
/// ```toml
/// generator_version = "2024-05"
/// cache_root = "/var/cache/minnow/artifacts"
/// artifact_root = "/repo/dist"
/// compress = true
/// read_only = false
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Prepended to every cache key; changing it invalidates all keys.
    #[serde(default)]
    pub generator_version: String,
    /// Where artifact tarballs are stored.
    pub cache_root: Utf8PathBuf,
    /// The directory cached archives are extracted relative to.
    pub artifact_root: Utf8PathBuf,
    /// Whether artifact archives are gzipped.
    #[serde(default = "default_compress")]
    pub compress: bool,
    /// Disables cache writes; reads proceed normally.
    #[serde(default)]
    pub read_only: bool,
}

impl CacheConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents).map_err(Error::ConfigParse)
    }

    /// Reads and parses a TOML config file.
    pub fn from_file(path: impl AsRef<Utf8Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| Error::ConfigIo {
            path: path.to_owned(),
            source: err,
        })?;
        Self::from_toml_str(&contents)
    }
}

fn default_compress() -> bool {
    true
}
