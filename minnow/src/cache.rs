// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-addressed storage of build outputs, indexed by cache key.

use crate::config::CacheConfig;
use crate::errors::Error;
use crate::fingerprint::CacheKey;
use crate::invalidator::safe_filename;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::time::{Duration, SystemTime};
use tracing::{debug, trace, warn};

/// Storage for build outputs, keyed by `(cache_key.id, cache_key.hash)`.
///
/// Storage is keyed by both id and hash because distinct targets with empty
/// payloads can legitimately hash identically and must not collide.
pub trait ArtifactCache {
    /// Returns true if outputs are stored under `key`.
    fn has(&self, key: &CacheKey) -> bool;

    /// Stores the outputs at `paths` (relative to the artifact root) under
    /// `key`. A no-op in read-only mode.
    fn try_insert(&self, key: &CacheKey, paths: &[&Utf8Path]) -> Result<(), Error>;

    /// If outputs are stored under `key`, extracts them relative to the
    /// artifact root and returns a handle; otherwise returns `None`.
    ///
    /// A stored archive that fails to extract is treated as a miss: the
    /// entry is deleted and `None` is returned.
    fn use_cached_files(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, Error>;

    /// Removes the outputs stored under `key`. Missing entries are not an
    /// error.
    fn delete(&self, key: &CacheKey) -> Result<(), Error>;

    /// Evicts entries older than `age_hours`. Implementations may treat this
    /// as a no-op.
    fn prune(&self, age_hours: u64) -> Result<(), Error>;
}

/// A handle to an artifact that was extracted from the cache.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CachedArtifact {
    archive_path: Utf8PathBuf,
}

impl CachedArtifact {
    /// Returns the path of the archive the artifact was extracted from.
    pub fn archive_path(&self) -> &Utf8Path {
        &self.archive_path
    }
}

/// An artifact cache that stores tarballs on the local filesystem.
///
/// Layout: `<cache_root>/<id>/<hash>.tar` (or `.tar.gz` when compression is
/// enabled). Archives contain paths relative to the artifact root. Writes go
/// to a unique temporary name on the same filesystem and are renamed into
/// place atomically, so concurrent writers of the same key may race but can
/// never leave a truncated archive at the final path.
#[derive(Clone, Debug)]
pub struct LocalArtifactCache {
    artifact_root: Utf8PathBuf,
    cache_root: Utf8PathBuf,
    compress: bool,
    read_only: bool,
}

impl LocalArtifactCache {
    /// Creates a cache storing tarballs under `cache_root` and extracting
    /// them relative to `artifact_root`.
    pub fn new(
        artifact_root: impl Into<Utf8PathBuf>,
        cache_root: impl Into<Utf8PathBuf>,
        compress: bool,
        read_only: bool,
    ) -> Result<Self, Error> {
        let cache_root = cache_root.into();
        fs::create_dir_all(&cache_root).map_err(|err| Error::cache_io(&cache_root, err))?;
        Ok(Self {
            artifact_root: artifact_root.into(),
            cache_root,
            compress,
            read_only,
        })
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Result<Self, Error> {
        Self::new(
            config.artifact_root.clone(),
            config.cache_root.clone(),
            config.compress,
            config.read_only,
        )
    }

    /// Returns the root directory archives are extracted relative to.
    pub fn artifact_root(&self) -> &Utf8Path {
        &self.artifact_root
    }

    fn cache_dir_for_key(&self, key: &CacheKey) -> Utf8PathBuf {
        self.cache_root.join(safe_filename(&key.id))
    }

    fn cache_file_for_key(&self, key: &CacheKey) -> Utf8PathBuf {
        let extension = if self.compress { "tar.gz" } else { "tar" };
        self.cache_dir_for_key(key)
            .join(format!("{}.{}", key.hash, extension))
    }

    fn collect_into_archive(&self, paths: &[&Utf8Path], file: File) -> std::io::Result<()> {
        if self.compress {
            let encoder = GzEncoder::new(file, Compression::default());
            let encoder = self.append_paths(paths, encoder)?;
            encoder.finish()?;
        } else {
            self.append_paths(paths, file)?;
        }
        Ok(())
    }

    fn append_paths<W: std::io::Write>(
        &self,
        paths: &[&Utf8Path],
        writer: W,
    ) -> std::io::Result<W> {
        let mut builder = tar::Builder::new(writer);
        for rel in paths {
            let full = self.artifact_root.join(rel);
            if full.is_dir() {
                builder.append_dir_all(rel, &full)?;
            } else {
                builder.append_path_with_name(&full, rel)?;
            }
        }
        builder.into_inner()
    }
}

impl ArtifactCache for LocalArtifactCache {
    fn has(&self, key: &CacheKey) -> bool {
        self.cache_file_for_key(key).is_file()
    }

    fn try_insert(&self, key: &CacheKey, paths: &[&Utf8Path]) -> Result<(), Error> {
        if self.read_only {
            trace!(id = %key.id, "cache is read-only, skipping insert");
            return Ok(());
        }

        let archive_path = self.cache_file_for_key(key);
        let dir = self.cache_dir_for_key(key);
        fs::create_dir_all(&dir).map_err(|err| Error::cache_io(&dir, err))?;

        // Collect into a unique temporary name on the same filesystem, then
        // rename atomically. Concurrent writers of the same key may both do
        // this; rename makes the race harmless.
        let temp = tempfile::Builder::new()
            .prefix(".tmp.")
            .tempfile_in(&dir)
            .map_err(|err| Error::cache_io(&dir, err))?;
        let file = temp
            .reopen()
            .map_err(|err| Error::cache_io(&archive_path, err))?;
        self.collect_into_archive(paths, file)
            .map_err(|err| Error::cache_io(&archive_path, err))?;
        temp.persist(&archive_path)
            .map_err(|err| Error::cache_io(&archive_path, err.error))?;
        debug!(id = %key.id, hash = %key.hash, "stored artifact");
        Ok(())
    }

    fn use_cached_files(&self, key: &CacheKey) -> Result<Option<CachedArtifact>, Error> {
        let archive_path = self.cache_file_for_key(key);
        let file = match File::open(&archive_path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                trace!(id = %key.id, hash = %key.hash, "artifact cache miss");
                return Ok(None);
            }
            Err(err) => return Err(Error::cache_io(&archive_path, err)),
        };

        let extracted = if self.compress {
            tar::Archive::new(GzDecoder::new(file)).unpack(&self.artifact_root)
        } else {
            tar::Archive::new(file).unpack(&self.artifact_root)
        };

        match extracted {
            Ok(()) => {
                debug!(id = %key.id, hash = %key.hash, "artifact cache hit");
                Ok(Some(CachedArtifact { archive_path }))
            }
            Err(err) => {
                // Corruption is a miss: drop the entry and let the caller
                // re-run the work.
                warn!(
                    archive = %archive_path,
                    error = %err,
                    "cached artifact failed to extract, deleting"
                );
                match fs::remove_file(&archive_path) {
                    Ok(()) => Ok(None),
                    Err(remove_err) if remove_err.kind() == std::io::ErrorKind::NotFound => {
                        Ok(None)
                    }
                    Err(remove_err) => Err(Error::ArtifactCorruption {
                        path: archive_path,
                        message: format!(
                            "extraction failed ({}) and the entry could not be removed: {}",
                            err, remove_err
                        ),
                    }),
                }
            }
        }
    }

    fn delete(&self, key: &CacheKey) -> Result<(), Error> {
        let archive_path = self.cache_file_for_key(key);
        match fs::remove_file(&archive_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(Error::cache_io(&archive_path, err)),
        }
        // Drop the id directory too if this was its last entry.
        let _ = fs::remove_dir(self.cache_dir_for_key(key));
        Ok(())
    }

    fn prune(&self, age_hours: u64) -> Result<(), Error> {
        let cutoff = Duration::from_secs(age_hours * 60 * 60);
        let now = SystemTime::now();
        for entry in walkdir::WalkDir::new(&self.cache_root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !(name.ends_with(".tar") || name.ends_with(".tar.gz")) {
                continue;
            }
            let modified = match entry.metadata().ok().and_then(|meta| meta.modified().ok()) {
                Some(modified) => modified,
                None => continue,
            };
            let age = match now.duration_since(modified) {
                Ok(age) => age,
                Err(_) => continue,
            };
            if age >= cutoff {
                trace!(archive = %entry.path().display(), "pruning aged artifact");
                let _ = fs::remove_file(entry.path());
            }
        }
        Ok(())
    }
}
