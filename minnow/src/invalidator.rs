// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent store of last-known-good cache-key hashes.

use crate::errors::Error;
use crate::fingerprint::CacheKey;
use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use tracing::debug;

// Escaped filenames longer than this fall back to a digest of the id.
const MAX_SAFE_FILENAME_LEN: usize = 100;

/// A persistent, on-disk map from cache-key id to the last hash that
/// produced a good build.
///
/// Layout: one file per id at `<root>/<version>/<safe_filename(id)>.hash`,
/// containing the hex hash. There is no locking between processes; writes
/// are atomic whole-file replacements, last writer wins, and every reader
/// re-verifies through [`needs_update`] before reusing anything.
///
/// [`needs_update`]: Self::needs_update
#[derive(Clone, Debug)]
pub struct BuildInvalidator {
    root: Utf8PathBuf,
}

impl BuildInvalidator {
    /// Creates an invalidator rooted at `<root>/<generator_version>`.
    ///
    /// Versioning the root means bumping the generator version orphans (but
    /// does not delete) all previously recorded hashes.
    pub fn new(root: impl AsRef<Utf8Path>, generator_version: &str) -> Result<Self, Error> {
        let root = root.as_ref().join(generator_version);
        fs::create_dir_all(&root).map_err(|err| Error::cache_io(&root, err))?;
        Ok(Self { root })
    }

    /// Returns true iff the on-disk hash for `key.id` differs from
    /// `key.hash` or is absent.
    pub fn needs_update(&self, key: &CacheKey) -> Result<bool, Error> {
        Ok(self.existing_hash(&key.id)?.as_deref() != Some(key.hash.as_str()))
    }

    /// Records `key.hash` as the last good hash for `key.id`, overwriting
    /// any previous record.
    pub fn update(&self, key: &CacheKey) -> Result<(), Error> {
        let path = self.hash_file(&key.id);
        let mut temp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|err| Error::cache_io(&self.root, err))?;
        temp.write_all(key.hash.as_bytes())
            .map_err(|err| Error::cache_io(&path, err))?;
        temp.persist(&path)
            .map_err(|err| Error::cache_io(&path, err.error))?;
        debug!(id = %key.id, hash = %key.hash, "recorded last good hash");
        Ok(())
    }

    /// Forgets the recorded hash for `key.id`. Missing records are not an
    /// error.
    pub fn force_invalidate(&self, key: &CacheKey) -> Result<(), Error> {
        let path = self.hash_file(&key.id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::cache_io(&path, err)),
        }
    }

    /// Forgets every recorded hash.
    pub fn force_invalidate_all(&self) -> Result<(), Error> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(Error::cache_io(&self.root, err)),
        }
        fs::create_dir_all(&self.root).map_err(|err| Error::cache_io(&self.root, err))
    }

    /// Returns the recorded hash for `id`, or `None` if absent.
    pub fn existing_hash(&self, id: &str) -> Result<Option<String>, Error> {
        let path = self.hash_file(id);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents.trim().to_owned())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::cache_io(&path, err)),
        }
    }

    fn hash_file(&self, id: &str) -> Utf8PathBuf {
        self.root.join(format!("{}.hash", safe_filename(id)))
    }
}

/// Maps an id to a filename that is unique even on case-insensitive
/// filesystems.
///
/// Lowercase ASCII alphanumerics and `._-` pass through; every other byte
/// (including uppercase letters, which would collide with their lowercase
/// forms on a case-insensitive filesystem) is escaped as `%XX`. Ids whose
/// escaped form would be unreasonably long use a digest of the id instead.
pub(crate) fn safe_filename(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => escaped.push(byte as char),
            other => escaped.push_str(&format!("%{:02x}", other)),
        }
    }
    if escaped.len() > MAX_SAFE_FILENAME_LEN {
        let mut hasher = Sha256::new();
        hasher.update(id.as_bytes());
        hex::encode(hasher.finalize())
    } else {
        escaped
    }
}
