// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache keys: stable content fingerprints over target payloads.

use crate::address::Address;
use crate::errors::Error;
use crate::graph::BuildGraph;
use crate::payload::Payload;
use crate::sorted_vec::SortedVec;
use crate::target::Target;
use debug_ignore::DebugIgnore;
use itertools::Itertools;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Mixed into every generated key. Bump this when key generation changes in
/// a backward-incompatible way; doing so invalidates all existing keys.
pub const GENERATOR_VERSION: &str = "1";

/// A stable fingerprint identifying one build-input set.
///
/// `id` is a human-readable identifier derived from the target (or
/// combined-target) address; `hash` is a hex digest over everything that
/// should invalidate downstream cached outputs; `payloads` records the
/// payloads that contributed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CacheKey {
    /// Human-readable identifier for the target(s) this key covers.
    pub id: String,
    /// Hex fingerprint of the covered build inputs.
    pub hash: String,
    /// The payloads that contributed to `hash`.
    pub payloads: DebugIgnore<Vec<Payload>>,
}

impl CacheKey {
    /// Creates a key directly from its parts.
    pub fn new(id: impl Into<String>, hash: impl Into<String>, payloads: Vec<Payload>) -> Self {
        Self {
            id: id.into(),
            hash: hash.into(),
            payloads: DebugIgnore(payloads),
        }
    }
}

/// Generates [`CacheKey`]s for targets in a build graph.
///
/// Every key is seeded with the generator's version string: the
/// concatenation of a user-configured version and [`GENERATOR_VERSION`].
/// Bumping either invalidates all keys.
#[derive(Clone, Debug)]
pub struct CacheKeyGenerator {
    version: String,
}

impl CacheKeyGenerator {
    /// Creates a generator with an empty user version.
    pub fn new() -> Self {
        Self::with_version("")
    }

    /// Creates a generator whose keys are additionally seeded with
    /// `user_version`.
    pub fn with_version(user_version: &str) -> Self {
        Self {
            version: format!("{}{}", user_version, GENERATOR_VERSION),
        }
    }

    /// Returns the full version string mixed into every key.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Computes the cache key for `target`.
    ///
    /// With `transitive` set, keys are computed recursively for each direct
    /// dependency recorded in the graph's edge map; the dependency hashes
    /// are sorted lexicographically before being absorbed, so the result is
    /// independent of edge iteration order.
    pub fn key_for_target(
        &self,
        graph: &BuildGraph,
        target: &Target,
        transitive: bool,
    ) -> Result<CacheKey, Error> {
        let mut memo = HashMap::new();
        let hash = self.hash_target(graph, target, transitive, &mut memo)?;
        Ok(CacheKey {
            id: target.id(),
            hash,
            payloads: DebugIgnore(vec![target.payload().clone()]),
        })
    }

    fn hash_target(
        &self,
        graph: &BuildGraph,
        target: &Target,
        transitive: bool,
        memo: &mut HashMap<Address, String>,
    ) -> Result<String, Error> {
        if let Some(hash) = memo.get(target.address()) {
            return Ok(hash.clone());
        }

        let mut hasher = Sha256::new();
        hasher.update(self.version.as_bytes());
        target.payload().fingerprint(&mut hasher);

        if transitive {
            let mut dep_hashes = Vec::new();
            for dep in graph.direct_dependencies(target.address())? {
                let dep_target = graph.target(dep).ok_or_else(|| {
                    Error::GraphInternal(format!("edge references unknown address '{}'", dep))
                })?;
                dep_hashes.push(self.hash_target(graph, dep_target, true, memo)?);
            }
            let dep_hashes = SortedVec::new(dep_hashes);
            for hash in dep_hashes.as_slice() {
                hasher.update((hash.len() as u64).to_le_bytes());
                hasher.update(hash.as_bytes());
            }
        }

        let hash = hex::encode(hasher.finalize());
        memo.insert(target.address().clone(), hash.clone());
        Ok(hash)
    }
}

impl Default for CacheKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Combines several cache keys into one key covering all of their inputs.
///
/// Combination is *commutative* -- inputs are sorted, so any permutation
/// yields the same key -- but deliberately *not* associative: combining
/// incrementally hashes a hash-of-hashes and produces a different result.
/// Callers must combine all keys in one operation.
///
/// A singleton input is returned unchanged. The input must be non-empty.
pub fn combine_cache_keys(mut keys: Vec<CacheKey>) -> CacheKey {
    assert!(!keys.is_empty(), "combine_cache_keys requires at least one key");
    if keys.len() == 1 {
        return keys.pop().expect("length was checked above");
    }

    let id = keys.iter().map(|key| key.id.as_str()).sorted().join("+");

    let hashes: SortedVec<&str> = keys.iter().map(|key| key.hash.as_str()).collect();
    let mut hasher = Sha256::new();
    for hash in hashes.as_slice() {
        hasher.update((hash.len() as u64).to_le_bytes());
        hasher.update(hash.as_bytes());
    }
    let hash = hex::encode(hasher.finalize());

    let payloads = keys
        .iter()
        .flat_map(|key| key.payloads.iter().cloned())
        .map(|payload| (payload.fingerprint_hex(), payload))
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, payload)| payload)
        .collect();

    CacheKey {
        id,
        hash,
        payloads: DebugIgnore(payloads),
    }
}
