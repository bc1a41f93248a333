// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The invalidation-relevant content of a target.

use crate::target::TargetKind;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One invalidation-relevant field value.
///
/// This mirrors the data subset of the BUILD-file language: anything an
/// author can declare that affects build output can be recorded here and
/// absorbed into a fingerprint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    /// An explicit `None`.
    None,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A string.
    Str(String),
    /// A list of values, order-significant.
    List(Vec<FieldValue>),
    /// A string-keyed map, ordered by key.
    Dict(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    fn absorb<D: Digest>(&self, hasher: &mut D) {
        match self {
            FieldValue::None => hasher.update([0u8]),
            FieldValue::Bool(b) => {
                hasher.update([1u8]);
                hasher.update([*b as u8]);
            }
            FieldValue::Int(i) => {
                hasher.update([2u8]);
                hasher.update(i.to_le_bytes());
            }
            FieldValue::Str(s) => {
                hasher.update([3u8]);
                absorb_str(hasher, s);
            }
            FieldValue::List(items) => {
                hasher.update([4u8]);
                hasher.update((items.len() as u64).to_le_bytes());
                for item in items {
                    item.absorb(hasher);
                }
            }
            FieldValue::Dict(entries) => {
                hasher.update([5u8]);
                hasher.update((entries.len() as u64).to_le_bytes());
                for (key, value) in entries {
                    absorb_str(hasher, key);
                    value.absorb(hasher);
                }
            }
        }
    }
}

/// The invalidation-relevant content of a target: its declared sources (by
/// path, in declaration order) and every option that affects build output.
///
/// Payloads expose one operation: given a hasher, absorb all bytes that, if
/// changed, should invalidate downstream cached outputs. The encoding is
/// length-prefixed throughout so that distinct payloads can never absorb
/// identical byte streams.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payload {
    kind: TargetKind,
    sources: Vec<String>,
    fields: BTreeMap<String, FieldValue>,
}

impl Payload {
    pub(crate) fn new(
        kind: TargetKind,
        sources: Vec<String>,
        fields: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            kind,
            sources,
            fields,
        }
    }

    /// Returns the kind of target this payload belongs to.
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Returns the declared source paths, relative to the target's spec
    /// path, in declaration order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Returns the named invalidation-relevant field, if declared.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns all invalidation-relevant fields, ordered by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Absorbs this payload's bytes into `hasher`.
    pub fn fingerprint<D: Digest>(&self, hasher: &mut D) {
        absorb_str(hasher, self.kind.alias());
        hasher.update((self.sources.len() as u64).to_le_bytes());
        for source in &self.sources {
            absorb_str(hasher, source);
        }
        hasher.update((self.fields.len() as u64).to_le_bytes());
        for (key, value) in &self.fields {
            absorb_str(hasher, key);
            value.absorb(hasher);
        }
    }

    /// Returns the hex digest of this payload alone. Used to order payload
    /// lists deterministically.
    pub(crate) fn fingerprint_hex(&self) -> String {
        let mut hasher = Sha256::new();
        self.fingerprint(&mut hasher);
        hex::encode(hasher.finalize())
    }
}

fn absorb_str<D: Digest>(hasher: &mut D, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
