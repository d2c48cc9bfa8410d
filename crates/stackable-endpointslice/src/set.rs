//! An unordered configuration set, deduplicated by a caller-supplied
//! [`SetHasher`].
//!
//! Members are keyed by their identity hash, which means iterating a
//! [`ConfigSet`] yields members in hash order, not in insertion order. Two
//! members with the same hash are considered to be the same member, the one
//! inserted first wins.
use std::{
    collections::{BTreeMap, btree_map},
    fmt::{self, Debug},
    sync::Arc,
};

use serde::{Serialize, Serializer, ser::SerializeSeq};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::keys;

/// The identity of a set member.
pub type SetHash = u64;

/// Computes the identity hash of a composite configuration element.
///
/// This is implemented for all `Fn(&Value) -> SetHash` closures, so ad-hoc
/// hashers don't need a dedicated type.
pub trait SetHasher: Send + Sync {
    fn hash(&self, value: &Value) -> SetHash;
}

impl<F> SetHasher for F
where
    F: Fn(&Value) -> SetHash + Send + Sync,
{
    fn hash(&self, value: &Value) -> SetHash {
        self(value)
    }
}

/// Hashes a structural, canonical form of the listed (visible) fields of a map.
///
/// Fields which are `null`, an empty string or an empty list don't contribute
/// to the hash, because they expand to the same unset state as a missing key.
/// For the same reason a `null` list item hashes like an empty map, so the
/// blocks `[null]` and `[{}]` are the same. Map keys are hashed in sorted order,
/// so the hash doesn't depend on the order a map was built in.
///
/// The hash is structural and knows nothing about field types: a wrongly shaped
/// field which is skipped while expanding still contributes to it. Two such
/// members can expand to equal domain objects.
#[derive(Clone, Copy, Debug)]
pub struct FieldHasher {
    fields: &'static [&'static str],
}

impl FieldHasher {
    pub const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }
}

impl SetHasher for FieldHasher {
    fn hash(&self, value: &Value) -> SetHash {
        let mut canonical = String::new();

        match value {
            Value::Object(map) => {
                for field in self.fields {
                    let Some(field_value) = map.get(*field) else {
                        continue;
                    };

                    if is_unset(field_value) {
                        continue;
                    }

                    canonical.push_str(field);
                    canonical.push('=');
                    write_canonical(field_value, &mut canonical);
                    canonical.push(';');
                }
            }
            other => write_canonical(other, &mut canonical),
        }

        digest(&canonical)
    }
}

/// The hasher used for the `endpoint` set of an EndpointSlice.
pub fn hash_endpoint_slice_endpoints() -> FieldHasher {
    FieldHasher::new(keys::ENDPOINT_HASH_FIELDS)
}

/// The hasher used for the `port` set of an EndpointSlice.
pub fn hash_endpoint_slice_ports() -> FieldHasher {
    FieldHasher::new(keys::PORT_HASH_FIELDS)
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(string) => string.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                match item {
                    Value::Null => out.push_str("{}"),
                    item => write_canonical(item, out),
                }
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().filter(|(_, v)| !is_unset(v)).collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            out.push('{');
            for (index, (key, value)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&format!("{key:?}:"));
                write_canonical(value, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn digest(canonical: &str) -> SetHash {
    let digest = Sha256::digest(canonical.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    SetHash::from_be_bytes(bytes)
}

/// An unordered collection of configuration elements with caller-defined
/// deduplication.
#[derive(Clone)]
pub struct ConfigSet {
    hasher: Arc<dyn SetHasher>,
    members: BTreeMap<SetHash, Value>,
}

impl ConfigSet {
    pub fn new(hasher: impl SetHasher + 'static) -> Self {
        Self {
            hasher: Arc::new(hasher),
            members: BTreeMap::new(),
        }
    }

    /// Builds a set from `values`, dropping every value whose hash is already
    /// present.
    pub fn from_values(
        hasher: impl SetHasher + 'static,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        let mut set = Self::new(hasher);
        set.extend(values);
        set
    }

    /// Computes the identity hash `value` would have in this set.
    pub fn hash_of(&self, value: &Value) -> SetHash {
        self.hasher.hash(value)
    }

    /// Inserts `value`, returning `false` if a member with the same hash is
    /// already present. The existing member is kept in that case.
    pub fn insert(&mut self, value: Value) -> bool {
        let hash = self.hash_of(&value);

        match self.members.entry(hash) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            btree_map::Entry::Occupied(_) => {
                tracing::trace!(hash, "dropping duplicate set member");
                false
            }
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.members.contains_key(&self.hash_of(value))
    }

    pub fn remove(&mut self, value: &Value) -> Option<Value> {
        let hash = self.hash_of(value);
        self.members.remove(&hash)
    }

    /// Iterates over all members. The order is stable for equal sets, but not
    /// related to insertion order.
    pub fn members(&self) -> btree_map::Values<'_, SetHash, Value> {
        self.members.values()
    }

    /// Iterates over all members together with their identity hash.
    pub fn iter(&self) -> btree_map::Iter<'_, SetHash, Value> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the members as a list, as stored in configuration state.
    pub fn to_list(&self) -> Vec<Value> {
        self.members.values().cloned().collect()
    }
}

impl Extend<Value> for ConfigSet {
    fn extend<T: IntoIterator<Item = Value>>(&mut self, values: T) {
        for value in values {
            self.insert(value);
        }
    }
}

impl IntoIterator for ConfigSet {
    type IntoIter = btree_map::IntoValues<SetHash, Value>;
    type Item = Value;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_values()
    }
}

impl<'a> IntoIterator for &'a ConfigSet {
    type IntoIter = btree_map::Values<'a, SetHash, Value>;
    type Item = &'a Value;

    fn into_iter(self) -> Self::IntoIter {
        self.members()
    }
}

impl From<ConfigSet> for Value {
    fn from(set: ConfigSet) -> Self {
        Value::Array(set.into_iter().collect())
    }
}

impl PartialEq for ConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Debug for ConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.members.values()).finish()
    }
}

impl Serialize for ConfigSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.members.len()))?;
        for member in self.members.values() {
            seq.serialize_element(member)?;
        }
        seq.end()
    }
}
