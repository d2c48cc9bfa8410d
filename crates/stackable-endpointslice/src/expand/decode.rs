//! Typed access to the fields of a single, dynamically-typed configuration
//! element.
//!
//! Every read returns `Ok(None)` for missing and `null` fields. Present fields
//! of the wrong shape are handled according to the [`ShapeMismatchPolicy`].
use std::{
    collections::BTreeMap,
    fmt::{Display, Write},
    str::FromStr,
};

use serde_json::{Map, Value};
use snafu::OptionExt;

use super::{MissingFieldSnafu, Result, TypeMismatchSnafu};
use crate::options::ShapeMismatchPolicy;

pub(crate) const OBJECT: &str = "an object";
pub(crate) const STRING: &str = "a string";
pub(crate) const BOOLEAN: &str = "a boolean";
pub(crate) const LIST: &str = "a list";
pub(crate) const STRING_LIST: &str = "a list of strings";
pub(crate) const STRING_MAP: &str = "a map of strings";
pub(crate) const PORT_NUMBER: &str = "an integer between 0 and 65535";

/// The location of a field within a configuration document, e.g.
/// `endpoint.0.target_ref.0.uid`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn root(segment: impl Display) -> Self {
        Self::default().join(segment)
    }

    /// Returns a new path pointing at `segment` below `self`.
    pub fn join(&self, segment: impl Display) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }

        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_char('.')?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

pub(crate) struct Decoder<'a> {
    fields: Option<&'a Map<String, Value>>,
    path: FieldPath,
    policy: ShapeMismatchPolicy,
}

impl<'a> Decoder<'a> {
    /// Wraps a set or list element, which must be an object or `null`.
    ///
    /// A non-object element is a structural error and fails regardless of the
    /// policy.
    pub(crate) fn new(
        element: &'a Value,
        path: FieldPath,
        policy: ShapeMismatchPolicy,
    ) -> Result<Self> {
        let fields = match element {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => return strict_mismatch(path, OBJECT, other),
        };

        Ok(Self {
            fields,
            path,
            policy,
        })
    }

    /// Wraps the first element of a nested block. An empty block behaves like
    /// an element without any fields.
    pub(crate) fn first_of(
        block: &'a [Value],
        path: FieldPath,
        policy: ShapeMismatchPolicy,
    ) -> Result<Self> {
        let path = path.join(0);

        match block.first() {
            Some(element) => Self::new(element, path, policy),
            None => Ok(Self {
                fields: None,
                path,
                policy,
            }),
        }
    }

    pub(crate) fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Returns `true` if the element is `null`, missing or has no fields.
    pub(crate) fn is_empty(&self) -> bool {
        self.fields.is_none_or(Map::is_empty)
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields
            .and_then(|fields| fields.get(key))
            .filter(|value| !value.is_null())
    }

    fn mismatch<T>(&self, key: &str, expected: &'static str, found: &Value) -> Result<Option<T>> {
        let path = self.path.join(key);

        match self.policy {
            ShapeMismatchPolicy::Skip => {
                tracing::debug!(%path, expected, %found, "ignoring wrongly shaped field");
                Ok(None)
            }
            ShapeMismatchPolicy::Fail => strict_mismatch(path, expected, found),
        }
    }

    /// Reads a non-empty string. Empty strings are indistinguishable from
    /// unset fields.
    pub(crate) fn string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(non_empty(value)),
            Some(other) => self.mismatch(key, STRING, other),
        }
    }

    /// Like [`Self::string`], but a wrongly shaped value always fails.
    ///
    /// Used for fields whose kind is fixed by the API contract.
    pub(crate) fn strict_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(non_empty(value)),
            Some(other) => strict_mismatch(self.path.join(key), STRING, other),
        }
    }

    pub(crate) fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(other) => self.mismatch(key, BOOLEAN, other),
        }
    }

    /// Reads a port number. `0` is a valid port and is kept.
    pub(crate) fn port(&self, key: &str) -> Result<Option<i32>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };

        match value
            .as_u64()
            .and_then(|number| u16::try_from(number).ok())
        {
            Some(port) => Ok(Some(i32::from(port))),
            None => self.mismatch(key, PORT_NUMBER, value),
        }
    }

    /// Reads a non-empty string and parses it into `T`. Strings which fail to
    /// parse count as wrongly shaped.
    pub(crate) fn parse<T: FromStr>(
        &self,
        key: &str,
        expected: &'static str,
    ) -> Result<Option<T>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };

        match value.as_str() {
            Some("") => Ok(None),
            Some(string) => match string.parse() {
                Ok(parsed) => Ok(Some(parsed)),
                Err(_) => self.mismatch(key, expected, value),
            },
            None => self.mismatch(key, expected, value),
        }
    }

    /// Like [`Self::parse`], but the field must be present and a wrongly shaped
    /// value always fails.
    ///
    /// Used for required fields whose values are fixed by the API contract.
    pub(crate) fn required_parse<T: FromStr>(
        &self,
        key: &str,
        expected: &'static str,
    ) -> Result<T> {
        let path = self.path.join(key);
        let value = self.get(key).context(MissingFieldSnafu { path: path.clone() })?;

        match value.as_str() {
            Some("") => MissingFieldSnafu { path }.fail(),
            Some(string) => match string.parse() {
                Ok(parsed) => Ok(parsed),
                Err(_) => strict_mismatch(path, expected, value),
            },
            None => strict_mismatch(path, expected, value),
        }
    }

    /// Reads a non-empty list of strings. A list containing anything but
    /// strings is wrongly shaped as a whole.
    pub(crate) fn string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };

        let Some(items) = value.as_array() else {
            return self.mismatch(key, STRING_LIST, value);
        };

        if items.is_empty() {
            return Ok(None);
        }

        match items
            .iter()
            .map(|item| item.as_str().map(ToOwned::to_owned))
            .collect::<Option<Vec<_>>>()
        {
            Some(strings) => Ok(Some(strings)),
            None => self.mismatch(key, STRING_LIST, value),
        }
    }

    /// Reads a non-empty map of strings, such as labels.
    pub(crate) fn string_map(&self, key: &str) -> Result<Option<BTreeMap<String, String>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };

        let Some(entries) = value.as_object() else {
            return self.mismatch(key, STRING_MAP, value);
        };

        if entries.is_empty() {
            return Ok(None);
        }

        match entries
            .iter()
            .map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
            .collect::<Option<BTreeMap<_, _>>>()
        {
            Some(map) => Ok(Some(map)),
            None => self.mismatch(key, STRING_MAP, value),
        }
    }

    /// Reads a non-empty list, such as a nested block or a set.
    pub(crate) fn list(&self, key: &str) -> Result<Option<&'a [Value]>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) if items.is_empty() => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.as_slice())),
            Some(other) => self.mismatch(key, LIST, other),
        }
    }
}

fn strict_mismatch<T>(path: FieldPath, expected: &'static str, found: &Value) -> Result<T> {
    TypeMismatchSnafu {
        path,
        expected,
        found: found.clone(),
    }
    .fail()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}
