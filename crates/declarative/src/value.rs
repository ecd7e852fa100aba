//! Attribute value model
//!
//! [`AttributeValue`] is the single representation used for desired
//! configuration, recorded state and planned state. Null, unknown and
//! concrete values are distinct variants and are never collapsed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute values of one object, keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A single step in an [`AttributePath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PathStep {
    /// Named attribute or block
    Attribute(String),
    /// Position within a list
    Index(usize),
}

/// Location of a value within a resource, rendered as `a.b[0].c`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributePath(Vec<PathStep>);

impl AttributePath {
    /// The path of the resource object itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to a top-level attribute.
    pub fn attribute(name: &str) -> Self {
        Self::root().child(name)
    }

    /// Extend this path with a named attribute.
    pub fn child(&self, name: &str) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Attribute(name.to_string()));
        Self(steps)
    }

    /// Extend this path with a list index.
    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Index(index));
        Self(steps)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }
        for (i, step) in self.0.iter().enumerate() {
            match step {
                PathStep::Attribute(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Attribute(name) => write!(f, ".{name}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// A concrete scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Bool(bool),
    Number(Number),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Value of an attribute in configuration, prior state or planned state.
///
/// Equality is variant-aware: [`AttributeValue::Unknown`] is never equal to
/// anything, including another `Unknown`. Use [`AttributeValue::same_as`]
/// for an identity comparison that treats two unknowns as the same.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// No value
    #[default]
    Null,
    /// Value will be known only after reconciliation
    Unknown,
    Scalar(Scalar),
    List(Vec<AttributeValue>),
    Object(Attributes),
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(value.into()))
    }

    pub fn bool(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }

    pub fn number(value: impl Into<Number>) -> Self {
        Self::Scalar(Scalar::Number(value.into()))
    }

    /// Build an object from `(name, value)` pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttributeValue)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Whether an `Unknown` appears anywhere in this value.
    pub fn contains_unknown(&self) -> bool {
        match self {
            Self::Unknown => true,
            Self::List(items) => items.iter().any(Self::contains_unknown),
            Self::Object(attrs) => attrs.values().any(Self::contains_unknown),
            Self::Null | Self::Scalar(_) => false,
        }
    }

    /// Whether the value is fully known.
    pub fn is_known(&self) -> bool {
        !self.contains_unknown()
    }

    /// Structural identity, treating `Unknown` as identical to `Unknown`.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Unknown, Self::Unknown) => true,
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            (Self::Object(a), Self::Object(b)) => same_attributes(a, b),
            _ => false,
        }
    }

    /// Name of the variant, as used in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Unknown => "unknown",
            Self::Scalar(Scalar::String(_)) => "string",
            Self::Scalar(Scalar::Bool(_)) => "bool",
            Self::Scalar(Scalar::Number(_)) => "number",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Scalar(Scalar::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Attributes> {
        match self {
            Self::Object(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Look up a named attribute of an object value.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.as_object().and_then(|attrs| attrs.get(name))
    }

    /// Convert to a native type, reporting `path` on mismatch.
    pub fn decode_as<T: FromAttribute>(&self, path: &AttributePath) -> Result<T> {
        T::from_attribute(self, path)
    }
}

/// Identity comparison of two attribute maps.
pub fn same_attributes(a: &Attributes, b: &Attributes) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|((ka, va), (kb, vb))| ka == kb && va.same_as(vb))
}

/// Convert a named attribute of `attrs` to a native type.
///
/// A missing attribute converts like `Null`.
pub fn get_as<T: FromAttribute>(attrs: &Attributes, name: &str) -> Result<T> {
    let path = AttributePath::attribute(name);
    attrs
        .get(name)
        .unwrap_or(&AttributeValue::Null)
        .decode_as(&path)
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Unknown => write!(f, "(known after apply)"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(attrs) => {
                write!(f, "{{")?;
                for (i, (name, value)) in attrs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {name} = {value}")?;
                }
                write!(f, " }}")
            }
        }
    }
}

/// Serialize a value to its JSON encoding.
pub fn encode(value: &AttributeValue) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Parse a value from its JSON encoding.
pub fn decode(encoded: &str) -> Result<AttributeValue> {
    Ok(serde_json::from_str(encoded)?)
}

// ============================================================================
// Typed conversion
// ============================================================================

/// Fallible conversion from an [`AttributeValue`].
pub trait FromAttribute: Sized {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self>;
}

/// Conversion into an [`AttributeValue`].
pub trait IntoAttribute {
    fn into_attribute(self) -> AttributeValue;
}

fn mismatch(path: &AttributePath, expected: &'static str, value: &AttributeValue) -> Error {
    Error::TypeMismatch {
        path: path.clone(),
        expected,
        found: value.type_name(),
    }
}

impl FromAttribute for AttributeValue {
    fn from_attribute(value: &AttributeValue, _path: &AttributePath) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromAttribute for String {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(path, "string", value))
    }
}

impl FromAttribute for bool {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch(path, "bool", value))
    }
}

impl FromAttribute for i64 {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self> {
        value
            .as_number()
            .and_then(Number::as_i64)
            .ok_or_else(|| mismatch(path, "integer", value))
    }
}

impl FromAttribute for u16 {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self> {
        value
            .as_number()
            .and_then(Number::as_u64)
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| mismatch(path, "port number", value))
    }
}

impl FromAttribute for f64 {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self> {
        value
            .as_number()
            .and_then(Number::as_f64)
            .ok_or_else(|| mismatch(path, "number", value))
    }
}

impl<T: FromAttribute> FromAttribute for Option<T> {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self> {
        match value {
            AttributeValue::Null => Ok(None),
            other => T::from_attribute(other, path).map(Some),
        }
    }
}

impl<T: FromAttribute> FromAttribute for Vec<T> {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self> {
        let items = value.as_list().ok_or_else(|| mismatch(path, "list", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_attribute(item, &path.index(i)))
            .collect()
    }
}

impl<T: FromAttribute> FromAttribute for BTreeMap<String, T> {
    fn from_attribute(value: &AttributeValue, path: &AttributePath) -> Result<Self> {
        let attrs = value
            .as_object()
            .ok_or_else(|| mismatch(path, "object", value))?;
        attrs
            .iter()
            .map(|(name, item)| Ok((name.clone(), T::from_attribute(item, &path.child(name))?)))
            .collect()
    }
}

impl IntoAttribute for AttributeValue {
    fn into_attribute(self) -> AttributeValue {
        self
    }
}

impl IntoAttribute for String {
    fn into_attribute(self) -> AttributeValue {
        AttributeValue::string(self)
    }
}

impl IntoAttribute for &str {
    fn into_attribute(self) -> AttributeValue {
        AttributeValue::string(self)
    }
}

impl IntoAttribute for bool {
    fn into_attribute(self) -> AttributeValue {
        AttributeValue::bool(self)
    }
}

impl IntoAttribute for i64 {
    fn into_attribute(self) -> AttributeValue {
        AttributeValue::number(self)
    }
}

impl IntoAttribute for u16 {
    fn into_attribute(self) -> AttributeValue {
        AttributeValue::number(self)
    }
}

impl IntoAttribute for f64 {
    fn into_attribute(self) -> AttributeValue {
        Number::from_f64(self).map_or(AttributeValue::Null, |n| {
            AttributeValue::Scalar(Scalar::Number(n))
        })
    }
}

impl<T: IntoAttribute> IntoAttribute for Option<T> {
    fn into_attribute(self) -> AttributeValue {
        self.map_or(AttributeValue::Null, IntoAttribute::into_attribute)
    }
}

impl<T: IntoAttribute> IntoAttribute for Vec<T> {
    fn into_attribute(self) -> AttributeValue {
        AttributeValue::List(self.into_iter().map(IntoAttribute::into_attribute).collect())
    }
}

impl<T: IntoAttribute> IntoAttribute for BTreeMap<String, T> {
    fn into_attribute(self) -> AttributeValue {
        AttributeValue::Object(
            self.into_iter()
                .map(|(name, value)| (name, value.into_attribute()))
                .collect(),
        )
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::number(value)
    }
}
