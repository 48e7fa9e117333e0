//! Feature records, attribute values and collection schemas.

use crate::error::GeometryError;
use crate::geometry::parse_feature_shape;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Stable feature identifier, unique within its collection.
pub type FeatureId = u64;

/// Attribute value stored on a feature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
}

impl FieldValue {
    /// Check for the store null sentinel.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text form of the value. Null renders as the empty string.
    ///
    /// Integral numbers render without a fractional part, so `210400.0`
    /// compares equal to the text `"210400"`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Null => Cow::Borrowed(""),
            FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
            FieldValue::Number(n) => Cow::Owned(format_number(*n)),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

/// Declared kind of an attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
}

impl FieldKind {
    /// Check whether a value can be stored in a field of this kind.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (_, FieldValue::Null) => true,
            (FieldKind::Text, FieldValue::Text(_)) => true,
            (FieldKind::Number, FieldValue::Number(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
        }
    }
}

/// Attribute field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Number,
        }
    }
}

/// Position of a field within a collection schema.
///
/// Only meaningful for the schema it was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldIndex(usize);

impl FieldIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Ordered set of attribute fields of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Find a field by name, ignoring ASCII case.
    pub fn find_field(&self, name: &str) -> Option<FieldIndex> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .map(FieldIndex)
    }

    pub fn field(&self, index: FieldIndex) -> Option<&FieldDef> {
        self.fields.get(index.0)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A geometric record: identifier, WKT shape and attribute values.
///
/// Values are positional and line up with the owning collection's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: FeatureId,
    wkt: Arc<str>,
    values: Vec<FieldValue>,
}

impl Feature {
    pub fn new(id: FeatureId, wkt: impl Into<Arc<str>>, values: Vec<FieldValue>) -> Self {
        Self {
            id,
            wkt: wkt.into(),
            values,
        }
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    /// Stored shape as WKT.
    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    /// Parse the stored shape.
    pub fn geometry(&self) -> Result<Geometry<f64>, GeometryError> {
        parse_feature_shape(self.id, &self.wkt)
    }

    /// Raw value at `index`; out-of-range positions read as null.
    pub fn value(&self, index: FieldIndex) -> &FieldValue {
        const NULL: &FieldValue = &FieldValue::Null;
        self.values.get(index.0).unwrap_or(NULL)
    }

    /// Set the value at `index`, growing the value row if needed.
    pub fn set_value(&mut self, index: FieldIndex, value: FieldValue) {
        if index.0 >= self.values.len() {
            self.values.resize(index.0 + 1, FieldValue::Null);
        }
        self.values[index.0] = value;
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub(crate) fn replace_values(&mut self, values: Vec<FieldValue>) -> Vec<FieldValue> {
        std::mem::replace(&mut self.values, values)
    }
}
