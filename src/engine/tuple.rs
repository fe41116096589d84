//! Raw result tuples returned by a script executor
//!
//! A tuple is `key fields..., result`: the leading fields echo the metric's
//! key parameters in schema order and the last field is the computed value.

use serde::{Deserialize, Serialize};

/// One field of a raw tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawField {
    /// Integer (dates travel as `20101005`, counts as plain numbers).
    Int(i64),
    /// Text.
    Text(String),
    /// Ordered strings.
    List(Vec<String>),
    /// Bag of string tuples.
    Bag(Vec<Vec<String>>),
}

impl RawField {
    /// Render a scalar field as key text. Lists have no key form.
    #[must_use]
    pub fn as_key_text(&self) -> Option<String> {
        match self {
            Self::Int(v) => Some(v.to_string()),
            Self::Text(v) => Some(v.clone()),
            Self::List(_) | Self::Bag(_) => None,
        }
    }

    /// Short type name for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Bag(_) => "bag",
        }
    }
}

impl From<i64> for RawField {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for RawField {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RawField {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<String>> for RawField {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<Vec<Vec<String>>> for RawField {
    fn from(v: Vec<Vec<String>>) -> Self {
        Self::Bag(v)
    }
}

/// Ordered fields produced by one executor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTuple(Vec<RawField>);

impl RawTuple {
    /// Create an empty tuple.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a field at the end.
    pub fn append(&mut self, field: impl Into<RawField>) {
        self.0.push(field.into());
    }

    /// Append a field, builder style.
    #[must_use]
    pub fn with(mut self, field: impl Into<RawField>) -> Self {
        self.append(field);
        self
    }

    /// All fields in order.
    #[must_use]
    pub fn fields(&self) -> &[RawField] {
        &self.0
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the tuple has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into `(key fields, result field)`.
    #[must_use]
    pub fn split_result(self) -> Option<(Vec<RawField>, RawField)> {
        let mut fields = self.0;
        let result = fields.pop()?;
        Some((fields, result))
    }
}

impl From<Vec<RawField>> for RawTuple {
    fn from(fields: Vec<RawField>) -> Self {
        Self(fields)
    }
}
