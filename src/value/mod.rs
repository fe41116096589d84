//! Result Value Types
//!
//! Every metric produces one of three shapes:
//!
//! | Shape              | Rust value                 | On-disk text                         |
//! |--------------------|----------------------------|--------------------------------------|
//! | `ScalarCount`      | `i64`                      | decimal integer                      |
//! | `StringList`       | `Vec<String>` (ordered)    | one JSON array of strings            |
//! | `ListOfStringList` | set of `Vec<String>`       | one JSON array per line, sorted      |
//!
//! `ListOfStringList` compares as a set: duplicate inner lists collapse,
//! inner order matters, outer order does not.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result shape declared by a metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultShape {
    /// Single integer count.
    ScalarCount,
    /// Ordered list of strings.
    StringList,
    /// Set of ordered string lists.
    ListOfStringList,
}

impl ResultShape {
    /// Value returned for a cache miss or an empty scan.
    #[must_use]
    pub fn default_value(&self) -> ResultValue {
        match self {
            Self::ScalarCount => ResultValue::Scalar(0),
            Self::StringList => ResultValue::StringList(Vec::new()),
            Self::ListOfStringList => ResultValue::ListOfStringList(ListOfStringList::new()),
        }
    }

    /// Get shape name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ScalarCount => "scalar-count",
            Self::StringList => "string-list",
            Self::ListOfStringList => "list-of-string-list",
        }
    }
}

/// Set of string lists with order-independent equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListOfStringList(BTreeSet<Vec<String>>);

impl ListOfStringList {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Insert an inner list. Returns `false` if it was already present.
    pub fn insert(&mut self, inner: Vec<String>) -> bool {
        self.0.insert(inner)
    }

    /// Check membership of an inner list.
    #[must_use]
    pub fn contains(&self, inner: &[String]) -> bool {
        self.0.contains(inner)
    }

    /// Number of distinct inner lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate inner lists in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Vec<String>> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for ListOfStringList {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|inner| inner.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// A computed (or defaulted) metric value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultValue {
    /// Integer count.
    Scalar(i64),
    /// Ordered strings.
    StringList(Vec<String>),
    /// Set of ordered string lists.
    ListOfStringList(ListOfStringList),
}

/// Text could not be parsed as the requested shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {shape}: {reason}")]
pub struct DecodeError {
    /// Shape the decoder was asked for
    pub shape: &'static str,
    /// Parser diagnostic
    pub reason: String,
}

impl ResultValue {
    /// Shape of this value.
    #[must_use]
    pub const fn shape(&self) -> ResultShape {
        match self {
            Self::Scalar(_) => ResultShape::ScalarCount,
            Self::StringList(_) => ResultShape::StringList,
            Self::ListOfStringList(_) => ResultShape::ListOfStringList,
        }
    }

    /// Get the count, if this is a scalar.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<i64> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the strings, if this is a string list.
    #[must_use]
    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(v) => Some(v),
            _ => None,
        }
    }

    /// Get the inner lists, if this is a list of string lists.
    #[must_use]
    pub const fn as_list_of_string_list(&self) -> Option<&ListOfStringList> {
        match self {
            Self::ListOfStringList(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this equals the shape's default (zero / empty).
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == self.shape().default_value()
    }

    /// Serialize to the on-disk text form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Scalar(v) => v.to_string(),
            Self::StringList(items) => json_array(items),
            Self::ListOfStringList(set) => set.iter().fold(String::new(), |mut out, inner| {
                out.push_str(&json_array(inner));
                out.push('\n');
                out
            }),
        }
    }

    /// Parse the on-disk text form of `shape`.
    ///
    /// # Errors
    /// Returns `DecodeError` if `text` is not a valid encoding of `shape`.
    pub fn decode(shape: ResultShape, text: &str) -> Result<Self, DecodeError> {
        let fail = |reason: String| DecodeError {
            shape: shape.as_str(),
            reason,
        };
        match shape {
            ResultShape::ScalarCount => text
                .trim()
                .parse::<i64>()
                .map(Self::Scalar)
                .map_err(|e| fail(e.to_string())),
            ResultShape::StringList => serde_json::from_str::<Vec<String>>(text.trim())
                .map(Self::StringList)
                .map_err(|e| fail(e.to_string())),
            ResultShape::ListOfStringList => {
                let mut set = ListOfStringList::new();
                for (idx, line) in text.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let inner: Vec<String> = serde_json::from_str(line)
                        .map_err(|e| fail(format!("line {}: {e}", idx + 1)))?;
                    set.insert(inner);
                }
                Ok(Self::ListOfStringList(set))
            }
        }
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::StringList(items) => f.write_str(&json_array(items)),
            Self::ListOfStringList(set) => {
                let inner: Vec<String> = set.iter().map(|i| json_array(i)).collect();
                write!(f, "{{{}}}", inner.join(", "))
            }
        }
    }
}

fn json_array(items: &[String]) -> String {
    Value::Array(items.iter().cloned().map(Value::String).collect()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_defaults_per_shape() {
        assert_eq!(ResultShape::ScalarCount.default_value(), ResultValue::Scalar(0));
        assert_eq!(
            ResultShape::StringList.default_value(),
            ResultValue::StringList(vec![])
        );
        assert!(ResultShape::ListOfStringList.default_value().is_default());
    }

    #[test]
    fn test_outer_order_ignored_inner_order_kept() {
        let a: ListOfStringList = vec![vec!["a", "b"], vec!["c", "d"]].into_iter().collect();
        let b: ListOfStringList = vec![vec!["c", "d"], vec!["a", "b"]].into_iter().collect();
        let c: ListOfStringList = vec![vec!["b", "a"], vec!["c", "d"]].into_iter().collect();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut set = ListOfStringList::new();
        assert!(set.insert(strings(&["ws", "user"])));
        assert!(!set.insert(strings(&["ws", "user"])));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&strings(&["ws", "user"])));
    }

    #[test]
    fn test_scalar_encoding() {
        assert_eq!(ResultValue::Scalar(42).encode(), "42");
        assert_eq!(
            ResultValue::decode(ResultShape::ScalarCount, "42\n").unwrap(),
            ResultValue::Scalar(42)
        );
        assert_eq!(
            ResultValue::decode(ResultShape::ScalarCount, "-7").unwrap(),
            ResultValue::Scalar(-7)
        );
    }

    #[test]
    fn test_string_list_keeps_order_and_escapes() {
        let value = ResultValue::StringList(strings(&["z", "a,b", "line\nbreak", ""]));
        let text = value.encode();
        assert!(!text.contains('\n'));
        assert_eq!(ResultValue::decode(ResultShape::StringList, &text).unwrap(), value);
    }

    #[test]
    fn test_list_of_string_list_one_line_per_inner() {
        let value = ResultValue::ListOfStringList(
            vec![vec!["ws2", "user2"], vec!["ws1", "user1"]].into_iter().collect(),
        );
        let text = value.encode();
        assert_eq!(text, "[\"ws1\",\"user1\"]\n[\"ws2\",\"user2\"]\n");
        assert_eq!(
            ResultValue::decode(ResultShape::ListOfStringList, &text).unwrap(),
            value
        );
    }

    #[test]
    fn test_empty_values_roundtrip() {
        for shape in [
            ResultShape::ScalarCount,
            ResultShape::StringList,
            ResultShape::ListOfStringList,
        ] {
            let value = shape.default_value();
            assert_eq!(ResultValue::decode(shape, &value.encode()).unwrap(), value);
        }
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        assert!(ResultValue::decode(ResultShape::ScalarCount, "abc").is_err());
        assert!(ResultValue::decode(ResultShape::ScalarCount, "").is_err());
        assert!(ResultValue::decode(ResultShape::StringList, "42").is_err());
        let err = ResultValue::decode(ResultShape::ListOfStringList, "[\"a\"]\n{oops").unwrap_err();
        assert!(err.reason.contains("line 2"));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(ResultValue::Scalar(3).as_scalar(), Some(3));
        assert!(ResultValue::Scalar(3).as_string_list().is_none());
        let list = ResultValue::StringList(strings(&["a"]));
        assert_eq!(list.as_string_list(), Some(&["a".to_string()][..]));
        assert_eq!(list.shape(), ResultShape::StringList);
    }
}
