//! Metric Kind - a named, schema-typed aggregation job

use serde::{Deserialize, Serialize};

use super::{MetricParameter, ParameterMapping};
use crate::engine::{RawField, RawTuple};
use crate::value::{ListOfStringList, ResultShape, ResultValue};
use crate::{Error, Result};

/// Aggregation logic a metric kind dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Number of workspaces alive at some point of the range.
    ActiveTenantCount,
    /// Sorted ids of workspaces alive at some point of the range.
    ActiveTenantList,
    /// `[workspace, user]` pairs for shell launches in the range.
    UsersShellLaunched,
    /// `[workspace, user]` pairs for project creations in the range.
    UsersCreatedProjects,
    /// Users with the most project creations in the range, best first.
    TopProjectCreators,
}

impl Aggregation {
    /// Result shape this aggregation produces.
    #[must_use]
    pub const fn shape(&self) -> ResultShape {
        match self {
            Self::ActiveTenantCount => ResultShape::ScalarCount,
            Self::ActiveTenantList | Self::TopProjectCreators => ResultShape::StringList,
            Self::UsersShellLaunched | Self::UsersCreatedProjects => ResultShape::ListOfStringList,
        }
    }

    /// Whether the aggregation reads a `LIMIT` parameter.
    #[must_use]
    pub const fn needs_limit(&self) -> bool {
        matches!(self, Self::TopProjectCreators)
    }
}

/// Metric kind descriptor.
///
/// ## Schema rules
///
/// - the first parameter opens the date range (`DATE` or `FROM_DATE`)
/// - `TO_DATE` is present exactly once
/// - `LIMIT` is present iff the aggregation needs it
///
/// The schema order is the key order: it decides the storage path.
///
/// The identifier is the top-level storage directory, so it must be a
/// single plain path component. Deserialization runs the same checks as
/// [`new`](Self::new).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MetricKindRepr")]
pub struct MetricKind {
    identifier: String,
    parameters: Vec<MetricParameter>,
    shape: ResultShape,
    aggregation: Aggregation,
}

impl MetricKind {
    /// Create a metric kind. The result shape follows from the aggregation.
    ///
    /// # Errors
    /// - `Error::InvalidIdentifier` if the identifier is empty, `.`, `..`,
    ///   or contains a path separator
    /// - `Error::ParameterArityMismatch` if the schema breaks the rules above
    pub fn new(
        identifier: impl Into<String>,
        parameters: Vec<MetricParameter>,
        aggregation: Aggregation,
    ) -> Result<Self> {
        let identifier = identifier.into();
        if identifier.is_empty()
            || identifier == "."
            || identifier == ".."
            || identifier.contains(['/', '\\', '\0'])
        {
            return Err(Error::InvalidIdentifier(identifier));
        }

        let kind = Self {
            identifier,
            parameters,
            shape: aggregation.shape(),
            aggregation,
        };
        kind.validate()?;
        Ok(kind)
    }

    fn validate(&self) -> Result<()> {
        let occurrences = |p: MetricParameter| self.parameters.iter().filter(|&&q| q == p).count();
        let range_starts = self.parameters.iter().filter(|p| p.is_range_start()).count();

        let valid = self.parameters.first().is_some_and(MetricParameter::is_range_start)
            && range_starts == 1
            && occurrences(MetricParameter::ToDate) == 1
            && occurrences(MetricParameter::Limit) == usize::from(self.aggregation.needs_limit());

        if valid {
            Ok(())
        } else {
            let mut expected = "DATE|FROM_DATE, TO_DATE".to_string();
            if self.aggregation.needs_limit() {
                expected.push_str(", LIMIT");
            }
            Err(self.arity_error(expected, self.schema_names()))
        }
    }

    /// Get the unique identifier (also the top-level storage directory).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Get the ordered parameter schema.
    #[must_use]
    pub fn parameters(&self) -> &[MetricParameter] {
        &self.parameters
    }

    /// Get the result shape.
    #[must_use]
    pub const fn shape(&self) -> ResultShape {
        self.shape
    }

    /// Get the aggregation tag.
    #[must_use]
    pub const fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Value for a cache miss or a scan with no matching events.
    #[must_use]
    pub fn default_value(&self) -> ResultValue {
        self.shape.default_value()
    }

    /// Build a key from values given in schema order.
    ///
    /// # Errors
    /// - `Error::ParameterArityMismatch` if the value count differs from the schema
    /// - `Error::ParameterTypeError` if a value does not coerce, or the range
    ///   start is after `TO_DATE`
    pub fn make_key<S: AsRef<str>>(&self, values: &[S]) -> Result<ParameterMapping> {
        if values.len() != self.parameters.len() {
            let actual = values.iter().map(|v| v.as_ref()).collect::<Vec<&str>>().join(", ");
            return Err(self.arity_error(self.schema_names(), format!("[{actual}]")));
        }

        let entries = self
            .parameters
            .iter()
            .zip(values)
            .map(|(p, v)| (*p, v.as_ref().to_string()))
            .collect();

        ParameterMapping::validated(self.identifier.clone(), entries)
    }

    /// Build a key from named parameters given in any order.
    ///
    /// # Errors
    /// - `Error::ParameterArityMismatch` if a schema parameter is missing or
    ///   an unexpected one is supplied
    /// - `Error::ParameterTypeError` as for [`make_key`](Self::make_key)
    pub fn make_key_named<I, S>(&self, named: I) -> Result<ParameterMapping>
    where
        I: IntoIterator<Item = (MetricParameter, S)>,
        S: Into<String>,
    {
        let supplied: Vec<(MetricParameter, String)> =
            named.into_iter().map(|(p, v)| (p, v.into())).collect();
        let arity = || {
            let actual = supplied
                .iter()
                .map(|(p, _)| p.name())
                .collect::<Vec<_>>()
                .join(", ");
            self.arity_error(self.schema_names(), format!("[{actual}]"))
        };

        if supplied.len() != self.parameters.len() {
            return Err(arity());
        }

        let values = self
            .parameters
            .iter()
            .map(|slot| {
                supplied
                    .iter()
                    .find(|(name, _)| slot.accepts(*name))
                    .map(|(_, v)| v.as_str())
                    .ok_or_else(arity)
            })
            .collect::<Result<Vec<_>>>()?;

        self.make_key(&values)
    }

    /// Split a raw executor tuple into its key and its result value.
    ///
    /// The last field is the result; all preceding fields are key values in
    /// schema order.
    ///
    /// # Errors
    /// - `Error::ParameterArityMismatch` if the tuple has the wrong length
    /// - `Error::ParameterTypeError` if a key field does not coerce or the
    ///   result field does not match the kind's shape
    pub fn split_tuple(&self, tuple: RawTuple) -> Result<(ParameterMapping, ResultValue)> {
        if tuple.len() != self.parameters.len() + 1 {
            let actual = tuple
                .fields()
                .iter()
                .map(RawField::type_name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(self.arity_error(
                format!("{}, RESULT", self.schema_names()),
                format!("({actual})"),
            ));
        }
        let Some((keys, result)) = tuple.split_result() else {
            return Err(self.arity_error(self.schema_names(), "()".to_string()));
        };

        let values = self
            .parameters
            .iter()
            .zip(&keys)
            .map(|(p, field)| {
                field
                    .as_key_text()
                    .ok_or_else(|| p.type_error(field.type_name(), "key fields must be scalar"))
            })
            .collect::<Result<Vec<_>>>()?;
        let mapping = self.make_key(&values)?;

        let value = match (self.shape, result) {
            (ResultShape::ScalarCount, RawField::Int(v)) => ResultValue::Scalar(v),
            (ResultShape::StringList, RawField::List(items)) => ResultValue::StringList(items),
            (ResultShape::ListOfStringList, RawField::Bag(inner)) => {
                ResultValue::ListOfStringList(inner.into_iter().collect::<ListOfStringList>())
            }
            (shape, other) => {
                return Err(Error::ParameterTypeError {
                    parameter: "RESULT".to_string(),
                    value: other.type_name().to_string(),
                    reason: format!("expected {}", shape.as_str()),
                })
            }
        };
        Ok((mapping, value))
    }

    /// Check that `params` was built for this kind.
    ///
    /// # Errors
    /// Returns `Error::ParameterArityMismatch` if the mapping belongs to
    /// another kind or does not follow this schema.
    pub fn ensure_key(&self, params: &ParameterMapping) -> Result<()> {
        let same_schema = params.iter().map(|(p, _)| p).eq(self.parameters.iter().copied());
        if params.metric() == self.identifier && same_schema {
            Ok(())
        } else {
            Err(self.arity_error(self.schema_names(), params.to_string()))
        }
    }

    fn schema_names(&self) -> String {
        let names: Vec<&str> = self.parameters.iter().map(MetricParameter::name).collect();
        format!("[{}]", names.join(", "))
    }

    fn arity_error(&self, expected: String, actual: String) -> Error {
        Error::ParameterArityMismatch {
            metric: self.identifier.clone(),
            expected,
            actual,
        }
    }
}

#[derive(Deserialize)]
struct MetricKindRepr {
    identifier: String,
    parameters: Vec<MetricParameter>,
    aggregation: Aggregation,
}

impl TryFrom<MetricKindRepr> for MetricKind {
    type Error = Error;

    fn try_from(repr: MetricKindRepr) -> Result<Self> {
        Self::new(repr.identifier, repr.parameters, repr.aggregation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricParameter::{Date, FromDate, Limit, ToDate};

    fn active_tenant_count() -> MetricKind {
        MetricKind::new("active_tenant_count", vec![Date, ToDate], Aggregation::ActiveTenantCount)
            .unwrap()
    }

    #[test]
    fn test_shape_follows_aggregation() {
        let kind = active_tenant_count();
        assert_eq!(kind.shape(), ResultShape::ScalarCount);
        assert_eq!(kind.default_value(), ResultValue::Scalar(0));
    }

    #[test]
    fn test_schema_validation() {
        assert!(MetricKind::new("x", vec![ToDate, Date], Aggregation::ActiveTenantCount).is_err());
        assert!(MetricKind::new("x", vec![Date], Aggregation::ActiveTenantCount).is_err());
        assert!(
            MetricKind::new("x", vec![Date, FromDate, ToDate], Aggregation::ActiveTenantCount)
                .is_err()
        );
        assert!(
            MetricKind::new("x", vec![FromDate, ToDate], Aggregation::TopProjectCreators).is_err()
        );
        assert!(
            MetricKind::new("x", vec![FromDate, ToDate, Limit], Aggregation::TopProjectCreators)
                .is_ok()
        );
    }

    #[test]
    fn test_make_key_arity() {
        let err = active_tenant_count().make_key(&["20101001"]).unwrap_err();
        assert!(matches!(err, Error::ParameterArityMismatch { .. }));
    }

    #[test]
    fn test_make_key_type() {
        let err = active_tenant_count()
            .make_key(&["20101001", "2010-10-05"])
            .unwrap_err();
        assert!(matches!(err, Error::ParameterTypeError { .. }));
    }

    #[test]
    fn test_make_key_rejects_reversed_range() {
        let err = active_tenant_count()
            .make_key(&["20101005", "20101001"])
            .unwrap_err();
        assert!(matches!(err, Error::ParameterTypeError { .. }));
    }

    #[test]
    fn test_named_accepts_either_range_start() {
        let kind = active_tenant_count();
        let two_param = kind
            .make_key_named([(Date, "20101001"), (ToDate, "20101005")])
            .unwrap();
        let range_form = kind
            .make_key_named([(ToDate, "20101005"), (FromDate, "20101001")])
            .unwrap();

        assert_eq!(two_param, range_form);
        assert_eq!(two_param.values(), vec!["20101001", "20101005"]);
    }

    #[test]
    fn test_named_rejects_missing_and_extra() {
        let kind = active_tenant_count();
        assert!(matches!(
            kind.make_key_named([(Date, "20101001"), (Limit, "3")]),
            Err(Error::ParameterArityMismatch { .. })
        ));
        assert!(matches!(
            kind.make_key_named([(Date, "20101001"), (ToDate, "20101005"), (Limit, "3")]),
            Err(Error::ParameterArityMismatch { .. })
        ));
    }

    #[test]
    fn test_split_tuple_matches_named_key() {
        let kind = active_tenant_count();
        let tuple = RawTuple::new()
            .with(20_100_203_i64)
            .with(20_100_204_i64)
            .with(1_i64);

        let (mapping, value) = kind.split_tuple(tuple).unwrap();

        let named = kind
            .make_key_named([(Date, "20100203"), (ToDate, "20100204")])
            .unwrap();
        assert_eq!(mapping, named);
        assert_eq!(value, ResultValue::Scalar(1));
        let order: Vec<_> = mapping.iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![Date, ToDate]);
    }

    #[test]
    fn test_split_tuple_wrong_result_shape() {
        let kind = active_tenant_count();
        let tuple = RawTuple::new()
            .with(20_100_203_i64)
            .with(20_100_204_i64)
            .with(vec!["a".to_string()]);
        assert!(matches!(
            kind.split_tuple(tuple),
            Err(Error::ParameterTypeError { .. })
        ));
    }

    #[test]
    fn test_split_tuple_wrong_length() {
        let kind = active_tenant_count();
        let tuple = RawTuple::new().with(20_100_203_i64).with(1_i64);
        assert!(matches!(
            kind.split_tuple(tuple),
            Err(Error::ParameterArityMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_identifiers_that_are_not_one_path_component() {
        for bad in ["", ".", "..", "../outside", "a/b", "a\\b", "nul\0byte"] {
            assert!(
                matches!(
                    MetricKind::new(bad, vec![Date, ToDate], Aggregation::ActiveTenantCount),
                    Err(Error::InvalidIdentifier(_))
                ),
                "accepted {bad:?}"
            );
        }
        assert!(MetricKind::new("a.b-c_1", vec![Date, ToDate], Aggregation::ActiveTenantCount).is_ok());
    }

    #[test]
    fn test_deserialize_revalidates() {
        let kind = active_tenant_count();
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(serde_json::from_str::<MetricKind>(&json).unwrap(), kind);

        let escaped = json.replace("active_tenant_count", "../outside");
        assert!(serde_json::from_str::<MetricKind>(&escaped).is_err());

        let bad_schema = r#"{"identifier":"m","parameters":["TO_DATE","DATE"],"aggregation":"active_tenant_count"}"#;
        assert!(serde_json::from_str::<MetricKind>(bad_schema).is_err());
    }
}
