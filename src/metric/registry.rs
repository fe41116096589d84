//! Metric Registry - process-wide catalogue of metric kinds

use rustc_hash::FxHashMap;

use super::{Aggregation, MetricKind, MetricParameter, ParameterMapping};
use crate::engine::RawTuple;
use crate::value::ResultValue;
use crate::{Error, Result};

/// Identifier of the built-in active tenant count.
pub const ACTIVE_TENANT_COUNT: &str = "active_tenant_count";
/// Identifier of the built-in active tenant list.
pub const ACTIVE_TENANT_LIST: &str = "active_tenant_list";
/// Identifier of the built-in shell launch pairs.
pub const USERS_SHELL_LAUNCHED: &str = "users_shell_launched";
/// Identifier of the built-in project creation pairs.
pub const USERS_CREATED_PROJECTS: &str = "users_created_projects";
/// Identifier of the built-in top project creators list.
pub const TOP_PROJECT_CREATORS: &str = "top_project_creators";

/// Registry of metric kinds, looked up by identifier.
///
/// Kinds are registered once at start-up and never mutated; share the
/// registry behind an `Arc` (or by reference) once it is built.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    kinds: Vec<MetricKind>,
    index: FxHashMap<String, usize>,
}

impl MetricRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in kinds.
    ///
    /// | identifier               | parameters                | shape            |
    /// |--------------------------|---------------------------|------------------|
    /// | `active_tenant_count`    | DATE, TO_DATE             | ScalarCount      |
    /// | `active_tenant_list`     | DATE, TO_DATE             | StringList       |
    /// | `users_shell_launched`   | FROM_DATE, TO_DATE        | ListOfStringList |
    /// | `users_created_projects` | FROM_DATE, TO_DATE        | ListOfStringList |
    /// | `top_project_creators`   | FROM_DATE, TO_DATE, LIMIT | StringList       |
    ///
    /// An entry that fails to build is logged at `error` level and left
    /// out; [`try_builtin`](Self::try_builtin) surfaces it instead.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in builtin_kinds() {
            if let Err(e) = kind.and_then(|kind| registry.register(kind)) {
                tracing::error!(error = %e, "invalid built-in metric");
            }
        }
        registry
    }

    /// Create a registry holding the built-in kinds, failing on the first
    /// entry that does not build.
    ///
    /// # Errors
    /// Any error of [`MetricKind::new`] or [`register`](Self::register).
    pub fn try_builtin() -> Result<Self> {
        let mut registry = Self::new();
        for kind in builtin_kinds() {
            registry.register(kind?)?;
        }
        Ok(registry)
    }

    /// Register a kind.
    ///
    /// # Errors
    /// Returns `Error::DuplicateMetric` if the identifier is taken.
    pub fn register(&mut self, kind: MetricKind) -> Result<()> {
        if self.index.contains_key(kind.identifier()) {
            return Err(Error::DuplicateMetric(kind.identifier().to_string()));
        }
        tracing::debug!(metric = kind.identifier(), shape = kind.shape().as_str(), "registered metric");
        self.index.insert(kind.identifier().to_string(), self.kinds.len());
        self.kinds.push(kind);
        Ok(())
    }

    /// Look up a kind by identifier.
    ///
    /// # Errors
    /// Returns `Error::UnknownMetric` if nothing is registered under `identifier`.
    pub fn lookup(&self, identifier: &str) -> Result<&MetricKind> {
        self.index
            .get(identifier)
            .map(|&idx| &self.kinds[idx])
            .ok_or_else(|| Error::UnknownMetric(identifier.to_string()))
    }

    /// All kinds in registration order.
    #[must_use]
    pub fn kinds(&self) -> &[MetricKind] {
        &self.kinds
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Look up `identifier` and build a key from values in schema order.
    ///
    /// # Errors
    /// `Error::UnknownMetric`, or any error of [`MetricKind::make_key`].
    pub fn make_key<S: AsRef<str>>(&self, identifier: &str, values: &[S]) -> Result<ParameterMapping> {
        self.lookup(identifier)?.make_key(values)
    }

    /// Look up `identifier` and build a key from named parameters.
    ///
    /// # Errors
    /// `Error::UnknownMetric`, or any error of [`MetricKind::make_key_named`].
    pub fn make_key_named<I, S>(&self, identifier: &str, named: I) -> Result<ParameterMapping>
    where
        I: IntoIterator<Item = (MetricParameter, S)>,
        S: Into<String>,
    {
        self.lookup(identifier)?.make_key_named(named)
    }

    /// Look up `identifier` and split an executor tuple into key and value.
    ///
    /// # Errors
    /// `Error::UnknownMetric`, or any error of [`MetricKind::split_tuple`].
    pub fn split_tuple(
        &self,
        identifier: &str,
        tuple: RawTuple,
    ) -> Result<(ParameterMapping, ResultValue)> {
        self.lookup(identifier)?.split_tuple(tuple)
    }
}

fn builtin_kinds() -> impl Iterator<Item = Result<MetricKind>> {
    use MetricParameter::{Date, FromDate, Limit, ToDate};

    [
        (ACTIVE_TENANT_COUNT, vec![Date, ToDate], Aggregation::ActiveTenantCount),
        (ACTIVE_TENANT_LIST, vec![Date, ToDate], Aggregation::ActiveTenantList),
        (USERS_SHELL_LAUNCHED, vec![FromDate, ToDate], Aggregation::UsersShellLaunched),
        (USERS_CREATED_PROJECTS, vec![FromDate, ToDate], Aggregation::UsersCreatedProjects),
        (TOP_PROJECT_CREATORS, vec![FromDate, ToDate, Limit], Aggregation::TopProjectCreators),
    ]
    .into_iter()
    .map(|(identifier, parameters, aggregation)| MetricKind::new(identifier, parameters, aggregation))
}
