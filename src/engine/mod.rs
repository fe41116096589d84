//! Aggregation Engine
//!
//! Executes one metric kind over the event stream and produces a single
//! raw tuple `(key fields..., result)`.
//!
//! ## Executor seam
//!
//! ```text
//! evaluate(kind, events, params)
//!     │
//!     ├─> ScriptExecutor::execute(kind, params) ──> RawTuple
//!     │        (EventScan: in-process scan over &[Event])
//!     │
//!     └─> MetricKind::split_tuple(tuple) ──> (ParameterMapping, ResultValue)
//! ```
//!
//! Any engine that can answer with a tuple (a batch job runner, a remote
//! scan service) plugs in behind [`ScriptExecutor`]; the rest of the crate
//! only sees tuples.
//!
//! Evaluation is a blocking scan with no suspension points. Independent
//! evaluations may run on separate threads since kinds and events are
//! read-only.

mod aggregations;
mod tuple;

pub use aggregations::lifetime_intersects;
pub use tuple::{RawField, RawTuple};

use crate::event::{Event, EventKind};
use crate::metric::{Aggregation, MetricKind, MetricParameter, ParameterMapping};
use crate::value::ResultValue;
use crate::{Error, Result};

/// Opaque executor that runs one metric job and returns one result tuple.
pub trait ScriptExecutor {
    /// Run `kind` scoped to `params`.
    ///
    /// The returned tuple echoes the key values in schema order followed by
    /// the result field.
    ///
    /// # Errors
    /// Returns an error if the job cannot run for these parameters.
    fn execute(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<RawTuple>;
}

/// In-process executor scanning a borrowed event slice.
#[derive(Debug, Clone, Copy)]
pub struct EventScan<'a> {
    events: &'a [Event],
}

impl<'a> EventScan<'a> {
    /// Create a scanner over `events`.
    #[must_use]
    pub const fn new(events: &'a [Event]) -> Self {
        Self { events }
    }

    /// Number of events the scanner sees.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if there is nothing to scan.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl ScriptExecutor for EventScan<'_> {
    fn execute(&self, kind: &MetricKind, params: &ParameterMapping) -> Result<RawTuple> {
        kind.ensure_key(params)?;
        let (from, to) = params.date_range().ok_or_else(|| Error::ParameterArityMismatch {
            metric: kind.identifier().to_string(),
            expected: "DATE|FROM_DATE, TO_DATE".to_string(),
            actual: params.to_string(),
        })?;

        let result = match kind.aggregation() {
            Aggregation::ActiveTenantCount => {
                let active = aggregations::active_workspaces(self.events, from, to);
                RawField::Int(i64::try_from(active.len()).unwrap_or(i64::MAX))
            }
            Aggregation::ActiveTenantList => {
                RawField::List(aggregations::active_workspaces(self.events, from, to))
            }
            Aggregation::UsersShellLaunched => RawField::Bag(aggregations::workspace_user_pairs(
                self.events,
                EventKind::ShellLaunched,
                from,
                to,
            )),
            Aggregation::UsersCreatedProjects => RawField::Bag(aggregations::workspace_user_pairs(
                self.events,
                EventKind::ProjectCreated,
                from,
                to,
            )),
            Aggregation::TopProjectCreators => {
                let limit = params.count(MetricParameter::Limit).unwrap_or_default();
                RawField::List(aggregations::top_project_creators(
                    self.events,
                    from,
                    to,
                    limit as usize,
                ))
            }
        };

        tracing::debug!(
            metric = kind.identifier(),
            %params,
            events = self.events.len(),
            result = result.type_name(),
            "scanned event log"
        );

        // Keys travel as integers, like the values a batch job would emit
        let mut tuple: RawTuple = params
            .iter()
            .map(|(_, v)| match v.parse::<i64>() {
                // Zero-padded values (years before 1000) stay text
                Ok(n) if n.to_string() == v => RawField::Int(n),
                _ => RawField::from(v),
            })
            .collect::<Vec<_>>()
            .into();
        tuple.append(result);
        Ok(tuple)
    }
}

/// Evaluate `kind` over `events` for `params`.
///
/// A range with no matching events yields the kind's zero/empty value,
/// never an error.
///
/// # Errors
/// Returns `Error::ParameterArityMismatch` if `params` was built for another
/// kind.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use trueno_metrics::engine::evaluate;
/// use trueno_metrics::event::Event;
/// use trueno_metrics::metric::{MetricRegistry, ACTIVE_TENANT_COUNT};
/// use trueno_metrics::value::ResultValue;
///
/// let day = |d| NaiveDate::from_ymd_opt(2010, 10, d).unwrap();
/// let events = vec![
///     Event::tenant_created("ws1", "user1").date(day(1)).build(),
///     Event::tenant_created("ws2", "user2").date(day(2)).build(),
///     Event::tenant_destroyed("ws2").date(day(5)).build(),
/// ];
///
/// let registry = MetricRegistry::builtin();
/// let kind = registry.lookup(ACTIVE_TENANT_COUNT)?;
/// let params = kind.make_key(&["20101001", "20101005"])?;
///
/// assert_eq!(evaluate(kind, &events, &params)?, ResultValue::Scalar(2));
/// # Ok::<(), trueno_metrics::Error>(())
/// ```
pub fn evaluate(kind: &MetricKind, events: &[Event], params: &ParameterMapping) -> Result<ResultValue> {
    evaluate_with(&EventScan::new(events), kind, params)
}

/// Evaluate `kind` through any executor.
///
/// # Errors
/// Returns the executor's error, `Error::ParameterArityMismatch` /
/// `Error::ParameterTypeError` if the tuple does not fit the kind, or
/// `Error::ParameterTypeError` if the executor answered for another key.
pub fn evaluate_with<E>(executor: &E, kind: &MetricKind, params: &ParameterMapping) -> Result<ResultValue>
where
    E: ScriptExecutor + ?Sized,
{
    kind.ensure_key(params)?;
    let tuple = executor.execute(kind, params)?;
    let (echoed, value) = kind.split_tuple(tuple)?;
    if echoed != *params {
        return Err(Error::ParameterTypeError {
            parameter: "KEY".to_string(),
            value: echoed.to_string(),
            reason: format!("executor answered for a different key than {params}"),
        });
    }
    Ok(value)
}
