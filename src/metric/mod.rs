//! Metric Registry
//!
//! Metric kinds are typed aggregation jobs: each declares an ordered
//! parameter schema, a result shape and the aggregation it runs.
//!
//! ## Key construction
//!
//! ```text
//! named:       [(TO_DATE, "20101005"), (DATE, "20101001")] ─┐
//!                                                            ├─> ParameterMapping
//! positional:  (20101001, 20101005, <result>)  ──────────────┘     DATE=20101001, TO_DATE=20101005
//! ```
//!
//! Both paths coerce through the same schema, so equivalent input yields
//! identical mappings.
//!
//! ## Usage
//!
//! ```rust
//! use trueno_metrics::metric::{MetricParameter, MetricRegistry, ACTIVE_TENANT_COUNT};
//!
//! let registry = MetricRegistry::builtin();
//! let key = registry.make_key_named(
//!     ACTIVE_TENANT_COUNT,
//!     [(MetricParameter::FromDate, "20101001"), (MetricParameter::ToDate, "20101005")],
//! )?;
//! assert_eq!(key.get(MetricParameter::Date), Some("20101001"));
//! # Ok::<(), trueno_metrics::Error>(())
//! ```

mod kind;
mod parameter;
mod registry;

pub use kind::{Aggregation, MetricKind};
pub use parameter::{
    format_date, parse_date, MetricParameter, ParameterMapping, ParameterType, MAX_COUNT,
};
pub use registry::{
    MetricRegistry, ACTIVE_TENANT_COUNT, ACTIVE_TENANT_LIST, TOP_PROJECT_CREATORS,
    USERS_CREATED_PROJECTS, USERS_SHELL_LAUNCHED,
};
