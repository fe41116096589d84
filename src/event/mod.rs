//! Event Model
//!
//! Typed usage records consumed by the aggregation engine.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trueno_metrics::event::{Event, EventLog};
//!
//! let day = NaiveDate::from_ymd_opt(2010, 10, 1).unwrap();
//!
//! let mut log = EventLog::new();
//! log.append(Event::tenant_created("ws1", "user1").date(day).build());
//! log.append(Event::shell_launched("user1", "ws1", "session").date(day).build());
//!
//! assert_eq!(log.len(), 2);
//! ```

mod log;
mod record;

pub use log::EventLog;
pub use record::{
    Event, EventBuilder, EventKind, ATTR_EMAIL, ATTR_PROJECT, ATTR_SESSION, ATTR_WS,
};
