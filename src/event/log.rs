//! Event Log - append-only container of usage events
//!
//! **Append-Only Design**: events are pushed at the tail and never updated
//! or removed. Log order is append order; nothing here sorts by timestamp.
//!
//! The JSON-lines codec (one serde_json object per line) is the exchange
//! format with log providers.

use std::io::{BufRead, Write};

use super::Event;
use crate::{Error, Result};

/// Append-only sequence of events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event at the tail.
    pub fn append(&mut self, event: Event) {
        self.events.push(event);
    }

    /// All events in append order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterate over events in append order.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Read a JSON-lines log. Blank lines are skipped.
    ///
    /// # Errors
    /// Returns `Error::EventLog` for a malformed line, `Error::Io` if the
    /// reader fails.
    pub fn read_json_lines<R: BufRead>(reader: R) -> Result<Self> {
        let mut log = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = serde_json::from_str(&line).map_err(|e| Error::EventLog {
                line: idx + 1,
                reason: e.to_string(),
            })?;
            log.append(event);
        }
        tracing::debug!(events = log.len(), "read event log");
        Ok(log)
    }

    /// Write the log as JSON lines, in append order.
    ///
    /// # Errors
    /// Returns `Error::Io` if the writer fails.
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> Result<()> {
        for event in &self.events {
            serde_json::to_writer(&mut writer, event).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl From<Vec<Event>> for EventLog {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl Extend<Event> for EventLog {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
