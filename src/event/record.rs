//! Event Record - one immutable usage event

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Attribute holding the workspace of non-tenant events.
pub const ATTR_WS: &str = "WS";
/// Attribute holding the IDE session id.
pub const ATTR_SESSION: &str = "SESSION";
/// Attribute holding the project name.
pub const ATTR_PROJECT: &str = "PROJECT";
/// Attribute holding a user's e-mail address.
pub const ATTR_EMAIL: &str = "EMAIL";

/// Lifecycle action recorded by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A workspace (tenant) was created. Entity is the workspace.
    TenantCreated,
    /// A workspace (tenant) was destroyed. Entity is the workspace.
    TenantDestroyed,
    /// A user account was created. Entity is the user.
    UserCreated,
    /// A project was created inside a workspace. Entity is the project.
    ProjectCreated,
    /// A user launched a shell inside a workspace. Entity is the session.
    ShellLaunched,
}

impl EventKind {
    /// Get the wire name of the event kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TenantCreated => "tenant-created",
            Self::TenantDestroyed => "tenant-destroyed",
            Self::UserCreated => "user-created",
            Self::ProjectCreated => "project-created",
            Self::ShellLaunched => "shell-launched",
        }
    }

    /// Whether the event's entity is the workspace itself.
    #[must_use]
    pub const fn is_tenant_lifecycle(&self) -> bool {
        matches!(self, Self::TenantCreated | Self::TenantDestroyed)
    }
}

/// Event represents a single timestamped usage record.
///
/// Events are immutable once built; the log that holds them is append-only
/// and does not guarantee timestamp ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    entity_id: String,
    owner_id: String,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
}

impl Event {
    /// Create a builder for an event of the given kind.
    #[must_use]
    pub fn builder(
        kind: EventKind,
        entity_id: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> EventBuilder {
        EventBuilder::new(kind, entity_id, owner_id)
    }

    /// Workspace `ws` created by `user`.
    #[must_use]
    pub fn tenant_created(ws: impl Into<String>, user: impl Into<String>) -> EventBuilder {
        EventBuilder::new(EventKind::TenantCreated, ws, user)
    }

    /// Workspace `ws` destroyed.
    #[must_use]
    pub fn tenant_destroyed(ws: impl Into<String>) -> EventBuilder {
        EventBuilder::new(EventKind::TenantDestroyed, ws, "")
    }

    /// User account `user_id` created with `email`.
    #[must_use]
    pub fn user_created(user_id: impl Into<String>, email: impl Into<String>) -> EventBuilder {
        let user_id = user_id.into();
        EventBuilder::new(EventKind::UserCreated, user_id.clone(), user_id)
            .attribute(ATTR_EMAIL, email)
    }

    /// Project `project` created by `user` in workspace `ws`.
    #[must_use]
    pub fn project_created(
        user: impl Into<String>,
        ws: impl Into<String>,
        session: impl Into<String>,
        project: impl Into<String>,
    ) -> EventBuilder {
        let project = project.into();
        EventBuilder::new(EventKind::ProjectCreated, project.clone(), user)
            .attribute(ATTR_WS, ws)
            .attribute(ATTR_SESSION, session)
            .attribute(ATTR_PROJECT, project)
    }

    /// Shell launched by `user` in workspace `ws`.
    #[must_use]
    pub fn shell_launched(
        user: impl Into<String>,
        ws: impl Into<String>,
        session: impl Into<String>,
    ) -> EventBuilder {
        let session = session.into();
        EventBuilder::new(EventKind::ShellLaunched, session.clone(), user)
            .attribute(ATTR_WS, ws)
            .attribute(ATTR_SESSION, session)
    }

    /// Get the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Get the entity the event is about.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Get the acting user (empty when the log does not record one).
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Get the event timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Get the UTC calendar day of the event.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Get an extra attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Get all extra attributes.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Workspace the event belongs to.
    ///
    /// Tenant lifecycle events carry the workspace as their entity; every
    /// other kind carries it in the `WS` attribute.
    #[must_use]
    pub fn workspace(&self) -> Option<&str> {
        if self.kind.is_tenant_lifecycle() {
            Some(&self.entity_id)
        } else {
            self.attribute(ATTR_WS)
        }
    }
}

/// Builder for `Event`.
#[derive(Debug)]
pub struct EventBuilder {
    kind: EventKind,
    entity_id: String,
    owner_id: String,
    timestamp: DateTime<Utc>,
    attributes: BTreeMap<String, String>,
}

impl EventBuilder {
    /// Create a new builder with required fields, stamped with the current time.
    #[must_use]
    pub fn new(kind: EventKind, entity_id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            owner_id: owner_id.into(),
            timestamp: Utc::now(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set a custom timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the timestamp to midnight UTC of `day`.
    #[must_use]
    pub fn date(mut self, day: NaiveDate) -> Self {
        self.timestamp = day.and_time(chrono::NaiveTime::MIN).and_utc();
        self
    }

    /// Add an extra attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Build the `Event`.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            kind: self.kind,
            entity_id: self.entity_id,
            owner_id: self.owner_id,
            timestamp: self.timestamp,
            attributes: self.attributes,
        }
    }
}
