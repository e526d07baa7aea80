// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entities, enums, and shared value types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::HeraldError;
use crate::id;

/// Free-form JSON object used for payloads and `extra` columns.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Current UTC time in the storage timestamp format (`2026-01-02T03:04:05.678Z`).
///
/// Matches SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ','now')`, so values written
/// from Rust and from SQL sort together.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Publisher,
    Profile,
    Observability,
}

/// Lifecycle state of a notification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    #[default]
    Created,
    Checked,
    Active,
    Inactive,
    Deleted,
}

impl State {
    /// Terminal states close a notification; later non-terminal statuses
    /// are recorded but do not reopen it.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Inactive | State::Deleted)
    }
}

/// Delivery status carried by each status row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Unknown,
    Queued,
    InProcess,
    Successful,
    Failed,
}

/// Transport category of a notification or route.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum NotificationType {
    /// Wildcard, matches any transport.
    #[default]
    #[strum(serialize = "any")]
    #[serde(rename = "any")]
    Any,
    /// Long-form (email).
    #[strum(serialize = "l")]
    #[serde(rename = "l")]
    Long,
    /// Short-form (SMS).
    #[strum(serialize = "s")]
    #[serde(rename = "s")]
    Short,
}

impl NotificationType {
    /// Parse a caller-supplied type, treating empty input as [`NotificationType::Any`].
    pub fn parse_lenient(s: &str) -> Result<Self, HeraldError> {
        if s.trim().is_empty() {
            return Ok(NotificationType::Any);
        }
        s.trim()
            .parse()
            .map_err(|_| HeraldError::Validation(format!("unknown notification type: {s}")))
    }
}

/// Direction a route serves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// Outbound only.
    Tx,
    /// Inbound only.
    Rx,
    /// Both directions.
    Trx,
}

/// Contact type as reported by the profile service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactType {
    Msisdn,
    Email,
    #[default]
    #[serde(other)]
    Other,
}

impl ContactType {
    /// Effective transport category for a recipient contact.
    pub fn notification_type(self) -> NotificationType {
        match self {
            ContactType::Msisdn => NotificationType::Short,
            ContactType::Email => NotificationType::Long,
            ContactType::Other => NotificationType::Any,
        }
    }
}

/// Multi-tenancy coordinates carried by every request and every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    pub tenant_id: String,
    pub partition_id: String,
    pub access_id: String,
}

impl TenantScope {
    pub fn new(
        tenant_id: impl Into<String>,
        partition_id: impl Into<String>,
        access_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            partition_id: partition_id.into(),
            access_id: access_id.into(),
        }
    }

    /// Tenant and partition are mandatory; access may be empty for
    /// service-to-service calls.
    pub fn validate(&self) -> Result<(), HeraldError> {
        if self.tenant_id.trim().is_empty() {
            return Err(HeraldError::Unauthorized("missing tenant id".into()));
        }
        if self.partition_id.trim().is_empty() {
            return Err(HeraldError::Unauthorized("missing partition id".into()));
        }
        Ok(())
    }
}

/// Audit envelope shared by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub tenant_id: String,
    pub partition_id: String,
    pub access_id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    pub version: i64,
}

impl Audit {
    /// Fresh envelope for a row created under `scope`.
    pub fn for_scope(scope: &TenantScope) -> Self {
        let now = now_timestamp();
        Self {
            tenant_id: scope.tenant_id.clone(),
            partition_id: scope.partition_id.clone(),
            access_id: scope.access_id.clone(),
            created_at: now.clone(),
            updated_at: now,
            deleted_at: None,
            version: 1,
        }
    }

    pub fn scope(&self) -> TenantScope {
        TenantScope::new(&self.tenant_id, &self.partition_id, &self.access_id)
    }
}

/// A language templates can be written in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Language {
    pub fn new(
        scope: &TenantScope,
        code: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id::new_id(),
            code: code.into(),
            name: name.into(),
            description: description.into(),
            audit: Audit::for_scope(scope),
        }
    }
}

/// Channel-independent template metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub extra: JsonMap,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Template {
    pub fn new(scope: &TenantScope, name: impl Into<String>, extra: JsonMap) -> Self {
        Self {
            id: id::new_id(),
            name: name.into(),
            extra,
            audit: Audit::for_scope(scope),
        }
    }
}

/// Template text for one `(template, language, type)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateData {
    pub id: String,
    pub template_id: String,
    pub language_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl TemplateData {
    pub fn new(
        scope: &TenantScope,
        template_id: impl Into<String>,
        language_id: impl Into<String>,
        kind: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: id::new_id(),
            template_id: template_id.into(),
            language_id: language_id.into(),
            kind: kind.into(),
            detail: detail.into(),
            audit: Audit::for_scope(scope),
        }
    }
}

/// Binding of `(mode, type, partition)` to a transport URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub route_type: NotificationType,
    pub mode: RouteMode,
    pub uri: String,
    #[serde(default)]
    pub counter_id: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Route {
    /// New route in the scope's partition.
    pub fn new(
        scope: &TenantScope,
        name: impl Into<String>,
        route_type: NotificationType,
        mode: RouteMode,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id::new_id(),
            name: name.into(),
            description: String::new(),
            route_type,
            mode,
            uri: uri.into(),
            counter_id: String::new(),
            audit: Audit::for_scope(scope),
        }
    }
}

/// Sender or recipient coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(default)]
    pub profile_type: String,
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub contact_id: String,
}

impl Party {
    pub fn is_empty(&self) -> bool {
        self.profile_id.is_empty() && self.contact_id.is_empty()
    }
}

/// The pipeline's unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub parent_id: Option<String>,
    pub transient_id: Option<String>,
    pub sender: Party,
    pub recipient: Party,
    pub route_id: Option<String>,
    pub notification_type: NotificationType,
    pub language_id: String,
    pub template_id: Option<String>,
    pub payload: JsonMap,
    pub message: String,
    pub out_bound: bool,
    pub released_at: Option<String>,
    pub priority: i32,
    pub state: State,
    pub external_id: Option<String>,
    pub status_id: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Notification {
    /// Empty outbound notification owned by `scope`.
    pub fn new(scope: &TenantScope) -> Self {
        Self {
            id: id::new_id(),
            parent_id: None,
            transient_id: None,
            sender: Party::default(),
            recipient: Party::default(),
            route_id: None,
            notification_type: NotificationType::Any,
            language_id: String::new(),
            template_id: None,
            payload: JsonMap::new(),
            message: String::new(),
            out_bound: true,
            released_at: None,
            priority: 0,
            state: State::Created,
            external_id: None,
            status_id: None,
            audit: Audit::for_scope(scope),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released_at.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Closed notifications are never published again.
    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn route_id(&self) -> Option<&str> {
        self.route_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn scope(&self) -> TenantScope {
        self.audit.scope()
    }
}

/// Append-only audit entry of a state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationStatus {
    pub id: String,
    pub notification_id: String,
    pub state: State,
    pub status: Status,
    pub transient_id: Option<String>,
    pub external_id: Option<String>,
    #[serde(default)]
    pub extra: JsonMap,
    #[serde(flatten)]
    pub audit: Audit,
}

impl NotificationStatus {
    pub fn new(
        scope: &TenantScope,
        notification_id: impl Into<String>,
        state: State,
        status: Status,
    ) -> Self {
        Self {
            id: id::new_id(),
            notification_id: notification_id.into(),
            state,
            status,
            transient_id: None,
            external_id: None,
            extra: JsonMap::new(),
            audit: Audit::for_scope(scope),
        }
    }

    /// Terminal failure row: `(INACTIVE, FAILED)` with `error` and `step` extras.
    pub fn failure(
        scope: &TenantScope,
        notification_id: impl Into<String>,
        error: &HeraldError,
        step: &str,
    ) -> Self {
        let mut status = Self::new(scope, notification_id, State::Inactive, Status::Failed);
        status
            .extra
            .insert("error".into(), serde_json::Value::String(error.to_string()));
        status
            .extra
            .insert("step".into(), serde_json::Value::String(step.to_string()));
        status
    }

    pub fn with_extra(mut self, extra: JsonMap) -> Self {
        self.extra.extend(extra);
        self
    }

    pub fn with_external_id(mut self, external_id: Option<String>) -> Self {
        self.external_id = external_id.filter(|s| !s.is_empty());
        self
    }

    pub fn with_transient_id(mut self, transient_id: Option<String>) -> Self {
        self.transient_id = transient_id.filter(|s| !s.is_empty());
        self
    }
}

/// A recipient profile as returned by the profile service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl Profile {
    pub fn contact(&self, contact_id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == contact_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default, rename = "type")]
    pub contact_type: ContactType,
}

/// Page window for search operations. `page` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub count: u32,
}

impl Page {
    pub const DEFAULT_COUNT: u32 = 20;
    pub const MAX_COUNT: u32 = 500;

    pub fn new(page: u32, count: u32) -> Self {
        Self { page, count }
    }

    pub fn limit(&self) -> u32 {
        match self.count {
            0 => Self::DEFAULT_COUNT,
            n => n.min(Self::MAX_COUNT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn scope() -> TenantScope {
        TenantScope::new("tenant-a", "partition-a", "access-a")
    }

    #[test]
    fn state_and_status_use_screaming_case() {
        assert_eq!(State::Inactive.to_string(), "INACTIVE");
        assert_eq!(Status::InProcess.to_string(), "IN_PROCESS");
        assert_eq!(Status::from_str("IN_PROCESS").unwrap(), Status::InProcess);
        assert_eq!(
            serde_json::to_string(&Status::Successful).unwrap(),
            "\"SUCCESSFUL\""
        );
    }

    #[test]
    fn terminal_states() {
        assert!(State::Inactive.is_terminal());
        assert!(State::Deleted.is_terminal());
        assert!(!State::Active.is_terminal());
        assert!(!State::Checked.is_terminal());
    }

    #[test]
    fn notification_type_wire_names() {
        assert_eq!(NotificationType::Short.to_string(), "s");
        assert_eq!(NotificationType::from_str("l").unwrap(), NotificationType::Long);
        assert_eq!(
            NotificationType::parse_lenient("").unwrap(),
            NotificationType::Any
        );
        assert!(NotificationType::parse_lenient("sms").is_err());
    }

    #[test]
    fn contact_type_maps_to_transport_category() {
        assert_eq!(ContactType::Msisdn.notification_type(), NotificationType::Short);
        assert_eq!(ContactType::Email.notification_type(), NotificationType::Long);
        assert_eq!(ContactType::Other.notification_type(), NotificationType::Any);

        let c: Contact = serde_json::from_str(r#"{"id":"c1","type":"MATRIX"}"#).unwrap();
        assert_eq!(c.contact_type, ContactType::Other);
    }

    #[test]
    fn route_mode_lowercase() {
        assert_eq!(RouteMode::Trx.to_string(), "trx");
        assert_eq!(RouteMode::from_str("rx").unwrap(), RouteMode::Rx);
    }

    #[test]
    fn scope_requires_tenant_and_partition() {
        assert!(scope().validate().is_ok());
        assert!(TenantScope::new("", "p", "a").validate().is_err());
        assert!(TenantScope::new("t", " ", "a").validate().is_err());
        assert!(TenantScope::new("t", "p", "").validate().is_ok());
    }

    #[test]
    fn new_notification_is_unreleased_and_open() {
        let n = Notification::new(&scope());
        assert!(!n.is_released());
        assert!(!n.is_closed());
        assert!(n.route_id().is_none());
        assert_eq!(n.audit.version, 1);
        assert_eq!(n.audit.tenant_id, "tenant-a");
    }

    #[test]
    fn failure_status_carries_error_and_step() {
        let err = HeraldError::NoRouteMatched("for mode=rx".into());
        let s = NotificationStatus::failure(&scope(), "n1", &err, "in.route");
        assert_eq!(s.state, State::Inactive);
        assert_eq!(s.status, Status::Failed);
        assert_eq!(s.extra["step"], "in.route");
        assert!(s.extra["error"].as_str().unwrap().starts_with("no routes matched"));
    }

    #[test]
    fn page_limits() {
        assert_eq!(Page::default().limit(), Page::DEFAULT_COUNT);
        assert_eq!(Page::new(2, 10).offset(), 20);
        assert_eq!(Page::new(0, 10_000).limit(), Page::MAX_COUNT);
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now_timestamp();
        assert!(a < b);
        assert_eq!(a.len(), "2026-01-02T03:04:05.678Z".len());
    }
}
