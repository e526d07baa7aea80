// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event names and payload shapes.

use serde::{Deserialize, Serialize};

use herald_core::{HeraldError, JsonMap, Notification, NotificationStatus, State, Status};

/// Stable event kind strings.
pub mod names {
    pub const NOTIFICATION_SAVE: &str = "notification.save";
    pub const IN_ROUTE: &str = "notification.in.route";
    pub const IN_QUEUE: &str = "notification.in.queue";
    pub const OUT_ROUTE: &str = "notification.out.route";
    pub const OUT_QUEUE: &str = "notification.out.queue";
    pub const STATUS_SAVE: &str = "notificationStatus.save";
    pub const STATUS_UPDATE: &str = "notification.status.update";
}

/// A status report from a transport, before it becomes a status row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub notification_id: String,
    pub state: State,
    pub status: Status,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub transient_id: Option<String>,
    #[serde(default)]
    pub extras: JsonMap,
}

/// What a handler receives.
///
/// Stage hops carry only the notification id so handlers re-read fresh
/// state; saves carry the record being persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Id(String),
    Notification(Box<Notification>),
    Status(Box<NotificationStatus>),
    StatusUpdate(Box<StatusUpdate>),
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Id(_) => "id",
            EventPayload::Notification(_) => "notification",
            EventPayload::Status(_) => "status",
            EventPayload::StatusUpdate(_) => "status_update",
        }
    }

    /// The notification this event concerns.
    pub fn notification_id(&self) -> &str {
        match self {
            EventPayload::Id(id) => id,
            EventPayload::Notification(n) => &n.id,
            EventPayload::Status(s) => &s.notification_id,
            EventPayload::StatusUpdate(u) => &u.notification_id,
        }
    }

    /// Non-empty notification id, or a validation error.
    pub fn expect_id(&self) -> Result<&str, HeraldError> {
        match self {
            EventPayload::Id(id) if !id.trim().is_empty() => Ok(id),
            EventPayload::Id(_) => Err(HeraldError::Validation("empty notification id".into())),
            other => Err(mismatch("id", other)),
        }
    }

    pub fn expect_notification(&self) -> Result<&Notification, HeraldError> {
        match self {
            EventPayload::Notification(n) if !n.id.is_empty() => Ok(n),
            EventPayload::Notification(_) => {
                Err(HeraldError::Validation("notification has no id".into()))
            }
            other => Err(mismatch("notification", other)),
        }
    }

    pub fn expect_status(&self) -> Result<&NotificationStatus, HeraldError> {
        match self {
            EventPayload::Status(s) if !s.notification_id.is_empty() => Ok(s),
            EventPayload::Status(_) => {
                Err(HeraldError::Validation("status has no notification id".into()))
            }
            other => Err(mismatch("status", other)),
        }
    }

    pub fn expect_status_update(&self) -> Result<&StatusUpdate, HeraldError> {
        match self {
            EventPayload::StatusUpdate(u) if !u.notification_id.trim().is_empty() => Ok(u),
            EventPayload::StatusUpdate(_) => Err(HeraldError::Validation(
                "status update has no notification id".into(),
            )),
            other => Err(mismatch("status_update", other)),
        }
    }
}

fn mismatch(expected: &str, got: &EventPayload) -> HeraldError {
    HeraldError::Validation(format!(
        "expected {expected} payload, got {}",
        got.kind()
    ))
}
