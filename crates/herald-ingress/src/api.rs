// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response messages of the caller surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use herald_core::{
    JsonMap, Language, Notification, NotificationStatus, NotificationType, Page, Party, Route,
    RouteMode, State, Status, Template, TemplateData,
};

/// Sender or recipient coordinates as supplied by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRef {
    pub profile_type: String,
    pub profile_id: String,
    pub contact_id: String,
}

impl From<ContactRef> for Party {
    fn from(c: ContactRef) -> Self {
        Party {
            profile_type: c.profile_type,
            profile_id: c.profile_id,
            contact_id: c.contact_id,
        }
    }
}

impl From<&Party> for ContactRef {
    fn from(p: &Party) -> Self {
        ContactRef {
            profile_type: p.profile_type.clone(),
            profile_id: p.profile_id.clone(),
            contact_id: p.contact_id.clone(),
        }
    }
}

/// One notification in a `Send` or `Receive` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationRequest {
    /// Kept when it is a well-formed id; otherwise a fresh id is minted.
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub transient_id: Option<String>,
    pub source: Option<ContactRef>,
    pub recipient: Option<ContactRef>,
    /// `any`, `l`, or `s`; empty means `any`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Template name. Empty when `data` carries a literal message.
    pub template: String,
    pub payload: JsonMap,
    /// Literal message text.
    pub data: String,
    /// Language code; the configured default applies when empty.
    pub language: String,
    pub auto_release: bool,
    pub route_id: Option<String>,
    pub priority: i32,
}

/// Bulk body for `Send` and `Receive`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkRequest {
    pub notifications: Vec<NotificationRequest>,
}

/// A status row as returned to callers. `id` is the notification id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub id: String,
    pub status_id: String,
    pub state: State,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transient_id: Option<String>,
    #[serde(default)]
    pub extras: JsonMap,
    pub created_at: String,
}

impl From<&NotificationStatus> for StatusResponse {
    fn from(s: &NotificationStatus) -> Self {
        StatusResponse {
            id: s.notification_id.clone(),
            status_id: s.id.clone(),
            state: s.state,
            status: s.status,
            external_id: s.external_id.clone(),
            transient_id: s.transient_id.clone(),
            extras: s.extra.clone(),
            created_at: s.audit.created_at.clone(),
        }
    }
}

/// Feedback from a transport about one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub id: String,
    pub state: State,
    pub status: Status,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub transient_id: Option<String>,
    #[serde(default)]
    pub extras: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseRequest {
    pub ids: Vec<String>,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Free text matched against id, external id, and transient id.
    pub query: String,
    /// Direct lookup; wins over `query` when non-empty.
    pub id_query: Vec<String>,
    /// Exact-match filters on the notification payload.
    pub extras: JsonMap,
    #[serde(flatten)]
    pub page: Page,
}

/// A notification joined with its language code and latest status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub source: ContactRef,
    pub recipient: ContactRef,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub payload: JsonMap,
    pub data: String,
    pub language: String,
    pub out_bound: bool,
    pub auto_release: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transient_id: Option<String>,
    pub priority: i32,
    pub state: State,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusResponse>,
    pub created_at: String,
}

impl NotificationResponse {
    pub fn new(n: &Notification, language: &str, status: Option<&NotificationStatus>) -> Self {
        NotificationResponse {
            id: n.id.clone(),
            parent_id: n.parent_id.clone(),
            source: ContactRef::from(&n.sender),
            recipient: ContactRef::from(&n.recipient),
            kind: n.notification_type,
            template_id: n.template_id().map(String::from),
            payload: n.payload.clone(),
            data: n.message.clone(),
            language: language.to_string(),
            out_bound: n.out_bound,
            auto_release: n.is_released(),
            released_at: n.released_at.clone(),
            route_id: n.route_id().map(String::from),
            external_id: n.external_id.clone(),
            transient_id: n.transient_id.clone(),
            priority: n.priority,
            state: n.state,
            status: status.map(StatusResponse::from),
            created_at: n.audit.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSaveRequest {
    pub name: String,
    pub language_code: String,
    /// Template type (e.g. `text`, `subject`) to template text.
    pub data: BTreeMap<String, String>,
    pub extra: JsonMap,
}

/// One language-specific text of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateText {
    pub id: String,
    pub language_code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResponse {
    pub id: String,
    pub name: String,
    pub extra: JsonMap,
    pub data: Vec<TemplateText>,
}

impl TemplateResponse {
    /// Join `template` with its rows; rows of unknown languages show their id.
    pub fn new(template: &Template, rows: &[TemplateData], languages: &[Language]) -> Self {
        let data = rows
            .iter()
            .filter(|r| r.template_id == template.id)
            .map(|r| TemplateText {
                id: r.id.clone(),
                language_code: languages
                    .iter()
                    .find(|l| l.id == r.language_id)
                    .map(|l| l.code.clone())
                    .unwrap_or_else(|| r.language_id.clone()),
                kind: r.kind.clone(),
                detail: r.detail.clone(),
            })
            .collect();
        TemplateResponse {
            id: template.id.clone(),
            name: template.name.clone(),
            extra: template.extra.clone(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSearchRequest {
    pub query: String,
    pub language_code: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationType,
    pub mode: RouteMode,
    pub uri: String,
}

impl RouteRequest {
    pub(crate) fn apply_to(self, route: &mut Route) {
        route.name = self.name;
        route.description = self.description;
        route.route_type = self.kind;
        route.mode = self.mode;
        route.uri = self.uri;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::TenantScope;
    use serde_json::json;

    #[test]
    fn notification_request_accepts_sparse_json() {
        let req: NotificationRequest = serde_json::from_value(json!({
            "id": "c2f4j7au6s7f91uqnojg",
            "language": "en",
            "recipient": {"contact_id": "epochTesting"},
            "data": "Hello",
            "auto_release": true,
            "template": ""
        }))
        .unwrap();
        assert_eq!(req.id.as_deref(), Some("c2f4j7au6s7f91uqnojg"));
        assert_eq!(req.recipient.unwrap().contact_id, "epochTesting");
        assert!(req.auto_release);
        assert!(req.kind.is_empty());
    }

    #[test]
    fn status_response_uses_notification_id() {
        let scope = TenantScope::new("t", "p", "a");
        let status = NotificationStatus::new(&scope, "n-1", State::Created, Status::Queued);
        let resp = StatusResponse::from(&status);
        assert_eq!(resp.id, "n-1");
        assert_eq!(resp.status_id, status.id);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["state"], "CREATED");
        assert_eq!(json["status"], "QUEUED");
        assert!(json.get("external_id").is_none());
    }

    #[test]
    fn search_request_flattens_page() {
        let req: SearchRequest =
            serde_json::from_value(json!({"query": "abc", "page": 2, "count": 5})).unwrap();
        assert_eq!(req.page, Page::new(2, 5));
        assert!(req.id_query.is_empty());
    }
}
