// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the record published to a route.

use serde_json::Value;

use herald_core::wire::{self, ContactLink, NotificationRecord, StatusRecord, WireState, WireStatus};
use herald_core::{JsonMap, Notification, NotificationStatus, Party};
use herald_template::RenderedMap;

fn link(party: &Party) -> Option<ContactLink> {
    if party.is_empty() {
        return None;
    }
    Some(ContactLink {
        profile_type: party.profile_type.clone(),
        profile_id: party.profile_id.clone(),
        contact_id: party.contact_id.clone(),
    })
}

fn status_record(status: &NotificationStatus) -> StatusRecord {
    StatusRecord {
        id: status.id.clone(),
        state: WireState::from(status.state) as i32,
        status: WireStatus::from(status.status) as i32,
        external_id: status.external_id.clone().unwrap_or_default(),
        transient_id: status.transient_id.clone().unwrap_or_default(),
        extras: (!status.extra.is_empty()).then(|| wire::json_to_struct(&status.extra)),
    }
}

/// Tenant coordinates and release metadata carried next to the payload.
fn extras(n: &Notification) -> JsonMap {
    let mut extras = JsonMap::new();
    extras.insert("tenant_id".into(), Value::String(n.audit.tenant_id.clone()));
    extras.insert(
        "partition_id".into(),
        Value::String(n.audit.partition_id.clone()),
    );
    extras.insert("access_id".into(), Value::String(n.audit.access_id.clone()));
    if let Some(released_at) = n.released_at.as_ref().filter(|s| !s.is_empty()) {
        extras.insert("released_at".into(), Value::String(released_at.clone()));
    }
    if let Some(transient_id) = n.transient_id.as_ref().filter(|s| !s.is_empty()) {
        extras.insert("transient_id".into(), Value::String(transient_id.clone()));
    }
    extras
}

/// Build the record for `n` with its rendered content, language code, and
/// latest status.
pub fn build_record(
    n: &Notification,
    data: RenderedMap,
    language: &str,
    status: Option<&NotificationStatus>,
) -> NotificationRecord {
    NotificationRecord {
        id: n.id.clone(),
        parent_id: n.parent_id.clone().unwrap_or_default(),
        source: link(&n.sender),
        recipient: link(&n.recipient),
        kind: n.notification_type.to_string(),
        template: n.template_id().unwrap_or_default().to_string(),
        payload: Some(wire::json_to_struct(&n.payload)),
        data,
        language: language.to_string(),
        out_bound: n.out_bound,
        auto_release: n.is_released(),
        route_id: n.route_id().unwrap_or_default().to_string(),
        status: status.map(status_record),
        extras: Some(wire::json_to_struct(&extras(n))),
        priority: n.priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{NotificationType, State, Status, TenantScope, wire::struct_to_json};
    use serde_json::json;

    fn scope() -> TenantScope {
        TenantScope::new("tenant-a", "part-1", "acc-1")
    }

    fn notification() -> Notification {
        let mut n = Notification::new(&scope());
        n.recipient.contact_id = "epochTesting".into();
        n.notification_type = NotificationType::Short;
        n.route_id = Some("route-1".into());
        n.released_at = Some("2026-01-01T00:00:00.000Z".into());
        n.payload = json!({"pin": "1234"}).as_object().cloned().unwrap_or_default();
        n.priority = 2;
        n
    }

    #[test]
    fn record_carries_dispatch_fields() {
        let n = notification();
        let mut data = RenderedMap::new();
        data.insert("text".into(), "code 1234".into());
        let status = NotificationStatus::new(&scope(), &n.id, State::Active, Status::Queued)
            .with_external_id(Some("ext-9".into()));

        let record = build_record(&n, data, "en", Some(&status));

        assert_eq!(record.id, n.id);
        assert_eq!(record.kind, "s");
        assert_eq!(record.language, "en");
        assert_eq!(record.route_id, "route-1");
        assert!(record.auto_release);
        assert!(record.source.is_none());
        assert_eq!(record.recipient.unwrap().contact_id, "epochTesting");
        assert_eq!(record.data["text"], "code 1234");
        let s = record.status.unwrap();
        assert_eq!(s.external_id, "ext-9");
        assert_eq!(State::from(s.state()), State::Active);
        assert_eq!(record.priority, 2);
    }

    #[test]
    fn extras_merge_tenant_and_release_metadata() {
        let record = build_record(&notification(), RenderedMap::new(), "en", None);
        let extras = struct_to_json(&record.extras.unwrap());
        assert_eq!(extras["tenant_id"], "tenant-a");
        assert_eq!(extras["partition_id"], "part-1");
        assert_eq!(extras["access_id"], "acc-1");
        assert_eq!(extras["released_at"], "2026-01-01T00:00:00.000Z");
        assert!(!extras.contains_key("transient_id"));
        assert!(record.status.is_none());
    }

    #[test]
    fn unreleased_record_has_no_release_marker() {
        let mut n = notification();
        n.released_at = None;
        let record = build_record(&n, RenderedMap::new(), "en", None);
        assert!(!record.auto_release);
        assert!(!struct_to_json(&record.extras.unwrap()).contains_key("released_at"));
    }
}
