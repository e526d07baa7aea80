// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios: ingress through the event pipeline to a transport.

use std::collections::BTreeMap;

use herald_core::{
    EntityStore, HeraldError, NotificationType, Route, RouteMode, State, Status,
};
use herald_ingress::{
    ContactRef, NotificationRequest, ReleaseRequest, StatusUpdateRequest, TemplateSaveRequest,
};
use herald_test_utils::TestHarness;
use serde_json::json;

fn sms(id: &str, auto_release: bool) -> NotificationRequest {
    NotificationRequest {
        id: Some(id.into()),
        language: "en".into(),
        recipient: Some(ContactRef {
            contact_id: "epochTesting".into(),
            ..ContactRef::default()
        }),
        data: "Hello we are testing herald".into(),
        auto_release,
        ..NotificationRequest::default()
    }
}

async fn rows(h: &TestHarness, id: &str) -> Vec<(State, Status)> {
    h.statuses(id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.state, s.status))
        .collect()
}

#[tokio::test]
async fn s1_outbound_auto_release() {
    let h = TestHarness::builder().build().await.unwrap();
    let route = h
        .route(RouteMode::Tx, NotificationType::Any, "mock://sms")
        .await
        .unwrap();

    let resp = h
        .service
        .queue_out(h.ctx(), sms("c2f4j7au6s7f91uqnojg", true))
        .await
        .unwrap();
    assert_eq!(resp.id, "c2f4j7au6s7f91uqnojg");
    assert_eq!((resp.state, resp.status), (State::Created, Status::Queued));

    h.settle().await.unwrap();
    assert!(rows(&h, &resp.id).await.contains(&(State::Active, Status::InProcess)));

    let records = h.mock.records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "c2f4j7au6s7f91uqnojg");
    assert_eq!(records[0].route_id, route.id);
    assert_eq!(records[0].data["default"], "Hello we are testing herald");

    // The mirror follows the newest row.
    let latest = h.latest(&resp.id).await.unwrap();
    let all = h.statuses(&resp.id).await.unwrap();
    assert_eq!(latest.id, all.last().unwrap().id);
    h.shutdown().await;
}

#[tokio::test]
async fn s2_outbound_with_template() {
    let h = TestHarness::builder().build().await.unwrap();
    h.route(RouteMode::Tx, NotificationType::Any, "mock://verify")
        .await
        .unwrap();
    let mut data = BTreeMap::new();
    data.insert(
        "text".to_string(),
        "Your contact verification code is : {{pin}} and will expire at {{expiryDate}}"
            .to_string(),
    );
    h.service
        .template_save(
            h.ctx(),
            TemplateSaveRequest {
                name: "template.profilev1.contact.verification".into(),
                language_code: "en".into(),
                data,
                extra: Default::default(),
            },
        )
        .await
        .unwrap();

    let mut req = sms(&herald_core::id::new_id(), true);
    req.data.clear();
    req.template = "template.profilev1.contact.verification".into();
    req.payload = json!({"pin": "1234", "expiryDate": "tomorrow"})
        .as_object()
        .cloned()
        .unwrap();
    h.service.queue_out(h.ctx(), req).await.unwrap();
    h.settle().await.unwrap();

    let records = h.mock.records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].data["text"],
        "Your contact verification code is : 1234 and will expire at tomorrow"
    );
    h.shutdown().await;
}

#[tokio::test]
async fn s3_inbound_without_rx_route_fails_terminally() {
    let h = TestHarness::builder().build().await.unwrap();
    let resp = h
        .service
        .queue_in(h.ctx(), sms("justtestingId", false))
        .await
        .unwrap();
    assert_eq!((resp.state, resp.status), (State::Created, Status::Unknown));

    let n = h.store.get_notification(h.scope(), &resp.id).await.unwrap();
    assert!(n.released_at.is_some());

    h.settle().await.unwrap();
    let latest = h.latest(&resp.id).await.unwrap();
    assert_eq!((latest.state, latest.status), (State::Inactive, Status::Failed));
    assert!(
        latest.extra["error"]
            .as_str()
            .unwrap()
            .starts_with("no routes matched")
    );
    assert_eq!(h.mock.count().await, 0);
    h.shutdown().await;
}

#[tokio::test]
async fn s3_inbound_with_rx_route_is_queued_and_delivered() {
    let h = TestHarness::builder().build().await.unwrap();
    h.route(RouteMode::Rx, NotificationType::Any, "mock://replies")
        .await
        .unwrap();
    let resp = h
        .service
        .queue_in(h.ctx(), sms("justtestingId", false))
        .await
        .unwrap();
    h.settle().await.unwrap();

    let seen = rows(&h, &resp.id).await;
    assert!(seen.contains(&(State::Active, Status::Queued)));
    assert!(seen.contains(&(State::Active, Status::InProcess)));
    assert_eq!(h.mock.published().await[0].uri, "mock://replies");
    h.shutdown().await;
}

#[tokio::test]
async fn s4_held_until_release() {
    let h = TestHarness::builder().build().await.unwrap();
    h.route(RouteMode::Tx, NotificationType::Any, "mock://held")
        .await
        .unwrap();
    let resp = h
        .service
        .queue_out(h.ctx(), sms(&herald_core::id::new_id(), false))
        .await
        .unwrap();
    h.settle().await.unwrap();

    let before = rows(&h, &resp.id).await;
    assert_eq!(
        before
            .iter()
            .filter(|r| **r == (State::Checked, Status::Queued))
            .count(),
        1
    );
    assert_eq!(h.mock.count().await, 0);

    let released = h
        .service
        .release(
            h.ctx(),
            ReleaseRequest {
                ids: vec![resp.id.clone()],
                comment: String::new(),
            },
        )
        .await
        .collect_all()
        .await
        .unwrap();
    assert_eq!(
        (released[0].state, released[0].status),
        (State::Active, Status::Queued)
    );

    h.settle().await.unwrap();
    assert!(rows(&h, &resp.id).await.contains(&(State::Active, Status::Queued)));
    assert_eq!(h.mock.count().await, 1);
    h.shutdown().await;
}

#[tokio::test]
async fn s5_feedback_updates_status() {
    let h = TestHarness::builder().build().await.unwrap();
    h.route(RouteMode::Tx, NotificationType::Any, "mock://fb")
        .await
        .unwrap();
    let resp = h
        .service
        .queue_out(h.ctx(), sms(&herald_core::id::new_id(), true))
        .await
        .unwrap();
    h.settle().await.unwrap();
    let before = h.latest(&resp.id).await.unwrap();
    assert_eq!((before.state, before.status), (State::Active, Status::InProcess));
    let count_before = h.statuses(&resp.id).await.unwrap().len();

    h.service
        .status_update(
            h.ctx(),
            StatusUpdateRequest {
                id: resp.id.clone(),
                state: State::Inactive,
                status: Status::Successful,
                external_id: Some("xyz".into()),
                transient_id: None,
                extras: Default::default(),
            },
        )
        .await
        .unwrap();

    assert_eq!(h.statuses(&resp.id).await.unwrap().len(), count_before + 1);
    let after = h.service.status(h.ctx(), &resp.id).await.unwrap();
    assert_ne!(after.status_id, before.id);
    assert_eq!((after.state, after.status), (State::Inactive, Status::Successful));
    assert_eq!(after.external_id.as_deref(), Some("xyz"));
    h.shutdown().await;
}

#[tokio::test]
async fn s6_unbound_route_binds_on_first_publish() {
    let h = TestHarness::builder().build().await.unwrap();
    let route = Route::new(
        h.scope(),
        "late-bound",
        NotificationType::Any,
        RouteMode::Tx,
        "mem://late",
    );
    h.store.save_route(h.scope(), &route).await.unwrap();
    assert!(!h.registry.is_bound(&route.id));
    let mut rx = h.broker.subscribe("late");

    let resp = h
        .service
        .queue_out(h.ctx(), sms(&herald_core::id::new_id(), true))
        .await
        .unwrap();
    h.settle().await.unwrap();

    assert!(h.registry.is_bound(&route.id));
    rx.recv().await.unwrap();
    let latest = h.latest(&resp.id).await.unwrap();
    assert_eq!(latest.status, Status::InProcess);
    h.shutdown().await;
}

#[tokio::test]
async fn closed_notification_is_not_published_again() {
    let h = TestHarness::builder().build().await.unwrap();
    h.route(RouteMode::Tx, NotificationType::Any, "mock://closed")
        .await
        .unwrap();
    let resp = h
        .service
        .queue_out(h.ctx(), sms(&herald_core::id::new_id(), false))
        .await
        .unwrap();
    h.settle().await.unwrap();

    h.service
        .status_update(
            h.ctx(),
            StatusUpdateRequest {
                id: resp.id.clone(),
                state: State::Deleted,
                status: Status::Failed,
                external_id: None,
                transient_id: None,
                extras: Default::default(),
            },
        )
        .await
        .unwrap();

    let out = h
        .service
        .release(
            h.ctx(),
            ReleaseRequest {
                ids: vec![resp.id.clone()],
                comment: String::new(),
            },
        )
        .await
        .collect_all()
        .await
        .unwrap();
    assert_eq!(out[0].status, Status::Failed);
    h.settle().await.unwrap();
    assert_eq!(h.mock.count().await, 0);
    h.shutdown().await;
}

#[tokio::test]
async fn transient_transport_failure_is_retried() {
    let h = TestHarness::builder().build().await.unwrap();
    h.route(RouteMode::Tx, NotificationType::Any, "mock://flaky")
        .await
        .unwrap();
    h.mock.fail_next(HeraldError::unreachable("carrier down")).await;

    let resp = h
        .service
        .queue_out(h.ctx(), sms(&herald_core::id::new_id(), true))
        .await
        .unwrap();
    h.settle().await.unwrap();

    assert_eq!(h.mock.count().await, 1);
    let latest = h.latest(&resp.id).await.unwrap();
    assert_eq!(latest.status, Status::InProcess);
    h.shutdown().await;
}
