// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages transport integrations send back: delivery reports, incoming
//! messages, opt-outs, and subscription changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use herald_bus::{EventPayload, StatusUpdate, names};
use herald_config::model::FeedbackConfig;
use herald_core::{HeraldError, JsonMap, RequestContext};

use crate::api::{ContactRef, NotificationRequest, StatusResponse};
use crate::service::NotificationService;

/// One feedback message, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackMessage {
    DeliveryReport {
        /// Notification id, or the transport's own id for it.
        id: String,
        status: String,
        #[serde(default)]
        external_id: Option<String>,
        #[serde(flatten)]
        extras: JsonMap,
    },
    IncomingMessage {
        id: String,
        #[serde(default)]
        text: String,
        from: String,
        to: String,
        #[serde(default)]
        date: String,
        #[serde(flatten)]
        extras: JsonMap,
    },
    OptOut {
        phone_number: String,
        #[serde(default)]
        opt_out_code: String,
        #[serde(flatten)]
        extras: JsonMap,
    },
    SubscriptionChange {
        phone_number: String,
        #[serde(default)]
        short_code: String,
        #[serde(default)]
        keyword: String,
        #[serde(default)]
        update_type: String,
        #[serde(flatten)]
        extras: JsonMap,
    },
}

impl FeedbackMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedbackMessage::DeliveryReport { .. } => "delivery_report",
            FeedbackMessage::IncomingMessage { .. } => "incoming_message",
            FeedbackMessage::OptOut { .. } => "opt_out",
            FeedbackMessage::SubscriptionChange { .. } => "subscription_change",
        }
    }
}

/// What the sink did with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub kind: String,
    pub notification_id: String,
    /// Initial status of a notification created from the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusResponse>,
}

/// Turns transport feedback into status updates and inbound notifications.
#[derive(Clone)]
pub struct FeedbackSink {
    service: NotificationService,
    config: FeedbackConfig,
}

impl FeedbackSink {
    pub fn new(service: NotificationService, config: FeedbackConfig) -> Self {
        Self { service, config }
    }

    pub async fn handle(
        &self,
        ctx: &RequestContext,
        message: FeedbackMessage,
    ) -> Result<FeedbackAck, HeraldError> {
        let kind = message.kind();
        debug!(kind, "feedback received");
        match message {
            FeedbackMessage::DeliveryReport {
                id,
                status,
                external_id,
                extras,
            } => self.delivery_report(ctx, id, status, external_id, extras).await,
            FeedbackMessage::IncomingMessage {
                id,
                text,
                from,
                to,
                date,
                mut extras,
            } => {
                if !date.is_empty() {
                    extras.insert("date".into(), Value::String(date));
                }
                let request = NotificationRequest {
                    transient_id: Some(id),
                    source: Some(contact(from)),
                    recipient: Some(contact(to)),
                    data: text,
                    payload: extras,
                    ..NotificationRequest::default()
                };
                self.inbound(ctx, kind, request).await
            }
            FeedbackMessage::OptOut {
                phone_number,
                opt_out_code,
                mut extras,
            } => {
                extras.insert("kind".into(), Value::String(kind.into()));
                extras.insert("opt_out_code".into(), Value::String(opt_out_code));
                let request = NotificationRequest {
                    source: Some(contact(phone_number.clone())),
                    recipient: Some(contact(phone_number)),
                    payload: extras,
                    ..NotificationRequest::default()
                };
                self.inbound(ctx, kind, request).await
            }
            FeedbackMessage::SubscriptionChange {
                phone_number,
                short_code,
                keyword,
                update_type,
                mut extras,
            } => {
                extras.insert("kind".into(), Value::String(kind.into()));
                extras.insert("keyword".into(), Value::String(keyword));
                extras.insert("update_type".into(), Value::String(update_type));
                extras.insert("short_code".into(), Value::String(short_code.clone()));
                let recipient = if short_code.is_empty() {
                    phone_number.clone()
                } else {
                    short_code
                };
                let request = NotificationRequest {
                    source: Some(contact(phone_number)),
                    recipient: Some(contact(recipient)),
                    payload: extras,
                    ..NotificationRequest::default()
                };
                self.inbound(ctx, kind, request).await
            }
        }
    }

    async fn delivery_report(
        &self,
        ctx: &RequestContext,
        id: String,
        transport_status: String,
        external_id: Option<String>,
        mut extras: JsonMap,
    ) -> Result<FeedbackAck, HeraldError> {
        if id.trim().is_empty() {
            return Err(HeraldError::Validation("delivery report id is required".into()));
        }
        let n = self.service.locate(ctx, &id).await?;
        let target = self.config.resolve(&transport_status);
        let external_id = external_id
            .filter(|s| !s.is_empty())
            .or_else(|| (id != n.id).then(|| id.clone()));
        extras.insert(
            "transport_status".into(),
            Value::String(transport_status.clone()),
        );

        let update = StatusUpdate {
            notification_id: n.id.clone(),
            state: target.state,
            status: target.status,
            external_id,
            transient_id: None,
            extras,
        };
        self.service
            .emitter()
            .emit(
                ctx,
                names::STATUS_UPDATE,
                EventPayload::StatusUpdate(Box::new(update)),
            )
            .await?;
        info!(
            notification_id = %n.id,
            %transport_status,
            state = %target.state,
            status = %target.status,
            "delivery report accepted"
        );
        Ok(FeedbackAck {
            kind: "delivery_report".into(),
            notification_id: n.id,
            status: None,
        })
    }

    async fn inbound(
        &self,
        ctx: &RequestContext,
        kind: &'static str,
        request: NotificationRequest,
    ) -> Result<FeedbackAck, HeraldError> {
        let status = self.service.queue_in(ctx, request).await?;
        Ok(FeedbackAck {
            kind: kind.into(),
            notification_id: status.id.clone(),
            status: Some(status),
        })
    }
}

fn contact(contact_id: String) -> ContactRef {
    ContactRef {
        contact_id,
        ..ContactRef::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delivery_report_keeps_transport_extras() {
        let msg: FeedbackMessage = serde_json::from_value(json!({
            "kind": "delivery_report",
            "id": "c2f4j7au6s7f91uqnojg",
            "status": "DELIVRD",
            "network": "vodafone"
        }))
        .unwrap();
        match msg {
            FeedbackMessage::DeliveryReport {
                id, status, extras, ..
            } => {
                assert_eq!(id, "c2f4j7au6s7f91uqnojg");
                assert_eq!(status, "DELIVRD");
                assert_eq!(extras["network"], "vodafone");
                assert!(!extras.contains_key("kind"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn shapes_are_told_apart_by_kind() {
        let msg: FeedbackMessage = serde_json::from_value(json!({
            "kind": "subscription_change",
            "phone_number": "+15550100",
            "short_code": "3030",
            "keyword": "STOP",
            "update_type": "remove"
        }))
        .unwrap();
        assert_eq!(msg.kind(), "subscription_change");

        let msg: FeedbackMessage = serde_json::from_value(json!({
            "kind": "opt_out",
            "phone_number": "+15550100"
        }))
        .unwrap();
        assert_eq!(msg.kind(), "opt_out");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_json::from_value::<FeedbackMessage>(json!({"kind": "carrier_pigeon"})).is_err());
    }
}
