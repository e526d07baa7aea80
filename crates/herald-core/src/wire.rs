// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary notification record handed to transport integrations.
//!
//! Records are protobuf messages written with a varint length prefix.
//! Tag numbers are stable; new fields are appended with fresh tags.

use std::collections::BTreeMap;

use bytes::Bytes;
use prost::Message;
use prost_types::value::Kind;

use crate::error::HeraldError;
use crate::types::{JsonMap, State, Status};

/// Sender or recipient coordinates.
#[derive(Clone, PartialEq, Message)]
pub struct ContactLink {
    #[prost(string, tag = "1")]
    pub profile_type: String,
    #[prost(string, tag = "2")]
    pub profile_id: String,
    #[prost(string, tag = "3")]
    pub contact_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireState {
    Created = 0,
    Checked = 1,
    Active = 2,
    Inactive = 3,
    Deleted = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireStatus {
    Unknown = 0,
    Queued = 1,
    InProcess = 2,
    Successful = 3,
    Failed = 4,
}

impl From<State> for WireState {
    fn from(s: State) -> Self {
        match s {
            State::Created => WireState::Created,
            State::Checked => WireState::Checked,
            State::Active => WireState::Active,
            State::Inactive => WireState::Inactive,
            State::Deleted => WireState::Deleted,
        }
    }
}

impl From<WireState> for State {
    fn from(s: WireState) -> Self {
        match s {
            WireState::Created => State::Created,
            WireState::Checked => State::Checked,
            WireState::Active => State::Active,
            WireState::Inactive => State::Inactive,
            WireState::Deleted => State::Deleted,
        }
    }
}

impl From<Status> for WireStatus {
    fn from(s: Status) -> Self {
        match s {
            Status::Unknown => WireStatus::Unknown,
            Status::Queued => WireStatus::Queued,
            Status::InProcess => WireStatus::InProcess,
            Status::Successful => WireStatus::Successful,
            Status::Failed => WireStatus::Failed,
        }
    }
}

impl From<WireStatus> for Status {
    fn from(s: WireStatus) -> Self {
        match s {
            WireStatus::Unknown => Status::Unknown,
            WireStatus::Queued => Status::Queued,
            WireStatus::InProcess => Status::InProcess,
            WireStatus::Successful => Status::Successful,
            WireStatus::Failed => Status::Failed,
        }
    }
}

/// Latest status attached to an outgoing record.
#[derive(Clone, PartialEq, Message)]
pub struct StatusRecord {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(enumeration = "WireState", tag = "2")]
    pub state: i32,
    #[prost(enumeration = "WireStatus", tag = "3")]
    pub status: i32,
    #[prost(string, tag = "4")]
    pub external_id: String,
    #[prost(string, tag = "5")]
    pub transient_id: String,
    #[prost(message, optional, tag = "6")]
    pub extras: Option<prost_types::Struct>,
}

/// API-shaped notification as published on a route topic.
#[derive(Clone, PartialEq, Message)]
pub struct NotificationRecord {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub parent_id: String,
    #[prost(message, optional, tag = "3")]
    pub source: Option<ContactLink>,
    #[prost(message, optional, tag = "4")]
    pub recipient: Option<ContactLink>,
    /// Transport category (`any`, `l`, `s`).
    #[prost(string, tag = "5")]
    pub kind: String,
    #[prost(string, tag = "6")]
    pub template: String,
    #[prost(message, optional, tag = "7")]
    pub payload: Option<prost_types::Struct>,
    /// Rendered content keyed by template type (`default` for literal messages).
    #[prost(btree_map = "string, string", tag = "8")]
    pub data: BTreeMap<String, String>,
    #[prost(string, tag = "9")]
    pub language: String,
    #[prost(bool, tag = "10")]
    pub out_bound: bool,
    #[prost(bool, tag = "11")]
    pub auto_release: bool,
    #[prost(string, tag = "12")]
    pub route_id: String,
    #[prost(message, optional, tag = "13")]
    pub status: Option<StatusRecord>,
    #[prost(message, optional, tag = "14")]
    pub extras: Option<prost_types::Struct>,
    #[prost(int32, tag = "15")]
    pub priority: i32,
}

impl NotificationRecord {
    /// Length-delimited encoding.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.encode_length_delimited_to_vec())
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, HeraldError> {
        Self::decode_length_delimited(buf)
            .map_err(|e| HeraldError::Validation(format!("malformed notification record: {e}")))
    }
}

/// Convert a JSON object into a protobuf `Struct`.
pub fn json_to_struct(map: &JsonMap) -> prost_types::Struct {
    prost_types::Struct {
        fields: map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect(),
    }
}

fn json_to_value(v: &serde_json::Value) -> prost_types::Value {
    use serde_json::Value;
    let kind = match v {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        Value::Object(map) => Kind::StructValue(json_to_struct(map)),
    };
    prost_types::Value { kind: Some(kind) }
}

/// Convert a protobuf `Struct` back into a JSON object.
pub fn struct_to_json(s: &prost_types::Struct) -> JsonMap {
    s.fields
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect()
}

fn value_to_json(v: &prost_types::Value) -> serde_json::Value {
    use serde_json::Value;
    match &v.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => {
            if n.fract() == 0.0 && n.abs() < (i64::MAX as f64) {
                Value::from(*n as i64)
            } else {
                serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(l)) => Value::Array(l.values.iter().map(value_to_json).collect()),
        Some(Kind::StructValue(s)) => Value::Object(struct_to_json(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> NotificationRecord {
        let payload = json!({"pin": "1234", "attempts": 3, "nested": {"ok": true}});
        let mut data = BTreeMap::new();
        data.insert("text".to_string(), "Your code is 1234".to_string());
        NotificationRecord {
            id: "c2f4j7au6s7f91uqnojg".into(),
            recipient: Some(ContactLink {
                contact_id: "epochTesting".into(),
                ..Default::default()
            }),
            kind: "s".into(),
            payload: Some(json_to_struct(payload.as_object().unwrap())),
            data,
            language: "en".into(),
            out_bound: true,
            route_id: "route-1".into(),
            status: Some(StatusRecord {
                id: "s1".into(),
                state: WireState::Active as i32,
                status: WireStatus::Queued as i32,
                ..Default::default()
            }),
            priority: 2,
            ..Default::default()
        }
    }

    #[test]
    fn record_survives_the_wire() {
        let record = sample();
        let decoded = NotificationRecord::from_bytes(&record.to_bytes()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.data["text"], "Your code is 1234");
        let status = decoded.status.unwrap();
        assert_eq!(State::from(status.state()), State::Active);
        assert_eq!(Status::from(status.status()), Status::Queued);
    }

    #[test]
    fn encoding_is_length_prefixed() {
        let bytes = sample().to_bytes();
        let body_len = sample().encoded_len();
        assert!(bytes.len() > body_len);
        assert!(NotificationRecord::decode(&bytes[bytes.len() - body_len..]).is_ok());
    }

    #[test]
    fn json_struct_conversion_keeps_integers() {
        let payload = json!({"pin": "1234", "attempts": 3, "ratio": 0.5, "list": [1, "a"], "none": null});
        let map = payload.as_object().unwrap();
        assert_eq!(struct_to_json(&json_to_struct(map)), *map);
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let bytes = sample().to_bytes();
        assert!(NotificationRecord::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }
}
