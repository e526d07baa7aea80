// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport topic publisher trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;

/// Publishes opaque payloads to a single route topic.
///
/// Delivery semantics are transport-defined; callers assume at-least-once
/// and keep downstream steps idempotent on notification id.
#[async_trait]
pub trait TopicPublisher: PluginAdapter {
    /// The URI this publisher was bound to.
    fn uri(&self) -> &str;

    async fn publish(&self, payload: Bytes) -> Result<(), HeraldError>;
}
