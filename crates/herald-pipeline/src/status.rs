// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status recording shared by the status handler and synchronous ingress.

use tracing::debug;

use herald_core::{EntityStore, HeraldError, Notification, NotificationStatus, TenantScope};

/// Append `status` and fold it into its notification's mirror fields.
///
/// The notification must exist; an unknown id is [`HeraldError::NotFound`]
/// and nothing is written. Replaying the same status row is a no-op.
pub async fn record_status(
    store: &dyn EntityStore,
    scope: &TenantScope,
    status: &NotificationStatus,
) -> Result<(), HeraldError> {
    store.get_notification(scope, &status.notification_id).await?;
    store.save_status(scope, status).await?;
    store.advance_status_mirror(scope, status).await?;
    debug!(
        notification_id = %status.notification_id,
        status_id = %status.id,
        state = %status.state,
        status = %status.status,
        "status recorded"
    );
    Ok(())
}

/// Copy the first external id a transport reports onto the notification so
/// later feedback can find it by that id.
///
/// A notification that already has one is returned unchanged. A concurrent
/// update surfaces as [`HeraldError::Conflict`].
pub async fn adopt_external_id(
    store: &dyn EntityStore,
    scope: &TenantScope,
    mut notification: Notification,
    external_id: Option<&str>,
) -> Result<Notification, HeraldError> {
    let Some(external_id) = external_id.filter(|s| !s.is_empty()) else {
        return Ok(notification);
    };
    if notification
        .external_id
        .as_deref()
        .is_some_and(|s| !s.is_empty())
    {
        return Ok(notification);
    }
    notification.external_id = Some(external_id.to_string());
    let updated = store.update_notification(scope, &notification).await?;
    debug!(notification_id = %updated.id, external_id, "external id adopted");
    Ok(updated)
}
