// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route selection: pinned route > candidate match on mode, type, and partition.

use std::sync::Arc;

use tracing::{debug, info};

use herald_core::{
    EntityStore, HeraldError, Notification, NotificationType, Profile, Route, RouteMode,
    TenantScope,
};

/// The chosen route plus how it was chosen.
#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub route: Route,
    /// Number of candidates considered (1 for a pinned route).
    pub candidates: usize,
    /// Human-readable reason for the decision.
    pub reason: String,
}

/// Picks the route a notification is dispatched on.
#[derive(Clone)]
pub struct RouteSelector {
    store: Arc<dyn EntityStore>,
}

impl RouteSelector {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Select a route for `notification`.
    ///
    /// Priority order:
    /// 1. The notification's own `route_id`, which must exist
    /// 2. The first candidate in creation order among routes of the
    ///    notification's partition whose type is `any` or `route_type` and
    ///    whose mode is `mode` or `trx`
    pub async fn select(
        &self,
        scope: &TenantScope,
        mode: RouteMode,
        notification: &Notification,
        route_type: NotificationType,
    ) -> Result<RouteDecision, HeraldError> {
        if let Some(route_id) = notification.route_id() {
            let route = self
                .store
                .get_route(scope, route_id)
                .await
                .map_err(|e| match e {
                    HeraldError::NotFound { .. } => HeraldError::NoRoute(route_id.to_string()),
                    other => other,
                })?;
            debug!(notification_id = %notification.id, route_id, "using pinned route");
            return Ok(RouteDecision {
                route,
                candidates: 1,
                reason: "pinned on notification".to_string(),
            });
        }

        let partition_id = notification.audit.partition_id.as_str();
        let mut candidates = self
            .store
            .get_routes_by_mode_type_partition(scope, mode, route_type, partition_id)
            .await?;
        if candidates.is_empty() {
            return Err(HeraldError::NoRouteMatched(format!(
                "for mode={mode} type={route_type} partition={partition_id}"
            )));
        }

        let count = candidates.len();
        let route = candidates.swap_remove(0);
        info!(
            notification_id = %notification.id,
            route_id = %route.id,
            %mode,
            %route_type,
            candidates = count,
            "route selected"
        );
        Ok(RouteDecision {
            route,
            candidates: count,
            reason: format!("first of {count} candidate(s)"),
        })
    }
}

/// Transport category for the recipient's contact.
///
/// A missing profile or an unknown contact id degrades to `any`.
pub fn effective_type(profile: Option<&Profile>, contact_id: &str) -> NotificationType {
    profile
        .and_then(|p| p.contact(contact_id))
        .map(|c| c.contact_type.notification_type())
        .unwrap_or(NotificationType::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{Contact, ContactType};

    fn profile() -> Profile {
        Profile {
            id: "prof-1".into(),
            contacts: vec![
                Contact {
                    id: "c-sms".into(),
                    detail: "+15550100".into(),
                    contact_type: ContactType::Msisdn,
                },
                Contact {
                    id: "c-mail".into(),
                    detail: "a@example.com".into(),
                    contact_type: ContactType::Email,
                },
                Contact {
                    id: "c-other".into(),
                    detail: "@a:matrix.org".into(),
                    contact_type: ContactType::Other,
                },
            ],
        }
    }

    #[test]
    fn msisdn_is_short_form() {
        assert_eq!(effective_type(Some(&profile()), "c-sms"), NotificationType::Short);
    }

    #[test]
    fn email_is_long_form() {
        assert_eq!(effective_type(Some(&profile()), "c-mail"), NotificationType::Long);
    }

    #[test]
    fn everything_else_is_any() {
        assert_eq!(effective_type(Some(&profile()), "c-other"), NotificationType::Any);
        assert_eq!(effective_type(Some(&profile()), "missing"), NotificationType::Any);
        assert_eq!(effective_type(None, "c-sms"), NotificationType::Any);
    }
}
