// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory profile service.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use herald_core::{
    AdapterType, Contact, ContactType, HealthStatus, HeraldError, PluginAdapter, Profile,
    ProfileService, TenantScope,
};

/// Profiles served from memory. Unknown ids are `NotFound`.
#[derive(Default)]
pub struct StaticProfiles {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: Profile) {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile);
    }

    /// Add a profile holding one contact.
    pub async fn insert_contact(
        &self,
        profile_id: &str,
        contact_id: &str,
        detail: &str,
        contact_type: ContactType,
    ) {
        self.insert(Profile {
            id: profile_id.to_string(),
            contacts: vec![Contact {
                id: contact_id.to_string(),
                detail: detail.to_string(),
                contact_type,
            }],
        })
        .await;
    }
}

#[async_trait]
impl PluginAdapter for StaticProfiles {
    fn name(&self) -> &str {
        "static-profiles"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Profile
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}

#[async_trait]
impl ProfileService for StaticProfiles {
    async fn get_profile(
        &self,
        _scope: &TenantScope,
        profile_id: &str,
    ) -> Result<Profile, HeraldError> {
        self.profiles
            .read()
            .await
            .get(profile_id)
            .cloned()
            .ok_or_else(|| HeraldError::not_found("profile", profile_id))
    }
}
