// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile service query trait.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Profile, TenantScope};

/// Looks up recipient profiles and their contacts.
#[async_trait]
pub trait ProfileService: PluginAdapter {
    /// Fetch a profile. A missing profile is [`HeraldError::NotFound`];
    /// transport failures are retryable errors.
    async fn get_profile(
        &self,
        scope: &TenantScope,
        profile_id: &str,
    ) -> Result<Profile, HeraldError>;
}
