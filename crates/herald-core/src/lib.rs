// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Herald notification service.
//!
//! This crate provides the error taxonomy, entity types, id format, request
//! context, adapter traits, and the binary record published to transports.
//! Every other Herald crate builds on it.

pub mod context;
pub mod error;
pub mod id;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export key items at crate root for ergonomic imports.
pub use context::RequestContext;
pub use error::{ErrorCode, HeraldError};
pub use types::{
    AdapterType, Audit, Contact, ContactType, HealthStatus, JsonMap, Language, Notification,
    NotificationStatus, NotificationType, Page, Party, Profile, Route, RouteMode, State, Status,
    Template, TemplateData, TenantScope, now_timestamp,
};

pub use traits::{EntityStore, PluginAdapter, ProfileService, StorageAdapter, TopicPublisher};
