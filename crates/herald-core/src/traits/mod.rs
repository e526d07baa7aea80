// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by storage, transport, and profile backends.

pub mod adapter;
pub mod profile;
pub mod publisher;
pub mod store;

pub use adapter::PluginAdapter;
pub use profile::ProfileService;
pub use publisher::TopicPublisher;
pub use store::{EntityStore, StorageAdapter};
