// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Herald integration tests.
//!
//! Provides mock adapters and a test harness that assembles the whole
//! pipeline over a temporary SQLite database, without external services.
//!
//! # Components
//!
//! - [`MockPublisher`] - Captures published records under the `mock://` scheme
//! - [`StaticProfiles`] - In-memory profile service
//! - [`TestHarness`] - Storage, bus, pipeline, and ingress wired together

pub mod harness;
pub mod mock_profiles;
pub mod mock_publisher;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_profiles::StaticProfiles;
pub use mock_publisher::MockPublisher;
