// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route selection for the Herald notification pipeline.
//!
//! This crate provides:
//! - [`RouteSelector`]: direct lookup by route id, or candidate matching by
//!   `(mode, type, partition)` with a stable first-candidate tie-break
//! - [`effective_type`]: the transport category implied by a recipient contact

pub mod selector;

pub use selector::{RouteDecision, RouteSelector, effective_type};
