// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route publishers for the Herald notification service.
//!
//! The [`PublisherRegistry`] maps route ids to bound [`TopicPublisher`]s.
//! Publishers are created from a route's URI by the [`PublisherFactory`],
//! which knows the `mem://` in-process broker and `http(s)://` webhooks and
//! accepts further schemes through [`PublisherConnector`].
//!
//! [`TopicPublisher`]: herald_core::TopicPublisher

pub mod factory;
pub mod http;
pub mod memory;
pub mod registry;

pub use factory::{PublisherConnector, PublisherFactory};
pub use http::HttpPublisher;
pub use memory::{MemoryBroker, MemoryPublisher};
pub use registry::PublisherRegistry;
