// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal typed event bus for the Herald notification pipeline.
//!
//! Handlers are the edges of the notification state machine. The bus is
//! assembled in one explicit step: take an [`Emitter`] from the
//! [`EventBusBuilder`] to hand to handlers that emit follow-up events, add
//! every handler, then [`EventBusBuilder::build`] the running bus.
//!
//! Delivery is asynchronous, bounded by a semaphore, and retried with
//! exponential backoff for retryable errors. No ordering is imposed between
//! events, not even for one notification.

pub mod bus;
pub mod event;
pub mod handler;
pub mod policy;

pub use bus::{Emitter, EventBus, EventBusBuilder};
pub use event::{EventPayload, StatusUpdate, names};
pub use handler::EventHandler;
pub use policy::RetryPolicy;
