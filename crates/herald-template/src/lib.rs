// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template rendering for outbound notifications.
//!
//! A notification either carries a literal `message`, which is delivered as
//! is under the `default` key, or references a template whose per-language
//! rows are rendered against the notification payload. Each row produces one
//! entry in the rendered map, keyed by its channel type.

pub mod renderer;

pub use renderer::{DEFAULT_KEY, RenderedMap, TemplateRenderer};
