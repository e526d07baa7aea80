// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handlebars-backed renderer over stored template rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use handlebars::Handlebars;
use tracing::{debug, warn};

use herald_core::{EntityStore, HeraldError, JsonMap, Notification, TemplateData, TenantScope};

/// Key used when a literal message bypasses template lookup.
pub const DEFAULT_KEY: &str = "default";

/// Channel type → rendered text. Ordered so encodings are stable.
pub type RenderedMap = BTreeMap<String, String>;

/// Resolves a notification's template rows and renders them.
pub struct TemplateRenderer {
    store: Arc<dyn EntityStore>,
    engine: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let mut engine = Handlebars::new();
        // Payload values are delivered as plain text, never HTML.
        engine.register_escape_fn(handlebars::no_escape);
        engine.set_strict_mode(false);
        Self { store, engine }
    }

    /// Render `notification` in its own language.
    ///
    /// A lookup failure for the template rows is logged and treated as an
    /// empty set; callers decide whether an empty map is fatal.
    pub async fn render(
        &self,
        scope: &TenantScope,
        notification: &Notification,
    ) -> Result<RenderedMap, HeraldError> {
        if !notification.message.is_empty() {
            let mut out = RenderedMap::new();
            out.insert(DEFAULT_KEY.to_string(), notification.message.clone());
            return Ok(out);
        }

        let template_id = notification
            .template_id()
            .ok_or(HeraldError::MissingTemplate)?;

        let rows = match self
            .store
            .get_template_data_by_language(
                scope,
                &notification.language_id,
                &[template_id.to_string()],
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => {
                warn!(
                    notification_id = %notification.id,
                    template_id,
                    error = %e,
                    "template data lookup failed, rendering nothing"
                );
                Vec::new()
            }
        };

        debug!(
            notification_id = %notification.id,
            template_id,
            rows = rows.len(),
            "rendering template"
        );
        self.render_rows(&rows, &notification.payload)
    }

    /// Render each row's `detail` against `payload`. Pure.
    ///
    /// Missing payload keys render as empty strings.
    pub fn render_rows(
        &self,
        rows: &[TemplateData],
        payload: &JsonMap,
    ) -> Result<RenderedMap, HeraldError> {
        let mut out = RenderedMap::new();
        for row in rows {
            let rendered = self
                .engine
                .render_template(&row.detail, payload)
                .map_err(|e| HeraldError::Template(format!("{} ({}): {e}", row.id, row.kind)))?;
            out.insert(row.kind.clone(), rendered);
        }
        Ok(out)
    }
}
