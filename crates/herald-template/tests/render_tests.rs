// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering against templates stored in SQLite.

use std::sync::Arc;

use herald_config::model::StorageConfig;
use herald_core::{EntityStore, Notification, Template, TemplateData, TenantScope};
use herald_storage::SqliteStore;
use herald_template::TemplateRenderer;
use serde_json::json;

#[tokio::test]
async fn renders_only_rows_in_the_notification_language() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(StorageConfig {
        database_path: dir.path().join("t.db").to_str().unwrap().to_string(),
        migrate_only: false,
    })
    .await
    .unwrap();
    let scope = TenantScope::new("t1", "p1", "a1");

    let en = store.get_or_create_language(&scope, "en").await.unwrap();
    let fr = store.get_or_create_language(&scope, "fr").await.unwrap();
    let template = store
        .save_template(
            &scope,
            &Template::new(&scope, "template.profilev1.contact.verification", Default::default()),
        )
        .await
        .unwrap();
    store
        .save_template_data(
            &scope,
            &TemplateData::new(
                &scope,
                &template.id,
                &en.id,
                "text",
                "Your contact verification code is : {{pin}} and will expire at {{expiryDate}}",
            ),
        )
        .await
        .unwrap();
    store
        .save_template_data(
            &scope,
            &TemplateData::new(&scope, &template.id, &fr.id, "text", "Votre code : {{pin}}"),
        )
        .await
        .unwrap();

    let renderer = TemplateRenderer::new(Arc::new(store));
    let mut n = Notification::new(&scope);
    n.template_id = Some(template.id.clone());
    n.language_id = en.id.clone();
    if let serde_json::Value::Object(map) = json!({"pin": "1234", "expiryDate": "tomorrow"}) {
        n.payload = map;
    }

    let out = renderer.render(&scope, &n).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(
        out["text"],
        "Your contact verification code is : 1234 and will expire at tomorrow"
    );

    let again = renderer.render(&scope, &n).await.unwrap();
    assert_eq!(out, again);

    n.language_id = "unknown-language".into();
    assert!(renderer.render(&scope, &n).await.unwrap().is_empty());
}
