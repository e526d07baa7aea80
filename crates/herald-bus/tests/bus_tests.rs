// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus behaviour across chained handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use herald_bus::{Emitter, EventBus, EventHandler, EventPayload};
use herald_config::model::BusConfig;
use herald_core::{HeraldError, RequestContext, TenantScope};
use tokio::sync::Mutex;

fn ctx() -> RequestContext {
    RequestContext::new(TenantScope::new("t1", "p1", "a1")).unwrap()
}

/// Forwards every id to `second`.
struct First {
    emitter: Emitter,
}

#[async_trait]
impl EventHandler for First {
    fn name(&self) -> &'static str {
        "chain.first"
    }

    fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
        payload.expect_id().map(|_| ())
    }

    async fn execute(&self, ctx: &RequestContext, payload: &EventPayload) -> Result<(), HeraldError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let id = payload.expect_id()?;
        self.emitter
            .emit(ctx, "chain.second", EventPayload::Id(id.to_string()))
            .await
    }
}

/// Records what it saw, including the tenant from the context.
#[derive(Default)]
struct Second {
    seen: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl EventHandler for Second {
    fn name(&self) -> &'static str {
        "chain.second"
    }

    fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
        payload.expect_id().map(|_| ())
    }

    async fn execute(&self, ctx: &RequestContext, payload: &EventPayload) -> Result<(), HeraldError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.seen
            .lock()
            .await
            .push((ctx.scope().tenant_id.clone(), payload.expect_id()?.to_string()));
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wait_idle_covers_follow_up_events() {
    let builder = EventBus::builder(BusConfig::default());
    let first = Arc::new(First {
        emitter: builder.emitter(),
    });
    let second = Arc::new(Second::default());
    let bus = builder.handler(first).handler(second.clone()).build().unwrap();

    for i in 0..10 {
        bus.emitter()
            .emit(&ctx(), "chain.first", EventPayload::Id(format!("n{i}")))
            .await
            .unwrap();
    }
    assert!(bus.wait_idle_timeout(Duration::from_secs(5)).await);

    let seen = second.seen.lock().await;
    assert_eq!(seen.len(), 10);
    assert!(seen.iter().all(|(tenant, _)| tenant == "t1"));
}

/// Blocks until cancelled.
struct Stuck {
    started: AtomicUsize,
}

#[async_trait]
impl EventHandler for Stuck {
    fn name(&self) -> &'static str {
        "stuck"
    }

    fn validate(&self, _payload: &EventPayload) -> Result<(), HeraldError> {
        Ok(())
    }

    async fn execute(&self, ctx: &RequestContext, _payload: &EventPayload) -> Result<(), HeraldError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        ctx.cancellation().cancelled().await;
        Err(HeraldError::Cancelled)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_cancels_running_handlers() {
    let stuck = Arc::new(Stuck {
        started: AtomicUsize::new(0),
    });
    let bus = EventBus::builder(BusConfig::default())
        .handler(stuck.clone())
        .build()
        .unwrap();
    bus.emitter()
        .emit(&ctx(), "stuck", EventPayload::Id("n1".into()))
        .await
        .unwrap();
    while stuck.started.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!bus.wait_idle_timeout(Duration::from_millis(50)).await);

    bus.shutdown().await;
    assert!(bus.wait_idle_timeout(Duration::from_secs(2)).await);
    assert_eq!(stuck.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn emitting_request_cancellation_does_not_cancel_the_event() {
    let second = Arc::new(Second::default());
    let bus = EventBus::builder(BusConfig::default())
        .handler(second.clone())
        .build()
        .unwrap();
    let request = ctx();
    bus.emitter()
        .emit(&request, "chain.second", EventPayload::Id("n1".into()))
        .await
        .unwrap();
    request.cancellation().cancel();

    assert!(bus.wait_idle_timeout(Duration::from_secs(2)).await);
    assert_eq!(second.seen.lock().await.len(), 1);
}
