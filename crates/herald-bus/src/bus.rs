// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus assembly, emission, and the dispatcher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use herald_config::model::BusConfig;
use herald_core::{HeraldError, RequestContext};

use crate::event::EventPayload;
use crate::handler::EventHandler;
use crate::policy::RetryPolicy;

type HandlerTable = HashMap<&'static str, Arc<dyn EventHandler>>;

tokio::task_local! {
    /// Set while a handler runs; emits from inside it skip the bounded queue.
    static IN_HANDLER: ();
}

/// A queued delivery.
struct Envelope {
    ctx: RequestContext,
    handler: Arc<dyn EventHandler>,
    payload: EventPayload,
}

/// Counts events that are queued or running.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(&self) {
        let now = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        herald_prometheus::set_bus_in_flight(now as f64);
    }

    fn leave(&self) {
        let now = self.count.fetch_sub(1, Ordering::SeqCst) - 1;
        herald_prometheus::set_bus_in_flight(now as f64);
        if now == 0 {
            self.idle.notify_waiters();
        }
    }

    fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Cheap handle for emitting events; clone freely.
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::Sender<Envelope>,
    follow_tx: mpsc::UnboundedSender<Envelope>,
    handlers: Arc<OnceLock<HandlerTable>>,
    in_flight: Arc<InFlight>,
}

impl Emitter {
    /// Validate `payload` against the handler registered for `name` and
    /// queue it.
    ///
    /// The event runs detached from `ctx`'s cancellation: finishing the
    /// emitting request does not cancel the pipeline.
    ///
    /// Callers outside the bus wait for room in the queue. Follow-up events
    /// emitted by a running handler go to a separate queue the dispatcher
    /// drains first, since the handler holds one of the dispatch permits.
    pub async fn emit(
        &self,
        ctx: &RequestContext,
        name: &str,
        payload: EventPayload,
    ) -> Result<(), HeraldError> {
        let handlers = self
            .handlers
            .get()
            .ok_or_else(|| HeraldError::Internal("event bus is not running".into()))?;
        let handler = handlers
            .get(name)
            .cloned()
            .ok_or_else(|| HeraldError::Internal(format!("no handler registered for {name}")))?;
        handler.validate(&payload)?;

        self.in_flight.enter();
        let envelope = Envelope {
            ctx: ctx.clone(),
            handler,
            payload,
        };
        let sent = if IN_HANDLER.try_with(|_| ()).is_ok() {
            self.follow_tx.send(envelope).is_ok()
        } else {
            self.tx.send(envelope).await.is_ok()
        };
        if !sent {
            self.in_flight.leave();
            return Err(HeraldError::Cancelled);
        }
        herald_prometheus::record_bus_event(name);
        debug!(event = name, "event emitted");
        Ok(())
    }
}

/// Collects handlers before the bus starts.
pub struct EventBusBuilder {
    config: BusConfig,
    tx: mpsc::Sender<Envelope>,
    rx: mpsc::Receiver<Envelope>,
    follow_tx: mpsc::UnboundedSender<Envelope>,
    follow_rx: mpsc::UnboundedReceiver<Envelope>,
    shared: Arc<OnceLock<HandlerTable>>,
    handlers: HandlerTable,
    in_flight: Arc<InFlight>,
}

impl EventBusBuilder {
    /// Emitter that becomes usable once [`EventBusBuilder::build`] ran.
    pub fn emitter(&self) -> Emitter {
        Emitter {
            tx: self.tx.clone(),
            follow_tx: self.follow_tx.clone(),
            handlers: Arc::clone(&self.shared),
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let name = handler.name();
        if self.handlers.insert(name, handler).is_some() {
            warn!(event = name, "handler replaced");
        }
        self
    }

    /// Freeze the handler table and start the dispatcher on the current
    /// tokio runtime.
    pub fn build(self) -> Result<EventBus, HeraldError> {
        let names: Vec<&'static str> = self.handlers.keys().copied().collect();
        self.shared
            .set(self.handlers)
            .map_err(|_| HeraldError::Internal("event bus already built".into()))?;

        let cancel = CancellationToken::new();
        let policy = RetryPolicy::from_config(&self.config);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let dispatcher = tokio::spawn(dispatch_loop(
            Queues {
                rx: self.rx,
                follow_rx: self.follow_rx,
            },
            semaphore,
            policy,
            cancel.clone(),
            Arc::clone(&self.in_flight),
        ));
        info!(handlers = ?names, "event bus started");

        let emitter = Emitter {
            tx: self.tx,
            follow_tx: self.follow_tx,
            handlers: self.shared,
            in_flight: Arc::clone(&self.in_flight),
        };
        Ok(EventBus {
            emitter,
            cancel,
            in_flight: self.in_flight,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }
}

/// The running bus.
pub struct EventBus {
    emitter: Emitter,
    cancel: CancellationToken,
    in_flight: Arc<InFlight>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    pub fn builder(config: BusConfig) -> EventBusBuilder {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (follow_tx, follow_rx) = mpsc::unbounded_channel();
        EventBusBuilder {
            config,
            tx,
            rx,
            follow_tx,
            follow_rx,
            shared: Arc::new(OnceLock::new()),
            handlers: HashMap::new(),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    /// Events queued or running right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    /// Resolve once nothing is queued or running, including events emitted
    /// by handlers along the way.
    pub async fn wait_idle(&self) {
        self.in_flight.wait_idle().await;
    }

    /// [`EventBus::wait_idle`] with a deadline; returns whether the bus
    /// went idle in time.
    pub async fn wait_idle_timeout(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.wait_idle()).await.is_ok()
    }

    /// Stop dispatching. Running handlers see their context cancelled and
    /// no event is redelivered afterwards.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.dispatcher.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "event dispatcher panicked");
            }
        }
        info!("event bus stopped");
    }
}

/// Caller emits and handler follow-ups.
struct Queues {
    rx: mpsc::Receiver<Envelope>,
    follow_rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Queues {
    async fn next(&mut self) -> Option<Envelope> {
        tokio::select! {
            biased;
            Some(envelope) = self.follow_rx.recv() => Some(envelope),
            next = self.rx.recv() => next,
        }
    }

    fn close_and_drain(&mut self, in_flight: &InFlight) {
        self.rx.close();
        self.follow_rx.close();
        while let Ok(dropped) = self.follow_rx.try_recv() {
            drop_envelope(&dropped, in_flight);
        }
        while let Ok(dropped) = self.rx.try_recv() {
            drop_envelope(&dropped, in_flight);
        }
    }
}

fn drop_envelope(envelope: &Envelope, in_flight: &InFlight) {
    herald_prometheus::record_bus_dropped(envelope.handler.name());
    in_flight.leave();
}

/// Takes one event at a time and spawns its delivery only once a permit
/// is free, so at most `max_concurrency` first attempts are outstanding and
/// everything else waits in the queues.
async fn dispatch_loop(
    mut queues: Queues,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    in_flight: Arc<InFlight>,
) {
    loop {
        let envelope = tokio::select! {
            _ = cancel.cancelled() => break,
            next = queues.next() => match next {
                Some(envelope) => envelope,
                None => break,
            },
        };
        let permit = tokio::select! {
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            drop_envelope(&envelope, &in_flight);
            break;
        };
        tokio::spawn(deliver(
            envelope,
            permit,
            Arc::clone(&semaphore),
            policy,
            cancel.clone(),
            Arc::clone(&in_flight),
        ));
    }

    queues.close_and_drain(&in_flight);
    debug!("event dispatcher exited");
}

async fn deliver(
    envelope: Envelope,
    first_permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    in_flight: Arc<InFlight>,
) {
    let Envelope {
        ctx,
        handler,
        payload,
    } = envelope;
    let event = handler.name();
    let base = ctx.with_parent(&cancel);
    let mut first_permit = Some(first_permit);

    for attempt in 1..=policy.max_attempts {
        let permit = match first_permit.take() {
            Some(permit) => Some(permit),
            None => tokio::select! {
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            },
        };
        let Some(permit) = permit else {
            herald_prometheus::record_bus_dropped(event);
            break;
        };

        let attempt_ctx = base.for_attempt(attempt, policy.max_attempts);
        let started = Instant::now();
        let result = attempt_ctx
            .run(async {
                match tokio::time::timeout(
                    policy.handler_timeout,
                    IN_HANDLER.scope((), handler.execute(&attempt_ctx, &payload)),
                )
                .await
                {
                    Ok(res) => res,
                    Err(_) => Err(HeraldError::Timeout {
                        duration: policy.handler_timeout,
                    }),
                }
            })
            .await;
        drop(permit);
        herald_prometheus::record_handler_duration(event, started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                debug!(event, attempt, id = payload.notification_id(), "handler done");
                break;
            }
            Err(e) if e.is_retryable() && attempt < policy.max_attempts && !cancel.is_cancelled() => {
                let delay = policy.backoff(attempt);
                warn!(
                    event,
                    attempt,
                    id = payload.notification_id(),
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "handler failed, will redeliver"
                );
                herald_prometheus::record_bus_retry(event);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        herald_prometheus::record_bus_dropped(event);
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                error!(
                    event,
                    attempt,
                    id = payload.notification_id(),
                    error = %e,
                    "handler gave up"
                );
                herald_prometheus::record_bus_dropped(event);
                break;
            }
        }
    }

    in_flight.leave();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use herald_core::TenantScope;
    use std::sync::atomic::AtomicU32;

    fn ctx() -> RequestContext {
        RequestContext::new(TenantScope::new("t1", "p1", "a1")).unwrap()
    }

    fn fast_config(max_attempts: u32) -> BusConfig {
        BusConfig {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            handler_timeout_secs: 5,
            ..BusConfig::default()
        }
    }

    /// Fails with a retryable error until `succeed_on`.
    struct Flaky {
        calls: AtomicU32,
        succeed_on: u32,
        last_final: AtomicU32,
    }

    #[async_trait]
    impl EventHandler for Flaky {
        fn name(&self) -> &'static str {
            "test.flaky"
        }

        fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
            payload.expect_id().map(|_| ())
        }

        async fn execute(
            &self,
            ctx: &RequestContext,
            _payload: &EventPayload,
        ) -> Result<(), HeraldError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.last_final
                .store(u32::from(ctx.is_final_attempt()), Ordering::SeqCst);
            if n >= self.succeed_on {
                Ok(())
            } else {
                Err(HeraldError::unreachable("broker down"))
            }
        }
    }

    fn flaky(succeed_on: u32) -> Arc<Flaky> {
        Arc::new(Flaky {
            calls: AtomicU32::new(0),
            succeed_on,
            last_final: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn emit_before_build_fails() {
        let builder = EventBus::builder(fast_config(3));
        let emitter = builder.emitter();
        let err = emitter
            .emit(&ctx(), "test.flaky", EventPayload::Id("n1".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Internal(_)));
    }

    #[tokio::test]
    async fn unknown_event_is_rejected() {
        let bus = EventBus::builder(fast_config(3)).build().unwrap();
        let err = bus
            .emitter()
            .emit(&ctx(), "nope", EventPayload::Id("n1".into()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no handler registered for nope"));
    }

    #[tokio::test]
    async fn invalid_payload_is_never_queued() {
        let handler = flaky(1);
        let bus = EventBus::builder(fast_config(3))
            .handler(handler.clone())
            .build()
            .unwrap();
        let err = bus
            .emitter()
            .emit(&ctx(), "test.flaky", EventPayload::Id(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Validation(_)));
        assert_eq!(bus.in_flight(), 0);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retryable_errors_are_redelivered() {
        let handler = flaky(3);
        let bus = EventBus::builder(fast_config(5))
            .handler(handler.clone())
            .build()
            .unwrap();
        bus.emitter()
            .emit(&ctx(), "test.flaky", EventPayload::Id("n1".into()))
            .await
            .unwrap();
        assert!(bus.wait_idle_timeout(Duration::from_secs(5)).await);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(handler.last_final.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn attempts_are_bounded_and_last_is_final() {
        let handler = flaky(100);
        let bus = EventBus::builder(fast_config(3))
            .handler(handler.clone())
            .build()
            .unwrap();
        bus.emitter()
            .emit(&ctx(), "test.flaky", EventPayload::Id("n1".into()))
            .await
            .unwrap();
        assert!(bus.wait_idle_timeout(Duration::from_secs(5)).await);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(handler.last_final.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn exhausted_redelivery_is_logged() {
        let bus = EventBus::builder(fast_config(2))
            .handler(flaky(100))
            .build()
            .unwrap();
        bus.emitter()
            .emit(&ctx(), "test.flaky", EventPayload::Id("n7".into()))
            .await
            .unwrap();
        assert!(bus.wait_idle_timeout(Duration::from_secs(5)).await);
        assert!(logs_contain("will redeliver"));
        assert!(logs_contain("handler gave up"));
    }

    /// Blocks every call until the gate opens.
    struct Gated {
        gate: Semaphore,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EventHandler for Gated {
        fn name(&self) -> &'static str {
            "test.gated"
        }

        fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
            payload.expect_id().map(|_| ())
        }

        async fn execute(
            &self,
            _ctx: &RequestContext,
            _payload: &EventPayload,
        ) -> Result<(), HeraldError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _pass = self
                .gate
                .acquire()
                .await
                .map_err(|_| HeraldError::Cancelled)?;
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn busy_handlers_push_back_on_callers() {
        let handler = Arc::new(Gated {
            gate: Semaphore::new(0),
            calls: AtomicU32::new(0),
        });
        let config = BusConfig {
            queue_capacity: 1,
            max_concurrency: 1,
            ..fast_config(1)
        };
        let bus = EventBus::builder(config)
            .handler(handler.clone())
            .build()
            .unwrap();
        let emitter = bus.emitter();

        // One running, one held by the dispatcher, one queued.
        for id in ["n1", "n2", "n3"] {
            emitter
                .emit(&ctx(), "test.gated", EventPayload::Id(id.into()))
                .await
                .unwrap();
        }
        let blocked = {
            let emitter = emitter.clone();
            tokio::spawn(async move {
                emitter
                    .emit(&ctx(), "test.gated", EventPayload::Id("n4".into()))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!blocked.is_finished());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

        handler.gate.add_permits(4);
        blocked.await.unwrap().unwrap();
        assert!(bus.wait_idle_timeout(Duration::from_secs(5)).await);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 4);
    }

    /// Emits `fan_out` children from inside its own delivery.
    struct Parent {
        emitter: Emitter,
        fan_out: usize,
    }

    #[async_trait]
    impl EventHandler for Parent {
        fn name(&self) -> &'static str {
            "test.parent"
        }

        fn validate(&self, payload: &EventPayload) -> Result<(), HeraldError> {
            payload.expect_id().map(|_| ())
        }

        async fn execute(
            &self,
            ctx: &RequestContext,
            payload: &EventPayload,
        ) -> Result<(), HeraldError> {
            let id = payload.expect_id()?;
            for n in 0..self.fan_out {
                self.emitter
                    .emit(ctx, "test.flaky", EventPayload::Id(format!("{id}-{n}")))
                    .await?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn handlers_emit_past_a_full_queue() {
        let child = flaky(1);
        let config = BusConfig {
            queue_capacity: 1,
            max_concurrency: 1,
            ..fast_config(1)
        };
        let builder = EventBus::builder(config);
        let parent = Arc::new(Parent {
            emitter: builder.emitter(),
            fan_out: 4,
        });
        let bus = builder
            .handler(parent)
            .handler(child.clone())
            .build()
            .unwrap();

        for id in ["p1", "p2", "p3"] {
            bus.emitter()
                .emit(&ctx(), "test.parent", EventPayload::Id(id.into()))
                .await
                .unwrap();
        }
        assert!(bus.wait_idle_timeout(Duration::from_secs(5)).await);
        assert_eq!(child.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_events() {
        let bus = EventBus::builder(fast_config(3))
            .handler(flaky(1))
            .build()
            .unwrap();
        bus.shutdown().await;
        // The receiver is gone once the dispatcher exits.
        let err = bus
            .emitter()
            .emit(&ctx(), "test.flaky", EventPayload::Id("n1".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Cancelled));
        assert!(bus.wait_idle_timeout(Duration::from_secs(1)).await);
    }
}
