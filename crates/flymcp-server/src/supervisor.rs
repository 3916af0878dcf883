//! Execution supervisor for tool calls.
//!
//! Owns admission control (global and per-tool concurrency slots with
//! a bounded wait queue), timeout enforcement, cooperative
//! cancellation, and per-call bookkeeping. Slot release is tied to
//! permit scope, so every exit path (success, error, timeout,
//! cancellation, panic) releases identically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use flymcp_protocol::logging::{debug, targets, warn};
use flymcp_protocol::{CallToolResult, RequestId, ServerError, ServerResult};

use crate::config::ServerConfig;
use crate::handler::CallContext;
use crate::registry::{RegisteredTool, ToolRegistry};

/// Bookkeeping for one accepted call.
///
/// Owned exclusively by the supervisor; created on admission and
/// removed by a drop guard on every exit path.
struct InFlightCall {
    tool: String,
    started: Instant,
    cancel: CancellationToken,
}

/// An admission pool: a semaphore plus a bound on waiters.
struct Pool {
    semaphore: Arc<Semaphore>,
    waiting: AtomicUsize,
    max_waiting: usize,
}

impl Pool {
    fn new(permits: usize, max_waiting: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            waiting: AtomicUsize::new(0),
            max_waiting,
        }
    }

    /// Acquires one slot, waiting in a bounded queue.
    ///
    /// When the queue is already at its bound the call is rejected
    /// immediately rather than waiting without limit.
    async fn acquire(&self, tool: &str) -> ServerResult<OwnedSemaphorePermit> {
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            return Ok(permit);
        }

        let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
        let _guard = WaitGuard(&self.waiting);
        if queued >= self.max_waiting {
            debug!(
                target: targets::SUPERVISOR,
                "admission queue full for '{tool}' ({queued} waiting)"
            );
            return Err(ServerError::overloaded(tool));
        }

        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ServerError::internal_error("admission semaphore closed"))
    }
}

/// Decrements the waiter count on every exit path from `acquire`.
struct WaitGuard<'a>(&'a AtomicUsize);

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Concurrency, timeout, and cancellation machinery for tool calls.
pub(crate) struct Supervisor {
    global: Pool,
    per_tool: HashMap<String, Pool>,
    default_timeout: Duration,
    in_flight: Mutex<HashMap<RequestId, InFlightCall>>,
}

impl Supervisor {
    /// Builds the supervisor from the immutable tool registry.
    ///
    /// Per-tool pools exist only for tools with a configured cap; the
    /// registry has already clamped those caps to the global cap.
    pub fn new(config: &ServerConfig, tools: &ToolRegistry) -> Self {
        let per_tool = tools
            .iter()
            .filter_map(|tool| {
                tool.definition.max_concurrency.map(|cap| {
                    (
                        tool.definition.name.clone(),
                        Pool::new(cap, config.max_queue_depth),
                    )
                })
            })
            .collect();

        Self {
            global: Pool::new(config.max_concurrency, config.max_queue_depth),
            per_tool,
            default_timeout: config.default_timeout,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Runs one tool call under admission control and a deadline.
    ///
    /// Acquisition order is global-then-tool so a saturated tool never
    /// starves the ordering of unrelated tools in the global pool.
    pub async fn execute(
        &self,
        id: RequestId,
        tool: &RegisteredTool,
        arguments: serde_json::Value,
    ) -> ServerResult<CallToolResult> {
        let name = tool.definition.name.clone();

        let _global_slot = self.global.acquire(&name).await?;
        let _tool_slot = match self.per_tool.get(&name) {
            Some(pool) => Some(pool.acquire(&name).await?),
            None => None,
        };

        let timeout = tool.definition.timeout.unwrap_or(self.default_timeout);
        let cancel = CancellationToken::new();
        let _in_flight = InFlightGuard::register(&self.in_flight, id.clone(), &name, &cancel);

        let ctx = CallContext::new(id, cancel.clone());
        let handler = Arc::clone(&tool.handler);
        let mut work = tokio::spawn(async move { handler.call(&ctx, arguments).await });

        // Three signals race; the first terminal state wins and later
        // signals are no-ops. A handler that ignores the cancel signal
        // keeps running detached; cleanup of such orphaned work is the
        // handler's own responsibility.
        tokio::select! {
            joined = &mut work => match joined {
                Ok(result) => result,
                Err(err) if err.is_panic() => {
                    warn!(target: targets::SUPERVISOR, "tool '{name}' panicked");
                    Err(ServerError::internal_error(format!("tool '{name}' panicked")))
                }
                Err(_) => Err(ServerError::cancelled()),
            },
            () = cancel.cancelled() => {
                debug!(target: targets::SUPERVISOR, "tool '{name}' cancelled");
                Err(ServerError::cancelled())
            }
            () = tokio::time::sleep(timeout) => {
                cancel.cancel();
                debug!(target: targets::SUPERVISOR, "tool '{name}' hit its deadline");
                Err(ServerError::timeout(&name, timeout.as_secs_f64()))
            }
        }
    }

    /// Signals cancellation for an in-flight call.
    ///
    /// An id that is unknown or already completed is a silent no-op;
    /// racing with natural completion is expected.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let guard = self.in_flight.lock().expect("in_flight lock poisoned");
        match guard.get(id) {
            Some(call) => {
                debug!(
                    target: targets::SUPERVISOR,
                    "cancelling '{}' (id={id}) after {:?}",
                    call.tool,
                    call.started.elapsed()
                );
                call.cancel.cancel();
                true
            }
            None => {
                debug!(target: targets::SUPERVISOR, "cancel for unknown id={id} ignored");
                false
            }
        }
    }

    /// Number of calls between admission and a terminal state.
    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().expect("in_flight lock poisoned").len()
    }
}

/// Registers a call on admission and removes it on drop.
struct InFlightGuard<'a> {
    map: &'a Mutex<HashMap<RequestId, InFlightCall>>,
    id: RequestId,
}

impl<'a> InFlightGuard<'a> {
    fn register(
        map: &'a Mutex<HashMap<RequestId, InFlightCall>>,
        id: RequestId,
        tool: &str,
        cancel: &CancellationToken,
    ) -> Self {
        let call = InFlightCall {
            tool: tool.to_owned(),
            started: Instant::now(),
            cancel: cancel.clone(),
        };
        let mut guard = map.lock().expect("in_flight lock poisoned");
        if guard.insert(id.clone(), call).is_some() {
            warn!(target: targets::SUPERVISOR, "in-flight call replaced for id={id}");
        }
        Self { map, id }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut guard = self.map.lock().expect("in_flight lock poisoned");
        guard.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxFuture, ToolHandler};
    use flymcp_protocol::ToolDefinition;
    use tokio::sync::Notify;

    /// Tracks current and peak concurrent executions.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    /// Tool that records concurrency and waits until released.
    struct GatedTool {
        definition: ToolDefinition,
        gauge: Arc<Gauge>,
        release: Arc<Notify>,
    }

    impl ToolHandler for GatedTool {
        fn definition(&self) -> ToolDefinition {
            self.definition.clone()
        }

        fn call<'a>(
            &'a self,
            _ctx: &'a CallContext,
            _arguments: serde_json::Value,
        ) -> BoxFuture<'a, ServerResult<CallToolResult>> {
            let gauge = Arc::clone(&self.gauge);
            let release = Arc::clone(&self.release);
            Box::pin(async move {
                gauge.enter();
                release.notified().await;
                gauge.exit();
                Ok(CallToolResult::text("done"))
            })
        }
    }

    /// Tool whose handler never completes.
    struct StuckTool(ToolDefinition);

    impl ToolHandler for StuckTool {
        fn definition(&self) -> ToolDefinition {
            self.0.clone()
        }

        fn call<'a>(
            &'a self,
            _ctx: &'a CallContext,
            _arguments: serde_json::Value,
        ) -> BoxFuture<'a, ServerResult<CallToolResult>> {
            Box::pin(std::future::pending())
        }
    }

    /// Tool that completes immediately.
    struct FastTool(ToolDefinition);

    impl ToolHandler for FastTool {
        fn definition(&self) -> ToolDefinition {
            self.0.clone()
        }

        fn call<'a>(
            &'a self,
            _ctx: &'a CallContext,
            _arguments: serde_json::Value,
        ) -> BoxFuture<'a, ServerResult<CallToolResult>> {
            Box::pin(async { Ok(CallToolResult::text("fast")) })
        }
    }

    fn build(
        handlers: Vec<Arc<dyn ToolHandler>>,
        config: ServerConfig,
    ) -> (Arc<Supervisor>, Arc<ToolRegistry>) {
        let registry = Arc::new(ToolRegistry::new(handlers, config.max_concurrency));
        let supervisor = Arc::new(Supervisor::new(&config, &registry));
        (supervisor, registry)
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn global_cap_is_never_exceeded_under_burst() {
        let gauge = Arc::new(Gauge::default());
        let release = Arc::new(Notify::new());
        let tool: Arc<dyn ToolHandler> = Arc::new(GatedTool {
            definition: ToolDefinition::new("burst", "", serde_json::json!({})),
            gauge: Arc::clone(&gauge),
            release: Arc::clone(&release),
        });
        let (supervisor, registry) =
            build(vec![tool], ServerConfig::default().max_concurrency(2));

        let mut handles = Vec::new();
        for i in 0..6i64 {
            let supervisor = Arc::clone(&supervisor);
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let tool = registry.get("burst").unwrap();
                supervisor
                    .execute(RequestId::Number(i), tool, serde_json::json!({}))
                    .await
            }));
        }

        // Two calls run at a time; release them as they arrive.
        for _ in 0..6 {
            wait_for(|| gauge.current.load(Ordering::SeqCst) > 0).await;
            release.notify_one();
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(gauge.peak() <= 2, "peak concurrency was {}", gauge.peak());
        assert_eq!(supervisor.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn per_tool_cap_is_stricter_than_global() {
        let gauge = Arc::new(Gauge::default());
        let release = Arc::new(Notify::new());
        let tool: Arc<dyn ToolHandler> = Arc::new(GatedTool {
            definition: ToolDefinition::new("serial", "", serde_json::json!({}))
                .with_max_concurrency(1),
            gauge: Arc::clone(&gauge),
            release: Arc::clone(&release),
        });
        let (supervisor, registry) =
            build(vec![tool], ServerConfig::default().max_concurrency(4));

        let mut handles = Vec::new();
        for i in 0..3i64 {
            let supervisor = Arc::clone(&supervisor);
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let tool = registry.get("serial").unwrap();
                supervisor
                    .execute(RequestId::Number(i), tool, serde_json::json!({}))
                    .await
            }));
        }

        for _ in 0..3 {
            wait_for(|| gauge.current.load(Ordering::SeqCst) > 0).await;
            release.notify_one();
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(gauge.peak(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_handler_times_out_and_releases_slots() {
        let stuck: Arc<dyn ToolHandler> = Arc::new(StuckTool(
            ToolDefinition::new("stuck", "", serde_json::json!({}))
                .with_timeout(Duration::from_millis(50)),
        ));
        let fast: Arc<dyn ToolHandler> = Arc::new(FastTool(ToolDefinition::new(
            "fast",
            "",
            serde_json::json!({}),
        )));
        let (supervisor, registry) =
            build(vec![stuck, fast], ServerConfig::default().max_concurrency(1));

        let err = supervisor
            .execute(
                RequestId::Number(1),
                registry.get("stuck").unwrap(),
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, flymcp_protocol::ErrorCode::Timeout);
        assert_eq!(supervisor.in_flight(), 0);

        // The single global slot was released by the timeout path.
        let result = supervisor
            .execute(
                RequestId::Number(2),
                registry.get("fast").unwrap(),
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn saturated_queue_rejects_with_overloaded() {
        let gauge = Arc::new(Gauge::default());
        let release = Arc::new(Notify::new());
        let tool: Arc<dyn ToolHandler> = Arc::new(GatedTool {
            definition: ToolDefinition::new("busy", "", serde_json::json!({})),
            gauge: Arc::clone(&gauge),
            release: Arc::clone(&release),
        });
        let (supervisor, registry) = build(
            vec![tool],
            ServerConfig::default().max_concurrency(1).max_queue_depth(1),
        );

        // First call occupies the slot.
        let first = {
            let supervisor = Arc::clone(&supervisor);
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                supervisor
                    .execute(
                        RequestId::Number(1),
                        registry.get("busy").unwrap(),
                        serde_json::json!({}),
                    )
                    .await
            })
        };
        wait_for(|| gauge.current.load(Ordering::SeqCst) == 1).await;

        // Second call waits in the queue.
        let second = {
            let supervisor = Arc::clone(&supervisor);
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                supervisor
                    .execute(
                        RequestId::Number(2),
                        registry.get("busy").unwrap(),
                        serde_json::json!({}),
                    )
                    .await
            })
        };
        wait_for(|| supervisor.global.waiting.load(Ordering::SeqCst) == 1).await;

        // Third call overflows the bounded queue.
        let err = supervisor
            .execute(
                RequestId::Number(3),
                registry.get("busy").unwrap(),
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, flymcp_protocol::ErrorCode::Overloaded);

        release.notify_one();
        first.await.unwrap().unwrap();
        wait_for(|| gauge.current.load(Ordering::SeqCst) == 1).await;
        release.notify_one();
        second.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancellation_resolves_a_running_call() {
        let stuck: Arc<dyn ToolHandler> = Arc::new(StuckTool(ToolDefinition::new(
            "stuck",
            "",
            serde_json::json!({}),
        )));
        let (supervisor, registry) = build(vec![stuck], ServerConfig::default());

        let task = {
            let supervisor = Arc::clone(&supervisor);
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                supervisor
                    .execute(
                        RequestId::Number(7),
                        registry.get("stuck").unwrap(),
                        serde_json::json!({}),
                    )
                    .await
            })
        };

        wait_for(|| supervisor.in_flight() == 1).await;
        assert!(supervisor.cancel(&RequestId::Number(7)));

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.code, flymcp_protocol::ErrorCode::Cancelled);
        assert_eq!(supervisor.in_flight(), 0);
    }

    #[tokio::test]
    async fn cancel_after_completion_is_a_silent_noop() {
        let fast: Arc<dyn ToolHandler> = Arc::new(FastTool(ToolDefinition::new(
            "fast",
            "",
            serde_json::json!({}),
        )));
        let (supervisor, registry) = build(vec![fast], ServerConfig::default());

        supervisor
            .execute(
                RequestId::Number(9),
                registry.get("fast").unwrap(),
                serde_json::json!({}),
            )
            .await
            .unwrap();

        assert!(!supervisor.cancel(&RequestId::Number(9)));
    }

    #[tokio::test]
    async fn panicking_handler_maps_to_internal_error_and_releases() {
        struct PanicTool(ToolDefinition);

        impl ToolHandler for PanicTool {
            fn definition(&self) -> ToolDefinition {
                self.0.clone()
            }

            fn call<'a>(
                &'a self,
                _ctx: &'a CallContext,
                _arguments: serde_json::Value,
            ) -> BoxFuture<'a, ServerResult<CallToolResult>> {
                Box::pin(async { panic!("boom") })
            }
        }

        let tool: Arc<dyn ToolHandler> = Arc::new(PanicTool(ToolDefinition::new(
            "panics",
            "",
            serde_json::json!({}),
        )));
        let (supervisor, registry) =
            build(vec![tool], ServerConfig::default().max_concurrency(1));

        let err = supervisor
            .execute(
                RequestId::Number(1),
                registry.get("panics").unwrap(),
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, flymcp_protocol::ErrorCode::InternalError);
        assert_eq!(supervisor.in_flight(), 0);
    }
}
