//! Graceful shutdown coordinator for the casino platform services.
//!
//! Both services fire detached background tasks — most notably the
//! preference-vector recomputation that follows every rating/review/event
//! write — that must not be silently dropped on SIGTERM. This module gives
//! the binary a handle to track those tasks and wait for them (within a
//! bound) before the process exits.
//!
//! # Shutdown Phases
//!
//! 1. **Drain**: stop accepting new work, run shutdown callbacks
//! 2. **Wait**: wait for registered background tasks to complete
//! 3. **Force**: give up waiting and let the process exit anyway
//!
//! # Example
//!
//! ```no_run
//! use casino_core::shutdown::{ShutdownCoordinator, ShutdownConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ShutdownConfig {
//!     drain_timeout: Duration::from_secs(5),
//!     wait_timeout: Duration::from_secs(30),
//!     force_timeout: Duration::from_secs(5),
//! };
//!
//! let coordinator = ShutdownCoordinator::new(config);
//! let mut handle = coordinator.register_task("update-user-vector");
//!
//! tokio::spawn(async move {
//!     handle.wait_for_shutdown().await;
//!     handle.notify_complete();
//! });
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Default timeout for the drain phase (30 seconds)
const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for the wait phase (60 seconds)
const DEFAULT_WAIT_TIMEOUT_MS: u64 = 60_000;

/// Default timeout for the force phase (10 seconds)
const DEFAULT_FORCE_TIMEOUT_MS: u64 = 10_000;

/// Configuration for shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Timeout for the drain phase (stop accepting new work)
    pub drain_timeout: Duration,

    /// Timeout for the wait phase (wait for tasks to complete)
    pub wait_timeout: Duration,

    /// Timeout for the force phase (force kill remaining tasks)
    pub force_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_millis(DEFAULT_DRAIN_TIMEOUT_MS),
            wait_timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            force_timeout: Duration::from_millis(DEFAULT_FORCE_TIMEOUT_MS),
        }
    }
}

impl ShutdownConfig {
    /// Create a new shutdown configuration
    pub fn new(drain_timeout: Duration, wait_timeout: Duration, force_timeout: Duration) -> Self {
        Self {
            drain_timeout,
            wait_timeout,
            force_timeout,
        }
    }

    /// Create a configuration with all timeouts set to the same value
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            drain_timeout: timeout,
            wait_timeout: timeout,
            force_timeout: timeout,
        }
    }

    /// Create a fast shutdown configuration (5 seconds per phase)
    pub fn fast() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }
}

/// Shutdown phase tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownPhase {
    Running,
    Drain,
    Wait,
    Force,
    Complete,
}

/// Internal state for the shutdown coordinator
#[derive(Debug)]
struct ShutdownState {
    phase: ShutdownPhase,
    registered_tasks: usize,
    completed_tasks: usize,
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self {
            phase: ShutdownPhase::Running,
            registered_tasks: 0,
            completed_tasks: 0,
        }
    }
}

/// Shutdown coordinator for managing graceful shutdown
///
/// Coordinates shutdown across multiple components with support for
/// multi-phase shutdown, task tracking, and cleanup callbacks.
pub struct ShutdownCoordinator {
    config: ShutdownConfig,
    state: Arc<RwLock<ShutdownState>>,
    shutdown_tx: broadcast::Sender<()>,
    callbacks: Arc<RwLock<Vec<Box<dyn Fn() + Send + Sync>>>>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator with the given configuration
    pub fn new(config: ShutdownConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(100);

        Self {
            config,
            state: Arc::new(RwLock::new(ShutdownState::default())),
            shutdown_tx,
            callbacks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a new task that should be tracked during shutdown
    ///
    /// Returns a handle that the task can use to wait for shutdown signals
    /// and notify when it has completed cleanup.
    pub fn register_task(&self, task_name: &str) -> ShutdownHandle {
        let mut state = futures::executor::block_on(self.state.write());
        state.registered_tasks += 1;

        info!(
            task_name = %task_name,
            total_tasks = state.registered_tasks,
            "Task registered for shutdown coordination"
        );

        ShutdownHandle {
            task_name: task_name.to_string(),
            shutdown_rx: self.shutdown_tx.subscribe(),
            state: Arc::clone(&self.state),
        }
    }

    /// Register a callback to be executed before shutdown
    ///
    /// Callbacks are executed in the drain phase, allowing for cleanup
    /// operations like flushing metrics, closing connections, etc.
    pub fn on_shutdown<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut callbacks = futures::executor::block_on(self.callbacks.write());
        callbacks.push(Box::new(callback));
    }

    /// Create a future that completes when shutdown is signaled
    ///
    /// Useful for integrating with frameworks like Actix-web.
    pub fn create_shutdown_signal(&self) -> impl std::future::Future<Output = ()> {
        let mut rx = self.shutdown_tx.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Wait for shutdown signal and coordinate graceful shutdown
    ///
    /// This is the main entry point for the shutdown coordinator. It waits
    /// for SIGTERM or SIGINT signals and then coordinates shutdown across
    /// all registered tasks.
    pub async fn wait_for_signal(self) {
        info!("Shutdown coordinator initialized, waiting for signal");

        // Wait for shutdown signal (SIGTERM or SIGINT)
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            // For non-Unix systems, only handle Ctrl+C
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to register Ctrl+C handler");
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        // Execute shutdown sequence
        self.execute_shutdown().await;
    }

    /// Execute the multi-phase shutdown sequence
    async fn execute_shutdown(self) {
        // Phase 1: Drain
        self.drain_phase().await;

        // Phase 2: Wait
        self.wait_phase().await;

        // Phase 3: Force
        self.force_phase().await;

        // Mark as complete
        let mut state = self.state.write().await;
        state.phase = ShutdownPhase::Complete;
        info!("Shutdown complete");
    }

    /// Drain phase: stop accepting new work, execute callbacks
    async fn drain_phase(&self) {
        let mut state = self.state.write().await;
        state.phase = ShutdownPhase::Drain;
        drop(state);

        info!(
            timeout_ms = self.config.drain_timeout.as_millis(),
            "Entering drain phase"
        );

        // Execute shutdown callbacks
        let callbacks = self.callbacks.read().await;
        for callback in callbacks.iter() {
            callback();
        }
        drop(callbacks);

        // Broadcast shutdown signal to all tasks
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!(error = %e, "Failed to broadcast shutdown signal");
        }

        // Wait for drain timeout
        sleep(self.config.drain_timeout).await;
    }

    /// Wait phase: wait for registered tasks to complete
    async fn wait_phase(&self) {
        let mut state = self.state.write().await;
        state.phase = ShutdownPhase::Wait;
        let registered = state.registered_tasks;
        drop(state);

        info!(
            timeout_ms = self.config.wait_timeout.as_millis(),
            registered_tasks = registered,
            "Entering wait phase"
        );

        let start = tokio::time::Instant::now();
        let deadline = start + self.config.wait_timeout;

        loop {
            let state = self.state.read().await;
            let completed = state.completed_tasks;
            drop(state);

            if completed >= registered {
                info!(
                    completed_tasks = completed,
                    elapsed_ms = start.elapsed().as_millis(),
                    "All tasks completed gracefully"
                );
                break;
            }

            if tokio::time::Instant::now() >= deadline {
                let remaining = registered - completed;
                warn!(
                    completed_tasks = completed,
                    remaining_tasks = remaining,
                    "Wait timeout exceeded, proceeding to force phase"
                );
                break;
            }

            // Check every 100ms
            sleep(Duration::from_millis(100)).await;
        }
    }

    /// Force phase: force termination of remaining tasks
    async fn force_phase(&self) {
        let mut state = self.state.write().await;
        state.phase = ShutdownPhase::Force;
        let registered = state.registered_tasks;
        let completed = state.completed_tasks;
        drop(state);

        if completed < registered {
            let remaining = registered - completed;
            warn!(
                timeout_ms = self.config.force_timeout.as_millis(),
                remaining_tasks = remaining,
                "Entering force phase, terminating remaining tasks"
            );

            sleep(self.config.force_timeout).await;

            error!(
                remaining_tasks = remaining,
                "Force shutdown complete, some tasks may not have cleaned up properly"
            );
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(ShutdownConfig::default())
    }
}

/// Handle for a registered task
///
/// Allows tasks to wait for shutdown signals and notify when they've completed cleanup.
pub struct ShutdownHandle {
    task_name: String,
    shutdown_rx: broadcast::Receiver<()>,
    state: Arc<RwLock<ShutdownState>>,
}

impl Clone for ShutdownHandle {
    fn clone(&self) -> Self {
        Self {
            task_name: self.task_name.clone(),
            shutdown_rx: self.shutdown_rx.resubscribe(),
            state: Arc::clone(&self.state),
        }
    }
}

impl ShutdownHandle {
    /// Wait for shutdown signal
    ///
    /// This future completes when the shutdown coordinator signals that
    /// shutdown has been initiated.
    pub async fn wait_for_shutdown(&mut self) {
        let _ = self.shutdown_rx.recv().await;
        info!(task_name = %self.task_name, "Shutdown signal received");
    }

    /// Notify that this task has completed cleanup
    ///
    /// Call this after your task has finished all cleanup operations.
    pub fn notify_complete(&self) {
        let mut state = futures::executor::block_on(self.state.write());
        state.completed_tasks += 1;

        info!(
            task_name = %self.task_name,
            completed_tasks = state.completed_tasks,
            registered_tasks = state.registered_tasks,
            "Task completed shutdown cleanup"
        );
    }
}
