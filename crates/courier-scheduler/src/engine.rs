//! Scheduler engine. Owns the recurring timer and the single background loop.
//!
//! `start`/`stop`/`is_running` share one lock around the run-state, so
//! concurrent control calls never produce two loops. `stop` holds that lock
//! until the loop has exited, which also means no tick can be running once
//! it returns.

use courier_core::config::CourierConfig;
use courier_core::traits::TickExecutor;
use courier_core::types::Deadline;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Timing for the scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Time between ticks.
    pub interval: Duration,
    /// Deadline handed to each tick.
    pub tick_timeout: Duration,
}

impl SchedulerSettings {
    pub fn from_config(config: &CourierConfig) -> Self {
        Self {
            interval: config.scheduler.tick_interval(),
            tick_timeout: config.webhook.tick_timeout(),
        }
    }
}

enum RunState {
    Idle,
    Running {
        stop_tx: oneshot::Sender<()>,
        handle: JoinHandle<()>,
    },
}

/// Periodic dispatch scheduler.
pub struct Scheduler {
    executor: Arc<dyn TickExecutor>,
    settings: SchedulerSettings,
    state: Mutex<RunState>,
}

impl Scheduler {
    pub fn new(executor: Arc<dyn TickExecutor>, settings: SchedulerSettings) -> Self {
        Self {
            executor,
            settings,
            state: Mutex::new(RunState::Idle),
        }
    }

    /// Arm the timer and launch the loop. No-op if already running.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if matches!(*state, RunState::Running { .. }) {
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(self.executor.clone(), self.settings, stop_rx));
        *state = RunState::Running { stop_tx, handle };
        tracing::info!(
            "⏰ Scheduler started (every {}s, tick timeout {}s)",
            self.settings.interval.as_secs_f64(),
            self.settings.tick_timeout.as_secs_f64()
        );
    }

    /// Signal the loop and wait until it has fully exited. No-op if idle.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut *state, RunState::Idle);
        let RunState::Running { stop_tx, handle } = previous else {
            return;
        };

        // The receiver only disappears if the loop already ended.
        let _ = stop_tx.send(());
        if let Err(e) = handle.await {
            tracing::error!("Scheduler loop ended abnormally: {e}");
        }
        tracing::info!("🛑 Scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, RunState::Running { .. })
    }
}

impl Drop for Scheduler {
    /// Signals a running loop to exit after its current tick. Use `stop` to
    /// wait for that exit.
    fn drop(&mut self) {
        if let RunState::Running { stop_tx, .. } =
            std::mem::replace(self.state.get_mut(), RunState::Idle)
        {
            let _ = stop_tx.send(());
        }
    }
}

async fn run_loop(
    executor: Arc<dyn TickExecutor>,
    settings: SchedulerSettings,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let first_tick = Instant::now() + settings.interval;
    let mut ticker = tokio::time::interval_at(first_tick, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                run_tick(executor.as_ref(), settings.tick_timeout).await;
            }
        }
    }
}

async fn run_tick(executor: &dyn TickExecutor, tick_timeout: Duration) {
    let deadline = Deadline::after(tick_timeout);
    let tick = AssertUnwindSafe(executor.execute(deadline));
    match tick.catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("⚠️ Batch failed: {e}"),
        Err(_) => tracing::error!("❌ Batch panicked; scheduler keeps running"),
    }
}
