//! One periodically-executing tracker.
//!
//! Lifecycle: `Idle → (start) → Running → (stop) → Idle`. A started tracker
//! owns exactly one worker task that executes immediately, then re-executes
//! on every interval tick until the shutdown signal fires. `stop` awaits the
//! worker's join handle, so by the time it returns no loop body can still be
//! in flight — interval updates rely on that drain to swap the timer without
//! two loop bodies interleaving.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use pricewatch_core::{ChatId, Messenger, TrackerConfig};
use pricewatch_fetch::FetchStrategy;

/// Ring-buffer cap for recorded execution errors.
const MAX_RECORDED_ERRORS: usize = 50;

/// One recorded execution failure.
#[derive(Debug, Clone)]
pub struct ExecutionError {
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Runtime status of a tracker. Snapshots are cheap clones.
#[derive(Debug, Clone)]
pub struct TrackerStatus {
    /// Wall-clock time of the first start; restarts do not reset it.
    pub started_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Incremented exactly once per execution attempt, success or failure.
    pub total_runs: u64,
    /// Empty until the first successful sample.
    pub last_recorded_value: String,
    /// The ticking period currently in effect.
    pub current_interval: Duration,
    /// Monotonic count of failed runs. Never reset on success, and unlike
    /// `errors` never truncated — the alert threshold compares against this,
    /// so limits above the ring cap still fire.
    pub error_count: u64,
    /// Recent failures, capped at `MAX_RECORDED_ERRORS`. Never cleared on
    /// success.
    pub errors: VecDeque<ExecutionError>,
}

struct Worker {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// A single monitoring job bound to a configured source and chat.
pub struct Tracker {
    code: String,
    config: Arc<TrackerConfig>,
    chat: ChatId,
    strategy: Arc<dyn FetchStrategy>,
    messenger: Arc<dyn Messenger>,
    error_limit: usize,
    status: Mutex<TrackerStatus>,
    /// The worker slot doubles as the lifecycle lock: start, stop, and
    /// interval updates all serialize on it.
    worker: tokio::sync::Mutex<Option<Worker>>,
}

impl Tracker {
    pub fn new(
        config: Arc<TrackerConfig>,
        chat: ChatId,
        interval: Duration,
        strategy: Arc<dyn FetchStrategy>,
        messenger: Arc<dyn Messenger>,
        error_limit: usize,
    ) -> Self {
        let code = config.code.clone();
        Self {
            code,
            config,
            chat,
            strategy,
            messenger,
            error_limit,
            status: Mutex::new(TrackerStatus {
                started_at: None,
                last_run_at: None,
                total_runs: 0,
                last_recorded_value: String::new(),
                current_interval: interval,
                error_count: 0,
                errors: VecDeque::new(),
            }),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn chat(&self) -> ChatId {
        self.chat
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> TrackerStatus {
        self.status.lock().expect("status lock poisoned").clone()
    }

    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_some()
    }

    /// Start the periodic worker. No-op if already running. Returns whether
    /// a new worker was spawned.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut slot = self.worker.lock().await;
        self.start_locked(&mut slot)
    }

    /// Signal the worker to stop and wait for it to exit. Idempotent.
    pub async fn stop(&self) {
        let mut slot = self.worker.lock().await;
        Self::stop_locked(&self.code, &mut slot).await;
    }

    /// Swap the ticking period: drain the current worker, install the new
    /// interval, restart. Holding the worker slot across the whole sequence
    /// rules out a window where old and new loop bodies run concurrently.
    pub async fn update_interval(self: &Arc<Self>, new_interval: Duration) {
        let mut slot = self.worker.lock().await;
        Self::stop_locked(&self.code, &mut slot).await;
        self.status
            .lock()
            .expect("status lock poisoned")
            .current_interval = new_interval;
        self.start_locked(&mut slot);
        tracing::info!(code = %self.code, ?new_interval, "tracker interval updated");
    }

    fn start_locked(self: &Arc<Self>, slot: &mut Option<Worker>) -> bool {
        if slot.is_some() {
            return false;
        }

        let period = {
            let mut status = self.status.lock().expect("status lock poisoned");
            // First start only; restarts keep the original timestamp.
            if status.started_at.is_none() {
                status.started_at = Some(Utc::now());
            }
            status.current_interval
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tracker = Arc::clone(self);
        let join = tokio::spawn(async move { tracker.run_loop(period, shutdown_rx).await });
        *slot = Some(Worker { shutdown, join });
        tracing::info!(code = %self.code, ?period, "tracker started");
        true
    }

    async fn stop_locked(code: &str, slot: &mut Option<Worker>) {
        let Some(worker) = slot.take() else {
            return;
        };
        let _ = worker.shutdown.send(true);
        if let Err(e) = worker.join.await {
            tracing::warn!(code, "tracker worker did not exit cleanly: {e}");
        }
        tracing::info!(code, "tracker stopped");
    }

    /// Worker body: run now, then on schedule until shutdown.
    async fn run_loop(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        self.execute_once().await;

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately; the
        // immediate execution above already covered it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.execute_once().await,
                _ = shutdown.changed() => {
                    tracing::debug!(code = %self.code, "tracker worker exiting");
                    return;
                }
            }
        }
    }

    /// One execution attempt: fetch, record, alert past the error threshold.
    async fn execute_once(&self) {
        {
            let mut status = self.status.lock().expect("status lock poisoned");
            status.total_runs += 1;
            status.last_run_at = Some(Utc::now());
        }

        match self.strategy.execute(&self.config, self.chat).await {
            Ok(value) => {
                tracing::debug!(code = %self.code, value = %value, "tracker sampled");
                self.status
                    .lock()
                    .expect("status lock poisoned")
                    .last_recorded_value = value;
            }
            Err(e) => {
                tracing::warn!(code = %self.code, error = %e, "tracker execution failed");
                let error_count = {
                    let mut status = self.status.lock().expect("status lock poisoned");
                    status.error_count += 1;
                    status.errors.push_back(ExecutionError {
                        message: e.to_string(),
                        at: Utc::now(),
                    });
                    if status.errors.len() > MAX_RECORDED_ERRORS {
                        status.errors.pop_front();
                    }
                    status.error_count
                };

                if error_count >= self.error_limit as u64 {
                    let alert = format!(
                        "{} or more execution errors registered for tracker <b>{}</b>, \
                         you should probably take a look at the logs :(",
                        self.error_limit, self.code
                    );
                    if let Err(send_err) = self.messenger.send_text(self.chat, &alert).await {
                        tracing::error!(code = %self.code, "failed to deliver error alert: {send_err}");
                    }
                }
            }
        }
    }
}
