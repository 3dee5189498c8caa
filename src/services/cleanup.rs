//! Periodic sweep of expired stream records.
//!
//! The sweep task is owned by a [`CleanupScheduler`] created at startup and
//! stopped on shutdown, so tests can start and stop it deterministically.

use super::stream_manager::{StreamError, StreamManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

struct SweepTask {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct CleanupScheduler {
    manager: Arc<StreamManager>,
    interval: Duration,
    running: Mutex<Option<SweepTask>>,
}

impl CleanupScheduler {
    pub fn new(manager: Arc<StreamManager>, interval: Duration) -> Self {
        Self {
            manager,
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the sweep loop. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if let Some(sweep) = running.as_ref() {
            if !sweep.task.is_finished() {
                return false;
            }
        }

        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
        let manager = self.manager.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        if let Err(err) = manager.cleanup_expired_streams().await {
                            tracing::error!("Stream cleanup sweep failed: {}", err);
                        }
                    }
                }
            }

            tracing::info!("Stream cleanup sweep stopped");
        });

        tracing::info!(interval_secs = interval.as_secs(), "Stream cleanup sweep started");
        *running = Some(SweepTask { shutdown, task });

        true
    }

    /// Stop the sweep loop and wait for it. Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        let sweep = self.running.lock().await.take();
        match sweep {
            Some(SweepTask { shutdown, task }) => {
                let _ = shutdown.send(());
                if let Err(err) = task.await {
                    tracing::warn!("Stream cleanup task ended abnormally: {}", err);
                }
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|sweep| !sweep.task.is_finished())
            .unwrap_or(false)
    }

    /// One sweep, outside the schedule.
    pub async fn run_once(&self) -> Result<usize, StreamError> {
        self.manager.cleanup_expired_streams().await
    }
}
