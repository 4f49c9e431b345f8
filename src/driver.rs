// Realtime ticker
//
// Drives a shared engine on wall-clock time: sleeps until the next task is
// due (or a poll interval passes), fires everything due and forwards the
// resulting events to whoever renders them.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::engine::{EngineEvent, SharedEngine};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Handle to a running ticker task
#[derive(Debug)]
pub struct Ticker {
    wake: Arc<Notify>,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn the ticker on the current tokio runtime.
    /// Events are dropped once the receiver is gone.
    pub fn spawn(engine: SharedEngine, poll_interval: Duration) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(100);
        let wake = Arc::new(Notify::new());
        let shutdown = Arc::new(Notify::new());

        let handle = tokio::spawn(run(engine, tx, wake.clone(), shutdown.clone(), poll_interval));

        (Ticker { wake, shutdown, handle }, rx)
    }

    /// Re-check the queue now, e.g. right after a send scheduled new tasks
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Stop ticking and wait for the task to finish
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            warn!("Ticker task ended abnormally: {}", e);
        }
    }
}

async fn run(
    engine: SharedEngine,
    tx: mpsc::Sender<EngineEvent>,
    wake: Arc<Notify>,
    shutdown: Arc<Notify>,
    poll_interval: Duration,
) {
    info!("Ticker started (poll every {}ms)", poll_interval.as_millis());
    loop {
        let (events, sleep_for) = {
            let mut engine = engine.lock().await;
            let events = engine.run_due();
            let sleep_for = match engine.next_due() {
                Some(due) => (due - engine.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(poll_interval),
                None => poll_interval,
            };
            (events, sleep_for)
        };

        for event in events {
            if tx.send(event).await.is_err() {
                debug!("Event receiver dropped, discarding events");
                break;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => {}
            _ = wake.notified() => {}
            _ = shutdown.notified() => {
                info!("Ticker stopped");
                return;
            }
        }
    }
}
