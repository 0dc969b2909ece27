use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::error::Result;
use crate::scheduler::{Scheduler, ShutdownSignal};
use crate::sync::{SyncEvent, Synchronizer};

/// Runs a [`Synchronizer`] on its own worker thread.
///
/// The synchronizer is built on the worker by `factory`, so OS handles and
/// other thread-bound state never leave it. Observers read [`SyncEvent`]s
/// from [`SyncService::events`]; the last event is always `Stopped`.
pub struct SyncService {
    shutdown: Arc<ShutdownSignal>,
    events: Receiver<SyncEvent>,
    handle: Option<JoinHandle<()>>,
}

impl SyncService {
    pub fn spawn<F>(interval: Duration, factory: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Synchronizer> + Send + 'static,
    {
        let shutdown = Arc::new(ShutdownSignal::new());
        let (tx, rx) = mpsc::channel();

        let worker_shutdown = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("ncmrpc-sync".to_string())
            .spawn(move || worker(interval, factory, &worker_shutdown, &tx))?;

        Ok(Self {
            shutdown,
            events: rx,
            handle: Some(handle),
        })
    }

    pub fn events(&self) -> &Receiver<SyncEvent> {
        &self.events
    }

    /// Shared stop flag, for signal handlers and input monitors
    pub fn shutdown_signal(&self) -> Arc<ShutdownSignal> {
        Arc::clone(&self.shutdown)
    }

    /// Ask the worker to stop after its current cycle.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and wait for it to exit.
    pub fn join(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("Sync worker panicked");
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn worker<F>(interval: Duration, factory: F, shutdown: &ShutdownSignal, tx: &Sender<SyncEvent>)
where
    F: FnOnce() -> Result<Synchronizer>,
{
    let mut synchronizer = match factory() {
        Ok(synchronizer) => synchronizer,
        Err(e) => {
            error!("Failed to start synchronizer: {}", e);
            let _ = tx.send(SyncEvent::Fatal(e.to_string()));
            let _ = tx.send(SyncEvent::Stopped);
            return;
        }
    };

    debug!("Sync worker started ({:?} interval)", interval);
    let mut scheduler = Scheduler::new(interval, Instant::now());
    scheduler.run(shutdown, |tick| {
        let outcome = synchronizer.run_cycle(tick);
        for event in outcome.events {
            // A dropped receiver only means nobody is listening
            let _ = tx.send(event);
        }
        if outcome.stop {
            shutdown.trigger();
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    synchronizer.shutdown();
    debug!("Sync worker stopped");
    let _ = tx.send(SyncEvent::Stopped);
}
