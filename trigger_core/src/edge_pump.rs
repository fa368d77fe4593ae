//! Host-side interrupt context.
//!
//! An `EdgePump` owns a thread that receives timestamped edges over a bounded
//! channel and dispatches them, in order, to a shared decoder. Producers
//! (a simulator, a trace replayer, a GPIO poller) only ever send.
//!
//! Each `EdgePump` spawns exactly one thread, shut down and joined when the
//! pump is dropped.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use trigger_traits::{Edge, OutputScheduler, ToothLogger};

use crate::error::DecoderError;
use crate::trigger::TriggerCore;

/// How long the pump thread waits for an edge before rechecking shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Final counters of a drained pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub dispatched: u64,
    pub accepted: u64,
}

pub struct EdgePump {
    tx: Option<xch::Sender<Edge>>,
    dispatched: Arc<AtomicU64>,
    accepted: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl EdgePump {
    /// Start dispatching to `trigger`; at most `capacity` edges queue up.
    pub fn spawn<O, L>(trigger: Arc<TriggerCore<O, L>>, capacity: usize) -> Self
    where
        O: OutputScheduler + Send + 'static,
        L: ToothLogger + Send + 'static,
    {
        let (tx, rx) = xch::bounded::<Edge>(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let dispatched = Arc::new(AtomicU64::new(0));
        let dispatched_clone = dispatched.clone();
        let accepted = Arc::new(AtomicU64::new(0));
        let accepted_clone = accepted.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("edge pump received shutdown signal");
                    break;
                }
                match rx.recv_timeout(POLL_INTERVAL) {
                    Ok(edge) => {
                        if trigger.dispatch(edge).is_accepted() {
                            accepted_clone.fetch_add(1, Ordering::Relaxed);
                        }
                        dispatched_clone.fetch_add(1, Ordering::Release);
                    }
                    Err(xch::RecvTimeoutError::Timeout) => {}
                    Err(xch::RecvTimeoutError::Disconnected) => {
                        tracing::debug!("edge producers gone, pump exiting");
                        break;
                    }
                }
            }
            tracing::trace!("edge pump thread exiting cleanly");
        });

        Self {
            tx: Some(tx),
            dispatched,
            accepted,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Queue an edge, blocking while the queue is full.
    pub fn send(&self, edge: Edge) -> Result<(), DecoderError> {
        let tx = self.tx.as_ref().ok_or(DecoderError::Disconnected)?;
        tx.send(edge).map_err(|_| DecoderError::Disconnected)
    }

    /// Queue an edge without blocking; `Ok(false)` means it was dropped
    /// because the queue is full.
    pub fn try_send(&self, edge: Edge) -> Result<bool, DecoderError> {
        let tx = self.tx.as_ref().ok_or(DecoderError::Disconnected)?;
        match tx.try_send(edge) {
            Ok(()) => Ok(true),
            Err(xch::TrySendError::Full(_)) => Ok(false),
            Err(xch::TrySendError::Disconnected(_)) => Err(DecoderError::Disconnected),
        }
    }

    /// Edges handed to the decoder so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Acquire)
    }

    /// Edges the decoder accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Stop accepting edges, let the thread drain the queue, and join it.
    pub fn finish(mut self) -> PumpStats {
        self.tx.take();
        self.join();
        PumpStats {
            dispatched: self.dispatched(),
            accepted: self.accepted(),
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("edge pump thread joined"),
                Err(e) => tracing::warn!(?e, "edge pump thread panicked during shutdown"),
            }
        }
    }
}

impl Drop for EdgePump {
    fn drop(&mut self) {
        // Queued edges are discarded; use `finish` to drain them.
        self.shutdown.store(true, Ordering::Relaxed);
        self.tx.take();
        self.join();
    }
}
