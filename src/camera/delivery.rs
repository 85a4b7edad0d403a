//! Serial delivery context for captured frames.
//!
//! A single named worker thread owns the frame processor. Producers hand frames
//! over through a [`FrameSink`] backed by a one-slot channel, so at most one frame
//! ever waits while the processor is busy; anything beyond that is dropped
//! according to the [`LateFramePolicy`].

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::orientation::{exif_orientation, OrientationSource};
use super::processor::FrameProcessor;
use super::types::{CameraError, FrameBuffer, LateFramePolicy};

/// Outcome of handing a frame to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame is waiting for the processor
    Enqueued,
    /// Frame took the slot of an older waiting frame
    Replaced,
    /// Frame was discarded
    Dropped,
    /// Delivery context has shut down
    Closed,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    processed: AtomicU64,
    closed: AtomicBool,
}

/// Marks the queue closed when the worker exits, including by unwinding
/// out of a panicking processor.
struct CloseOnExit(Arc<Counters>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.closed.store(true, Ordering::Release);
    }
}

/// Snapshot of delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryStats {
    /// Frames accepted into the pending slot
    pub enqueued: u64,
    /// Frames discarded because the processor was behind
    pub dropped: u64,
    /// Frames the processor has returned from
    pub processed: u64,
}

/// Producer handle for the delivery context.
#[derive(Clone)]
pub struct FrameSink {
    tx: Sender<FrameBuffer>,
    evict: Receiver<FrameBuffer>,
    policy: LateFramePolicy,
    counters: Arc<Counters>,
}

impl FrameSink {
    /// Offer a frame to the processor without blocking.
    ///
    /// Returns [`Delivery::Closed`] once the worker has exited; producers
    /// should stop streaming when they see it.
    pub fn deliver(&self, frame: FrameBuffer) -> Delivery {
        if self.is_closed() {
            // Release whatever the dead worker left behind
            let _ = self.evict.try_recv();
            return Delivery::Closed;
        }
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                Delivery::Enqueued
            }
            Err(TrySendError::Disconnected(_)) => Delivery::Closed,
            Err(TrySendError::Full(frame)) => match self.policy {
                LateFramePolicy::DropNewest => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    Delivery::Dropped
                }
                LateFramePolicy::DropOldest => {
                    let evicted = self.evict.try_recv().is_ok();
                    if evicted {
                        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    match self.tx.try_send(frame) {
                        Ok(()) => {
                            self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                            if evicted {
                                Delivery::Replaced
                            } else {
                                Delivery::Enqueued
                            }
                        }
                        Err(TrySendError::Full(_)) => {
                            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                            Delivery::Dropped
                        }
                        Err(TrySendError::Disconnected(_)) => Delivery::Closed,
                    }
                }
            },
        }
    }

    /// Whether the worker is gone and no frame will be processed again.
    pub fn is_closed(&self) -> bool {
        self.counters.closed.load(Ordering::Acquire)
    }

    /// Frames currently waiting for the processor (0 or 1).
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("policy", &self.policy)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Single-worker serial queue that runs the frame processor.
pub struct SerialQueue<P: FrameProcessor> {
    label: String,
    sink: Option<FrameSink>,
    counters: Arc<Counters>,
    worker: Option<JoinHandle<P>>,
}

impl<P: FrameProcessor> SerialQueue<P> {
    /// Spawn the worker thread.
    ///
    /// The thread is named `label` and runs until every [`FrameSink`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::StreamFailed`] if the OS refuses to spawn the thread.
    pub fn spawn(
        label: &str,
        policy: LateFramePolicy,
        mut processor: P,
        orientation: Arc<dyn OrientationSource>,
    ) -> Result<Self, CameraError> {
        let (tx, rx) = bounded::<FrameBuffer>(1);
        let counters = Arc::new(Counters::default());
        let sink = FrameSink {
            tx,
            evict: rx.clone(),
            policy,
            counters: Arc::clone(&counters),
        };

        let worker_counters = Arc::clone(&counters);
        let worker = thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                let _close = CloseOnExit(Arc::clone(&worker_counters));
                for mut frame in rx.iter() {
                    let tag = exif_orientation(orientation.current());
                    frame.orientation = tag;
                    processor.on_frame_delivered(&frame, tag);
                    worker_counters.processed.fetch_add(1, Ordering::Relaxed);
                }
                processor
            })
            .map_err(|e| CameraError::StreamFailed(format!("cannot spawn {}: {}", label, e)))?;

        log::debug!("Delivery queue '{}' started ({:?})", label, policy);

        Ok(Self {
            label: label.to_string(),
            sink: Some(sink),
            counters,
            worker: Some(worker),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// A producer handle, or `None` once the queue is shutting down.
    pub fn sink(&self) -> Option<FrameSink> {
        self.sink.clone()
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, let the in-flight and pending frames finish, and
    /// return the processor.
    ///
    /// Blocks until every outstanding [`FrameSink`] clone has been dropped.
    pub fn shutdown(mut self) -> Option<P> {
        self.close()
    }

    fn close(&mut self) -> Option<P> {
        self.sink = None;
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(processor) => {
                log::debug!("Delivery queue '{}' stopped", self.label);
                Some(processor)
            }
            Err(_) => {
                log::error!("Frame processor on '{}' panicked", self.label);
                None
            }
        }
    }
}

impl<P: FrameProcessor> Drop for SerialQueue<P> {
    fn drop(&mut self) {
        self.close();
    }
}
