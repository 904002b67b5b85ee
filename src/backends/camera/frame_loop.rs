// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for the capture loop
//!
//! The producer side of the pipeline runs as a named thread driven by a
//! per-iteration closure. Cancellation is cooperative: a [`StopToken`] is
//! checked once before every iteration, so shutdown waits for at most one
//! in-flight camera read. The thread hands its state back on join, which is
//! how the camera ends up released only after the last read returned.

use super::FrameSource;
use super::latest_frame::LatestFrame;
use crate::errors::CameraError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Cloneable cancellation token shared with a capture thread
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Controller for a capture loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let controller = CaptureLoopController::start("capture", source, |source| {
///     if let Some(frame) = source.read() {
///         mailbox.publish(frame);
///     }
/// })?;
///
/// // Later: cancel, join, and get the source back
/// let source = controller.stop(Duration::from_secs(2));
/// ```
pub struct CaptureLoopController<S: Send + 'static> {
    /// Thread handle for joining; yields the loop state
    thread_handle: Option<JoinHandle<S>>,
    /// Signal to stop the loop
    stop_token: StopToken,
    /// Name for logging
    name: String,
}

impl<S: Send + 'static> CaptureLoopController<S> {
    /// Start a new capture loop in a separate thread
    ///
    /// `loop_fn` is called repeatedly with the loop state until the stop
    /// token is cancelled. Fails when the OS refuses to create the thread;
    /// `state` is dropped in that case.
    pub fn start<F>(name: &str, state: S, loop_fn: F) -> Result<Self, CameraError>
    where
        F: FnMut(&mut S) + Send + 'static,
    {
        let builder = thread::Builder::new().name(name.to_string());
        Self::spawn_on(builder, name, state, loop_fn)
    }

    fn spawn_on<F>(
        builder: thread::Builder,
        name: &str,
        mut state: S,
        mut loop_fn: F,
    ) -> Result<Self, CameraError>
    where
        F: FnMut(&mut S) + Send + 'static,
    {
        let stop_token = StopToken::new();
        let thread_token = stop_token.clone();
        let name_clone = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = builder
            .spawn(move || {
                debug!(name = %name_clone, "Capture loop thread started");

                while !thread_token.is_cancelled() {
                    loop_fn(&mut state);
                }

                info!(name = %name_clone, "Capture loop thread exiting");
                state
            })
            .map_err(|e| {
                warn!(name = %name, error = %e, "Failed to spawn capture loop thread");
                CameraError::from(e)
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_token,
            name: name.to_string(),
        })
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_token.cancel();
    }

    /// Stop the loop and wait up to `timeout` for the thread to finish
    ///
    /// Returns the loop state once the thread has exited. If the thread is
    /// still stuck in an iteration when the timeout expires, it is detached
    /// and `None` is returned; its state is dropped whenever it finishes.
    pub fn stop(mut self, timeout: Duration) -> Option<S> {
        self.request_stop();

        let handle = self.thread_handle.take()?;
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    name = %self.name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Capture loop did not stop in time, detaching"
                );
                return None;
            }
            thread::sleep(Duration::from_millis(1));
        }

        join_logged(&self.name, handle)
    }
}

fn join_logged<S>(name: &str, handle: JoinHandle<S>) -> Option<S> {
    debug!(name = %name, "Waiting for capture loop thread to finish");
    match handle.join() {
        Ok(state) => {
            debug!(name = %name, "Capture loop thread finished");
            Some(state)
        }
        Err(e) => {
            warn!(name = %name, "Capture loop thread panicked: {:?}", e);
            None
        }
    }
}

impl<S: Send + 'static> Drop for CaptureLoopController<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop_token.cancel();
            let _ = join_logged(&self.name, handle);
        }
    }
}

/// Producer half of the pipeline
///
/// Reads as fast as the source allows and publishes every non-empty frame.
/// There is no sleep or back-off: the mailbox overwrite is the only
/// backpressure.
pub fn spawn_capture<S>(
    source: S,
    mailbox: LatestFrame,
) -> Result<CaptureLoopController<S>, CameraError>
where
    S: FrameSource + 'static,
{
    let mut empty_reads: u64 = 0;

    CaptureLoopController::start("frame-capture", source, move |source| {
        match source.read() {
            Some(frame) if !frame.is_empty() => {
                if frame.sequence % 120 == 0 {
                    trace!(
                        sequence = frame.sequence,
                        width = frame.width(),
                        height = frame.height(),
                        "Publishing frame"
                    );
                }
                mailbox.publish(frame);
            }
            _ => {
                empty_reads += 1;
                if empty_reads % 100 == 1 {
                    debug!(empty_reads, "Empty frame from source, skipping");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_runs_until_stopped() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let controller = CaptureLoopController::start("test-loop", (), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        })
        .expect("thread spawned");

        thread::sleep(Duration::from_millis(20));
        assert!(controller.stop(Duration::from_secs(2)).is_some());

        let iterations = counter.load(Ordering::SeqCst);
        assert!(iterations > 0);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(counter.load(Ordering::SeqCst), iterations);
    }

    #[test]
    fn test_stop_returns_state() {
        let controller = CaptureLoopController::start("test-state", 0u32, |iterations| {
            *iterations += 1;
            thread::sleep(Duration::from_millis(5));
        })
        .expect("thread spawned");

        thread::sleep(Duration::from_millis(30));

        let iterations = controller
            .stop(Duration::from_secs(2))
            .expect("loop should stop within timeout");
        assert!(iterations > 0);
    }

    #[test]
    fn test_stop_times_out_on_stuck_iteration() {
        let controller = CaptureLoopController::start("test-stuck", (), |_| {
            thread::sleep(Duration::from_millis(300));
        })
        .expect("thread spawned");

        thread::sleep(Duration::from_millis(20));
        assert!(controller.stop(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_request_stop_does_not_block() {
        let controller = CaptureLoopController::start("test-request", 0u32, |n| {
            *n += 1;
            thread::sleep(Duration::from_millis(1));
        })
        .expect("thread spawned");

        thread::sleep(Duration::from_millis(10));
        controller.request_stop();

        // The thread exits on its own once the token is cancelled
        let deadline = Instant::now() + Duration::from_secs(2);
        let finished = |c: &CaptureLoopController<u32>| {
            c.thread_handle.as_ref().is_some_and(|h| h.is_finished())
        };
        while !finished(&controller) {
            assert!(Instant::now() < deadline, "loop ignored the token");
            thread::sleep(Duration::from_millis(1));
        }

        let iterations = controller
            .stop(Duration::ZERO)
            .expect("finished thread returns its state");
        assert!(iterations > 0);
    }

    /// State that counts how often it was dropped
    struct DropCounter(Arc<AtomicU32>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    // An absurd stack size makes thread creation fail on 64-bit targets
    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_spawn_failure_is_reported() {
        let drops = Arc::new(AtomicU32::new(0));
        let builder = thread::Builder::new()
            .name("test-spawn-fail".to_string())
            .stack_size(1 << 60);

        let result = CaptureLoopController::spawn_on(
            builder,
            "test-spawn-fail",
            DropCounter(Arc::clone(&drops)),
            |_| {},
        );

        assert!(matches!(result, Err(CameraError::Io(_))));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
