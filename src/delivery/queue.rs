//! Queue delivery
//!
//! Frames are appended by the receive task and removed in FIFO order by any
//! number of consumers. Consumers wait on a `Notify` that is signalled on
//! every push and when the queue is closed, so there is no polling.
//!
//! Once closed, remaining frames can still be drained; `pull` then returns
//! `None` instead of waiting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::media::Frame;

/// Thread-safe FIFO of completed frames
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: Mutex<VecDeque<Frame>>,
    closed: AtomicBool,
    notify: Notify,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame.
    ///
    /// Returns the frame back if the queue is closed.
    pub fn push(&self, frame: Frame) -> Result<(), Frame> {
        {
            // Checked under the lock so no push lands after `close` returns
            let mut frames = self.frames.lock();
            if self.is_closed() {
                return Err(frame);
            }
            frames.push_back(frame);
        }

        self.notify.notify_one();
        Ok(())
    }

    /// Remove the oldest frame, waiting until one is available.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub async fn pull(&self) -> Option<Frame> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push or close between the check
            // and the await is not missed
            notified.as_mut().enable();

            if let Some(frame) = self.frames.lock().pop_front() {
                return Some(frame);
            }
            if self.is_closed() {
                return None;
            }

            notified.await;
        }
    }

    /// Like `pull`, giving up after `timeout`
    pub async fn pull_timeout(&self, timeout: Duration) -> Option<Frame> {
        tokio::time::timeout(timeout, self.pull())
            .await
            .ok()
            .flatten()
    }

    /// Remove the oldest frame without waiting
    pub fn try_pull(&self) -> Option<Frame> {
        self.frames.lock().pop_front()
    }

    /// Stop accepting frames and wake all waiting consumers
    pub fn close(&self) {
        {
            let _frames = self.frames.lock();
            self.closed.store(true, Ordering::Release);
        }
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of frames waiting
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}
