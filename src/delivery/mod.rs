//! Frame delivery to the application
//!
//! Completed frames leave the receive task through exactly one of two paths,
//! fixed before the stream starts:
//!
//! ```text
//!   receive task ──► Delivery::deliver(frame)
//!                         │
//!            ┌────────────┴─────────────┐
//!            ▼                          ▼
//!   DeliveryMode::Callback      DeliveryMode::Queue
//!   handler.on_frame(frame)     FrameQueue::push(frame)
//!   (inline, receive task)           │
//!                                    ▼
//!                           RtpReader::pull_frame()
//!                           (any consumer task)
//! ```
//!
//! Frames move along the path; they are never cloned.

pub mod handler;
pub mod queue;

use std::sync::Arc;

use crate::media::Frame;

pub use handler::FrameHandler;
pub use queue::FrameQueue;

/// How completed frames reach the application
#[derive(Clone, Default)]
pub enum DeliveryMode {
    /// Frames are queued and pulled by the application
    #[default]
    Queue,
    /// Frames are passed to a handler on the receive task
    Callback(Arc<dyn FrameHandler>),
}

impl DeliveryMode {
    /// Callback delivery through `handler`
    pub fn callback<H: FrameHandler>(handler: H) -> Self {
        DeliveryMode::Callback(Arc::new(handler))
    }

    pub fn is_queue(&self) -> bool {
        matches!(self, DeliveryMode::Queue)
    }
}

impl std::fmt::Debug for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Queue => write!(f, "Queue"),
            DeliveryMode::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// Delivery endpoint owned by the receive task
pub(crate) struct Delivery {
    mode: DeliveryMode,
    queue: Arc<FrameQueue>,
}

impl Delivery {
    pub(crate) fn new(mode: DeliveryMode, queue: Arc<FrameQueue>) -> Self {
        Self { mode, queue }
    }

    /// Hand a frame to the application.
    ///
    /// Returns false if the frame was dropped because the queue is closed.
    pub(crate) fn deliver(&self, frame: Frame) -> bool {
        match &self.mode {
            DeliveryMode::Callback(handler) => {
                handler.on_frame(frame);
                true
            }
            DeliveryMode::Queue => self.queue.push(frame).is_ok(),
        }
    }
}
