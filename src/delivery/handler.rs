//! Callback delivery

use crate::media::Frame;

/// Receives completed frames on the receive task.
///
/// `on_frame` runs inline with packet reception: while it runs no further
/// datagrams are read. Implementations should hand the frame off quickly.
pub trait FrameHandler: Send + Sync + 'static {
    /// Called once per completed frame; the handler owns the frame
    fn on_frame(&self, frame: Frame);
}

impl<F> FrameHandler for F
where
    F: Fn(Frame) + Send + Sync + 'static,
{
    fn on_frame(&self, frame: Frame) {
        self(frame)
    }
}
