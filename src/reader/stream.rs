//! RTP stream handle
//!
//! [`RtpReader`] is the object the application owns. It binds the socket,
//! spawns the receive task and exposes the delivery side.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::delivery::{DeliveryMode, FrameHandler, FrameQueue};
use crate::error::{Error, Result};
use crate::media::Frame;
use crate::stats::{ReceiverStats, StatsSnapshot};

use super::config::ReaderConfig;
use super::receiver::Receiver;

/// Receive side of one RTP stream
///
/// # Example
/// ```no_run
/// use rtp_recv::{ReaderConfig, RtpReader};
///
/// # async fn example() -> rtp_recv::Result<()> {
/// let config = ReaderConfig::default().port(5004);
/// let mut reader = RtpReader::new(config);
/// reader.start().await?;
///
/// while let Some(frame) = reader.pull_frame().await {
///     println!("{:?} ts={} {} bytes", frame.kind(), frame.timestamp, frame.payload_len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct RtpReader {
    config: ReaderConfig,
    active: Arc<AtomicBool>,
    queue: Arc<FrameQueue>,
    stats: Arc<ReceiverStats>,
    shutdown_tx: watch::Sender<bool>,
    local_addr: Option<SocketAddr>,
    task: Mutex<Option<JoinHandle<()>>>,
    started: bool,
}

impl RtpReader {
    /// Create a reader. Nothing is bound until `start`.
    pub fn new(config: ReaderConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            active: Arc::new(AtomicBool::new(false)),
            queue: Arc::new(FrameQueue::new()),
            stats: Arc::new(ReceiverStats::new()),
            shutdown_tx,
            local_addr: None,
            task: Mutex::new(None),
            started: false,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Deliver frames to `handler` instead of the queue.
    ///
    /// Only allowed before `start`.
    pub fn install_handler<H: FrameHandler>(&mut self, handler: H) -> Result<()> {
        if self.is_finished() {
            tracing::error!("Cannot install frame handler after start");
            return Err(Error::AlreadyStarted);
        }

        self.config.delivery = DeliveryMode::callback(handler);
        Ok(())
    }

    /// Bind the socket and spawn the receive task.
    ///
    /// A reader can be started once, and not after `stop`.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_finished() {
            return Err(Error::AlreadyStarted);
        }

        tracing::info!(addr = %self.config.bind_addr, "Starting RTP reader");

        let socket = UdpSocket::bind(self.config.bind_addr).await.map_err(|e| {
            tracing::error!(addr = %self.config.bind_addr, error = %e, "Failed to bind socket");
            e
        })?;
        let local_addr = socket.local_addr()?;

        self.started = true;
        self.local_addr = Some(local_addr);
        self.stats.mark_started();
        self.active.store(true, Ordering::Release);

        let receiver = Receiver::new(
            socket,
            local_addr,
            &self.config,
            Arc::clone(&self.queue),
            Arc::clone(&self.stats),
            Arc::clone(&self.active),
            self.shutdown_tx.subscribe(),
        );

        *self.task.lock() = Some(tokio::spawn(receiver.run()));
        Ok(())
    }

    /// Stop receiving.
    ///
    /// No frames are produced afterwards. Frames already queued can still be
    /// pulled. Safe to call more than once.
    pub fn stop(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            tracing::info!(addr = ?self.local_addr, "Stopping RTP reader");
        }

        self.shutdown_tx.send_replace(true);
        self.queue.close();
    }

    /// Started before, or stopped without ever starting
    fn is_finished(&self) -> bool {
        self.started || *self.shutdown_tx.borrow()
    }

    /// Wait for the receive task to exit
    pub async fn stopped(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Receive task failed");
            }
        }
    }

    /// Whether the receive task is running
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Address the socket is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Wait for the next frame.
    ///
    /// Returns `None` once the stream is inactive and no frames remain, and
    /// immediately in callback mode.
    pub async fn pull_frame(&self) -> Option<Frame> {
        if !self.config.delivery.is_queue() {
            return None;
        }
        self.queue.pull().await
    }

    /// Like `pull_frame`, giving up after `timeout`
    pub async fn pull_frame_timeout(&self, timeout: Duration) -> Option<Frame> {
        if !self.config.delivery.is_queue() {
            return None;
        }
        self.queue.pull_timeout(timeout).await
    }

    /// Take the next frame if one is queued
    pub fn try_pull_frame(&self) -> Option<Frame> {
        self.queue.try_pull()
    }

    /// Number of frames waiting to be pulled
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Current receive statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for RtpReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FrameKind;
    use crate::rtp::RtpHeader;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn local_config() -> ReaderConfig {
        ReaderConfig::with_addr("127.0.0.1:0".parse().unwrap())
    }

    fn rtp(pt: u8, seq: u16, ts: u32, payload: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        RtpHeader::new(pt, seq, ts, 0x5555).write(&mut data);
        data.extend_from_slice(payload);
        data
    }

    fn hevc_fu(seq: u16, ts: u32, start: bool, end: bool, body: &[u8]) -> Vec<u8> {
        let mut payload = vec![49 << 1, 0x01];
        payload.push(((start as u8) << 7) | ((end as u8) << 6) | 1);
        payload.extend_from_slice(body);
        rtp(96, seq, ts, &payload)
    }

    async fn started(config: ReaderConfig) -> (RtpReader, UdpSocket) {
        let mut reader = RtpReader::new(config);
        reader.start().await.unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.connect(reader.local_addr().unwrap()).await.unwrap();
        (reader, sender)
    }

    async fn wait_for_delivered(reader: &RtpReader, count: u64) {
        tokio::time::timeout(TIMEOUT, async {
            while reader.stats().frames_delivered < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("frames were not delivered in time");
    }

    #[tokio::test]
    async fn test_generic_frame_pulled() {
        let (reader, sender) = started(local_config()).await;
        assert!(reader.is_active());

        sender.send(&rtp(0, 1, 100, b"payload")).await.unwrap();

        let frame = reader.pull_frame_timeout(TIMEOUT).await.unwrap();
        assert_eq!(frame.kind(), FrameKind::Generic);
        assert_eq!(frame.payload(), b"payload");
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.ssrc, 0x5555);
    }

    #[tokio::test]
    async fn test_hevc_fragments_over_udp() {
        let (reader, sender) = started(local_config()).await;

        sender.send(&hevc_fu(10, 9000, true, false, &[1, 2])).await.unwrap();
        sender.send(&hevc_fu(11, 9000, false, false, &[3])).await.unwrap();
        sender.send(&hevc_fu(12, 9000, false, true, &[4, 5])).await.unwrap();

        let frame = reader.pull_frame_timeout(TIMEOUT).await.unwrap();
        assert_eq!(frame.kind(), FrameKind::HevcAssembled);
        assert_eq!(frame.payload(), &[1 << 1, 0x01, 1, 2, 3, 4, 5]);
        assert_eq!(frame.timestamp, 9000);
        assert_eq!(reader.queued_frames(), 0);
    }

    #[tokio::test]
    async fn test_bad_packets_do_not_stop_stream() {
        let (reader, sender) = started(local_config()).await;

        sender.send(&[0x80, 0x60, 0x00]).await.unwrap();
        sender.send(&rtp(33, 1, 1, &[1, 2])).await.unwrap();
        sender.send(&rtp(97, 2, 1, &[])).await.unwrap();
        sender.send(&rtp(97, 3, 960, &[0xFC, 0xAA])).await.unwrap();

        let frame = reader.pull_frame_timeout(TIMEOUT).await.unwrap();
        assert_eq!(frame.kind(), FrameKind::Opus);
        assert_eq!(frame.sequence, 3);
        assert!(reader.is_active());
        wait_for_delivered(&reader, 1).await;

        let stats = reader.stats();
        assert_eq!(stats.packets_received, 4);
        assert_eq!(stats.packets_dropped, 3);
        assert_eq!(stats.frames_delivered, 1);
    }

    #[tokio::test]
    async fn test_lost_fragment_counted() {
        let (reader, sender) = started(local_config()).await;

        sender.send(&hevc_fu(1, 10, true, false, &[1])).await.unwrap();
        sender.send(&hevc_fu(3, 10, false, true, &[3])).await.unwrap();
        sender.send(&rtp(0, 4, 20, b"after")).await.unwrap();

        let frame = reader.pull_frame_timeout(TIMEOUT).await.unwrap();
        assert_eq!(frame.payload(), b"after");
        wait_for_delivered(&reader, 1).await;

        let stats = reader.stats();
        assert_eq!(stats.fragments_lost, 1);
        assert_eq!(stats.packets_dropped, 1);
    }

    #[tokio::test]
    async fn test_gapped_frame_lost_once() {
        let (reader, sender) = started(local_config()).await;

        sender.send(&hevc_fu(1, 100, true, false, &[1])).await.unwrap();
        sender.send(&hevc_fu(3, 100, false, false, &[3])).await.unwrap();
        sender.send(&hevc_fu(4, 100, false, false, &[4])).await.unwrap();
        sender.send(&hevc_fu(5, 100, false, false, &[5])).await.unwrap();
        sender.send(&hevc_fu(6, 100, false, true, &[6])).await.unwrap();
        sender.send(&rtp(0, 7, 200, b"after")).await.unwrap();

        let frame = reader.pull_frame_timeout(TIMEOUT).await.unwrap();
        assert_eq!(frame.payload(), b"after");
        wait_for_delivered(&reader, 1).await;

        let stats = reader.stats();
        assert_eq!(stats.packets_received, 6);
        assert_eq!(stats.packets_dropped, 4);
        assert_eq!(stats.fragments_lost, 1);
    }

    #[tokio::test]
    async fn test_callback_delivery() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let config = local_config().callback(move |frame: Frame| {
            let _ = tx.send(frame);
        });
        let (reader, sender) = started(config).await;

        sender.send(&rtp(0, 7, 1, b"cb")).await.unwrap();

        let frame = tokio::time::timeout(TIMEOUT, rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.payload(), b"cb");
        assert_eq!(reader.queued_frames(), 0);

        // Queue operations are inert in callback mode
        assert!(reader.pull_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_install_handler() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut reader = RtpReader::new(local_config());
        reader
            .install_handler(move |frame: Frame| {
                let _ = tx.send(frame.sequence);
            })
            .unwrap();
        reader.start().await.unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(&rtp(0, 99, 1, b"x"), reader.local_addr().unwrap())
            .await
            .unwrap();

        let seq = tokio::time::timeout(TIMEOUT, rx.recv()).await.unwrap();
        assert_eq!(seq, Some(99));

        let result = reader.install_handler(|_frame: Frame| {});
        assert!(matches!(result, Err(Error::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_stop_drains_cleanly() {
        let (reader, sender) = started(local_config()).await;

        sender.send(&rtp(0, 1, 1, b"one")).await.unwrap();
        sender.send(&rtp(0, 2, 2, b"two")).await.unwrap();
        wait_for_delivered(&reader, 2).await;

        reader.stop();
        assert!(!reader.is_active());
        tokio::time::timeout(TIMEOUT, reader.stopped())
            .await
            .expect("receive task did not exit");

        // Sent after stop: never delivered
        let _ = sender.send(&rtp(0, 3, 3, b"three")).await;

        assert_eq!(reader.pull_frame().await.unwrap().payload(), b"one");
        assert_eq!(reader.pull_frame().await.unwrap().payload(), b"two");
        let last = tokio::time::timeout(TIMEOUT, reader.pull_frame())
            .await
            .expect("pull_frame blocked after stop");
        assert!(last.is_none());
        assert_eq!(reader.stats().frames_delivered, 2);
    }

    #[tokio::test]
    async fn test_stop_wakes_waiting_consumer() {
        let (reader, _sender) = started(local_config()).await;
        let reader = Arc::new(reader);

        let consumer = {
            let reader = Arc::clone(&reader);
            tokio::spawn(async move { reader.pull_frame().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        reader.stop();

        let pulled = tokio::time::timeout(TIMEOUT, consumer)
            .await
            .expect("consumer not woken by stop")
            .unwrap();
        assert!(pulled.is_none());
    }

    #[tokio::test]
    async fn test_start_twice() {
        let mut reader = RtpReader::new(local_config());
        reader.start().await.unwrap();
        assert!(matches!(reader.start().await, Err(Error::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_start_after_stop() {
        let mut reader = RtpReader::new(local_config());
        reader.stop();

        assert!(matches!(reader.start().await, Err(Error::AlreadyStarted)));
        assert!(!reader.is_active());
        assert!(reader.local_addr().is_none());
        assert!(reader.pull_frame().await.is_none());

        let result = reader.install_handler(|_frame: Frame| {});
        assert!(matches!(result, Err(Error::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_stats_clock_starts_at_start() {
        let mut reader = RtpReader::new(local_config());
        tokio::time::sleep(Duration::from_millis(100)).await;

        reader.start().await.unwrap();
        assert!(reader.stats().duration < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let (first, _sender) = started(local_config()).await;

        let mut second = RtpReader::new(ReaderConfig::with_addr(first.local_addr().unwrap()));
        let result = second.start().await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!second.is_active());
    }

    #[tokio::test]
    async fn test_not_started() {
        let reader = RtpReader::new(local_config());
        assert!(!reader.is_active());
        assert!(reader.local_addr().is_none());
        assert!(reader.try_pull_frame().is_none());
        reader.stopped().await;
    }
}
