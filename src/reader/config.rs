//! Reader configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::delivery::{DeliveryMode, FrameHandler};
use crate::media::hevc::DEFAULT_MAX_FRAME_SIZE;
use crate::rtp::{Codec, PayloadMap, RTP_HEADER_SIZE};

/// Default receive buffer size (largest datagram read in one call)
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 4096;

/// Largest possible UDP payload
pub const MAX_RECV_BUFFER_SIZE: usize = 65535;

/// Default port to listen on
pub const DEFAULT_PORT: u16 = 8888;

/// Reader configuration options
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Local address to bind to
    pub bind_addr: SocketAddr,

    /// Receive buffer size. Longer datagrams are truncated.
    pub recv_buffer_size: usize,

    /// Payload type to codec mapping
    pub payload_map: PayloadMap,

    /// Maximum age of an incomplete HEVC assembly (None = no limit)
    pub fragment_timeout: Option<Duration>,

    /// Maximum size of a reassembled HEVC NAL unit
    pub max_frame_size: usize,

    /// How completed frames are delivered
    pub delivery: DeliveryMode,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            payload_map: PayloadMap::default(),
            fragment_timeout: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            delivery: DeliveryMode::Queue,
        }
    }
}

impl ReaderConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the port to listen on, keeping the bind IP
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set the receive buffer size
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size.clamp(RTP_HEADER_SIZE, MAX_RECV_BUFFER_SIZE);
        self
    }

    /// Map a payload type to a codec
    pub fn map_payload_type(mut self, payload_type: u8, codec: Codec) -> Self {
        self.payload_map.insert(payload_type, codec);
        self
    }

    /// Replace the whole payload type mapping
    pub fn payload_map(mut self, map: PayloadMap) -> Self {
        self.payload_map = map;
        self
    }

    /// Discard incomplete HEVC assemblies older than `timeout`
    pub fn fragment_timeout(mut self, timeout: Duration) -> Self {
        self.fragment_timeout = Some(timeout);
        self
    }

    /// Set the maximum reassembled frame size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Deliver frames through `handler` instead of the queue
    pub fn callback<H: FrameHandler>(mut self, handler: H) -> Self {
        self.delivery = DeliveryMode::callback(handler);
        self
    }

    /// Set the delivery mode
    pub fn delivery(mut self, mode: DeliveryMode) -> Self {
        self.delivery = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Frame;

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();

        assert_eq!(config.bind_addr.port(), 8888);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.recv_buffer_size, 4096);
        assert_eq!(config.payload_map.get(96), Some(Codec::Hevc));
        assert!(config.fragment_timeout.is_none());
        assert_eq!(config.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert!(config.delivery.is_queue());
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:5004".parse().unwrap();
        let config = ReaderConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_builder_port() {
        let config = ReaderConfig::default().port(5006);
        assert_eq!(config.bind_addr.port(), 5006);
    }

    #[test]
    fn test_builder_recv_buffer_size_clamped() {
        assert_eq!(ReaderConfig::default().recv_buffer_size(1).recv_buffer_size, 12);
        assert_eq!(
            ReaderConfig::default()
                .recv_buffer_size(1 << 20)
                .recv_buffer_size,
            MAX_RECV_BUFFER_SIZE
        );
        assert_eq!(
            ReaderConfig::default().recv_buffer_size(1500).recv_buffer_size,
            1500
        );
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ReaderConfig::default()
            .bind(addr)
            .map_payload_type(111, Codec::Opus)
            .fragment_timeout(Duration::from_millis(500))
            .max_frame_size(1024)
            .callback(|_frame: Frame| {});

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.payload_map.get(111), Some(Codec::Opus));
        assert_eq!(config.fragment_timeout, Some(Duration::from_millis(500)));
        assert_eq!(config.max_frame_size, 1024);
        assert!(!config.delivery.is_queue());
    }
}
