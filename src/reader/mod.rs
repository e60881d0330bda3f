//! RTP stream reader
//!
//! Binds a UDP socket and runs the receive loop on its own task:
//!
//! ```text
//! socket ──► RtpPacket::from_datagram ──► Depacketizer ──► Delivery
//!             (header parse + copy)        (by payload type)   (queue | callback)
//! ```

pub mod config;
pub(crate) mod receiver;
pub mod stream;

pub use config::ReaderConfig;
pub use stream::RtpReader;
