//! RTP receive path
//!
//! Listens on a UDP port, parses RTP packets, reassembles fragmented HEVC NAL
//! units and hands complete frames to the application either through a
//! callback or a pollable queue.
//!
//! ```text
//! UDP ──► RtpHeader::parse ──► Depacketizer ──► Delivery ──► application
//!                              ├─ Generic
//!                              ├─ Opus
//!                              └─ HEVC (FU reassembly)
//! ```
//!
//! # Example
//! ```no_run
//! use rtp_recv::{Codec, ReaderConfig, RtpReader};
//!
//! # async fn example() -> rtp_recv::Result<()> {
//! let config = ReaderConfig::default()
//!     .port(5004)
//!     .map_payload_type(98, Codec::Hevc);
//!
//! let mut reader = RtpReader::new(config);
//! reader.start().await?;
//!
//! while let Some(frame) = reader.pull_frame().await {
//!     if frame.is_keyframe() {
//!         println!("keyframe at {}", frame.timestamp);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod delivery;
pub mod error;
pub mod media;
pub mod reader;
pub mod rtp;
pub mod stats;

pub use delivery::{DeliveryMode, FrameHandler};
pub use error::{Error, PacketError, Result};
pub use media::{Frame, FrameKind};
pub use reader::{ReaderConfig, RtpReader};
pub use rtp::{Codec, PayloadMap, RtpHeader};
pub use stats::StatsSnapshot;
