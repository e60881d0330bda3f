//! Media depacketizing
//!
//! This module provides:
//! - The delivered [`Frame`] type
//! - Generic pass-through and Opus single-packet depacketizers
//! - HEVC fragmentation unit reassembly
//! - Payload type dispatch

pub mod depacketizer;
pub mod frame;
pub mod generic;
pub mod hevc;
pub mod opus;

pub use depacketizer::{Depacketizer, Outcome};
pub use frame::{Frame, FrameKind};
pub use hevc::{AggregatedUnits, FuHeader, HevcDepacketizer, NalType, PayloadHeader};
pub use opus::{OpusBandwidth, OpusMode, OpusToc};
