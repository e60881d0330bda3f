//! RTP receiver example
//!
//! Run with: cargo run --example receive [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example receive                    # binds to 0.0.0.0:8888
//!   cargo run --example receive localhost          # binds to 127.0.0.1:8888
//!   cargo run --example receive 0.0.0.0:5004       # binds to 0.0.0.0:5004
//!
//! ## Sending a stream
//!
//! HEVC with ffmpeg (payload type 96):
//!   ffmpeg -re -i input.mp4 -an -c:v libx265 -f rtp -payload_type 96 rtp://127.0.0.1:8888
//!
//! Opus with ffmpeg (payload type 97):
//!   ffmpeg -re -i input.wav -c:a libopus -f rtp -payload_type 97 rtp://127.0.0.1:8888

use std::net::SocketAddr;
use std::time::Duration;

use rtp_recv::{FrameKind, ReaderConfig, RtpReader};

/// Parse bind address from command line argument.
///
/// Accepts "IP:PORT", "IP" or "localhost".
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8888;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: receive [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8888)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => ReaderConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ReaderConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtp_recv=debug".parse()?)
                .add_directive("receive=debug".parse()?),
        )
        .init();

    let config = config.fragment_timeout(Duration::from_secs(2));
    let mut reader = RtpReader::new(config);
    reader.start().await?;

    if let Some(addr) = reader.local_addr() {
        println!("Receiving RTP on {}", addr);
    }

    let mut keyframes = 0u64;
    loop {
        tokio::select! {
            frame = reader.pull_frame() => {
                let Some(frame) = frame else {
                    println!("Stream ended");
                    break;
                };

                match frame.kind() {
                    FrameKind::Hevc | FrameKind::HevcAssembled => {
                        if frame.is_keyframe() {
                            keyframes += 1;
                            tracing::info!(timestamp = frame.timestamp, keyframes = keyframes, "HEVC keyframe");
                        }
                        tracing::debug!(
                            nal_type = ?frame.nal_type(),
                            size = frame.payload_len(),
                            "HEVC NAL unit"
                        );
                    }
                    FrameKind::Opus => {
                        if let Some(toc) = frame.opus_toc() {
                            tracing::trace!(
                                bandwidth = ?toc.bandwidth(),
                                duration_us = toc.frame_duration_us(),
                                "Opus packet"
                            );
                        }
                    }
                    FrameKind::Generic => {
                        tracing::trace!(size = frame.payload_len(), "Generic payload");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                reader.stop();
                reader.stopped().await;
                break;
            }
        }
    }

    let stats = reader.stats();
    println!(
        "Stats: packets={} bytes={} dropped={} lost={} frames={} bitrate={}bps",
        stats.packets_received,
        stats.bytes_received,
        stats.packets_dropped,
        stats.fragments_lost,
        stats.frames_delivered,
        stats.bitrate()
    );

    Ok(())
}
