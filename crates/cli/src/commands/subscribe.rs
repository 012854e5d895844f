//! `subscribe` command implementation.

use anyhow::{Context, Result};
use contracts::WireMessage;
use publisher::Subscriber;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::SubscribeArgs;

/// One received frame for JSON output
#[derive(Serialize)]
struct FrameLine<'a> {
    topic: &'a str,
    frame_index: u64,
    payload_len: usize,
    /// Frames missing between this one and the previous
    missing: u64,
}

/// Detects gaps in the received frame index sequence
#[derive(Debug, Default)]
struct GapTracker {
    last: Option<u64>,
    missing_total: u64,
    out_of_order: u64,
}

impl GapTracker {
    /// Record `index`, returning how many indices were skipped before it
    fn observe(&mut self, index: u64) -> u64 {
        let missing = match self.last {
            Some(last) if index > last => index - last - 1,
            Some(_) => {
                self.out_of_order += 1;
                0
            }
            None => 0,
        };
        self.missing_total += missing;
        self.last = Some(index);
        missing
    }
}

/// Execute the `subscribe` command
pub async fn run_subscribe(args: &SubscribeArgs) -> Result<()> {
    let mut subscriber = Subscriber::connect(args.addr, args.topic.clone())
        .await
        .with_context(|| format!("Failed to subscribe to {}", args.addr))?;
    info!(addr = %args.addr, topic = %args.topic, "Subscribed");

    let mut gaps = GapTracker::default();
    let mut received: u64 = 0;

    loop {
        let message = tokio::select! {
            message = subscriber.recv() => message.context("Failed to receive frame")?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                break;
            }
        };

        let Some(message) = message else {
            info!("Publisher closed the connection");
            break;
        };

        received += 1;
        let missing = gaps.observe(message.frame_index);
        print_frame(&message, missing, args.json)?;

        if args.count > 0 && received >= args.count {
            break;
        }
    }

    info!(
        received,
        missing = gaps.missing_total,
        out_of_order = gaps.out_of_order,
        "Subscription finished"
    );
    Ok(())
}

fn print_frame(message: &WireMessage, missing: u64, json: bool) -> Result<()> {
    if json {
        let topic = String::from_utf8_lossy(&message.topic);
        let line = FrameLine {
            topic: &topic,
            frame_index: message.frame_index,
            payload_len: message.payload.len(),
            missing,
        };
        println!("{}", serde_json::to_string(&line).context("Failed to serialize frame")?);
    } else {
        let header = synthetic_header(&message.payload).unwrap_or_default();
        if missing > 0 {
            println!("   … {} frame(s) missing", missing);
        }
        println!(
            "#{:>10}  {:>8} bytes  {}",
            message.frame_index,
            message.payload.len(),
            header
        );
    }
    Ok(())
}

/// Header line of a synthetic test frame, if the payload carries one
fn synthetic_header(payload: &[u8]) -> Option<&str> {
    if !payload.starts_with(b"SYNTH ") {
        return None;
    }
    let end = payload.iter().position(|&b| b == b'\n')?;
    std::str::from_utf8(&payload[..end]).ok()
}
