use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use acqsync_frame::DecodedFrame;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MarkerOutput<'a> {
    sample: u64,
    label: &'a str,
    stale: bool,
    timestamp: String,
}

/// A marker placed on session sample `sample`.
pub fn print_marker(sample: u64, label: &str, stale: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MarkerOutput {
                sample,
                label,
                stale,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SAMPLE", "LABEL", "STALE"])
                .add_row(vec![sample.to_string(), label.to_string(), stale.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let note = if stale { " (stale)" } else { "" };
            println!("sample={sample} label={label}{note}");
        }
        // Same line format as the session's marker file.
        OutputFormat::Raw => {
            print_raw(format!("{sample} {label}\n").as_bytes());
        }
    }
}

#[derive(Serialize)]
struct TimedMarkerOutput<'a> {
    block_start_sample: u64,
    label: &'a str,
    received_at: f64,
}

/// A network marker reported with its receive time, in seconds since the
/// Unix epoch with microsecond precision.
pub fn print_timed_marker(
    block_start_sample: u64,
    label: &str,
    received_at: SystemTime,
    format: OutputFormat,
) {
    let received_at = received_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    match format {
        OutputFormat::Json => {
            let out = TimedMarkerOutput {
                block_start_sample,
                label,
                received_at,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["BLOCK START", "LABEL", "RECEIVED AT"])
                .add_row(vec![
                    block_start_sample.to_string(),
                    label.to_string(),
                    format!("{received_at:.6}"),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("block_start={block_start_sample} label={label} received_at={received_at:.6}");
        }
        OutputFormat::Raw => {
            print_raw(format!("{received_at:.6} {label}\n").as_bytes());
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    index: u64,
    counter: u8,
    battery: u8,
    raw: &'a [u16],
    gyro: &'a [i16],
    quality: &'a [u8],
}

/// One decoded frame. `Raw` writes the sample row as little-endian `f32`.
pub fn print_frame(index: u64, frame: &DecodedFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                index,
                counter: frame.counter,
                battery: frame.battery,
                raw: &frame.raw,
                gyro: &frame.gyro,
                quality: &frame.quality,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "COUNTER", "BATTERY", "GYRO", "RAW"])
                .add_row(vec![
                    index.to_string(),
                    counter_label(frame),
                    frame.battery.to_string(),
                    join(&frame.gyro),
                    join(&frame.raw),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={} counter={} battery={} gyro=[{}] raw=[{}] quality=[{}]",
                index,
                counter_label(frame),
                frame.battery,
                join(&frame.gyro),
                join(&frame.raw),
                join(&frame.quality)
            );
        }
        OutputFormat::Raw => {
            let bytes: Vec<u8> = frame
                .sample_vector()
                .iter()
                .flat_map(|value| value.to_le_bytes())
                .collect();
            print_raw(&bytes);
        }
    }
}

#[derive(Serialize)]
struct SentOutput<'a> {
    addr: &'a str,
    sent: usize,
}

/// Markers delivered to a listener.
pub fn print_sent(addr: &str, sent: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SentOutput { addr, sent };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "SENT"])
                .add_row(vec![addr.to_string(), sent.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("sent {sent} marker(s) to {addr}");
        }
        OutputFormat::Raw => {}
    }
}

#[derive(Serialize)]
struct SummaryOutput {
    blocks: u64,
    samples: u64,
    markers: u64,
    stale_markers: u64,
}

/// Totals printed when a recording ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordSummary {
    pub blocks: u64,
    pub samples: u64,
    pub markers: u64,
    pub stale_markers: u64,
}

pub fn print_summary(summary: &RecordSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SummaryOutput {
                blocks: summary.blocks,
                samples: summary.samples,
                markers: summary.markers,
                stale_markers: summary.stale_markers,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["BLOCKS", "SAMPLES", "MARKERS", "STALE"])
                .add_row(vec![
                    summary.blocks.to_string(),
                    summary.samples.to_string(),
                    summary.markers.to_string(),
                    summary.stale_markers.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "blocks={} samples={} markers={} stale={}",
                summary.blocks, summary.samples, summary.markers, summary.stale_markers
            );
        }
        // Raw output carries data only.
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn counter_label(frame: &DecodedFrame) -> String {
    if frame.reports_battery() {
        "BATTERY".to_string()
    } else {
        frame.counter.to_string()
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
