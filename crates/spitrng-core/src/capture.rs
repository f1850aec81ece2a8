//! Capture recording of the bytes a master read from the device.
//!
//! # Storage Format
//!
//! Each capture is a directory `<timestamp>-<protocol>-<id>/` containing:
//! - `capture.json`: metadata (protocol, timing, counters, tags)
//! - `stream.bin`: the bytes exactly as read over the wire
//! - `chunks.csv`: `offset,length,timestamp_ns` per written chunk

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collector::CollectorStats;
use crate::config::DeviceConfig;
use crate::sampler::SamplerReport;
use crate::transport::SlaveStats;

/// Metadata written to `capture.json` when the capture finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureMeta {
    pub version: u32,
    pub id: String,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u64,
    pub device: DeviceConfig,
    pub total_bytes: u64,
    pub chunks: u64,
    pub collector: CollectorStats,
    pub slave: SlaveStats,
    pub sampler: Option<SamplerReport>,
    pub tags: HashMap<String, String>,
    pub note: Option<String>,
    pub spitrng_version: String,
}

/// Counters gathered from the device at the end of a capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureStats {
    pub collector: CollectorStats,
    pub slave: SlaveStats,
    pub sampler: Option<SamplerReport>,
}

/// Configuration for a capture.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub device: DeviceConfig,
    pub output_dir: PathBuf,
    pub tags: HashMap<String, String>,
    pub note: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            output_dir: PathBuf::from("captures"),
            tags: HashMap::new(),
            note: None,
        }
    }
}

/// Incremental writer for one capture directory.
pub struct CaptureWriter {
    dir: PathBuf,
    stream_writer: BufWriter<File>,
    index_writer: BufWriter<File>,
    offset: u64,
    chunks: u64,
    started_at: SystemTime,
    started_instant: Instant,
    id: String,
    config: CaptureConfig,
}

impl CaptureWriter {
    /// Create the capture directory and its files.
    pub fn new(config: CaptureConfig) -> std::io::Result<Self> {
        let id = Uuid::new_v4().to_string();
        let started_at = SystemTime::now();
        let ts = started_at.duration_since(UNIX_EPOCH).unwrap_or_default();
        let dir_name = format!(
            "{}-{}-{}",
            format_iso8601_compact(ts),
            config.device.protocol,
            &id[..8]
        );
        let dir = config.output_dir.join(dir_name);
        fs::create_dir_all(&dir)?;

        let stream_writer = BufWriter::new(File::create(dir.join("stream.bin"))?);
        let mut index_writer = BufWriter::new(File::create(dir.join("chunks.csv"))?);
        writeln!(index_writer, "offset,length,timestamp_ns")?;
        index_writer.flush()?;

        log::info!("capture {id} recording to {}", dir.display());
        Ok(Self {
            dir,
            stream_writer,
            index_writer,
            offset: 0,
            chunks: 0,
            started_at,
            started_instant: Instant::now(),
            id,
            config,
        })
    }

    /// Append one chunk of bytes read from the device.
    pub fn write_chunk(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let timestamp_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        self.stream_writer.write_all(bytes)?;
        self.stream_writer.flush()?;
        writeln!(
            self.index_writer,
            "{},{},{}",
            self.offset,
            bytes.len(),
            timestamp_ns
        )?;
        self.index_writer.flush()?;

        self.offset += bytes.len() as u64;
        self.chunks += 1;
        Ok(())
    }

    /// Flush everything and write `capture.json`.
    pub fn finish(mut self, stats: CaptureStats) -> std::io::Result<PathBuf> {
        self.stream_writer.flush()?;
        self.index_writer.flush()?;

        let ended_at = SystemTime::now();
        let meta = CaptureMeta {
            version: 1,
            id: self.id,
            started_at: format_iso8601(
                self.started_at
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default(),
            ),
            ended_at: format_iso8601(ended_at.duration_since(UNIX_EPOCH).unwrap_or_default()),
            duration_ms: self.started_instant.elapsed().as_millis() as u64,
            device: self.config.device,
            total_bytes: self.offset,
            chunks: self.chunks,
            collector: stats.collector,
            slave: stats.slave,
            sampler: stats.sampler,
            tags: self.config.tags,
            note: self.config.note,
            spitrng_version: crate::VERSION.to_string(),
        };

        let json = serde_json::to_string_pretty(&meta).map_err(std::io::Error::other)?;
        fs::write(self.dir.join("capture.json"), json)?;
        log::info!("capture finished: {} bytes in {} chunks", meta.total_bytes, meta.chunks);
        Ok(self.dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn total_bytes(&self) -> u64 {
        self.offset
    }

    pub fn elapsed(&self) -> Duration {
        self.started_instant.elapsed()
    }
}

/// Read `capture.json` back.
pub fn read_meta(dir: impl AsRef<Path>) -> std::io::Result<CaptureMeta> {
    let text = fs::read_to_string(dir.as_ref().join("capture.json"))?;
    serde_json::from_str(&text).map_err(std::io::Error::other)
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Compact UTC timestamp for directory names, e.g. `2026-10-16T013000Z`.
fn format_iso8601_compact(since_epoch: Duration) -> String {
    let (year, month, day, hour, min, sec) = civil_from_secs(since_epoch.as_secs());
    format!("{year:04}-{month:02}-{day:02}T{hour:02}{min:02}{sec:02}Z")
}

/// Full UTC timestamp, e.g. `2026-10-16T01:30:00Z`.
fn format_iso8601(since_epoch: Duration) -> String {
    let (year, month, day, hour, min, sec) = civil_from_secs(since_epoch.as_secs());
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
}

/// Seconds since the Unix epoch to UTC calendar fields. No leap seconds.
fn civil_from_secs(secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let (sec, min, hour) = (secs % 60, (secs / 60) % 60, (secs / 3600) % 24);
    let mut days = secs / 86_400;
    let mut year = 1970;
    loop {
        let len = if is_leap(year) { 366 } else { 365 };
        if days < len {
            break;
        }
        days -= len;
        year += 1;
    }
    let feb = if is_leap(year) { 29 } else { 28 };
    let mut month = 1;
    for len in [31, feb, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31] {
        if days < len {
            break;
        }
        days -= len;
        month += 1;
    }
    (year, month, days + 1, hour, min, sec)
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
