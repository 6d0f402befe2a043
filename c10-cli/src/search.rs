//! Search orchestration
//!
//! Drives the decoder over one recording, keeps that file's time reference,
//! evaluates the filter against every message and streams matches to the
//! output sinks under the file's heading. Many files can be scanned one after another or in parallel;
//! each scan owns its own decoder state and time correlator.

use crate::correlator::TimeCorrelator;
use crate::filter::{Decision, Filter, MatchValue};
use crate::progress::ProgressObserver;
use crate::report::{FileWriter, Output};
use c10_decoder::{
    Arinc429Message, Decoder, DecoderError, Message, Ms1553Message, Packet,
    PacketReader, Timestamp,
};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Text format of correlated timestamps
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One unit of search output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchRecord {
    /// Raw word value (wildcard search)
    Value { channel: u16, value: u16 },
    /// Absolute time of a matching message, if a time packet preceded it
    Timestamp {
        channel: u16,
        time: Option<Timestamp>,
    },
    /// Full rendering of an ARINC-429 message
    Arinc429 { channel: u16, message: String },
}

impl MatchRecord {
    pub fn to_text(&self) -> String {
        match self {
            MatchRecord::Value { value, .. } => format!("{:#x}", value),
            MatchRecord::Timestamp { time: Some(t), .. } => t.format(TIME_FORMAT).to_string(),
            MatchRecord::Timestamp { time: None, .. } => "unknown".to_string(),
            MatchRecord::Arinc429 { message, .. } => message.clone(),
        }
    }
}

/// Counters for one scanned file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub path: PathBuf,
    pub bytes: u64,
    pub packets: u64,
    pub messages: u64,
    pub matches: u64,
    /// Messages the filter could not evaluate (word offset out of range)
    pub skipped_messages: u64,
    /// Packets whose payload could not be fully parsed
    pub skipped_packets: u64,
    pub resyncs: u64,
    /// Time packets that could not be decoded
    pub rejected_time_packets: u64,
}

impl ScanSummary {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    /// The recording could not be opened or decoded; only this file is affected
    #[error("{}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecoderError,
    },

    /// Writing results failed
    #[error("{}: failed to write results: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub fn is_io(&self) -> bool {
        matches!(self, ScanError::Io { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            ScanError::Decode { path, .. } | ScanError::Io { path, .. } => path,
        }
    }
}

/// Results of scanning a set of files
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub summaries: Vec<ScanSummary>,
    pub failures: Vec<ScanError>,
}

impl RunOutcome {
    fn record(&mut self, result: Result<ScanSummary, ScanError>) {
        match result {
            Ok(summary) => self.summaries.push(summary),
            Err(e) => self.failures.push(e),
        }
    }
}

pub struct Searcher {
    filter: Filter,
    decoder: Decoder,
    output: Output,
    year: i32,
}

impl Searcher {
    pub fn new(filter: Filter, decoder: Decoder, output: Output, year: i32) -> Self {
        Self {
            filter,
            decoder,
            output,
            year,
        }
    }

    /// Scan files one at a time, in order
    ///
    /// Matches are written as they are found. A file that cannot be decoded
    /// is recorded as a failure and the run continues; a failure to write
    /// results aborts the run.
    pub fn run_sequential(
        &self,
        files: &[PathBuf],
        progress: &dyn ProgressObserver,
    ) -> Result<RunOutcome, ScanError> {
        let mut outcome = RunOutcome::default();
        for (index, path) in files.iter().enumerate() {
            match self.scan_indexed(path, index, files.len(), progress, false) {
                Err(e) if e.is_io() => return Err(e),
                result => {
                    if let Err(e) = &result {
                        log::warn!("{}", e);
                    }
                    outcome.record(result);
                }
            }
        }
        Ok(outcome)
    }

    /// Scan files concurrently, one task per file
    ///
    /// Any failure only ends the task of the file it happened in. Each file's
    /// output is written as one block when its task completes, so file order
    /// is not kept.
    pub fn run_parallel(&self, files: &[PathBuf], progress: &dyn ProgressObserver) -> RunOutcome {
        let results: Vec<_> = files
            .par_iter()
            .enumerate()
            .map(|(index, path)| self.scan_indexed(path, index, files.len(), progress, true))
            .collect();

        let mut outcome = RunOutcome::default();
        for result in results {
            if let Err(e) = &result {
                log::warn!("{}", e);
            }
            outcome.record(result);
        }
        outcome
    }

    fn scan_indexed(
        &self,
        path: &Path,
        index: usize,
        total: usize,
        progress: &dyn ProgressObserver,
        grouped: bool,
    ) -> Result<ScanSummary, ScanError> {
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        progress.file_started(path, index, total, size);
        let result = self
            .decoder
            .open(path)
            .map_err(|source| ScanError::Decode {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|packets| self.scan_stream(path, packets, progress, grouped));
        progress.file_finished(path, result.is_ok());
        result
    }

    /// Scan an already opened packet stream labelled `path`
    ///
    /// Output is written as it is found. Matches found before a decode error
    /// are kept.
    pub fn scan_packets<R: Read>(
        &self,
        path: &Path,
        packets: PacketReader<R>,
        progress: &dyn ProgressObserver,
    ) -> Result<ScanSummary, ScanError> {
        self.scan_stream(path, packets, progress, false)
    }

    fn scan_stream<R: Read>(
        &self,
        path: &Path,
        mut packets: PacketReader<R>,
        progress: &dyn ProgressObserver,
        grouped: bool,
    ) -> Result<ScanSummary, ScanError> {
        let mut summary = ScanSummary::new(path);
        let mut correlator = TimeCorrelator::new(self.year);
        let mut out = self
            .output
            .begin_file(path, grouped)
            .map_err(write_error(path))?;
        let mut failure = None;

        for packet in packets.by_ref() {
            let packet = match packet {
                Ok(packet) => packet,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            summary.packets += 1;
            summary.bytes += packet.packet_length() as u64;
            progress.advanced(path, packet.packet_length() as u64);

            self.scan_packet(path, &packet, &mut correlator, &mut summary, &mut out)?;
        }
        summary.resyncs = packets.stats().resyncs;
        summary.rejected_time_packets = correlator.rejected();
        out.finish().map_err(write_error(path))?;

        match failure {
            Some(source) => Err(ScanError::Decode {
                path: path.to_path_buf(),
                source,
            }),
            None => Ok(summary),
        }
    }

    fn scan_packet(
        &self,
        path: &Path,
        packet: &Packet,
        correlator: &mut TimeCorrelator,
        summary: &mut ScanSummary,
        out: &mut FileWriter<'_>,
    ) -> Result<(), ScanError> {
        correlator.observe(packet);

        if self.filter.skips_packet(packet) {
            return Ok(());
        }
        if !packet.data_type().has_messages() {
            return Ok(());
        }

        for message in packet.messages() {
            let keep_going = match message {
                Ok(Message::Ms1553(message)) => {
                    summary.messages += 1;
                    self.match_ms1553(path, packet, &message, correlator, summary, out)?
                }
                Ok(Message::Arinc429(message)) => {
                    summary.messages += 1;
                    self.match_arinc429(path, packet, &message, summary, out)?;
                    true
                }
                Err(e) => {
                    summary.skipped_packets += 1;
                    log::debug!(
                        "{}: skipping rest of packet on channel {}: {}",
                        path.display(),
                        packet.channel_id(),
                        e
                    );
                    false
                }
            };
            if !keep_going {
                break;
            }
        }
        Ok(())
    }

    /// Returns false when the rest of the packet should be skipped
    fn match_ms1553(
        &self,
        path: &Path,
        packet: &Packet,
        message: &Ms1553Message,
        correlator: &TimeCorrelator,
        summary: &mut ScanSummary,
        out: &mut FileWriter<'_>,
    ) -> Result<bool, ScanError> {
        let channel = packet.channel_id();
        match self.filter.matches(packet, message) {
            Ok(Decision::Match(value)) => {
                summary.matches += 1;
                let written = match self.filter.target {
                    MatchValue::Any => out.report(&MatchRecord::Value { channel, value }),
                    MatchValue::Exact(_) => out.result(&MatchRecord::Timestamp {
                        channel,
                        time: correlator.resolve(message.rtc()),
                    }),
                };
                written.map_err(write_error(path))?;
                Ok(true)
            }
            Ok(Decision::NoMatch) => Ok(true),
            Ok(Decision::Skip) => Ok(false),
            Err(e) => {
                summary.skipped_messages += 1;
                log::debug!("{}: channel {}: {}", path.display(), channel, e);
                Ok(true)
            }
        }
    }

    fn match_arinc429(
        &self,
        path: &Path,
        packet: &Packet,
        message: &Arinc429Message,
        summary: &mut ScanSummary,
        out: &mut FileWriter<'_>,
    ) -> Result<(), ScanError> {
        if !self.filter.accepts_arinc429(message) {
            return Ok(());
        }
        summary.matches += 1;
        out.report(&MatchRecord::Arinc429 {
            channel: packet.channel_id(),
            message: message.to_string(),
        })
        .map_err(write_error(path))
    }
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> ScanError + '_ {
    move |source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    }
}
