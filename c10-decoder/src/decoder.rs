//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! `Decoder` opens recordings; `PacketReader` streams packets from any
//! `Read` source in file order.

use crate::config::DecoderConfig;
use crate::formats::header::{PacketHeader, PRIMARY_HEADER_LEN};
use crate::packet::Packet;
use crate::types::{DecoderError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a new decoder instance with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Open a recording and return an iterator over its packets
    ///
    /// # Example
    /// ```no_run
    /// use c10_decoder::Decoder;
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::new();
    /// for packet in decoder.open(Path::new("flight.c10")).unwrap() {
    ///     match packet {
    ///         Ok(packet) => println!("{} on channel {}", packet.data_type(), packet.channel_id()),
    ///         Err(e) => eprintln!("Error: {}", e),
    ///     }
    /// }
    /// ```
    pub fn open(&self, path: &Path) -> Result<PacketReader<BufReader<File>>> {
        log::debug!("Opening recording: {:?}", path);
        let file = File::open(path)?;
        Ok(self.read(BufReader::new(file)))
    }

    /// Stream packets from an arbitrary reader
    pub fn read<R: Read>(&self, reader: R) -> PacketReader<R> {
        PacketReader::new(reader, self.config.clone())
    }
}

/// Counters describing what the reader had to skip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Packets returned
    pub packets: u64,
    /// Times the reader lost and regained packet sync
    pub resyncs: u64,
    /// Bytes discarded while searching for a sync pattern
    pub skipped_bytes: u64,
}

/// Iterator over the packets of a recording
///
/// Malformed headers are skipped by scanning for the next sync pattern
/// (unless resync is disabled). A packet cut short by end of input, or any
/// I/O error, is returned once and ends iteration.
pub struct PacketReader<R> {
    reader: R,
    config: DecoderConfig,
    stats: ReaderStats,
    offset: u64,
    done: bool,
}

impl<R: Read> PacketReader<R> {
    pub fn new(reader: R, config: DecoderConfig) -> Self {
        Self {
            reader,
            config,
            stats: ReaderStats::default(),
            offset: 0,
            done: false,
        }
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    /// Byte offset of the next unread byte
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Check a candidate header against the framing rules
    fn validate(&self, buf: &[u8; PRIMARY_HEADER_LEN]) -> Result<PacketHeader> {
        let header = PacketHeader::parse(buf)?;

        if self.config.verify_header_checksum && !header.checksum_ok() {
            return Err(DecoderError::InvalidHeader(format!(
                "checksum mismatch (stored 0x{:04X})",
                header.checksum
            )));
        }
        if header.packet_length > self.config.max_packet_length {
            return Err(DecoderError::InvalidHeader(format!(
                "packet length {} exceeds limit {}",
                header.packet_length, self.config.max_packet_length
            )));
        }
        if (header.packet_length as usize) < header.min_packet_length() {
            return Err(DecoderError::InvalidHeader(format!(
                "packet length {} too short for data length {}",
                header.packet_length, header.data_length
            )));
        }
        Ok(header)
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        let mut buf = [0u8; PRIMARY_HEADER_LEN];
        let start = self.offset;
        let filled = read_full(&mut self.reader, &mut buf)?;
        self.offset += filled as u64;
        if filled == 0 {
            return Ok(None);
        }
        if filled < PRIMARY_HEADER_LEN {
            return Err(DecoderError::Truncated {
                offset: start,
                expected: PRIMARY_HEADER_LEN,
                actual: filled,
            });
        }

        let mut skipped = 0u64;
        let header = loop {
            match self.validate(&buf) {
                Ok(header) => break header,
                Err(e) if self.config.resync => {
                    if skipped == 0 {
                        log::warn!("Lost sync at offset {}: {}", start, e);
                    }
                    // Slide the window one byte and try again
                    buf.copy_within(1.., 0);
                    let mut next = [0u8; 1];
                    if read_full(&mut self.reader, &mut next)? == 0 {
                        self.stats.skipped_bytes += skipped + PRIMARY_HEADER_LEN as u64;
                        log::warn!(
                            "No sync pattern found in the last {} bytes",
                            skipped + PRIMARY_HEADER_LEN as u64
                        );
                        return Ok(None);
                    }
                    buf[PRIMARY_HEADER_LEN - 1] = next[0];
                    self.offset += 1;
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if skipped > 0 {
            self.stats.resyncs += 1;
            self.stats.skipped_bytes += skipped;
            log::warn!(
                "Resynchronised at offset {} after skipping {} bytes",
                start + skipped,
                skipped
            );
        }

        let length = header.packet_length as usize;
        let mut raw = Vec::with_capacity(length);
        raw.extend_from_slice(&buf);
        let wanted = (length - PRIMARY_HEADER_LEN) as u64;
        let read = (&mut self.reader).take(wanted).read_to_end(&mut raw)?;
        self.offset += read as u64;
        if raw.len() < length {
            return Err(DecoderError::Truncated {
                offset: start + skipped,
                expected: length,
                actual: raw.len(),
            });
        }

        self.stats.packets += 1;
        log::trace!(
            "Packet at offset {}: type {} channel {} length {}",
            start + skipped,
            header.data_type(),
            header.channel_id,
            length
        );
        Ok(Some(Packet::from_parts(header, raw)))
    }
}

impl<R: Read> Iterator for PacketReader<R> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_packet() {
            Ok(Some(packet)) => Some(Ok(packet)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Read until `buf` is full or the input ends; returns the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
