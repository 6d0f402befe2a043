//! Bus reassignment
//!
//! Copies a recording packet by packet, moving every 1553 message onto one
//! bus. Non-1553 packets are copied untouched. A rewritten 1553 packet keeps
//! its header, secondary header and CSDW bytes, gets its messages
//! re-serialized with the new bus bit, and is padded with filler back to its
//! original length.

use crate::progress::ProgressObserver;
use c10_decoder::{Bus, DataType, Decoder, DecoderError, Message, Packet, PacketReader};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Byte used to pad rewritten packets (ASCII '0')
pub const FILLER_BYTE: u8 = b'0';

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Destination file exists. Use --force to overwrite it: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("Refusing to rewrite {} onto itself", .0.display())]
    SameFile(PathBuf),

    #[error(transparent)]
    Decode(#[from] DecoderError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What happened to one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    Copied,
    Rewritten { messages: usize, filler: usize },
    /// 1553 packet whose payload could not be parsed; copied unchanged
    PassedThrough,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub packets_copied: u64,
    pub packets_rewritten: u64,
    pub packets_passed_through: u64,
    pub messages_rewritten: u64,
    pub filler_bytes: u64,
    pub bytes: u64,
}

impl RewriteSummary {
    fn record(&mut self, outcome: PacketOutcome, length: usize) {
        self.bytes += length as u64;
        match outcome {
            PacketOutcome::Copied => self.packets_copied += 1,
            PacketOutcome::PassedThrough => self.packets_passed_through += 1,
            PacketOutcome::Rewritten { messages, filler } => {
                self.packets_rewritten += 1;
                self.messages_rewritten += messages as u64;
                self.filler_bytes += filler as u64;
            }
        }
    }
}

/// Rewrite `src` into `dst` with every 1553 message on `bus`
///
/// The destination checks happen before anything is written: an existing
/// `dst` is refused unless `force` is set, and `dst` may never be `src`.
pub fn rewrite_file(
    decoder: &Decoder,
    src: &Path,
    dst: &Path,
    bus: Bus,
    force: bool,
    progress: &dyn ProgressObserver,
) -> Result<RewriteSummary, RewriteError> {
    if dst.exists() {
        if !force {
            return Err(RewriteError::DestinationExists(dst.to_path_buf()));
        }
        if fs::canonicalize(src)? == fs::canonicalize(dst)? {
            return Err(RewriteError::SameFile(dst.to_path_buf()));
        }
    }

    let packets = decoder.open(src)?;

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let file = options.open(dst).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => RewriteError::DestinationExists(dst.to_path_buf()),
        _ => RewriteError::Io(e),
    })?;

    let size = fs::metadata(src).map(|m| m.len()).unwrap_or(0);
    progress.file_started(src, 0, 1, size);

    let mut writer = BufWriter::new(file);
    let result = rewrite_stream(packets, &mut writer, bus, |length| {
        progress.advanced(src, length as u64)
    })
    .and_then(|summary| {
        writer.flush()?;
        Ok(summary)
    });

    progress.file_finished(src, result.is_ok());
    result
}

/// Rewrite a packet stream into `out`
///
/// `on_packet` is called with the length of each packet written.
pub fn rewrite_stream<R, W, F>(
    packets: PacketReader<R>,
    out: &mut W,
    bus: Bus,
    mut on_packet: F,
) -> Result<RewriteSummary, RewriteError>
where
    R: Read,
    W: Write,
    F: FnMut(usize),
{
    let mut summary = RewriteSummary::default();
    let mut buf = Vec::new();

    for packet in packets {
        let packet = packet?;
        buf.clear();
        let outcome = rewrite_packet(&packet, bus, &mut buf);
        out.write_all(&buf)?;
        summary.record(outcome, buf.len());
        on_packet(buf.len());
    }

    log::debug!(
        "Rewrote {} packets ({} messages), copied {}, passed through {}",
        summary.packets_rewritten,
        summary.messages_rewritten,
        summary.packets_copied,
        summary.packets_passed_through
    );
    Ok(summary)
}

/// Append the rewritten form of `packet` to `out`
///
/// Exactly `packet.packet_length()` bytes are appended.
pub fn rewrite_packet(packet: &Packet, bus: Bus, out: &mut Vec<u8>) -> PacketOutcome {
    if packet.data_type() != DataType::Ms1553F1 {
        out.extend_from_slice(packet.raw());
        return PacketOutcome::Copied;
    }

    // Parse everything first so a bad payload leaves the packet untouched
    let messages = packet
        .messages()
        .map(|message| match message? {
            Message::Ms1553(message) => Ok(message),
            Message::Arinc429(_) => Err(DecoderError::InvalidMessage(
                "ARINC-429 message in a 1553 packet".to_string(),
            )),
        })
        .collect::<Result<Vec<_>, DecoderError>>();

    let messages = match messages {
        Ok(messages) => messages,
        Err(e) => {
            log::warn!(
                "Copying 1553 packet on channel {} unchanged: {}",
                packet.channel_id(),
                e
            );
            out.extend_from_slice(packet.raw());
            return PacketOutcome::PassedThrough;
        }
    };

    let start = out.len();
    let length = packet.packet_length();
    out.extend_from_slice(&packet.raw()[..packet.header().payload_offset()]);
    for mut message in messages.iter().cloned() {
        message.set_bus(bus);
        message.write_to(out);
    }

    let written = out.len() - start;
    if written > length {
        // Parsed messages always fit the payload; keep the packet intact if not
        out.truncate(start);
        out.extend_from_slice(packet.raw());
        return PacketOutcome::PassedThrough;
    }

    out.resize(start + length, FILLER_BYTE);
    PacketOutcome::Rewritten {
        messages: messages.len(),
        filler: length - written,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Silent;
    use crate::test_support::{time_packet, write_recording};
    use c10_decoder::formats::ms1553::block_status;
    use c10_decoder::formats::PRIMARY_HEADER_LEN;
    use c10_decoder::{Ms1553Message, PacketBuilder};
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn packet(raw: &[u8]) -> Packet {
        Packet::from_bytes(raw.to_vec()).unwrap()
    }

    fn buses(raw: &[u8]) -> Vec<Bus> {
        Decoder::new()
            .read(Cursor::new(raw.to_vec()))
            .flat_map(|p| {
                p.unwrap()
                    .messages()
                    .filter_map(|m| match m.unwrap() {
                        Message::Ms1553(m) => Some(m.bus()),
                        Message::Arinc429(_) => None,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn rewrite_bytes(raw: &[u8], bus: Bus) -> (Vec<u8>, RewriteSummary) {
        let mut out = Vec::new();
        let summary =
            rewrite_stream(Decoder::new().read(Cursor::new(raw.to_vec())), &mut out, bus, |_| {})
                .unwrap();
        (out, summary)
    }

    fn three_messages() -> Vec<Ms1553Message> {
        vec![
            Ms1553Message::new(100, Bus::A, &[0x0821]),
            Ms1553Message::new(200, Bus::B, &[0x0C22]),
            Ms1553Message::new(300, Bus::A, &[0x1043]),
        ]
    }

    #[test]
    fn test_non_1553_packet_is_identical() {
        let raw = PacketBuilder::new(DataType::Other(0x09), 4)
            .with_body(vec![0xA5; 36])
            .build();
        assert_eq!(raw.len(), 64);

        let (out, summary) = rewrite_bytes(&raw, Bus::B);
        assert_eq!(out, raw);
        assert_eq!(summary.packets_copied, 1);
    }

    #[test]
    fn test_1553_packet_layout_after_rewrite() {
        // 28 header bytes, 3 messages of 16 bytes, 12 bytes of filler
        let raw = PacketBuilder::ms1553(1, 0, &three_messages())
            .with_filler(12)
            .build();
        assert_eq!(raw.len(), 88);

        let mut out = Vec::new();
        let outcome = rewrite_packet(&packet(&raw), Bus::B, &mut out);

        assert_eq!(
            outcome,
            PacketOutcome::Rewritten {
                messages: 3,
                filler: 12
            }
        );
        assert_eq!(out.len(), 88);
        assert_eq!(out[..28], raw[..28]);

        let mut expected = Vec::new();
        for mut message in three_messages() {
            message.set_bus(Bus::B);
            message.write_to(&mut expected);
        }
        assert_eq!(out[28..76], expected[..]);
        assert!(out[76..].iter().all(|&b| b == FILLER_BYTE));
    }

    #[test]
    fn test_only_bus_bit_changes() {
        let mut message = Ms1553Message::new(7, Bus::A, &[0x0821]);
        message.block_status |= block_status::RT_TO_RT | block_status::MESSAGE_ERROR;
        message.gap_times = 0x1234;
        let raw = PacketBuilder::ms1553(1, 0, &[message.clone()]).build();

        let mut out = Vec::new();
        rewrite_packet(&packet(&raw), Bus::B, &mut out);

        let diff: Vec<usize> = (0..raw.len()).filter(|&i| raw[i] != out[i]).collect();
        // Block status is at byte 8 of the intra-packet header, bit 13 is in its high byte
        assert_eq!(diff, vec![28 + 9]);
    }

    #[test]
    fn test_secondary_header_kept() {
        let raw = PacketBuilder::ms1553(1, 0, &three_messages())
            .with_secondary_header([0x5A; 12])
            .build();

        let mut out = Vec::new();
        rewrite_packet(&packet(&raw), Bus::B, &mut out);

        assert_eq!(out.len(), raw.len());
        assert_eq!(out[..40], raw[..40]);
        assert_eq!(out[PRIMARY_HEADER_LEN..36], [0x5A; 12]);
        assert_eq!(buses(&out), vec![Bus::B; 3]);
    }

    #[test]
    fn test_round_trip_restores_bus() {
        let time = NaiveDate::from_ymd_opt(2022, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        let raw = [
            time_packet(1, 0, time),
            PacketBuilder::ms1553(2, 0, &three_messages()).build(),
            PacketBuilder::ms1553(2, 0, &three_messages()[..1]).with_filler(8).build(),
        ]
        .concat();

        let (to_a, _) = rewrite_bytes(&raw, Bus::A);
        let (to_b, summary) = rewrite_bytes(&to_a, Bus::B);
        let (back, _) = rewrite_bytes(&to_b, Bus::A);

        assert_eq!(summary.packets_copied, 1);
        assert_eq!(summary.packets_rewritten, 2);
        assert_eq!(summary.messages_rewritten, 4);
        assert_eq!(buses(&to_b), vec![Bus::B; 4]);
        assert_eq!(buses(&back), vec![Bus::A; 4]);
        assert_eq!(back.len(), raw.len());
        assert_eq!(back, to_a);
    }

    #[test]
    fn test_malformed_payload_passed_through() {
        // CSDW claims two messages but only one is present
        let mut body = Vec::new();
        Ms1553Message::new(0, Bus::A, &[0x0821]).write_to(&mut body);
        let raw = PacketBuilder::new(DataType::Ms1553F1, 1)
            .with_csdw(2)
            .with_body(body)
            .build();

        let mut out = Vec::new();
        let outcome = rewrite_packet(&packet(&raw), Bus::B, &mut out);

        assert_eq!(outcome, PacketOutcome::PassedThrough);
        assert_eq!(out, raw);
    }

    #[test]
    fn test_existing_destination_refused() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_recording(
            dir.path(),
            "src.c10",
            &[PacketBuilder::ms1553(1, 0, &three_messages()).build()],
        );
        let dst = dir.path().join("dst.c10");
        fs::write(&dst, b"keep me").unwrap();

        let err = rewrite_file(&Decoder::new(), &src, &dst, Bus::B, false, &Silent).unwrap_err();
        assert!(matches!(err, RewriteError::DestinationExists(_)));
        assert_eq!(fs::read(&dst).unwrap(), b"keep me");

        let summary = rewrite_file(&Decoder::new(), &src, &dst, Bus::B, true, &Silent).unwrap();
        assert_eq!(summary.packets_rewritten, 1);
        assert_eq!(fs::metadata(&dst).unwrap().len(), fs::metadata(&src).unwrap().len());
        assert_eq!(buses(&fs::read(&dst).unwrap()), vec![Bus::B; 3]);
    }

    #[test]
    fn test_same_file_refused() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_recording(
            dir.path(),
            "src.c10",
            &[PacketBuilder::ms1553(1, 0, &three_messages()).build()],
        );
        let before = fs::read(&src).unwrap();

        let err = rewrite_file(&Decoder::new(), &src, &src, Bus::B, true, &Silent).unwrap_err();
        assert!(matches!(err, RewriteError::SameFile(_)));
        assert_eq!(fs::read(&src).unwrap(), before);
    }

    #[test]
    fn test_missing_source_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("dst.c10");

        let err = rewrite_file(
            &Decoder::new(),
            &dir.path().join("nope.c10"),
            &dst,
            Bus::A,
            false,
            &Silent,
        )
        .unwrap_err();

        assert!(matches!(err, RewriteError::Decode(_)));
        assert!(!dst.exists());
    }
}
