//! Decoded packet and message access
//!
//! A `Packet` owns its raw bytes and a parsed primary header. Message-bearing
//! payloads are parsed lazily: each call to [`Packet::messages`] starts a new
//! pass over the payload.

use crate::formats::arinc429::{Arinc429Csdw, Arinc429Message};
use crate::formats::ms1553::{Ms1553Csdw, Ms1553Message};
use crate::formats::{PacketHeader, TimeF1, CSDW_LEN};
use crate::types::{DataType, DecoderError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// One framed packet from a recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: PacketHeader,
    raw: Vec<u8>,
}

impl Packet {
    /// Wrap raw packet bytes, checking the header and length agree
    pub fn from_bytes(raw: Vec<u8>) -> Result<Self> {
        let header = PacketHeader::parse(&raw)?;
        if header.packet_length as usize != raw.len() {
            return Err(DecoderError::InvalidHeader(format!(
                "header claims {} bytes, buffer holds {}",
                header.packet_length,
                raw.len()
            )));
        }
        Ok(Self { header, raw })
    }

    pub(crate) fn from_parts(header: PacketHeader, raw: Vec<u8>) -> Self {
        Self { header, raw }
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn data_type(&self) -> DataType {
        self.header.data_type()
    }

    pub fn channel_id(&self) -> u16 {
        self.header.channel_id
    }

    /// Total length including header, body and filler
    pub fn packet_length(&self) -> usize {
        self.raw.len()
    }

    pub fn has_secondary_header(&self) -> bool {
        self.header.has_secondary_header()
    }

    /// Relative time counter from the primary header
    pub fn rtc(&self) -> u64 {
        self.header.rtc
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    /// Channel-specific data word, if the packet is long enough to hold one
    pub fn csdw(&self) -> Option<u32> {
        let start = self.header.body_offset();
        self.raw
            .get(start..start + CSDW_LEN)
            .map(LittleEndian::read_u32)
    }

    /// Payload bytes after the CSDW, bounded by the header's data length
    pub fn payload(&self) -> &[u8] {
        let start = self.header.payload_offset();
        let end = (self.header.body_offset() + self.header.data_length as usize).min(self.raw.len());
        if start >= end {
            return &[];
        }
        &self.raw[start..end]
    }

    /// Iterate over the messages of a 1553 or ARINC-429 packet
    ///
    /// Other packet types yield nothing. The iterator stops after the first
    /// malformed message.
    pub fn messages(&self) -> Messages<'_> {
        let kind = match self.data_type() {
            DataType::Ms1553F1 => MessageKind::Ms1553,
            DataType::Arinc429F0 => MessageKind::Arinc429,
            _ => return Messages::empty(),
        };

        let Some(csdw) = self.csdw() else {
            return Messages {
                kind,
                buf: &[],
                pos: 0,
                remaining: 0,
                error: Some(DecoderError::InvalidMessage(format!(
                    "{} byte packet has no room for a CSDW",
                    self.raw.len()
                ))),
            };
        };

        let remaining = match kind {
            MessageKind::Ms1553 => Ms1553Csdw::from_u32(csdw).message_count,
            MessageKind::Arinc429 => Arinc429Csdw::from_u32(csdw).message_count as u32,
            MessageKind::None => 0,
        };

        Messages {
            kind,
            buf: self.payload(),
            pos: 0,
            remaining,
            error: None,
        }
    }

    /// Decode the body of a time F1 packet
    pub fn time(&self) -> Result<TimeF1> {
        if self.data_type() != DataType::TimeF1 {
            return Err(DecoderError::InvalidTime(format!(
                "packet type {} is not a time packet",
                self.data_type()
            )));
        }
        let csdw = self
            .csdw()
            .ok_or_else(|| DecoderError::InvalidTime("time packet has no CSDW".to_string()))?;
        TimeF1::parse(csdw, self.payload())
    }
}

/// A message decoded from a packet payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Ms1553(Ms1553Message),
    Arinc429(Arinc429Message),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageKind {
    Ms1553,
    Arinc429,
    None,
}

/// Lazy iterator over the messages of one packet
pub struct Messages<'a> {
    kind: MessageKind,
    buf: &'a [u8],
    pos: usize,
    remaining: u32,
    error: Option<DecoderError>,
}

impl<'a> Messages<'a> {
    fn empty() -> Self {
        Self {
            kind: MessageKind::None,
            buf: &[],
            pos: 0,
            remaining: 0,
            error: None,
        }
    }
}

impl<'a> Iterator for Messages<'a> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.error.take() {
            self.remaining = 0;
            return Some(Err(error));
        }
        if self.remaining == 0 {
            return None;
        }

        let rest = &self.buf[self.pos..];
        let parsed = match self.kind {
            MessageKind::Ms1553 => {
                Ms1553Message::parse(rest).map(|(m, used)| (Message::Ms1553(m), used))
            }
            MessageKind::Arinc429 => {
                Arinc429Message::parse(rest).map(|(m, used)| (Message::Arinc429(m), used))
            }
            MessageKind::None => return None,
        };

        match parsed {
            Ok((message, used)) => {
                self.pos += used;
                self.remaining -= 1;
                Some(Ok(message))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}
