//! Packet construction
//!
//! Builds well-formed packets (lengths, checksum, 4-byte alignment) from a
//! payload. Used to produce synthetic recordings.

use crate::formats::arinc429::Arinc429Message;
use crate::formats::header::{flags, PacketHeader, CSDW_LEN, PRIMARY_HEADER_LEN};
use crate::formats::ms1553::{Ms1553Csdw, Ms1553Message};
use crate::formats::TimeF1;
use crate::types::DataType;

/// Builder for a single packet
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    data_type: DataType,
    channel_id: u16,
    data_type_version: u8,
    sequence_number: u8,
    flags: u8,
    rtc: u64,
    secondary_header: Option<[u8; 12]>,
    csdw: u32,
    body: Vec<u8>,
    extra_filler: usize,
}

impl PacketBuilder {
    pub fn new(data_type: DataType, channel_id: u16) -> Self {
        Self {
            data_type,
            channel_id,
            data_type_version: 0x06,
            sequence_number: 0,
            flags: 0,
            rtc: 0,
            secondary_header: None,
            csdw: 0,
            body: Vec::new(),
            extra_filler: 0,
        }
    }

    /// 1553 format 1 packet carrying `messages`
    pub fn ms1553(channel_id: u16, rtc: u64, messages: &[Ms1553Message]) -> Self {
        let mut body = Vec::new();
        for message in messages {
            message.write_to(&mut body);
        }
        let csdw = Ms1553Csdw {
            time_tag_bits: 0,
            message_count: messages.len() as u32,
        };
        Self::new(DataType::Ms1553F1, channel_id)
            .with_rtc(rtc)
            .with_csdw(csdw.to_u32())
            .with_body(body)
    }

    /// ARINC-429 format 0 packet carrying `messages`
    pub fn arinc429(channel_id: u16, rtc: u64, messages: &[Arinc429Message]) -> Self {
        let mut body = Vec::new();
        for message in messages {
            message.write_to(&mut body);
        }
        Self::new(DataType::Arinc429F0, channel_id)
            .with_rtc(rtc)
            .with_csdw(messages.len() as u32 & 0xFFFF)
            .with_body(body)
    }

    /// Time format 1 packet
    pub fn time_f1(channel_id: u16, rtc: u64, time: &TimeF1) -> Self {
        Self::new(DataType::TimeF1, channel_id)
            .with_rtc(rtc)
            .with_csdw(time.csdw.to_u32())
            .with_body(time.encode_body())
    }

    pub fn with_rtc(mut self, rtc: u64) -> Self {
        self.rtc = rtc;
        self
    }

    pub fn with_sequence(mut self, sequence_number: u8) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// Add a secondary header and set the packet flag announcing it
    pub fn with_secondary_header(mut self, secondary: [u8; 12]) -> Self {
        self.secondary_header = Some(secondary);
        self.flags |= flags::SECONDARY_HEADER;
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_csdw(mut self, csdw: u32) -> Self {
        self.csdw = csdw;
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Extra filler bytes beyond 4-byte alignment
    pub fn with_filler(mut self, bytes: usize) -> Self {
        self.extra_filler = bytes;
        self
    }

    /// Serialize the packet
    pub fn build(&self) -> Vec<u8> {
        let secondary_len = self.secondary_header.map_or(0, |s| s.len());
        let data_length = CSDW_LEN + self.body.len();
        let unpadded = PRIMARY_HEADER_LEN + secondary_len + data_length;
        let packet_length = unpadded.div_ceil(4) * 4 + self.extra_filler;

        let header = PacketHeader {
            channel_id: self.channel_id,
            packet_length: packet_length as u32,
            data_length: data_length as u32,
            data_type_version: self.data_type_version,
            sequence_number: self.sequence_number,
            flags: self.flags,
            data_type: self.data_type.as_u8(),
            rtc: self.rtc,
            checksum: 0,
        };

        let mut raw = Vec::with_capacity(packet_length);
        raw.extend_from_slice(&header.encode());
        if let Some(secondary) = &self.secondary_header {
            raw.extend_from_slice(secondary);
        }
        raw.extend_from_slice(&self.csdw.to_le_bytes());
        raw.extend_from_slice(&self.body);
        raw.resize(packet_length, 0);
        raw
    }
}
