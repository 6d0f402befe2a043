//! Message filtering
//!
//! A `Filter` is built once from the search options and evaluated against
//! every decoded message. The channel constraint applies to whole packets and
//! is checked before any message is parsed.

use c10_decoder::{Arinc429Message, Ms1553Message, Packet};
use std::fmt;

/// The value being searched for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchValue {
    /// Match every message and report its value
    Any,
    /// Match messages whose (masked) word equals this value
    Exact(u16),
}

impl fmt::Display for MatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchValue::Any => write!(f, "*"),
            MatchValue::Exact(v) => write!(f, "{:#x}", v),
        }
    }
}

/// Outcome of evaluating a filter against one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Wrong channel: skip the whole packet
    Skip,
    NoMatch,
    /// Matched; carries the extracted (masked) word
    Match(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("word offset {offset} out of range for message with {word_count} words")]
    OutOfRange { offset: usize, word_count: usize },
}

/// Search constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub channel: Option<u16>,
    /// 1553 command word (first word of the message)
    pub command_word: Option<u16>,
    /// 1553: 0 = bus A, 1 = bus B. ARINC-429: bus number.
    pub bus: Option<u8>,
    pub word_offset: usize,
    pub mask: Option<u16>,
    pub target: MatchValue,
}

impl Filter {
    pub fn new(target: MatchValue) -> Self {
        Self {
            channel: None,
            command_word: None,
            bus: None,
            word_offset: 0,
            mask: None,
            target,
        }
    }

    pub fn with_channel(mut self, channel: Option<u16>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_command_word(mut self, command_word: Option<u16>) -> Self {
        self.command_word = command_word;
        self
    }

    pub fn with_bus(mut self, bus: Option<u8>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_word_offset(mut self, word_offset: usize) -> Self {
        self.word_offset = word_offset;
        self
    }

    pub fn with_mask(mut self, mask: Option<u16>) -> Self {
        self.mask = mask;
        self
    }

    /// True if the packet is on a channel this filter excludes
    pub fn skips_packet(&self, packet: &Packet) -> bool {
        matches!(self.channel, Some(channel) if channel != packet.channel_id())
    }

    /// Evaluate the filter against a 1553 message of `packet`
    pub fn matches(
        &self,
        packet: &Packet,
        message: &Ms1553Message,
    ) -> Result<Decision, FilterError> {
        if self.skips_packet(packet) {
            return Ok(Decision::Skip);
        }

        if let Some(command_word) = self.command_word {
            if message.command_word() != Some(command_word) {
                return Ok(Decision::NoMatch);
            }
        }

        if let Some(bus) = self.bus {
            if message.bus().as_bit() != bus {
                return Ok(Decision::NoMatch);
            }
        }

        let mut value = message
            .word(self.word_offset)
            .ok_or(FilterError::OutOfRange {
                offset: self.word_offset,
                word_count: message.word_count(),
            })?;

        if let Some(mask) = self.mask {
            value &= mask;
        }

        match self.target {
            MatchValue::Any => Ok(Decision::Match(value)),
            MatchValue::Exact(target) if value == target => Ok(Decision::Match(value)),
            MatchValue::Exact(_) => Ok(Decision::NoMatch),
        }
    }

    /// True if the bus constraint rules out every 1553 message
    pub fn excludes_all_1553(&self) -> bool {
        matches!(self.bus, Some(bus) if bus > 1)
    }

    /// ARINC-429 messages are only filtered by bus number
    pub fn accepts_arinc429(&self, message: &Arinc429Message) -> bool {
        self.bus.map_or(true, |bus| message.bus == bus)
    }

    /// Human-readable summary of the search
    pub fn describe(&self) -> String {
        let mut text = format!("Searching for {}", self.target);
        if let Some(channel) = self.channel {
            text.push_str(&format!(" in channel #{}", channel));
        }
        if let Some(command_word) = self.command_word {
            text.push_str(&format!(" with command word {:#x}", command_word));
        }
        if let Some(bus) = self.bus {
            text.push_str(&format!(" on bus {}", bus));
        }
        if self.word_offset != 0 {
            text.push_str(&format!(" at word {}", self.word_offset));
        }
        if let Some(mask) = self.mask {
            text.push_str(&format!(" with mask {:#x}", mask));
        }
        text
    }
}
