//! Time correlation
//!
//! Messages carry only a relative time counter (RTC, 10 MHz). The most recent
//! time packet pairs an RTC value with an absolute time, so a message's
//! absolute time is that reference shifted by the RTC difference.
//!
//! One correlator belongs to one file scan and is never shared.

use c10_decoder::formats::RTC_MASK;
use c10_decoder::{DataType, Packet, Timestamp};
use chrono::Duration;

/// Nanoseconds per RTC tick
const RTC_TICK_NS: i64 = 100;

/// Absolute time anchored to an RTC value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReference {
    pub rtc: u64,
    pub time: Timestamp,
}

#[derive(Debug, Clone)]
pub struct TimeCorrelator {
    reference: Option<TimeReference>,
    year: i32,
    rejected: u64,
}

impl TimeCorrelator {
    /// `year` is assumed for time packets that only record day of year
    pub fn new(year: i32) -> Self {
        Self {
            reference: None,
            year,
            rejected: 0,
        }
    }

    /// Replace the reference if `packet` is a decodable time packet
    ///
    /// An undecodable time packet leaves the previous reference in place.
    pub fn observe(&mut self, packet: &Packet) {
        if packet.data_type() != DataType::TimeF1 {
            return;
        }

        let time = packet
            .time()
            .map_err(|e| e.to_string())
            .and_then(|t| {
                t.to_datetime(self.year)
                    .ok_or_else(|| format!("day of year invalid for {}", self.year))
            });

        match time {
            Ok(time) => {
                self.reference = Some(TimeReference {
                    rtc: packet.rtc(),
                    time,
                });
            }
            Err(e) => {
                self.rejected += 1;
                log::debug!(
                    "Ignoring time packet on channel {}: {}",
                    packet.channel_id(),
                    e
                );
            }
        }
    }

    /// Absolute time for a relative time counter, if a reference exists
    pub fn resolve(&self, rtc: u64) -> Option<Timestamp> {
        let reference = self.reference?;
        let ticks = rtc_delta(reference.rtc, rtc);
        reference
            .time
            .checked_add_signed(Duration::nanoseconds(ticks * RTC_TICK_NS))
    }

    /// Time packets that could not be decoded
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

/// Signed distance from `from` to `to` on the 48-bit wrapping counter
fn rtc_delta(from: u64, to: u64) -> i64 {
    let modulus = RTC_MASK + 1;
    let diff = to.wrapping_sub(from) & RTC_MASK;
    if diff >= modulus / 2 {
        diff as i64 - modulus as i64
    } else {
        diff as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ms1553_packet, time_packet};
    use c10_decoder::{PacketBuilder, TimeF1};
    use chrono::{NaiveDate, NaiveTime};

    fn at(h: u32, m: u32, s: u32, ms: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
    }

    fn packet(raw: Vec<u8>) -> Packet {
        Packet::from_bytes(raw).unwrap()
    }

    #[test]
    fn test_resolve_before_observe_is_unknown() {
        let correlator = TimeCorrelator::new(2020);
        assert_eq!(correlator.resolve(12345), None);
    }

    #[test]
    fn test_resolve_offsets_by_rtc() {
        let mut correlator = TimeCorrelator::new(2020);
        correlator.observe(&packet(time_packet(1, 1_000_000, at(12, 0, 0, 0))));

        // 10 MHz: 10_000_000 ticks per second
        assert_eq!(correlator.resolve(1_000_000), Some(at(12, 0, 0, 0)));
        assert_eq!(correlator.resolve(16_000_000), Some(at(12, 0, 1, 500)));
        assert_eq!(correlator.resolve(0), Some(at(11, 59, 59, 900)));
    }

    #[test]
    fn test_newer_time_packet_replaces_reference() {
        let mut correlator = TimeCorrelator::new(2020);
        correlator.observe(&packet(time_packet(1, 0, at(1, 0, 0, 0))));
        correlator.observe(&packet(time_packet(1, 0, at(2, 0, 0, 0))));
        assert_eq!(correlator.resolve(0), Some(at(2, 0, 0, 0)));
    }

    #[test]
    fn test_non_time_packets_ignored() {
        let mut correlator = TimeCorrelator::new(2020);
        correlator.observe(&packet(ms1553_packet(1, 99, vec![])));
        assert_eq!(correlator.resolve(99), None);
    }

    #[test]
    fn test_resolve_is_pure() {
        let mut correlator = TimeCorrelator::new(2020);
        correlator.observe(&packet(time_packet(1, 500, at(3, 4, 5, 0))));
        let first = correlator.resolve(777_777);
        assert_eq!(correlator.resolve(777_777), first);
    }

    #[test]
    fn test_rtc_wraparound() {
        let mut correlator = TimeCorrelator::new(2020);
        correlator.observe(&packet(time_packet(1, RTC_MASK - 9, at(0, 0, 1, 0))));
        // 20 ticks later, past the wrap
        assert_eq!(
            correlator.resolve(10),
            at(0, 0, 1, 0).checked_add_signed(Duration::nanoseconds(2_000))
        );
    }

    #[test]
    fn test_day_of_year_uses_configured_year() {
        let time = TimeF1::day_of_year(60, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        let raw = PacketBuilder::time_f1(1, 0, &time).build();

        let mut correlator = TimeCorrelator::new(2020);
        correlator.observe(&packet(raw.clone()));
        assert_eq!(correlator.resolve(0), Some(at(6, 0, 0, 0)));

        let mut correlator = TimeCorrelator::new(2021);
        correlator.observe(&packet(raw));
        assert_eq!(
            correlator.resolve(0).map(|t| t.to_string()),
            Some("2021-03-01 06:00:00".to_string())
        );
    }

    #[test]
    fn test_bad_time_packet_keeps_reference() {
        let mut correlator = TimeCorrelator::new(2020);
        correlator.observe(&packet(time_packet(1, 0, at(5, 0, 0, 0))));

        let bad = PacketBuilder::new(DataType::TimeF1, 1)
            .with_body(vec![0xFF; 6])
            .build();
        correlator.observe(&packet(bad));

        assert_eq!(correlator.rejected(), 1);
        assert_eq!(correlator.resolve(0), Some(at(5, 0, 0, 0)));
    }
}
