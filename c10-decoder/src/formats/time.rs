//! Time data format 1 (IRIG time in BCD)
//!
//! CSDW bits 3-0 time source, bits 7-4 time format, bit 8 leap year,
//! bit 9 date format (0 = day of year, 1 = day/month/year).
//!
//! The body is a sequence of little-endian 16-bit words:
//!
//! ```text
//! word 0  bits 3-0 tens of ms | 7-4 hundreds of ms | 11-8 seconds | 14-12 tens of seconds
//! word 1  bits 3-0 minutes    | 6-4 tens of minutes | 11-8 hours  | 13-12 tens of hours
//! word 2  day of year:  bits 3-0 days | 7-4 tens of days | 9-8 hundreds of days
//!         day/month/yr: bits 3-0 days | 7-4 tens of days | 11-8 months | 12 tens of months
//! word 3  day/month/yr: bits 3-0 years | 7-4 tens | 11-8 hundreds | 13-12 thousands
//! ```

use crate::types::{DecoderError, Result, Timestamp};
use byteorder::{ByteOrder, LittleEndian};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

const DATE_FORMAT_BIT: u32 = 1 << 9;
const LEAP_YEAR_BIT: u32 = 1 << 8;

/// How the date portion of the body is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    DayOfYear,
    DayMonthYear,
}

/// Time F1 channel-specific data word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeF1Csdw {
    pub time_source: u8,
    pub time_format: u8,
    pub leap_year: bool,
    pub date_format: DateFormat,
}

impl TimeF1Csdw {
    pub fn from_u32(raw: u32) -> Self {
        Self {
            time_source: (raw & 0xF) as u8,
            time_format: ((raw >> 4) & 0xF) as u8,
            leap_year: raw & LEAP_YEAR_BIT != 0,
            date_format: if raw & DATE_FORMAT_BIT != 0 {
                DateFormat::DayMonthYear
            } else {
                DateFormat::DayOfYear
            },
        }
    }

    pub fn to_u32(&self) -> u32 {
        let mut raw = (self.time_source as u32 & 0xF) | ((self.time_format as u32 & 0xF) << 4);
        if self.leap_year {
            raw |= LEAP_YEAR_BIT;
        }
        if self.date_format == DateFormat::DayMonthYear {
            raw |= DATE_FORMAT_BIT;
        }
        raw
    }
}

/// Decoded time body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBody {
    /// Day of year (1-based) and time of day; the year is not recorded
    DayOfYear { day: u16, time: NaiveTime },
    /// Full calendar date and time
    Date(Timestamp),
}

/// A decoded time F1 packet body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeF1 {
    pub csdw: TimeF1Csdw,
    pub body: TimeBody,
}

impl TimeF1 {
    /// Time expressed as day of year, external time source
    pub fn day_of_year(day: u16, time: NaiveTime) -> Self {
        Self {
            csdw: TimeF1Csdw {
                time_source: 0,
                time_format: 0,
                leap_year: false,
                date_format: DateFormat::DayOfYear,
            },
            body: TimeBody::DayOfYear { day, time },
        }
    }

    /// Time expressed as a full calendar date
    pub fn date(timestamp: Timestamp) -> Self {
        Self {
            csdw: TimeF1Csdw {
                time_source: 0,
                time_format: 0,
                leap_year: NaiveDate::from_yo_opt(timestamp.year(), 366).is_some(),
                date_format: DateFormat::DayMonthYear,
            },
            body: TimeBody::Date(timestamp),
        }
    }

    /// Decode a time body given its CSDW
    pub fn parse(csdw: u32, body: &[u8]) -> Result<Self> {
        let csdw = TimeF1Csdw::from_u32(csdw);
        let needed = match csdw.date_format {
            DateFormat::DayOfYear => 6,
            DateFormat::DayMonthYear => 8,
        };
        if body.len() < needed {
            return Err(DecoderError::InvalidTime(format!(
                "time body needs {} bytes, got {}",
                needed,
                body.len()
            )));
        }

        let w0 = LittleEndian::read_u16(&body[0..2]);
        let w1 = LittleEndian::read_u16(&body[2..4]);
        let w2 = LittleEndian::read_u16(&body[4..6]);

        let millis = bcd(w0, 4, 4)? * 100 + bcd(w0, 0, 4)? * 10;
        let seconds = bcd(w0, 12, 3)? * 10 + bcd(w0, 8, 4)?;
        let minutes = bcd(w1, 4, 3)? * 10 + bcd(w1, 0, 4)?;
        let hours = bcd(w1, 12, 2)? * 10 + bcd(w1, 8, 4)?;
        let time = NaiveTime::from_hms_milli_opt(hours, minutes, seconds, millis).ok_or_else(
            || {
                DecoderError::InvalidTime(format!(
                    "{:02}:{:02}:{:02}.{:03} is not a valid time of day",
                    hours, minutes, seconds, millis
                ))
            },
        )?;

        let body = match csdw.date_format {
            DateFormat::DayOfYear => {
                let day = bcd(w2, 8, 2)? * 100 + bcd(w2, 4, 4)? * 10 + bcd(w2, 0, 4)?;
                if !(1..=366).contains(&day) {
                    return Err(DecoderError::InvalidTime(format!(
                        "day of year {} out of range",
                        day
                    )));
                }
                TimeBody::DayOfYear {
                    day: day as u16,
                    time,
                }
            }
            DateFormat::DayMonthYear => {
                let w3 = LittleEndian::read_u16(&body[6..8]);
                let day = bcd(w2, 4, 4)? * 10 + bcd(w2, 0, 4)?;
                let month = bcd(w2, 12, 1)? * 10 + bcd(w2, 8, 4)?;
                let year = bcd(w3, 12, 2)? * 1000
                    + bcd(w3, 8, 4)? * 100
                    + bcd(w3, 4, 4)? * 10
                    + bcd(w3, 0, 4)?;
                let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| {
                    DecoderError::InvalidTime(format!(
                        "{:04}-{:02}-{:02} is not a valid date",
                        year, month, day
                    ))
                })?;
                TimeBody::Date(date.and_time(time))
            }
        };

        Ok(Self { csdw, body })
    }

    /// Absolute time of the packet
    ///
    /// `year` is only used for day-of-year bodies, which do not record one.
    pub fn to_datetime(&self, year: i32) -> Option<Timestamp> {
        match self.body {
            TimeBody::DayOfYear { day, time } => {
                NaiveDate::from_yo_opt(year, day as u32).map(|date| date.and_time(time))
            }
            TimeBody::Date(timestamp) => Some(timestamp),
        }
    }

    /// Serialize the body (without CSDW) in BCD
    pub fn encode_body(&self) -> Vec<u8> {
        let time = match self.body {
            TimeBody::DayOfYear { time, .. } => time,
            TimeBody::Date(timestamp) => timestamp.time(),
        };
        let millis = (time.nanosecond() / 1_000_000).min(999) as u16;
        let w0 = ((millis / 100) << 4)
            | (millis / 10 % 10)
            | ((time.second() as u16 % 10) << 8)
            | ((time.second() as u16 / 10) << 12);
        let w1 = (time.minute() as u16 % 10)
            | ((time.minute() as u16 / 10) << 4)
            | ((time.hour() as u16 % 10) << 8)
            | ((time.hour() as u16 / 10) << 12);

        let mut words = vec![w0, w1];
        match self.body {
            TimeBody::DayOfYear { day, .. } => {
                words.push((day % 10) | ((day / 10 % 10) << 4) | ((day / 100) << 8));
            }
            TimeBody::Date(timestamp) => {
                let day = timestamp.day() as u16;
                let month = timestamp.month() as u16;
                let year = timestamp.year().clamp(0, 9999) as u16;
                words.push((day % 10) | ((day / 10) << 4) | ((month % 10) << 8) | ((month / 10) << 12));
                words.push(
                    (year % 10)
                        | ((year / 10 % 10) << 4)
                        | ((year / 100 % 10) << 8)
                        | ((year / 1000) << 12),
                );
            }
        }

        let mut out = vec![0u8; words.len() * 2];
        LittleEndian::write_u16_into(&words, &mut out);
        out
    }
}

/// Extract one BCD digit of `bits` width at `shift`
fn bcd(word: u16, shift: u32, bits: u32) -> Result<u32> {
    let digit = ((word >> shift) & ((1 << bits) - 1)) as u32;
    if digit > 9 {
        return Err(DecoderError::InvalidTime(format!(
            "invalid BCD digit {:X} in word 0x{:04X}",
            digit, word
        )));
    }
    Ok(digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_day_of_year() {
        // 12:34:56.780 on day 123
        let body = [0x78, 0x56, 0x34, 0x12, 0x23, 0x01];
        let time = TimeF1::parse(0, &body).unwrap();

        let expected = NaiveTime::from_hms_milli_opt(12, 34, 56, 780).unwrap();
        assert_eq!(
            time.body,
            TimeBody::DayOfYear {
                day: 123,
                time: expected
            }
        );

        let absolute = time.to_datetime(2020).unwrap();
        assert_eq!(absolute.to_string(), "2020-05-02 12:34:56.780");
    }

    #[test]
    fn test_decode_day_month_year() {
        // 2019-03-05 23:59:01.000
        let body = [0x00, 0x01, 0x59, 0x23, 0x05, 0x03, 0x19, 0x20];
        let time = TimeF1::parse(DATE_FORMAT_BIT, &body).unwrap();
        assert_eq!(time.csdw.date_format, DateFormat::DayMonthYear);
        assert_eq!(
            time.to_datetime(1970).unwrap().to_string(),
            "2019-03-05 23:59:01"
        );
    }

    #[test]
    fn test_invalid_bcd() {
        let body = [0x0A, 0x00, 0x00, 0x00, 0x01, 0x00];
        assert!(matches!(
            TimeF1::parse(0, &body),
            Err(DecoderError::InvalidTime(_))
        ));
    }

    #[test]
    fn test_short_body() {
        assert!(TimeF1::parse(DATE_FORMAT_BIT, &[0u8; 6]).is_err());
    }

    #[test]
    fn test_encode_matches_decode() {
        let timestamp = NaiveDate::from_ymd_opt(2021, 11, 30)
            .unwrap()
            .and_hms_milli_opt(7, 8, 9, 120)
            .unwrap();
        let time = TimeF1::date(timestamp);
        let parsed = TimeF1::parse(time.csdw.to_u32(), &time.encode_body()).unwrap();
        assert_eq!(parsed.to_datetime(1970), Some(timestamp));

        let doy = TimeF1::day_of_year(366, NaiveTime::from_hms_opt(1, 2, 3).unwrap());
        let parsed = TimeF1::parse(doy.csdw.to_u32(), &doy.encode_body()).unwrap();
        assert_eq!(parsed.body, doy.body);
        // day 366 does not exist in a non-leap year
        assert_eq!(parsed.to_datetime(2021), None);
    }
}
