//! Line grammar for device accelerometer logs.
//!
//! A ticked line has the shape
//!
//! ```text
//! [I] (<tick>ms)<delim><counter><delim><seconds>[.<fraction>]<delim><acceleration>;
//! ```
//!
//! where `<delim>` is one or more non-digit bytes. Plain lines omit the
//! `(<tick>ms)` group and follow `[I]` directly with a delimiter. Matching is
//! anchored at the start of the line and stops at the `;`.
//!
//! The matcher works on bytes, so lines from other subsystems that carry
//! invalid UTF-8 are skipped like any other non-matching line. Only ASCII
//! digits count as digits.

use serde::{Deserialize, Serialize};

use crate::convert::{Field, FieldSet, LogRecord};

/// Line shape emitted by the device firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDialect {
    /// `[I] (<tick>ms) ...` lines carrying a device millisecond tick.
    #[default]
    Ticked,
    /// `[I] ...` lines without a tick.
    Plain,
}

impl LogDialect {
    /// Fields extracted by this dialect.
    pub fn field_set(&self) -> FieldSet {
        match self {
            LogDialect::Ticked => FieldSet::TICKED,
            LogDialect::Plain => FieldSet::PLAIN,
        }
    }

    /// Get the lowercase name of the dialect.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogDialect::Ticked => "ticked",
            LogDialect::Plain => "plain",
        }
    }
}

/// Result of matching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// The line is a sample.
    Record(LogRecord),
    /// The line does not have the sample shape.
    Skip,
    /// The line has the sample shape but a number does not fit its field.
    MalformedNumeric(NumericFault),
}

/// A digit group that overflowed its field width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericFault {
    /// Field the digits belong to
    pub field: Field,
    /// The digits as written in the log
    pub digits: String,
}

/// Match a single line (without its terminator) against the grammar.
///
/// # Examples
///
/// ```
/// use accel_convert::logfmt::{match_line, LineOutcome, LogDialect};
///
/// let outcome = match_line(b"[I] (12ms) 3 4.567 89;", LogDialect::Ticked);
/// match outcome {
///     LineOutcome::Record(record) => {
///         assert_eq!(record.device_millis, Some(12));
///         assert_eq!(record.timestamp_millis, 4567);
///     }
///     other => panic!("unexpected: {:?}", other),
/// }
///
/// assert_eq!(match_line(b"not a log line", LogDialect::Ticked), LineOutcome::Skip);
/// ```
pub fn match_line(line: &[u8], dialect: LogDialect) -> LineOutcome {
    match match_groups(line, dialect) {
        Some(groups) => groups.convert(),
        None => LineOutcome::Skip,
    }
}

/// Raw digit groups of a matched line.
#[derive(Debug, Clone, Copy)]
struct Groups<'a> {
    tick: Option<&'a [u8]>,
    counter: &'a [u8],
    seconds: &'a [u8],
    fraction: Option<&'a [u8]>,
    acceleration: &'a [u8],
}

impl Groups<'_> {
    fn convert(&self) -> LineOutcome {
        let device_millis = match self.tick {
            Some(digits) => match parse_u64(digits) {
                Some(tick) => Some(tick),
                None => return fault(Field::Millisecond, digits),
            },
            None => None,
        };

        let Some(counter) = parse_u64(self.counter).and_then(|v| u32::try_from(v).ok()) else {
            return fault(Field::Counter, self.counter);
        };

        let Some(timestamp_millis) = to_millis(self.seconds, self.fraction) else {
            let mut digits = String::from_utf8_lossy(self.seconds).into_owned();
            if let Some(fraction) = self.fraction {
                digits.push('.');
                digits.push_str(&String::from_utf8_lossy(fraction));
            }
            return LineOutcome::MalformedNumeric(NumericFault {
                field: Field::Timestamp,
                digits,
            });
        };

        let Some(acceleration) = parse_u64(self.acceleration).and_then(|v| u16::try_from(v).ok()) else {
            return fault(Field::Acceleration, self.acceleration);
        };

        LineOutcome::Record(LogRecord {
            device_millis,
            counter,
            timestamp_millis,
            acceleration,
        })
    }
}

fn fault(field: Field, digits: &[u8]) -> LineOutcome {
    LineOutcome::MalformedNumeric(NumericFault {
        field,
        digits: String::from_utf8_lossy(digits).into_owned(),
    })
}

fn match_groups(line: &[u8], dialect: LogDialect) -> Option<Groups<'_>> {
    let mut cursor = Cursor::new(line);
    if !cursor.literal(b"[I]") {
        return None;
    }

    let tick = match dialect {
        LogDialect::Ticked => {
            cursor.skip_whitespace();
            if !cursor.literal(b"(") {
                return None;
            }
            let tick = cursor.digits()?;
            if !cursor.literal(b"ms)") {
                return None;
            }
            Some(tick)
        }
        LogDialect::Plain => None,
    };

    if !cursor.delimiter() {
        return None;
    }
    let counter = cursor.digits()?;
    if !cursor.delimiter() {
        return None;
    }
    let seconds = cursor.digits()?;

    // Prefer the decimal reading; fall back to treating the '.' as part of
    // the next delimiter when the decimal reading leaves no valid tail.
    let after_seconds = cursor;
    if cursor.literal(b".") {
        if let Some(fraction) = cursor.digits() {
            if let Some(acceleration) = tail(&mut cursor) {
                return Some(Groups {
                    tick,
                    counter,
                    seconds,
                    fraction: Some(fraction),
                    acceleration,
                });
            }
        }
    }

    let mut cursor = after_seconds;
    let acceleration = tail(&mut cursor)?;
    Some(Groups {
        tick,
        counter,
        seconds,
        fraction: None,
        acceleration,
    })
}

/// `<delim><acceleration>;`
fn tail<'a>(cursor: &mut Cursor<'a>) -> Option<&'a [u8]> {
    if !cursor.delimiter() {
        return None;
    }
    let acceleration = cursor.digits()?;
    cursor.literal(b";").then_some(acceleration)
}

/// Forward-only byte cursor.
#[derive(Debug, Clone, Copy)]
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn literal(&mut self, lit: &[u8]) -> bool {
        if self.bytes[self.pos..].starts_with(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)) {
            self.pos += 1;
        }
    }

    /// One or more ASCII digits.
    fn digits(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let (bytes, end) = (self.bytes, self.pos);
        (end > start).then(|| &bytes[start..end])
    }

    /// One or more non-digit bytes.
    fn delimiter(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if !b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos > start
    }
}

fn parse_u64(digits: &[u8]) -> Option<u64> {
    digits.iter().try_fold(0u64, |acc, &d| {
        acc.checked_mul(10)?.checked_add(u64::from(d - b'0'))
    })
}

/// Decimal seconds to integer milliseconds, truncating past the third
/// fractional digit.
fn to_millis(seconds: &[u8], fraction: Option<&[u8]>) -> Option<u64> {
    let whole = parse_u64(seconds)?;
    let fraction = fraction.unwrap_or(&[]);
    let millis = (0..3).fold(0u64, |acc, i| {
        acc * 10 + fraction.get(i).map_or(0, |&d| u64::from(d - b'0'))
    });
    whole.checked_mul(1000)?.checked_add(millis)
}
