//! Line-by-line log parser.
//!
//! The parser makes a single forward pass over its input, reusing one line
//! buffer, so memory per line is constant and only matched records are kept.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};
use serde::Serialize;

use crate::config::ParserConfig;
use crate::convert::{Field, FieldSet, LogRecord, RecordSet};
use crate::error::{ConvertError, Result};
use crate::logfmt::grammar::{match_line, LineOutcome};

/// A matched line whose digits did not fit their field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineError {
    /// Line number (1-indexed)
    pub line: usize,
    /// Field that overflowed
    pub field: Field,
    /// The digits as written in the log
    pub digits: String,
}

impl From<LineError> for ConvertError {
    fn from(error: LineError) -> Self {
        ConvertError::NumericOverflow {
            line: error.line,
            field: error.field.name(),
            digits: error.digits,
        }
    }
}

/// Output of one parse: records in order plus line accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLog {
    records: Vec<LogRecord>,
    fields: FieldSet,
    lines: usize,
    skipped: usize,
    errors: Vec<LineError>,
}

impl ParsedLog {
    /// Matched records in line order.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Fields extracted by the dialect that produced this log.
    pub fn fields(&self) -> FieldSet {
        self.fields
    }

    /// Total number of lines read.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Number of lines that did not have the sample shape.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Lines dropped because a number overflowed.
    pub fn errors(&self) -> &[LineError] {
        &self.errors
    }

    /// Build the record set for this log.
    pub fn into_record_set(self) -> Result<RecordSet> {
        RecordSet::project_with(self.records, self.fields)
    }

    /// Split into the record set and the per-line errors.
    pub fn into_parts(self) -> Result<(RecordSet, Vec<LineError>)> {
        let set = RecordSet::project_with(self.records, self.fields)?;
        Ok((set, self.errors))
    }
}

/// Parser for device accelerometer logs.
///
/// # Examples
///
/// ```
/// use accel_convert::LogParser;
///
/// let parser = LogParser::new();
/// let log = "[I] (12ms) 3 4.567 89;\nnot a log line\n[I] (13ms) 4 5.0 90;\n";
/// let parsed = parser.parse_str(log).unwrap();
///
/// assert_eq!(parsed.records().len(), 2);
/// assert_eq!(parsed.skipped(), 1);
/// assert_eq!(parsed.records()[1].timestamp_millis, 5000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogParser {
    config: ParserConfig,
}

impl LogParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with custom settings.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Get the parser configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse log text held in memory.
    pub fn parse_str(&self, text: &str) -> Result<ParsedLog> {
        self.parse_reader(text.as_bytes())
    }

    /// Parse a log file.
    ///
    /// Failing to open or read the file yields
    /// [`ConvertError::SourceUnreadable`].
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedLog> {
        let path = path.as_ref();
        let unreadable = |source| ConvertError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unreadable)?;
        let parsed = self.parse_reader(BufReader::new(file)).map_err(|e| match e {
            ConvertError::Io(source) => unreadable(source),
            other => other,
        })?;

        debug!(
            "Parsed {}: {} records from {} lines ({} skipped, {} overflowed)",
            path.display(),
            parsed.records.len(),
            parsed.lines,
            parsed.skipped,
            parsed.errors.len()
        );
        Ok(parsed)
    }

    /// Parse from any buffered reader.
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> Result<ParsedLog> {
        let dialect = self.config.dialect;
        let mut parsed = ParsedLog {
            records: Vec::new(),
            fields: dialect.field_set(),
            lines: 0,
            skipped: 0,
            errors: Vec::new(),
        };

        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            parsed.lines += 1;

            match match_line(strip_terminator(&buf), dialect) {
                LineOutcome::Record(record) => parsed.records.push(record),
                LineOutcome::Skip => parsed.skipped += 1,
                LineOutcome::MalformedNumeric(fault) => {
                    let error = LineError {
                        line: parsed.lines,
                        field: fault.field,
                        digits: fault.digits,
                    };
                    if self.config.strict_numeric {
                        return Err(error.into());
                    }
                    warn!(
                        "Line {}: {} value {} does not fit, line dropped",
                        error.line, error.field, error.digits
                    );
                    parsed.errors.push(error);
                }
            }
        }

        Ok(parsed)
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logfmt::LogDialect;

    #[test]
    fn test_parse_scenario() {
        let log = "[I] (12ms) 3 4.567 89;\nnot a log line\n[I] (13ms) 4 5.0 90;\n";
        let parsed = LogParser::new().parse_str(log).unwrap();

        assert_eq!(parsed.lines(), 3);
        assert_eq!(parsed.skipped(), 1);
        assert!(parsed.errors().is_empty());
        assert_eq!(
            parsed.records(),
            &[
                LogRecord::new(3, 4567, 89).with_device_millis(12),
                LogRecord::new(4, 5000, 90).with_device_millis(13),
            ]
        );
    }

    #[test]
    fn test_parse_empty() {
        let parsed = LogParser::new().parse_str("").unwrap();
        assert_eq!(parsed.lines(), 0);
        assert!(parsed.records().is_empty());

        let set = parsed.into_record_set().unwrap();
        assert!(set.is_empty());
        assert_eq!(set.fields(), FieldSet::TICKED);
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let parsed = LogParser::new()
            .parse_str("[I] (1ms) 1 1.0 1;\r\n[I] (2ms) 2 2.0 2;")
            .unwrap();
        assert_eq!(parsed.records().len(), 2);
        assert_eq!(parsed.lines(), 2);
    }

    #[test]
    fn test_overflow_is_reported_not_truncated() {
        let log = "[I] (1ms) 1 1.0 1;\n[I] (2ms) 2 2.0 99999;\n[I] (3ms) 3 3.0 3;\n";
        let parsed = LogParser::new().parse_str(log).unwrap();

        assert_eq!(parsed.records().len(), 2);
        assert_eq!(parsed.skipped(), 0);
        assert_eq!(
            parsed.errors(),
            &[LineError {
                line: 2,
                field: Field::Acceleration,
                digits: "99999".to_string(),
            }]
        );
    }

    #[test]
    fn test_strict_overflow_aborts() {
        let parser = LogParser::with_config(ParserConfig::new().with_strict_numeric(true));
        let err = parser
            .parse_str("[I] (1ms) 1 1.0 1;\n[I] (2ms) 2 2.0 99999;\n")
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::NumericOverflow { line: 2, field: "acceleration", .. }
        ));
    }

    #[test]
    fn test_plain_dialect_field_set() {
        let parser = LogParser::with_config(ParserConfig::new().with_dialect(LogDialect::Plain));
        let parsed = parser.parse_str("[I] 3 4.567 89;\n").unwrap();
        assert_eq!(parsed.fields(), FieldSet::PLAIN);
        assert_eq!(parsed.records(), &[LogRecord::new(3, 4567, 89)]);
    }

    #[test]
    fn test_non_utf8_lines_do_not_abort() {
        let mut bytes = b"[I] (1ms) 1 1.0 1;\n".to_vec();
        bytes.extend_from_slice(&[0xc3, 0x28, b'\n']);
        bytes.extend_from_slice(b"[I] (2ms) 2 2.0 2;\n");
        let parsed = LogParser::new().parse_reader(bytes.as_slice()).unwrap();
        assert_eq!(parsed.records().len(), 2);
        assert_eq!(parsed.skipped(), 1);
    }

    #[test]
    fn test_missing_file_is_source_unreadable() {
        let err = LogParser::new()
            .parse_file("/definitely/not/here/Log.txt")
            .unwrap_err();
        assert!(matches!(err, ConvertError::SourceUnreadable { .. }));
        assert!(err.is_fatal_to_run());
    }
}
