//! Flat table (CSV) writing and reading.
//!
//! The writer emits one header row followed by one row per record, with
//! `\n` terminators on every platform. The reader accepts exactly the tables
//! the writer produces and rebuilds an equal [`RecordSet`].

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::convert::{Field, FieldSet, LogRecord, RecordSet};
use crate::error::{ConvertError, Result};

/// Write a record set as CSV.
///
/// # Examples
///
/// ```
/// use accel_convert::{LogRecord, RecordSet};
/// use accel_convert::convert::flat::write_flat_table;
///
/// let set = RecordSet::project(vec![LogRecord::new(3, 4567, 89).with_device_millis(12)]);
/// let mut out = Vec::new();
/// write_flat_table(&set, &mut out).unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "millisecond,counter,timestamp,acceleration\n12,3,4567,89\n"
/// );
/// ```
pub fn write_flat_table<W: Write>(set: &RecordSet, writer: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    writer.write_record(set.column_names())?;

    let ticks = set.millisecond();
    let mut row: Vec<String> = Vec::with_capacity(4);
    for (index, record) in set.records().iter().enumerate() {
        row.clear();
        if let Some(ticks) = ticks {
            row.push(ticks[index].to_string());
        }
        row.push(record.counter.to_string());
        row.push(record.timestamp_millis.to_string());
        row.push(record.acceleration.to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a CSV produced by [`write_flat_table`] back into a record set.
pub fn read_flat_table<R: Read>(reader: R) -> Result<RecordSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let names: Vec<&str> = headers.iter().collect();
    let fields = if names == FieldSet::TICKED.names() {
        FieldSet::TICKED
    } else if names == FieldSet::PLAIN.names() {
        FieldSet::PLAIN
    } else {
        return Err(ConvertError::InvalidFlatTable {
            line: 1,
            message: format!("unexpected header: {}", names.join(",")),
        });
    };

    let mut records = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let line = row_idx + 2; // +2 because line 1 is the header
        let row = result?;
        let mut cells = row.iter();
        let device_millis = if fields.device_millis {
            Some(parse_cell::<u64>(cells.next(), Field::Millisecond, line)?)
        } else {
            None
        };
        let counter = parse_cell::<u32>(cells.next(), Field::Counter, line)?;
        let timestamp_millis = parse_cell::<u64>(cells.next(), Field::Timestamp, line)?;
        let acceleration = parse_cell::<u16>(cells.next(), Field::Acceleration, line)?;

        records.push(LogRecord {
            device_millis,
            counter,
            timestamp_millis,
            acceleration,
        });
    }

    RecordSet::project_with(records, fields)
}

/// Read a flat table from a file.
pub fn read_flat_table_path<P: AsRef<Path>>(path: P) -> Result<RecordSet> {
    let file = File::open(path)?;
    read_flat_table(BufReader::new(file))
}

fn parse_cell<T: std::str::FromStr>(cell: Option<&str>, field: Field, line: usize) -> Result<T> {
    let cell = cell.ok_or_else(|| ConvertError::InvalidFlatTable {
        line,
        message: format!("missing {} cell", field),
    })?;
    cell.trim().parse().map_err(|_| ConvertError::InvalidFlatTable {
        line,
        message: format!("{} cell {:?} is not a valid number", field, cell),
    })
}
