//! Immutable record set with an eager columnar projection.
//!
//! `RecordSet` is the single hand-off point between parsing and encoding.
//! It keeps the parsed records in their original order and, alongside them,
//! one pre-materialized vector per field. Structured backends write
//! homogeneous arrays, so the columnar copy is built once up front and shared
//! read-only by every encoder.

use crate::convert::{Field, FieldSet, LogRecord};
use crate::error::{ConvertError, Result};

/// Ordered log records plus their index-aligned columns.
///
/// Every present column has exactly [`len`](Self::len) values, in parse order.
///
/// # Examples
///
/// ```
/// use accel_convert::{LogRecord, RecordSet};
///
/// let set = RecordSet::project(vec![
///     LogRecord::new(3, 4567, 89).with_device_millis(12),
///     LogRecord::new(4, 5000, 90).with_device_millis(13),
/// ]);
///
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.counter(), &[3, 4]);
/// assert_eq!(set.millisecond(), Some(&[12, 13][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordSet {
    records: Vec<LogRecord>,
    fields: FieldSet,
    millisecond: Option<Vec<u64>>,
    counter: Vec<u32>,
    timestamp: Vec<u64>,
    acceleration: Vec<u16>,
}

impl RecordSet {
    /// Build a record set, inferring the field set from the records.
    ///
    /// The `millisecond` column is kept only when there is at least one
    /// record and every record carries a device tick.
    pub fn project(records: Vec<LogRecord>) -> Self {
        let ticked = !records.is_empty() && records.iter().all(|r| r.device_millis.is_some());
        let fields = if ticked { FieldSet::TICKED } else { FieldSet::PLAIN };
        Self::transpose(records, fields)
    }

    /// Build a record set with an explicit field set.
    ///
    /// Fails with [`ConvertError::MissingField`] if the field set requires a
    /// device tick that some record lacks. Ticks present on records are
    /// dropped from the columns when the field set excludes them.
    pub fn project_with(records: Vec<LogRecord>, fields: FieldSet) -> Result<Self> {
        if fields.device_millis {
            if let Some(index) = records.iter().position(|r| r.device_millis.is_none()) {
                return Err(ConvertError::MissingField {
                    index,
                    field: Field::Millisecond.name(),
                });
            }
        }
        Ok(Self::transpose(records, fields))
    }

    fn transpose(records: Vec<LogRecord>, fields: FieldSet) -> Self {
        let n = records.len();
        let mut millisecond = fields.device_millis.then(|| Vec::with_capacity(n));
        let mut counter = Vec::with_capacity(n);
        let mut timestamp = Vec::with_capacity(n);
        let mut acceleration = Vec::with_capacity(n);

        for record in &records {
            if let (Some(column), Some(tick)) = (millisecond.as_mut(), record.device_millis) {
                column.push(tick);
            }
            counter.push(record.counter);
            timestamp.push(record.timestamp_millis);
            acceleration.push(record.acceleration);
        }

        Self {
            records,
            fields,
            millisecond,
            counter,
            timestamp,
            acceleration,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the set has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Which optional fields are present.
    pub fn fields(&self) -> FieldSet {
        self.fields
    }

    /// Records in parse order.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Get a record by index.
    pub fn get(&self, index: usize) -> Option<&LogRecord> {
        self.records.get(index)
    }

    /// Device tick column, if the field set has one.
    pub fn millisecond(&self) -> Option<&[u64]> {
        self.millisecond.as_deref()
    }

    /// Sample counter column.
    pub fn counter(&self) -> &[u32] {
        &self.counter
    }

    /// Timestamp column in milliseconds.
    pub fn timestamp(&self) -> &[u64] {
        &self.timestamp
    }

    /// Acceleration column.
    pub fn acceleration(&self) -> &[u16] {
        &self.acceleration
    }

    /// Column names in output order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.names()
    }

    /// Lengths of all present columns, in output order.
    pub fn column_lengths(&self) -> Vec<usize> {
        let mut lengths = Vec::with_capacity(4);
        if let Some(column) = &self.millisecond {
            lengths.push(column.len());
        }
        lengths.extend([self.counter.len(), self.timestamp.len(), self.acceleration.len()]);
        lengths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticked(n: u32) -> Vec<LogRecord> {
        (0..n)
            .map(|i| LogRecord::new(i, 1000 + u64::from(i), (i * 7) as u16).with_device_millis(u64::from(i) * 10))
            .collect()
    }

    #[test]
    fn test_project_keeps_order() {
        let records = vec![
            LogRecord::new(9, 30, 1),
            LogRecord::new(2, 10, 2),
            LogRecord::new(5, 20, 3),
        ];
        let set = RecordSet::project(records.clone());
        assert_eq!(set.records(), records.as_slice());
        assert_eq!(set.counter(), &[9, 2, 5]);
        assert_eq!(set.timestamp(), &[30, 10, 20]);
        assert_eq!(set.acceleration(), &[1, 2, 3]);
    }

    #[test]
    fn test_project_infers_tick_column() {
        let set = RecordSet::project(ticked(3));
        assert_eq!(set.fields(), FieldSet::TICKED);
        assert_eq!(set.millisecond(), Some(&[0, 10, 20][..]));

        let mut mixed = ticked(2);
        mixed.push(LogRecord::new(7, 7, 7));
        let set = RecordSet::project(mixed);
        assert_eq!(set.fields(), FieldSet::PLAIN);
        assert!(set.millisecond().is_none());
    }

    #[test]
    fn test_project_empty() {
        let set = RecordSet::project(Vec::new());
        assert!(set.is_empty());
        assert_eq!(set.fields(), FieldSet::PLAIN);
        assert_eq!(set.column_lengths(), vec![0, 0, 0]);
    }

    #[test]
    fn test_project_with_empty_ticked() {
        let set = RecordSet::project_with(Vec::new(), FieldSet::TICKED).unwrap();
        assert_eq!(set.column_names(), vec!["millisecond", "counter", "timestamp", "acceleration"]);
        assert_eq!(set.column_lengths(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_project_with_missing_tick() {
        let mut records = ticked(2);
        records.push(LogRecord::new(1, 1, 1));
        let err = RecordSet::project_with(records, FieldSet::TICKED).unwrap_err();
        assert!(matches!(err, ConvertError::MissingField { index: 2, field: "millisecond" }));
    }

    #[test]
    fn test_project_with_drops_unwanted_ticks() {
        let set = RecordSet::project_with(ticked(2), FieldSet::PLAIN).unwrap();
        assert!(set.millisecond().is_none());
        assert_eq!(set.records()[1].device_millis, Some(10));
    }

    #[test]
    fn test_column_lengths_match_record_count() {
        let set = RecordSet::project(ticked(17));
        assert!(set.column_lengths().iter().all(|&len| len == set.len()));
    }
}
