//! Parsed log records and the field vocabulary shared by every output.

use serde::{Deserialize, Serialize};

/// One accelerometer sample parsed from a log line.
///
/// # Examples
///
/// ```
/// use accel_convert::LogRecord;
///
/// let record = LogRecord::new(3, 4567, 89).with_device_millis(12);
/// assert_eq!(record.device_millis, Some(12));
/// assert_eq!(record.timestamp_millis, 4567);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogRecord {
    /// Device-local millisecond tick, present only in ticked logs.
    pub device_millis: Option<u64>,
    /// Sample index as emitted by the device. Gaps and resets are kept.
    pub counter: u32,
    /// Capture timestamp in integer milliseconds.
    pub timestamp_millis: u64,
    /// Raw ADC reading.
    pub acceleration: u16,
}

impl LogRecord {
    /// Create a record without a device tick.
    pub fn new(counter: u32, timestamp_millis: u64, acceleration: u16) -> Self {
        Self {
            device_millis: None,
            counter,
            timestamp_millis,
            acceleration,
        }
    }

    /// Attach a device tick.
    pub fn with_device_millis(mut self, millis: u64) -> Self {
        self.device_millis = Some(millis);
        self
    }
}

/// A named field of a log record.
///
/// The declaration order is the fixed output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Device millisecond tick
    Millisecond,
    /// Sample counter
    Counter,
    /// Capture timestamp
    Timestamp,
    /// Acceleration reading
    Acceleration,
}

impl Field {
    /// Column name used in every output format.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Millisecond => "millisecond",
            Field::Counter => "counter",
            Field::Timestamp => "timestamp",
            Field::Acceleration => "acceleration",
        }
    }

    /// Look a field up by its column name.
    pub fn from_name(name: &str) -> Option<Field> {
        match name {
            "millisecond" => Some(Field::Millisecond),
            "counter" => Some(Field::Counter),
            "timestamp" => Some(Field::Timestamp),
            "acceleration" => Some(Field::Acceleration),
            _ => None,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which optional fields a record set carries.
///
/// Only the device tick is optional; the other three fields are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FieldSet {
    /// Whether the `millisecond` column exists.
    pub device_millis: bool,
}

impl FieldSet {
    /// Field set of logs that print the device tick.
    pub const TICKED: FieldSet = FieldSet {
        device_millis: true,
    };

    /// Field set of logs without a device tick.
    pub const PLAIN: FieldSet = FieldSet {
        device_millis: false,
    };

    /// Fields in output order.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::with_capacity(4);
        if self.device_millis {
            fields.push(Field::Millisecond);
        }
        fields.extend([Field::Counter, Field::Timestamp, Field::Acceleration]);
        fields
    }

    /// Column names in output order.
    pub fn names(&self) -> Vec<&'static str> {
        self.fields().iter().map(Field::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order() {
        assert_eq!(
            FieldSet::TICKED.names(),
            vec!["millisecond", "counter", "timestamp", "acceleration"]
        );
        assert_eq!(FieldSet::PLAIN.names(), vec!["counter", "timestamp", "acceleration"]);
    }

    #[test]
    fn test_field_name_lookup() {
        for field in FieldSet::TICKED.fields() {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("Counter"), None);
    }

    #[test]
    fn test_record_builder() {
        let record = LogRecord::new(1, 2, 3);
        assert_eq!(record.device_millis, None);
        assert_eq!(record.with_device_millis(9).device_millis, Some(9));
    }
}
