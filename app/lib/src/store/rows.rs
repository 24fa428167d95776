//! Physical row types of the structured outputs.

use std::fmt;

use serde::Serialize;

/// Element type of one stored column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 64-bit integer
    UInt64,
    /// 64-bit float
    Float64,
}

impl FieldType {
    /// Type name as used in error messages, e.g. `uint8`.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::UInt8 => "uint8",
            FieldType::UInt16 => "uint16",
            FieldType::UInt64 => "uint64",
            FieldType::Float64 => "float64",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name and element type of one column of a row schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    /// Column name
    pub name: &'static str,
    /// Element type
    pub ty: FieldType,
}

const fn column(name: &'static str, ty: FieldType) -> ColumnSpec {
    ColumnSpec { name, ty }
}

/// One value read back from a row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Integer value
    Int(i64),
    /// Unsigned value
    UInt(u64),
    /// Float value
    Float(f64),
}

/// Wide columnar row with the device tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WideTickedRow {
    /// Device tick in milliseconds
    pub millisecond: i32,
    /// Sample counter
    pub counter: i32,
    /// Timestamp in seconds
    pub timestamp: f64,
    /// Acceleration value
    pub acceleration: i32,
}

/// Wide columnar row without the device tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WideRow {
    /// Sample counter
    pub counter: i32,
    /// Timestamp in seconds
    pub timestamp: f64,
    /// Acceleration value
    pub acceleration: i32,
}

/// Narrow row shared by the narrow columnar layout and the row table.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrowRow {
    /// Sample counter
    pub counter: u8,
    /// Timestamp in milliseconds
    pub timestamp: u64,
    /// Acceleration value
    pub acceleration: u16,
}

const WIDE_TICKED_SCHEMA: &[ColumnSpec] = &[
    column("millisecond", FieldType::Int32),
    column("counter", FieldType::Int32),
    column("timestamp", FieldType::Float64),
    column("acceleration", FieldType::Int32),
];

const WIDE_SCHEMA: &[ColumnSpec] = &[
    column("counter", FieldType::Int32),
    column("timestamp", FieldType::Float64),
    column("acceleration", FieldType::Int32),
];

const NARROW_SCHEMA: &[ColumnSpec] = &[
    column("counter", FieldType::UInt8),
    column("timestamp", FieldType::UInt64),
    column("acceleration", FieldType::UInt16),
];

/// A block of rows sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub enum RowBlock {
    /// Wide rows with the device tick
    WideTicked(Vec<WideTickedRow>),
    /// Wide rows without the device tick
    Wide(Vec<WideRow>),
    /// Narrow rows
    Narrow(Vec<NarrowRow>),
}

impl RowBlock {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            RowBlock::WideTicked(rows) => rows.len(),
            RowBlock::Wide(rows) => rows.len(),
            RowBlock::Narrow(rows) => rows.len(),
        }
    }

    /// Check whether the block has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Columns of the row type, in storage order.
    pub fn schema(&self) -> &'static [ColumnSpec] {
        match self {
            RowBlock::WideTicked(_) => WIDE_TICKED_SCHEMA,
            RowBlock::Wide(_) => WIDE_SCHEMA,
            RowBlock::Narrow(_) => NARROW_SCHEMA,
        }
    }

    /// Values of row `index` in schema order.
    pub fn row(&self, index: usize) -> Option<Vec<Scalar>> {
        match self {
            RowBlock::WideTicked(rows) => rows.get(index).map(|r| {
                vec![
                    Scalar::Int(r.millisecond.into()),
                    Scalar::Int(r.counter.into()),
                    Scalar::Float(r.timestamp),
                    Scalar::Int(r.acceleration.into()),
                ]
            }),
            RowBlock::Wide(rows) => rows.get(index).map(|r| {
                vec![
                    Scalar::Int(r.counter.into()),
                    Scalar::Float(r.timestamp),
                    Scalar::Int(r.acceleration.into()),
                ]
            }),
            RowBlock::Narrow(rows) => rows.get(index).map(|r| {
                vec![
                    Scalar::UInt(r.counter.into()),
                    Scalar::UInt(r.timestamp),
                    Scalar::UInt(r.acceleration.into()),
                ]
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas() {
        let names: Vec<&str> = RowBlock::WideTicked(Vec::new()).schema().iter().map(|c| c.name).collect();
        assert_eq!(names, ["millisecond", "counter", "timestamp", "acceleration"]);
        assert_eq!(RowBlock::Narrow(Vec::new()).schema()[0].ty, FieldType::UInt8);
    }

    #[test]
    fn test_row_values() {
        let block = RowBlock::Narrow(vec![NarrowRow { counter: 3, timestamp: 4567, acceleration: 89 }]);
        assert_eq!(block.len(), 1);
        assert_eq!(
            block.row(0),
            Some(vec![Scalar::UInt(3), Scalar::UInt(4567), Scalar::UInt(89)])
        );
        assert_eq!(block.row(1), None);
    }
}
