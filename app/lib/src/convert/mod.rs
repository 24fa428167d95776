//! Record data model and flat-table conversion.
//!
//! This module contains the typed records produced by the log parser, the
//! immutable [`RecordSet`] shared by all encoders, and CSV reading and
//! writing for that set.

pub mod flat;
mod record;
mod record_set;

pub use record::{Field, FieldSet, LogRecord};
pub use record_set::RecordSet;
