//! Accelerometer log grammar and parser.
//!
//! This module provides the explicit line grammar ([`match_line`]) and the
//! [`LogParser`] that applies it to a whole log in one forward pass.

mod grammar;
mod parser;

pub use grammar::{match_line, LineOutcome, LogDialect, NumericFault};
pub use parser::{LineError, LogParser, ParsedLog};
