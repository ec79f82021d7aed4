//! Input side: line sources, token extraction and record identification

pub mod matcher;
pub mod source;
pub mod tokens;

pub use matcher::{identifies, match_record, rules_accept};
pub use source::{IterSource, LineCursor, LineSource, NumberedLine, ReaderSource};
pub use tokens::{extract, extract_line, split_delimited, DelimitedTokens};
