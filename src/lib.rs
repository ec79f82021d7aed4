//! Flat-file record engine
//!
//! Parses fixed-width and delimited text lines into typed object graphs, and
//! formats object graphs back into lines, driven by a declarative schema of
//! record, field and segment definitions.

pub mod cli;
pub mod conversion;
pub mod error;
pub mod formatter;
pub mod model;
pub mod parser;
pub mod schema;

// Re-export commonly used types
pub use conversion::{
    Converter, ConverterRegistry, Engine, EngineConfig, FormattedRecord, ParseStatistics,
    ParsedRecord, ReadEvent, RecordReader, RecordWriter, UnmatchedPolicy,
};
pub use error::{
    Diagnostic, EngineError, EngineResult, FieldConversionError, SchemaError, StructuralError,
    UnmatchedLine,
};
pub use model::{NodeFactory, RecordNode, Target, TargetFactory, Value};
pub use parser::{LineCursor, LineSource};
pub use schema::{
    BlankPolicy, FieldDefinition, IdentityRule, Layout, LineDefinition, RecordDefinition, Schema,
    SegmentDefinition,
};

use std::sync::Arc;

/// Parse in-memory text into record nodes with the built-in converters.
///
/// Stops at the first structural error; unmatched lines fail unless `config`
/// is lenient, in which case they are dropped.
pub fn parse_str(schema: Schema, input: &str, config: EngineConfig) -> EngineResult<Vec<RecordNode>> {
    let engine = Engine::new(
        Arc::new(schema),
        Arc::new(ConverterRegistry::with_builtins()),
        config,
    )?;
    let events = engine.read_str(input).read_all()?;
    Ok(events
        .into_iter()
        .filter_map(ReadEvent::into_record)
        .filter_map(ParsedRecord::into_node)
        .collect())
}
