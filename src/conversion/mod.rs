//! Record conversion module
//!
//! This module contains the converters, the field pipeline, the segment
//! assembler, the engine that drives them, and its configuration and
//! statistics.

pub mod assembler;
pub mod config;
pub mod converters;
pub mod engine;
pub mod pipeline;
pub mod registry;
pub mod stats;

pub use assembler::{AppliedDefault, Assembler, RecordReport};
pub use config::{EngineConfig, UnmatchedPolicy};
pub use converters::{
    BooleanConverter, Converter, DateConverter, DateTimeConverter, DecimalConverter,
    IntegerConverter, TextConverter,
};
pub use engine::{DecodedSource, Engine, FormattedRecord, ParsedRecord, ReadEvent, RecordReader, RecordWriter};
pub use pipeline::{FieldPipeline, Inbound};
pub use registry::ConverterRegistry;
pub use stats::ParseStatistics;
