//! Record engine: matching, assembly and the reader/writer sessions
//!
//! An [`Engine`] holds only shared, read-only state (schema, converter
//! registry, target factory, configuration). Cursor position lives in the
//! [`RecordReader`] driving it, so one engine can serve any number of
//! sessions and threads at once.

use crate::conversion::assembler::{AppliedDefault, Assembler, RecordReport};
use crate::conversion::config::{EngineConfig, UnmatchedPolicy};
use crate::conversion::registry::ConverterRegistry;
use crate::conversion::stats::ParseStatistics;
use crate::error::{
    Diagnostic, EngineError, EngineResult, FieldConversionError, SchemaResult, StructuralError,
    StructuralResult, UnmatchedLine,
};
use crate::formatter::{LineSink, WriterSink};
use crate::model::{NodeFactory, RecordNode, Target, TargetFactory};
use crate::parser::{match_record, IterSource, LineCursor, LineSource, NumberedLine, ReaderSource};
use crate::schema::{RecordDefinition, Schema};
use encoding_rs::Encoding;
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};
use log::{info, warn};
use std::io::{BufReader, Read, Write};
use std::sync::Arc;
use std::time::Instant;

/// One top-level record parsed from the input
#[derive(Debug)]
pub struct ParsedRecord {
    /// Name of the matched record definition
    pub record: String,
    /// Line the record started on
    pub line_number: usize,
    /// Text of that line as read
    pub line: String,
    pub target: Box<dyn Target>,
    /// Field conversion failures, in input order
    pub errors: Vec<FieldConversionError>,
    /// Blank fields that were given a value by their blank policy
    pub defaults_applied: Vec<AppliedDefault>,
}

impl ParsedRecord {
    /// True when every field converted
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Field errors as flat diagnostics
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors.iter().map(Diagnostic::from).collect()
    }

    /// Take the target as a [`RecordNode`], if that is what the factory built
    pub fn into_node(self) -> Option<RecordNode> {
        self.target.downcast::<RecordNode>().ok().map(|node| *node)
    }
}

/// Formatted lines of one top-level record, plus its field failures
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedRecord {
    pub lines: Vec<String>,
    pub errors: Vec<FieldConversionError>,
}

/// What the reader produced for one top-level line
#[derive(Debug)]
pub enum ReadEvent {
    Record(ParsedRecord),
    /// Line skipped in lenient mode
    Unmatched(UnmatchedLine),
}

impl ReadEvent {
    pub fn into_record(self) -> Option<ParsedRecord> {
        match self {
            ReadEvent::Record(record) => Some(record),
            ReadEvent::Unmatched(_) => None,
        }
    }
}

/// Orchestrates matching, extraction, conversion and assembly
#[derive(Clone)]
pub struct Engine {
    schema: Arc<Schema>,
    registry: Arc<ConverterRegistry>,
    factory: Arc<dyn TargetFactory>,
    config: EngineConfig,
    encoding: &'static Encoding,
}

/// Line source decoding bytes of the configured encoding
pub type DecodedSource<R> = ReaderSource<BufReader<DecodeReaderBytes<R, Vec<u8>>>>;

impl Engine {
    /// Build an engine over a validated schema, producing [`RecordNode`] targets
    pub fn new(
        schema: Arc<Schema>,
        registry: Arc<ConverterRegistry>,
        config: EngineConfig,
    ) -> SchemaResult<Self> {
        config.validate()?;
        let encoding = config.text_encoding()?;
        schema.validate(&config)?;
        for unknown in schema.unknown_converters(&registry) {
            warn!(
                "Field '{}' of record '{}' uses unregistered converter '{}'",
                unknown.field, unknown.record, unknown.converter
            );
        }
        Ok(Self {
            schema,
            registry,
            factory: Arc::new(NodeFactory),
            config,
            encoding,
        })
    }

    /// Use caller-supplied targets instead of [`RecordNode`]
    pub fn with_factory(mut self, factory: Arc<dyn TargetFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn assembler(&self) -> Assembler<'_> {
        Assembler::new(&self.registry, self.factory.as_ref())
    }

    /// Parse the top-level record starting at `line`, pulling its child lines
    /// from `cursor`.
    ///
    /// Field failures are returned inside the record. Structural failures
    /// abort the record; the cursor stays after the last consumed line, so
    /// the caller may carry on with the next one.
    pub fn parse_record<S: LineSource>(
        &self,
        line: NumberedLine,
        cursor: &mut LineCursor<S>,
    ) -> EngineResult<ReadEvent> {
        let Some(record) = match_record(&line.text, &self.schema.records) else {
            return match self.config.unmatched {
                UnmatchedPolicy::Strict => Err(StructuralError::UnmatchedLine {
                    line_number: line.number,
                    line: line.text,
                }
                .into()),
                UnmatchedPolicy::Lenient => {
                    let unmatched = UnmatchedLine {
                        line_number: line.number,
                        line: line.text,
                    };
                    warn!("{}", unmatched);
                    Ok(ReadEvent::Unmatched(unmatched))
                }
            };
        };

        let mut report = RecordReport::default();
        let target = self.assembler().parse(record, &line, cursor, &mut report)?;
        Ok(ReadEvent::Record(ParsedRecord {
            record: record.name.clone(),
            line_number: line.number,
            line: line.text,
            target,
            errors: report.errors,
            defaults_applied: report.defaults_applied,
        }))
    }

    /// Format a target as `record`, children included.
    ///
    /// All lines are built before anything is returned, so a structural
    /// failure yields no partial output.
    pub fn format_record(
        &self,
        target: &dyn Target,
        record: &RecordDefinition,
    ) -> StructuralResult<FormattedRecord> {
        let mut lines = Vec::new();
        let mut report = RecordReport::default();
        self.assembler().format(record, target, &mut lines, &mut report)?;
        Ok(FormattedRecord {
            lines,
            errors: report.errors,
        })
    }

    /// Format a target as the top-level record called `name`
    pub fn format_named(&self, target: &dyn Target, name: &str) -> StructuralResult<FormattedRecord> {
        let record = self
            .schema
            .record(name)
            .ok_or_else(|| StructuralError::UnknownRecord {
                name: name.to_string(),
            })?;
        self.format_record(target, record)
    }

    /// Reader session over any line source
    pub fn reader<S: LineSource>(&self, source: S) -> RecordReader<'_, S> {
        RecordReader::new(
            self,
            LineCursor::new(source).with_skip_blank(self.config.skip_blank_lines),
        )
    }

    /// Reader session over in-memory text
    pub fn read_str<'a>(&'a self, input: &'a str) -> RecordReader<'a, IterSource<std::str::Lines<'a>>> {
        self.reader(IterSource::new(input.lines()))
    }

    /// Reader session over raw bytes in the configured encoding.
    ///
    /// A byte-order mark overrides the configured encoding. Malformed
    /// sequences decode to U+FFFD.
    pub fn read_bytes<R: Read>(&self, input: R) -> RecordReader<'_, DecodedSource<R>> {
        let decoder = DecodeReaderBytesBuilder::new()
            .encoding(Some(self.encoding))
            .strip_bom(true)
            .build(input);
        self.reader(ReaderSource::new(BufReader::new(decoder)))
    }

    /// Writer session encoding lines into `output`, each followed by the
    /// configured record separator
    pub fn write_to<W: Write>(&self, output: W) -> RecordWriter<'_, WriterSink<W>> {
        self.writer(
            WriterSink::new(output)
                .with_separator(&self.config.record_separator)
                .with_encoding(self.encoding),
        )
    }

    /// Writer session pushing lines into `sink`
    pub fn writer<K: LineSink>(&self, sink: K) -> RecordWriter<'_, K> {
        RecordWriter::new(self, sink)
    }
}

/// Pull-based parse session: one top-level record per call
pub struct RecordReader<'e, S> {
    engine: &'e Engine,
    cursor: LineCursor<S>,
    stats: ParseStatistics,
    started: Instant,
}

impl<'e, S: LineSource> RecordReader<'e, S> {
    pub fn new(engine: &'e Engine, cursor: LineCursor<S>) -> Self {
        Self {
            engine,
            cursor,
            stats: ParseStatistics::new(),
            started: Instant::now(),
        }
    }

    /// Next record or unmatched line, `None` at end of input.
    ///
    /// After an error the session can be resumed by calling again.
    pub fn next_event(&mut self) -> EngineResult<Option<ReadEvent>> {
        let Some(line) = self.cursor.next_line()? else {
            return Ok(None);
        };

        let result = self.engine.parse_record(line, &mut self.cursor);
        match &result {
            Ok(ReadEvent::Record(record)) => {
                self.stats.records_parsed += 1;
                self.stats.field_errors += record.errors.len();
            }
            Ok(ReadEvent::Unmatched(_)) => self.stats.unmatched_lines += 1,
            Err(EngineError::Structural(_)) => self.stats.structural_errors += 1,
            Err(_) => {}
        }
        result.map(Some)
    }

    /// Drain the input, stopping at the first error
    pub fn read_all(&mut self) -> EngineResult<Vec<ReadEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    /// Counters so far
    pub fn statistics(&self) -> ParseStatistics {
        let mut stats = self.stats.clone();
        stats.lines_read = self.cursor.lines_read();
        stats.finish(self.started.elapsed());
        stats
    }
}

impl<S: LineSource> Iterator for RecordReader<'_, S> {
    type Item = EngineResult<ReadEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Push-based format session writing whole records to a sink
pub struct RecordWriter<'e, K> {
    engine: &'e Engine,
    sink: K,
    stats: ParseStatistics,
}

impl<'e, K: LineSink> RecordWriter<'e, K> {
    pub fn new(engine: &'e Engine, sink: K) -> Self {
        Self {
            engine,
            sink,
            stats: ParseStatistics::new(),
        }
    }

    /// Format and push one record, returning its field failures.
    ///
    /// Nothing reaches the sink when the record fails structurally.
    pub fn write(
        &mut self,
        target: &dyn Target,
        record: &RecordDefinition,
    ) -> EngineResult<Vec<FieldConversionError>> {
        let formatted = match self.engine.format_record(target, record) {
            Ok(formatted) => formatted,
            Err(e) => {
                self.stats.structural_errors += 1;
                return Err(e.into());
            }
        };
        for line in &formatted.lines {
            self.sink.push_line(line)?;
        }
        self.stats.records_written += 1;
        self.stats.lines_written += formatted.lines.len();
        self.stats.field_errors += formatted.errors.len();
        Ok(formatted.errors)
    }

    /// Write a [`RecordNode`] as the top-level record it names
    pub fn write_node(&mut self, node: &RecordNode) -> EngineResult<Vec<FieldConversionError>> {
        let engine = self.engine;
        let record = engine
            .schema()
            .record(&node.record)
            .ok_or_else(|| StructuralError::UnknownRecord {
                name: node.record.clone(),
            })?;
        self.write(node, record)
    }

    pub fn statistics(&self) -> &ParseStatistics {
        &self.stats
    }

    pub fn into_sink(self) -> K {
        info!(
            "Wrote {} records as {} lines",
            self.stats.records_written, self.stats.lines_written
        );
        self.sink
    }
}
