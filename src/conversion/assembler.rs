//! Segment assembler: recursive descent over record definitions
//!
//! Parsing reads a record's own lines first (the identifying line, its
//! sequential continuation lines, then any identified continuation lines),
//! and then pulls child lines from the cursor while they identify as the
//! current segment's record, up to its maximum. The first non-matching line
//! is left for the outer level. Formatting walks child collections in
//! declaration order and checks each collection's size before any of its
//! lines are emitted.

use crate::conversion::pipeline::FieldPipeline;
use crate::conversion::registry::ConverterRegistry;
use crate::error::{EngineResult, FieldConversionError, FieldErrorCause, StructuralError, StructuralResult};
use crate::formatter::{join_delimited, FixedLine, Padding, QuoteEngine};
use crate::model::{Target, TargetFactory};
use crate::parser::{extract_line, identifies, rules_accept, LineCursor, LineSource, NumberedLine};
use crate::schema::{
    BlankPolicy, Binding, Extraction, FieldDefinition, Layout, LineDefinition, LineShape, RecordDefinition,
};
use log::{debug, warn};

/// A blank field that received a value from its blank policy
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDefault {
    pub record: String,
    pub field: String,
    pub policy: BlankPolicy,
    pub line_number: Option<usize>,
}

/// Non-fatal outcomes collected while assembling one top-level record
#[derive(Debug, Default)]
pub struct RecordReport {
    pub errors: Vec<FieldConversionError>,
    pub defaults_applied: Vec<AppliedDefault>,
}

impl RecordReport {
    fn field_error(
        &mut self,
        record: &str,
        field: &FieldDefinition,
        raw: &str,
        line_number: Option<usize>,
        cause: FieldErrorCause,
    ) {
        let mut error = FieldConversionError::new(record, &field.name, raw, &field.converter, cause);
        error.line_number = line_number;
        debug!("{}", error);
        self.errors.push(error);
    }
}

/// Recursive parser and formatter over one record definition tree
pub struct Assembler<'e> {
    pipeline: FieldPipeline<'e>,
    factory: &'e dyn TargetFactory,
}

impl<'e> Assembler<'e> {
    pub fn new(registry: &'e ConverterRegistry, factory: &'e dyn TargetFactory) -> Self {
        Self {
            pipeline: FieldPipeline::new(registry),
            factory,
        }
    }

    /// Parse `line` as `record`, read its continuation lines and assemble its
    /// segments from the cursor
    pub fn parse<S: LineSource>(
        &self,
        record: &RecordDefinition,
        line: &NumberedLine,
        cursor: &mut LineCursor<S>,
        report: &mut RecordReport,
    ) -> EngineResult<Box<dyn Target>> {
        let mut target = self
            .factory
            .create(record)
            .map_err(|e| StructuralError::property(&record.name, e))?;
        self.read_fields(record.first_line(), line, target.as_mut(), report)?;
        self.read_continuation(record, line, cursor, target.as_mut(), report)?;

        for segment in &record.segments {
            let mut count = 0;
            while segment.max.map_or(true, |max| count < max) {
                let Some(next) = cursor.peek()? else {
                    break;
                };
                if !identifies(&segment.record, &next.text) {
                    break;
                }
                let Some(child_line) = cursor.next_line()? else {
                    break;
                };
                let child = self.parse(&segment.record, &child_line, cursor, report)?;
                target
                    .add_child(&segment.property, child)
                    .map_err(|e| StructuralError::property(&record.name, e))?;
                count += 1;
            }

            if count < segment.min {
                let error = StructuralError::cardinality(
                    &record.name,
                    &segment.property,
                    segment.min,
                    segment.max,
                    count,
                )
                .at_line(line.number);
                warn!("{}", error);
                return Err(error.into());
            }
        }

        Ok(target)
    }

    fn read_continuation<S: LineSource>(
        &self,
        record: &RecordDefinition,
        first: &NumberedLine,
        cursor: &mut LineCursor<S>,
        target: &mut dyn Target,
        report: &mut RecordReport,
    ) -> EngineResult<()> {
        let expected = 1 + record.sequential_lines().count();
        for (read, definition) in record.sequential_lines().enumerate() {
            let Some(next) = cursor.next_line()? else {
                return Err(StructuralError::incomplete(&record.name, expected, read + 1)
                    .at_line(first.number)
                    .into());
            };
            self.read_fields(definition.shape(&record.name), &next, target, report)?;
        }

        let identified: Vec<&LineDefinition> = record.identified_lines().collect();
        while !identified.is_empty() {
            let Some(next) = cursor.peek()? else {
                break;
            };
            let Some(definition) = identified
                .iter()
                .copied()
                .find(|d| rules_accept(&d.identity, d.layout, &next.text))
            else {
                break;
            };
            let Some(next) = cursor.next_line()? else {
                break;
            };
            self.read_fields(definition.shape(&record.name), &next, target, report)?;
            if definition.record_end {
                break;
            }
        }
        Ok(())
    }

    fn read_fields(
        &self,
        shape: LineShape<'_>,
        line: &NumberedLine,
        target: &mut dyn Target,
        report: &mut RecordReport,
    ) -> StructuralResult<()> {
        let raw = extract_line(&line.text, shape).map_err(|e| e.at_line(line.number))?;

        for (field, raw) in shape.fields.iter().zip(&raw) {
            let Some(property) = field.property() else {
                continue;
            };
            match self.pipeline.convert_in(raw, field) {
                Ok(inbound) => {
                    if let Some(policy) = inbound.default_applied {
                        report.defaults_applied.push(AppliedDefault {
                            record: shape.record.to_string(),
                            field: field.name.clone(),
                            policy,
                            line_number: Some(line.number),
                        });
                    }
                    if let Some(value) = inbound.value {
                        if let Err(e) = target.set_property(property, value) {
                            report.field_error(shape.record, field, raw, Some(line.number), e.into());
                        }
                    }
                }
                Err(cause) => report.field_error(shape.record, field, raw, Some(line.number), cause),
            }
        }
        Ok(())
    }

    /// Format `target` and its children as `record`, appending to `lines`.
    ///
    /// Sequential continuation lines are always written. An identified line
    /// is written when it binds no property or at least one of its
    /// properties is set.
    pub fn format(
        &self,
        record: &RecordDefinition,
        target: &dyn Target,
        lines: &mut Vec<String>,
        report: &mut RecordReport,
    ) -> StructuralResult<()> {
        lines.push(self.write_line(record.first_line(), target, report));
        for definition in &record.lines {
            if !definition.is_identified() || has_values(&definition.fields, target) {
                lines.push(self.write_line(definition.shape(&record.name), target, report));
            }
        }

        for segment in &record.segments {
            let children = target
                .children(&segment.property)
                .map_err(|e| StructuralError::property(&record.name, e))?;
            if !segment.accepts(children.len()) {
                let error = StructuralError::cardinality(
                    &record.name,
                    &segment.property,
                    segment.min,
                    segment.max,
                    children.len(),
                );
                warn!("{}", error);
                return Err(error);
            }
            for child in children {
                self.format(&segment.record, child, lines, report)?;
            }
        }
        Ok(())
    }

    fn write_line(&self, shape: LineShape<'_>, target: &dyn Target, report: &mut RecordReport) -> String {
        match shape.layout {
            Layout::Fixed => {
                let mut line = FixedLine::new(shape.line_width());
                for field in shape.fields {
                    let Extraction::Column { start, length } = field.extract else {
                        continue;
                    };
                    let cell = self.field_text(field, target).and_then(|text| match text {
                        Some(text) => {
                            let padding = Padding::for_field(field)
                                .map_err(|e| (text.clone(), FieldErrorCause::from(e)))?
                                .unwrap_or_default();
                            Ok(Some(padding.fit(&text, length)))
                        }
                        None => Ok(None),
                    });
                    match cell {
                        Ok(Some((cell, truncated))) => {
                            if truncated {
                                warn!(
                                    "Value of field '{}' in record '{}' truncated to {} characters",
                                    field.name, shape.record, length
                                );
                            }
                            line.place(start, &cell);
                        }
                        Ok(None) => {}
                        Err((raw, cause)) => report.field_error(shape.record, field, &raw, None, cause),
                    }
                }
                line.finish()
            }
            Layout::Delimited { delimiter, quote } => {
                let quotes = QuoteEngine::new(delimiter, quote);
                let count = shape
                    .fields
                    .iter()
                    .filter_map(|f| match f.extract {
                        Extraction::Token { index } => Some(index + 1),
                        Extraction::Column { .. } => None,
                    })
                    .max()
                    .unwrap_or(0);
                let mut tokens = vec![String::new(); count];
                for field in shape.fields {
                    let Extraction::Token { index } = field.extract else {
                        continue;
                    };
                    let token = self.field_text(field, target).and_then(|text| {
                        let text = text.unwrap_or_default();
                        quotes
                            .format(&text)
                            .map_err(|e| (text.clone(), FieldErrorCause::from(e)))
                    });
                    match token {
                        Ok(token) => tokens[index] = token,
                        Err((raw, cause)) => report.field_error(shape.record, field, &raw, None, cause),
                    }
                }
                join_delimited(&tokens, delimiter)
            }
        }
    }

    /// Unpadded output text of one field, `None` for a column left blank.
    /// The error carries the offending value.
    fn field_text(
        &self,
        field: &FieldDefinition,
        target: &dyn Target,
    ) -> Result<Option<String>, (String, FieldErrorCause)> {
        let property = match &field.binding {
            Binding::Literal(text) => return Ok(Some(text.clone())),
            Binding::Ignore => return Ok(None),
            Binding::Field => field.name.as_str(),
            Binding::Property(name) => name.as_str(),
        };
        let value = target
            .property(property)
            .map_err(|e| (String::new(), FieldErrorCause::from(e)))?;
        if value.is_null() {
            return Ok(None);
        }
        self.pipeline
            .convert_out(&value, field)
            .map(Some)
            .map_err(|cause| (value.to_string(), cause))
    }
}

/// Whether any property bound by `fields` holds a value; true when none is bound
fn has_values(fields: &[FieldDefinition], target: &dyn Target) -> bool {
    let mut properties = fields.iter().filter_map(FieldDefinition::property).peekable();
    if properties.peek().is_none() {
        return true;
    }
    properties.any(|property| target.property(property).map_or(true, |value| !value.is_null()))
}
