//! Schema validation, run once when an engine is built

use crate::conversion::{ConverterRegistry, EngineConfig};
use crate::error::{SchemaError, SchemaResult};
use crate::schema::{Extraction, IdentityRule, Layout, LineShape, RecordDefinition, Schema};
use std::collections::HashSet;

/// A field naming a converter the registry does not know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConverter {
    pub record: String,
    pub field: String,
    pub converter: String,
}

impl Schema {
    /// Check the schema for structural consistency.
    ///
    /// Converter names are not checked here; see [`Schema::unknown_converters`].
    pub fn validate(&self, config: &EngineConfig) -> SchemaResult<()> {
        if self.records.is_empty() {
            return Err(SchemaError::Configuration(
                "schema declares no record definitions".to_string(),
            ));
        }
        check_unique(
            self.records.iter().map(|r| r.name.as_str()),
            |name| SchemaError::record(name, "record name declared twice at top level"),
        )?;
        for record in &self.records {
            validate_record(record, config, 1)?;
        }
        Ok(())
    }

    /// Property-bound fields whose converter is not registered, depth first
    pub fn unknown_converters(&self, registry: &ConverterRegistry) -> Vec<UnknownConverter> {
        let mut unknown = Vec::new();
        for record in &self.records {
            collect_unknown(record, registry, &mut unknown);
        }
        unknown
    }
}

fn collect_unknown(record: &RecordDefinition, registry: &ConverterRegistry, out: &mut Vec<UnknownConverter>) {
    for field in record.all_fields() {
        if field.property().is_some() && !registry.contains(&field.converter) {
            out.push(UnknownConverter {
                record: record.name.clone(),
                field: field.name.clone(),
                converter: field.converter.clone(),
            });
        }
    }
    for segment in &record.segments {
        collect_unknown(&segment.record, registry, out);
    }
}

fn check_unique<'a, I, E>(names: I, error: E) -> SchemaResult<()>
where
    I: IntoIterator<Item = &'a str>,
    E: Fn(&str) -> SchemaError,
{
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(error(name));
        }
    }
    Ok(())
}

fn validate_record(record: &RecordDefinition, config: &EngineConfig, depth: usize) -> SchemaResult<()> {
    let name = record.name.as_str();
    if name.trim().is_empty() {
        return Err(SchemaError::Configuration(
            "record definition without a name".to_string(),
        ));
    }
    if depth > config.max_depth {
        return Err(SchemaError::record(
            name,
            format!(
                "segment nesting depth {} exceeds the maximum of {}",
                depth, config.max_depth
            ),
        ));
    }

    check_unique(record.all_fields().map(|f| f.name.as_str()), |field| {
        SchemaError::field(name, field, "field name declared twice")
    })?;

    validate_line(record.first_line())?;
    let mut identified_seen = false;
    for line in &record.lines {
        if line.fields.is_empty() {
            return Err(SchemaError::record(name, "continuation line without fields"));
        }
        if line.is_identified() {
            identified_seen = true;
        } else if identified_seen {
            return Err(SchemaError::record(
                name,
                "continuation line without identity rules follows an identified line",
            ));
        } else if line.record_end {
            return Err(SchemaError::record(
                name,
                "only a line with identity rules can end a record",
            ));
        }
        validate_line(line.shape(name))?;
    }

    check_unique(record.segments.iter().map(|s| s.property.as_str()), |property| {
        SchemaError::segment(name, property, "segment property declared twice")
    })?;
    check_unique(
        record.segments.iter().map(|s| s.record.name.as_str()),
        |child| SchemaError::record(name, format!("child record '{}' declared twice", child)),
    )?;

    for segment in &record.segments {
        if let Some(max) = segment.max {
            if segment.min > max {
                return Err(SchemaError::segment(
                    name,
                    &segment.property,
                    format!("min {} exceeds max {}", segment.min, max),
                ));
            }
        }
        if segment.record.identity.is_empty() {
            return Err(SchemaError::segment(
                name,
                &segment.property,
                "child record must declare at least one identity rule",
            ));
        }
        validate_record(&segment.record, config, depth + 1)?;
    }

    Ok(())
}

/// Layout, extraction and identity checks shared by every line of a record
fn validate_line(line: LineShape<'_>) -> SchemaResult<()> {
    let name = line.record;
    if let Layout::Delimited { delimiter, quote } = line.layout {
        if quote == Some(delimiter) {
            return Err(SchemaError::record(
                name,
                "quote character must differ from the delimiter",
            ));
        }
    }

    for field in line.fields {
        match (field.extract, line.layout) {
            (Extraction::Column { length: 0, .. }, Layout::Fixed) => {
                return Err(SchemaError::field(name, &field.name, "length must be greater than 0"));
            }
            (Extraction::Column { .. }, Layout::Fixed)
            | (Extraction::Token { .. }, Layout::Delimited { .. }) => {}
            (Extraction::Column { .. }, Layout::Delimited { .. }) => {
                return Err(SchemaError::field(
                    name,
                    &field.name,
                    "column extraction in a delimited record",
                ));
            }
            (Extraction::Token { .. }, Layout::Fixed) => {
                return Err(SchemaError::field(
                    name,
                    &field.name,
                    "token extraction in a fixed-width record",
                ));
            }
        }
    }

    for rule in line.identity {
        match rule {
            IdentityRule::Literal { values, .. } if values.iter().all(String::is_empty) => {
                return Err(SchemaError::record(name, "literal identity rule without values"));
            }
            IdentityRule::Token { .. } if line.layout == Layout::Fixed => {
                return Err(SchemaError::record(
                    name,
                    "token identity rule on a fixed-width record",
                ));
            }
            IdentityRule::Length { min, max: Some(max) } if min > max => {
                return Err(SchemaError::record(
                    name,
                    format!("length identity rule with min {} above max {}", min, max),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
