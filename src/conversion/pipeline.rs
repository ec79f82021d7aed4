//! Field converter pipeline
//!
//! Inbound, raw column text goes through the field's text options (padding
//! removal, `strip-chars`, `substring`), then the blank policy or the named
//! converter. Outbound, the converter's text is returned unpadded; fitting it
//! into a column is the formatter's job.

use crate::conversion::converters::Converter;
use crate::conversion::registry::ConverterRegistry;
use crate::error::{ConverterError, FieldErrorCause};
use crate::formatter::Padding;
use crate::model::Value;
use crate::schema::{BlankPolicy, FieldDefinition};

/// Outcome of converting one raw field
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    /// Value to set; `None` leaves the property unset
    pub value: Option<Value>,
    /// Blank policy applied, when the raw text was blank
    pub default_applied: Option<BlankPolicy>,
}

/// Stateless conversion front end over a read-only registry
#[derive(Debug, Clone, Copy)]
pub struct FieldPipeline<'r> {
    registry: &'r ConverterRegistry,
}

impl<'r> FieldPipeline<'r> {
    pub fn new(registry: &'r ConverterRegistry) -> Self {
        Self { registry }
    }

    fn converter(&self, name: &str) -> Result<&'r dyn Converter, FieldErrorCause> {
        self.registry
            .get(name)
            .ok_or_else(|| FieldErrorCause::UnknownConverter(name.to_string()))
    }

    /// Convert raw field text into a value
    pub fn convert_in(&self, raw: &str, field: &FieldDefinition) -> Result<Inbound, FieldErrorCause> {
        let converter = self.converter(&field.converter)?;
        let format = field.format.as_deref();
        let text = clean(raw, field, converter.is_numeric())?;

        if is_blank(&text, converter) {
            let value = match &field.blank {
                BlankPolicy::ConverterDefault => converter.blank_default(),
                BlankPolicy::Unset => Value::Null,
                BlankPolicy::Empty => Value::Str(String::new()),
                BlankPolicy::Default(default) => converter.parse(default, format, &field.options)?,
            };
            return Ok(Inbound {
                value: (!value.is_null()).then_some(value),
                default_applied: Some(field.blank.clone()),
            });
        }

        let value = converter.parse(&text, format, &field.options)?;
        Ok(Inbound {
            value: Some(value),
            default_applied: None,
        })
    }

    /// Convert a value into unpadded field text; unset values become empty
    pub fn convert_out(&self, value: &Value, field: &FieldDefinition) -> Result<String, FieldErrorCause> {
        let converter = self.converter(&field.converter)?;
        if value.is_null() {
            return Ok(String::new());
        }
        Ok(converter.format(value, field.format.as_deref(), &field.options)?)
    }
}

fn is_blank(text: &str, converter: &dyn Converter) -> bool {
    text.is_empty() || (!converter.keeps_whitespace() && text.trim().is_empty())
}

/// Apply the inbound text options in order: padding, `strip-chars`, `substring`.
///
/// `numeric` keeps a single digit of an all-pad column.
pub fn clean(raw: &str, field: &FieldDefinition, numeric: bool) -> Result<String, ConverterError> {
    let options = &field.options;
    let mut text = match Padding::for_field(field)? {
        Some(padding) => padding.strip(raw, numeric),
        None => raw.to_string(),
    };

    if let Some(strip) = options.get("strip-chars") {
        let keep: fn(&char) -> bool = match strip.as_str() {
            "non-numeric" => |c| c.is_ascii_digit(),
            "non-alpha" => |c| c.is_alphabetic(),
            "non-alphanumeric" => |c| c.is_alphanumeric(),
            other => {
                return Err(ConverterError::invalid_option(
                    "strip-chars",
                    format!(
                        "'{}', use 'non-numeric', 'non-alpha', or 'non-alphanumeric'",
                        other
                    ),
                ))
            }
        };
        text = text.chars().filter(keep).collect();
    }

    if let Some(range) = options.get("substring") {
        let (start, end) = substring_bounds(range)?;
        text = text
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect();
    }

    Ok(text)
}

fn substring_bounds(range: &str) -> Result<(usize, usize), ConverterError> {
    let invalid = || ConverterError::invalid_option("substring", format!("'{}', expected 'start,end'", range));
    let (start, end) = range.split_once(',').ok_or_else(invalid)?;
    let start = start.trim().parse::<usize>().map_err(|_| invalid())?;
    let end = end.trim().parse::<usize>().map_err(|_| invalid())?;
    if start > end {
        return Err(invalid());
    }
    Ok((start, end))
}
