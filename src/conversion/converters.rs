//! Converter contract and the built-in converters

use crate::error::ConverterError;
use crate::model::Value;
use crate::schema::ConversionOptions;
use chrono::{NaiveDate, NaiveDateTime};

/// Named, stateless bidirectional conversion between raw text and a value.
///
/// `parse(format(v))` must equal `v` for every value of the converter's
/// declared type. The reverse does not hold: padding and case may normalise.
pub trait Converter: Send + Sync {
    /// Convert trimmed raw text into a value
    fn parse(
        &self,
        raw: &str,
        format: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<Value, ConverterError>;

    /// Convert a value into raw text, before padding
    fn format(
        &self,
        value: &Value,
        format: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<String, ConverterError>;

    /// Value used for blank input under the converter-default blank policy.
    /// `Value::Null` leaves the property unset.
    fn blank_default(&self) -> Value {
        Value::Null
    }

    /// Numeric converters read a column made only of a digit pad character
    /// as that digit, so `"0000"` zero-padded is `0` rather than blank
    fn is_numeric(&self) -> bool {
        false
    }

    /// Whether whitespace-only text is a value rather than blank input
    fn keeps_whitespace(&self) -> bool {
        false
    }
}

/// Text, passed through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct TextConverter;

impl Converter for TextConverter {
    fn parse(&self, raw: &str, _: Option<&str>, _: &ConversionOptions) -> Result<Value, ConverterError> {
        Ok(Value::Str(raw.to_string()))
    }

    fn format(&self, value: &Value, _: Option<&str>, _: &ConversionOptions) -> Result<String, ConverterError> {
        Ok(match value {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn blank_default(&self) -> Value {
        Value::Str(String::new())
    }

    fn keeps_whitespace(&self) -> bool {
        true
    }
}

/// Signed 64-bit integers
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl Converter for IntegerConverter {
    fn parse(&self, raw: &str, _: Option<&str>, _: &ConversionOptions) -> Result<Value, ConverterError> {
        raw.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| ConverterError::invalid_value(raw, e))
    }

    fn format(&self, value: &Value, _: Option<&str>, _: &ConversionOptions) -> Result<String, ConverterError> {
        match value {
            Value::Int(i) => Ok(i.to_string()),
            Value::Str(s) => self
                .parse(s, None, &ConversionOptions::new())
                .map(|v| v.to_string()),
            other => Err(ConverterError::TypeMismatch {
                expected: "integer",
                found: other.type_name(),
            }),
        }
    }

    fn blank_default(&self) -> Value {
        Value::Int(0)
    }

    fn is_numeric(&self) -> bool {
        true
    }
}

/// Floating point decimals.
///
/// Options: `decimal-places` (digits after the point) and `decimal-implied`
/// (`true` when the text carries no point and the last `decimal-places`
/// digits are the fraction).
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalConverter;

impl DecimalConverter {
    fn places(options: &ConversionOptions) -> Result<Option<usize>, ConverterError> {
        options
            .get("decimal-places")
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|e| ConverterError::invalid_option("decimal-places", e))
            })
            .transpose()
    }

    fn implied(options: &ConversionOptions) -> bool {
        options
            .get("decimal-implied")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

impl Converter for DecimalConverter {
    fn parse(
        &self,
        raw: &str,
        _: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<Value, ConverterError> {
        let number = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| ConverterError::invalid_value(raw, e))?;
        if !number.is_finite() {
            return Err(ConverterError::invalid_value(raw, "not a finite number"));
        }
        match Self::places(options)? {
            Some(places) if Self::implied(options) => {
                Ok(Value::Decimal(number / 10f64.powi(places as i32)))
            }
            _ => Ok(Value::Decimal(number)),
        }
    }

    fn format(
        &self,
        value: &Value,
        _: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<String, ConverterError> {
        let number = match value {
            Value::Decimal(d) => *d,
            Value::Int(i) => *i as f64,
            other => {
                return Err(ConverterError::TypeMismatch {
                    expected: "decimal",
                    found: other.type_name(),
                })
            }
        };
        match Self::places(options)? {
            Some(places) if Self::implied(options) => {
                Ok(format!("{:.0}", number * 10f64.powi(places as i32)))
            }
            Some(places) => Ok(format!("{:.*}", places, number)),
            None => Ok(format!("{}", number)),
        }
    }

    fn blank_default(&self) -> Value {
        Value::Decimal(0.0)
    }

    fn is_numeric(&self) -> bool {
        true
    }
}

/// Booleans, with configurable `true-value` / `false-value` spellings
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl Converter for BooleanConverter {
    fn parse(
        &self,
        raw: &str,
        _: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<Value, ConverterError> {
        let text = raw.trim();
        if let Some(yes) = options.get("true-value") {
            if text.eq_ignore_ascii_case(yes) {
                return Ok(Value::Bool(true));
            }
        }
        if let Some(no) = options.get("false-value") {
            if text.eq_ignore_ascii_case(no) {
                return Ok(Value::Bool(false));
            }
        }
        match text.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
            _ => Err(ConverterError::invalid_value(raw, "not a boolean")),
        }
    }

    fn format(
        &self,
        value: &Value,
        _: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<String, ConverterError> {
        match value {
            Value::Bool(true) => Ok(options
                .get("true-value")
                .cloned()
                .unwrap_or_else(|| "true".to_string())),
            Value::Bool(false) => Ok(options
                .get("false-value")
                .cloned()
                .unwrap_or_else(|| "false".to_string())),
            other => Err(ConverterError::TypeMismatch {
                expected: "boolean",
                found: other.type_name(),
            }),
        }
    }

    fn blank_default(&self) -> Value {
        Value::Bool(false)
    }
}

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Field format string, then the `format` option, then the converter default
fn pattern<'a>(format: Option<&'a str>, options: &'a ConversionOptions, default: &'a str) -> &'a str {
    format
        .or_else(|| options.get("format").map(String::as_str))
        .unwrap_or(default)
}

/// Calendar dates using chrono `strftime` patterns
#[derive(Debug, Clone, Copy, Default)]
pub struct DateConverter;

impl Converter for DateConverter {
    fn parse(
        &self,
        raw: &str,
        format: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<Value, ConverterError> {
        let pattern = pattern(format, options, DEFAULT_DATE_FORMAT);
        NaiveDate::parse_from_str(raw.trim(), pattern)
            .map(Value::Date)
            .map_err(|e| ConverterError::invalid_value(raw, format!("{} (expected {})", e, pattern)))
    }

    fn format(
        &self,
        value: &Value,
        format: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<String, ConverterError> {
        let pattern = pattern(format, options, DEFAULT_DATE_FORMAT);
        let date = match value {
            Value::Date(d) => *d,
            // ISO text, as produced by the JSON form of a record
            Value::Str(s) => NaiveDate::parse_from_str(s, DEFAULT_DATE_FORMAT)
                .map_err(|e| ConverterError::invalid_value(s, e))?,
            other => {
                return Err(ConverterError::TypeMismatch {
                    expected: "date",
                    found: other.type_name(),
                })
            }
        };
        Ok(date.format(pattern).to_string())
    }
}

/// Timestamps without time zone using chrono `strftime` patterns
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeConverter;

impl Converter for DateTimeConverter {
    fn parse(
        &self,
        raw: &str,
        format: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<Value, ConverterError> {
        let pattern = pattern(format, options, DEFAULT_DATETIME_FORMAT);
        NaiveDateTime::parse_from_str(raw.trim(), pattern)
            .map(Value::DateTime)
            .map_err(|e| ConverterError::invalid_value(raw, format!("{} (expected {})", e, pattern)))
    }

    fn format(
        &self,
        value: &Value,
        format: Option<&str>,
        options: &ConversionOptions,
    ) -> Result<String, ConverterError> {
        let pattern = pattern(format, options, DEFAULT_DATETIME_FORMAT);
        let timestamp = match value {
            Value::DateTime(dt) => *dt,
            Value::Str(s) => s
                .parse::<NaiveDateTime>()
                .map_err(|e| ConverterError::invalid_value(s, e))?,
            other => {
                return Err(ConverterError::TypeMismatch {
                    expected: "datetime",
                    found: other.type_name(),
                })
            }
        };
        Ok(timestamp.format(pattern).to_string())
    }
}
