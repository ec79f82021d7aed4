//! Error types and handling infrastructure for flat-file record conversion

use std::fmt;

/// Structural failures: always fatal to the record currently being assembled
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuralError {
    #[error(
        "Line too short for field '{field}' of record '{record}': needs {required} characters, line has {actual}{}",
        at_line(.line_number)
    )]
    LineTooShort {
        record: String,
        field: String,
        required: usize,
        actual: usize,
        line_number: Option<usize>,
    },

    #[error(
        "Missing token for required field '{field}' of record '{record}': expected index {index}, line has {tokens} tokens{}",
        at_line(.line_number)
    )]
    DelimiterCountMismatch {
        record: String,
        field: String,
        index: usize,
        tokens: usize,
        line_number: Option<usize>,
    },

    #[error("No record definition matches line {line_number}: {line}")]
    UnmatchedLine { line_number: usize, line: String },

    #[error(
        "Record '{record}' spans {expected} lines but input ended after {found}{}",
        at_line(.line_number)
    )]
    IncompleteRecord {
        record: String,
        expected: usize,
        found: usize,
        line_number: Option<usize>,
    },

    #[error(
        "Segment '{segment}' of record '{record}' expects {} occurrences, found {actual}{}",
        bounds(.min, .max),
        at_line(.line_number)
    )]
    SegmentCardinality {
        record: String,
        segment: String,
        min: usize,
        max: Option<usize>,
        actual: usize,
        line_number: Option<usize>,
    },

    #[error("Unknown record definition '{name}'")]
    UnknownRecord { name: String },

    #[error("Property access failed on record '{record}': {source}")]
    Property {
        record: String,
        #[source]
        source: AccessError,
    },
}

impl StructuralError {
    pub fn line_too_short(
        record: &str,
        field: &str,
        required: usize,
        actual: usize,
    ) -> Self {
        Self::LineTooShort {
            record: record.to_string(),
            field: field.to_string(),
            required,
            actual,
            line_number: None,
        }
    }

    pub fn delimiter_count_mismatch(record: &str, field: &str, index: usize, tokens: usize) -> Self {
        Self::DelimiterCountMismatch {
            record: record.to_string(),
            field: field.to_string(),
            index,
            tokens,
            line_number: None,
        }
    }

    pub fn incomplete(record: &str, expected: usize, found: usize) -> Self {
        Self::IncompleteRecord {
            record: record.to_string(),
            expected,
            found,
            line_number: None,
        }
    }

    pub fn cardinality(
        record: &str,
        segment: &str,
        min: usize,
        max: Option<usize>,
        actual: usize,
    ) -> Self {
        Self::SegmentCardinality {
            record: record.to_string(),
            segment: segment.to_string(),
            min,
            max,
            actual,
            line_number: None,
        }
    }

    pub fn property(record: &str, source: AccessError) -> Self {
        Self::Property {
            record: record.to_string(),
            source,
        }
    }

    /// Attach a 1-based input line number to errors that carry one
    pub fn at_line(mut self, number: usize) -> Self {
        match &mut self {
            Self::LineTooShort { line_number, .. }
            | Self::DelimiterCountMismatch { line_number, .. }
            | Self::IncompleteRecord { line_number, .. }
            | Self::SegmentCardinality { line_number, .. } => {
                line_number.get_or_insert(number);
            }
            Self::UnmatchedLine { .. } | Self::UnknownRecord { .. } | Self::Property { .. } => {}
        }
        self
    }

    /// Input line number the error was raised at, if known
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::LineTooShort { line_number, .. }
            | Self::DelimiterCountMismatch { line_number, .. }
            | Self::IncompleteRecord { line_number, .. }
            | Self::SegmentCardinality { line_number, .. } => *line_number,
            Self::UnmatchedLine { line_number, .. } => Some(*line_number),
            Self::UnknownRecord { .. } | Self::Property { .. } => None,
        }
    }
}

fn at_line(line_number: &Option<usize>) -> String {
    line_number
        .map(|n| format!(" (line {})", n))
        .unwrap_or_default()
}

fn bounds(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) => format!("{}..={}", min, max),
        None => format!("at least {}", min),
    }
}

/// Errors raised by an individual converter
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConverterError {
    #[error("invalid value '{raw}': {message}")]
    InvalidValue { raw: String, message: String },

    #[error("expected a {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid conversion option '{option}': {message}")]
    InvalidOption { option: String, message: String },
}

impl ConverterError {
    pub fn invalid_value(raw: &str, message: impl fmt::Display) -> Self {
        Self::InvalidValue {
            raw: raw.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid_option(option: &str, message: impl fmt::Display) -> Self {
        Self::InvalidOption {
            option: option.to_string(),
            message: message.to_string(),
        }
    }
}

/// Why a single field failed to convert
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldErrorCause {
    #[error("no converter registered under '{0}'")]
    UnknownConverter(String),

    #[error(transparent)]
    Conversion(#[from] ConverterError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

/// A conversion failure attributable to exactly one field
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Field '{field}' of record '{record}' ({converter}) failed for '{raw}': {cause}")]
pub struct FieldConversionError {
    pub record: String,
    pub field: String,
    pub raw: String,
    pub converter: String,
    pub line_number: Option<usize>,
    pub cause: FieldErrorCause,
}

impl FieldConversionError {
    pub fn new(record: &str, field: &str, raw: &str, converter: &str, cause: FieldErrorCause) -> Self {
        Self {
            record: record.to_string(),
            field: field.to_string(),
            raw: raw.to_string(),
            converter: converter.to_string(),
            line_number: None,
            cause,
        }
    }

    pub fn with_line_number(mut self, number: usize) -> Self {
        self.line_number = Some(number);
        self
    }

    /// True when the failure is a missing converter rather than bad input
    pub fn is_unknown_converter(&self) -> bool {
        matches!(self.cause, FieldErrorCause::UnknownConverter(_))
    }
}

/// Errors raised by a property accessor on a target object
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessError {
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("unknown segment collection '{0}'")]
    UnknownSegment(String),

    #[error("property '{property}' cannot hold a {found} value")]
    WrongType {
        property: String,
        found: &'static str,
    },

    #[error("cannot create target for record '{0}'")]
    Unconstructible(String),
}

/// Schema loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record '{record}': {message}")]
    InvalidRecord { record: String, message: String },

    #[error("Record '{record}', field '{field}': {message}")]
    InvalidField {
        record: String,
        field: String,
        message: String,
    },

    #[error("Record '{record}', segment '{segment}': {message}")]
    InvalidSegment {
        record: String,
        segment: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl SchemaError {
    pub fn record(record: &str, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            record: record.to_string(),
            message: message.into(),
        }
    }

    pub fn field(record: &str, field: &str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            record: record.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn segment(record: &str, segment: &str, message: impl Into<String>) -> Self {
        Self::InvalidSegment {
            record: record.to_string(),
            segment: segment.to_string(),
            message: message.into(),
        }
    }
}

/// Non-fatal signal that a line was skipped in lenient mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedLine {
    pub line_number: usize,
    pub line: String,
}

impl fmt::Display for UnmatchedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skipped unmatched line {}: {}", self.line_number, self.line)
    }
}

/// Main error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Field(#[from] FieldConversionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Structural(StructuralError::UnmatchedLine { .. }) => ErrorKind::UnmatchedLine,
            Self::Structural(_) => ErrorKind::Structural,
            Self::Field(_) => ErrorKind::FieldConversion,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Io(_) | Self::Other(_) => ErrorKind::Io,
        }
    }

    /// Create a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Structural(StructuralError::UnmatchedLine { line_number, line }) => {
                format!(
                    "Line {} does not match any record definition: {}",
                    line_number,
                    excerpt(line)
                )
            }
            Self::Structural(err) => format!("Record structure error: {}", err),
            Self::Field(err) => match err.line_number {
                Some(line) => format!("Conversion error at line {}: {}", line, err),
                None => format!("Conversion error: {}", err),
            },
            Self::Schema(err) => format!("Schema error: {}", err),
            Self::Io(err) => format!("IO error: {}", err),
            Self::Other(err) => format!("Unexpected error: {}", err),
        }
    }
}

/// Broad classification used by diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Structural,
    FieldConversion,
    UnknownConverter,
    UnmatchedLine,
    Schema,
    Io,
}

/// Flat, caller-facing error record
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub record: Option<String>,
    pub name: Option<String>,
    pub excerpt: Option<String>,
    pub line_number: Option<usize>,
    pub message: String,
}

impl From<&FieldConversionError> for Diagnostic {
    fn from(err: &FieldConversionError) -> Self {
        Self {
            kind: if err.is_unknown_converter() {
                ErrorKind::UnknownConverter
            } else {
                ErrorKind::FieldConversion
            },
            record: Some(err.record.clone()),
            name: Some(err.field.clone()),
            excerpt: Some(excerpt(&err.raw)),
            line_number: err.line_number,
            message: err.cause.to_string(),
        }
    }
}

impl From<&StructuralError> for Diagnostic {
    fn from(err: &StructuralError) -> Self {
        let (kind, record, name, excerpt_text) = match err {
            StructuralError::LineTooShort { record, field, .. }
            | StructuralError::DelimiterCountMismatch { record, field, .. } => {
                (ErrorKind::Structural, Some(record.clone()), Some(field.clone()), None)
            }
            StructuralError::UnmatchedLine { line, .. } => {
                (ErrorKind::UnmatchedLine, None, None, Some(excerpt(line)))
            }
            StructuralError::SegmentCardinality {
                record, segment, ..
            } => (ErrorKind::Structural, Some(record.clone()), Some(segment.clone()), None),
            StructuralError::IncompleteRecord { record, .. } => {
                (ErrorKind::Structural, Some(record.clone()), None, None)
            }
            StructuralError::UnknownRecord { name } => {
                (ErrorKind::Structural, Some(name.clone()), None, None)
            }
            StructuralError::Property { record, .. } => {
                (ErrorKind::Structural, Some(record.clone()), None, None)
            }
        };
        Self {
            kind,
            record,
            name,
            excerpt: excerpt_text,
            line_number: err.line_number(),
            message: err.to_string(),
        }
    }
}

impl From<&UnmatchedLine> for Diagnostic {
    fn from(unmatched: &UnmatchedLine) -> Self {
        Self {
            kind: ErrorKind::UnmatchedLine,
            record: None,
            name: None,
            excerpt: Some(excerpt(&unmatched.line)),
            line_number: Some(unmatched.line_number),
            message: unmatched.to_string(),
        }
    }
}

const EXCERPT_CHARS: usize = 40;

/// Shorten raw input for error messages
pub fn excerpt(raw: &str) -> String {
    if raw.chars().count() <= EXCERPT_CHARS {
        raw.to_string()
    } else {
        let head: String = raw.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", head)
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Convenience result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Convenience result type for structural operations
pub type StructuralResult<T> = Result<T, StructuralError>;
