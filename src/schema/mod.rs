//! Schema description: record, field and segment definitions
//!
//! Definitions are built once, either in code through the `with_*` builders or
//! from JSON through [`Schema::from_json_str`], and are only read afterwards.

pub mod validation;

use crate::error::{SchemaError, SchemaResult};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Conversion options keyed by option name
pub type ConversionOptions = BTreeMap<String, String>;

/// Ordered set of top-level record definitions
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    pub records: Vec<RecordDefinition>,
}

impl Schema {
    pub fn new(records: Vec<RecordDefinition>) -> Self {
        Self { records }
    }

    /// Load a schema from its JSON description
    pub fn from_json_str(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a schema from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Add a top-level record definition; declaration order is match order
    pub fn with_record(mut self, record: RecordDefinition) -> Self {
        self.records.push(record);
        self
    }

    /// Find a top-level record by name
    pub fn record(&self, name: &str) -> Option<&RecordDefinition> {
        self.records.iter().find(|r| r.name == name)
    }
}

/// How a record splits its line into fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Layout {
    /// Fields occupy fixed character columns
    #[default]
    Fixed,
    /// Fields are separated by a delimiter, optionally quoted
    Delimited {
        delimiter: char,
        #[serde(default)]
        quote: Option<char>,
    },
}

/// A record: its first line, optional continuation lines and nested child
/// segments
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDefinition {
    pub name: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub identity: Vec<IdentityRule>,
    /// Lines following the first one, sequential lines before identified ones
    #[serde(default)]
    pub lines: Vec<LineDefinition>,
    #[serde(default)]
    pub segments: Vec<SegmentDefinition>,
    /// Minimum width of formatted fixed-width lines
    #[serde(default)]
    pub width: Option<usize>,
}

impl RecordDefinition {
    /// Create a fixed-width record definition
    pub fn fixed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            layout: Layout::Fixed,
            fields: Vec::new(),
            identity: Vec::new(),
            lines: Vec::new(),
            segments: Vec::new(),
            width: None,
        }
    }

    /// Create a delimited record definition
    pub fn delimited(name: &str, delimiter: char) -> Self {
        Self {
            layout: Layout::Delimited {
                delimiter,
                quote: None,
            },
            ..Self::fixed(name)
        }
    }

    /// Set the quote character of a delimited record
    pub fn with_quote(mut self, quote: char) -> Self {
        if let Layout::Delimited { delimiter, .. } = self.layout {
            self.layout = Layout::Delimited {
                delimiter,
                quote: Some(quote),
            };
        }
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_identity(mut self, rule: IdentityRule) -> Self {
        self.identity.push(rule);
        self
    }

    /// Add a continuation line
    pub fn with_line(mut self, line: LineDefinition) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_segment(mut self, segment: SegmentDefinition) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn is_delimited(&self) -> bool {
        matches!(self.layout, Layout::Delimited { .. })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.all_fields().find(|f| f.name == name)
    }

    pub fn segment(&self, property: &str) -> Option<&SegmentDefinition> {
        self.segments.iter().find(|s| s.property == property)
    }

    /// The line that identifies the record
    pub fn first_line(&self) -> LineShape<'_> {
        LineShape {
            record: &self.name,
            layout: self.layout,
            fields: &self.fields,
            identity: &self.identity,
            width: self.width,
        }
    }

    /// Continuation lines read unconditionally after the first line
    pub fn sequential_lines(&self) -> impl Iterator<Item = &LineDefinition> {
        self.lines.iter().filter(|line| !line.is_identified())
    }

    /// Continuation lines picked out by their own identity rules
    pub fn identified_lines(&self) -> impl Iterator<Item = &LineDefinition> {
        self.lines.iter().filter(|line| line.is_identified())
    }

    /// Every field of the record across all of its lines
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields
            .iter()
            .chain(self.lines.iter().flat_map(|line| line.fields.iter()))
    }

    /// Width of a formatted fixed-width first line
    pub fn line_width(&self) -> usize {
        self.first_line().line_width()
    }
}

/// A continuation line of a multi-line record.
///
/// Without identity rules the line always follows in sequence. With rules,
/// it is read for as long as the next input line identifies as one of the
/// record's identified lines, until one marked `record_end` is read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineDefinition {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub identity: Vec<IdentityRule>,
    #[serde(default)]
    pub width: Option<usize>,
    /// Reading this identified line closes the record
    #[serde(default)]
    pub record_end: bool,
}

impl LineDefinition {
    pub fn fixed() -> Self {
        Self::default()
    }

    pub fn delimited(delimiter: char) -> Self {
        Self {
            layout: Layout::Delimited {
                delimiter,
                quote: None,
            },
            ..Self::default()
        }
    }

    pub fn with_quote(mut self, quote: char) -> Self {
        if let Layout::Delimited { delimiter, .. } = self.layout {
            self.layout = Layout::Delimited {
                delimiter,
                quote: Some(quote),
            };
        }
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_identity(mut self, rule: IdentityRule) -> Self {
        self.identity.push(rule);
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Mark an identified line as the last line of its record
    pub fn ending(mut self) -> Self {
        self.record_end = true;
        self
    }

    pub fn is_identified(&self) -> bool {
        !self.identity.is_empty()
    }

    /// View of this line as part of `record`
    pub fn shape<'a>(&'a self, record: &'a str) -> LineShape<'a> {
        LineShape {
            record,
            layout: self.layout,
            fields: &self.fields,
            identity: &self.identity,
            width: self.width,
        }
    }
}

/// Borrowed view of one physical line layout of a record
#[derive(Debug, Clone, Copy)]
pub struct LineShape<'a> {
    /// Name of the owning record
    pub record: &'a str,
    pub layout: Layout,
    pub fields: &'a [FieldDefinition],
    pub identity: &'a [IdentityRule],
    pub width: Option<usize>,
}

impl LineShape<'_> {
    /// Width of a formatted fixed-width line
    pub fn line_width(&self) -> usize {
        let fields_end = self
            .fields
            .iter()
            .filter_map(|f| match f.extract {
                Extraction::Column { start, length } => Some(start + length),
                Extraction::Token { .. } => None,
            })
            .max()
            .unwrap_or(0);
        fields_end.max(self.width.unwrap_or(0))
    }
}

/// Where a field's raw text comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Extraction {
    /// Characters `[start, start + length)`
    Column { start: usize, length: usize },
    /// The delimited token at `index`
    Token { index: usize },
}

/// How a field's value attaches to the target object
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Binding {
    /// Property named after the field
    #[default]
    Field,
    /// Explicitly named property
    Property(String),
    /// Constant text written on output, not bound on input
    Literal(String),
    /// Column skipped on input and left blank on output
    Ignore,
}

/// What to do when a field's raw text is blank
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlankPolicy {
    /// Use the converter's declared default
    #[default]
    ConverterDefault,
    /// Leave the property unset
    Unset,
    /// Set an empty string
    Empty,
    /// Convert this raw text instead
    Default(String),
}

fn default_converter() -> String {
    "char".to_string()
}

fn default_required() -> bool {
    true
}

/// One column or token of a record
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    pub extract: Extraction,
    #[serde(default = "default_converter")]
    pub converter: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub options: ConversionOptions,
    #[serde(default)]
    pub binding: Binding,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub blank: BlankPolicy,
}

impl FieldDefinition {
    fn new(name: &str, extract: Extraction) -> Self {
        Self {
            name: name.to_string(),
            extract,
            converter: default_converter(),
            format: None,
            options: ConversionOptions::new(),
            binding: Binding::Field,
            required: true,
            blank: BlankPolicy::ConverterDefault,
        }
    }

    /// Fixed-width field over `[start, start + length)`
    pub fn column(name: &str, start: usize, length: usize) -> Self {
        Self::new(name, Extraction::Column { start, length })
    }

    /// Delimited field at token `index`
    pub fn token(name: &str, index: usize) -> Self {
        Self::new(name, Extraction::Token { index })
    }

    pub fn with_converter(mut self, converter: &str) -> Self {
        self.converter = converter.to_string();
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn with_option(mut self, name: &str, value: &str) -> Self {
        self.options.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_blank(mut self, blank: BlankPolicy) -> Self {
        self.blank = blank;
        self
    }

    pub fn bound_to(mut self, property: &str) -> Self {
        self.binding = Binding::Property(property.to_string());
        self
    }

    /// Constant column, e.g. a record type code
    pub fn literal(mut self, text: &str) -> Self {
        self.binding = Binding::Literal(text.to_string());
        self
    }

    pub fn ignored(mut self) -> Self {
        self.binding = Binding::Ignore;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Target property this field reads and writes, if bound to one
    pub fn property(&self) -> Option<&str> {
        match &self.binding {
            Binding::Field => Some(&self.name),
            Binding::Property(name) => Some(name),
            Binding::Literal(_) | Binding::Ignore => None,
        }
    }

    /// Declared length of a fixed-width field
    pub fn length(&self) -> Option<usize> {
        match self.extract {
            Extraction::Column { length, .. } => Some(length),
            Extraction::Token { .. } => None,
        }
    }
}

/// A nested, possibly repeating child record
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentDefinition {
    /// Collection property on the parent target
    pub property: String,
    pub record: RecordDefinition,
    #[serde(default)]
    pub min: usize,
    /// `None` means unbounded
    #[serde(default)]
    pub max: Option<usize>,
}

impl SegmentDefinition {
    /// Optional, unbounded segment
    pub fn new(property: &str, record: RecordDefinition) -> Self {
        Self {
            property: property.to_string(),
            record,
            min: 0,
            max: None,
        }
    }

    pub fn with_bounds(mut self, min: usize, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Whether `count` occurrences satisfy the bounds
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

/// Cheap, conversion-free test deciding whether a line belongs to a record
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IdentityRule {
    /// Any of `values` appears at character `start`
    Literal {
        start: usize,
        values: Vec<String>,
        #[serde(default)]
        ignore_case: bool,
    },
    /// Delimited token `index` equals any of `values`
    Token {
        index: usize,
        values: Vec<String>,
        #[serde(default)]
        ignore_case: bool,
    },
    /// Regex over characters `[start, start + length)`, or to the end of line
    Pattern {
        #[serde(default)]
        start: usize,
        #[serde(default)]
        length: Option<usize>,
        regex: Pattern,
    },
    /// Line length in characters within `[min, max]`
    Length {
        #[serde(default)]
        min: usize,
        #[serde(default)]
        max: Option<usize>,
    },
    /// Caller-supplied predicate over the raw line
    #[serde(skip)]
    Predicate(LinePredicate),
}

impl IdentityRule {
    pub fn literal(start: usize, value: &str) -> Self {
        Self::Literal {
            start,
            values: vec![value.to_string()],
            ignore_case: false,
        }
    }

    pub fn token(index: usize, value: &str) -> Self {
        Self::Token {
            index,
            values: vec![value.to_string()],
            ignore_case: false,
        }
    }

    pub fn pattern(start: usize, length: Option<usize>, regex: &str) -> SchemaResult<Self> {
        Ok(Self::Pattern {
            start,
            length,
            regex: Pattern::new(regex)?,
        })
    }

    pub fn length(min: usize, max: Option<usize>) -> Self {
        Self::Length { min, max }
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(LinePredicate(Arc::new(predicate)))
    }
}

/// Compiled regular expression for pattern identity rules
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(regex: &str) -> SchemaResult<Self> {
        Regex::new(regex)
            .map(Pattern)
            .map_err(|e| SchemaError::Configuration(format!("invalid pattern '{}': {}", regex, e)))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source)
            .map(Pattern)
            .map_err(serde::de::Error::custom)
    }
}

/// Shared predicate over a raw line
#[derive(Clone)]
pub struct LinePredicate(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl LinePredicate {
    pub fn test(&self, line: &str) -> bool {
        (self.0)(line)
    }
}

impl fmt::Debug for LinePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinePredicate(..)")
    }
}
