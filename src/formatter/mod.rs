//! Output side: field justification, line composition and line sinks

pub mod quotes;
pub mod sink;

pub use quotes::QuoteEngine;
pub use sink::{LineSink, WriterSink};

use crate::error::ConverterError;
use crate::schema::{ConversionOptions, Extraction, FieldDefinition};

/// Side a field's value is aligned to within its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    /// Value first, padding on the right
    #[default]
    Left,
    /// Padding first, value on the right
    Right,
    /// Padding split around the value
    Both,
}

impl Justify {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Justify::Left),
            "right" => Ok(Justify::Right),
            "both" | "center" => Ok(Justify::Both),
            other => Err(format!(
                "Invalid justify '{}'. Use 'left', 'right', or 'both'",
                other
            )),
        }
    }
}

/// Justification and pad character of one field, read from its options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub justify: Justify,
    pub pad: char,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            justify: Justify::Left,
            pad: ' ',
        }
    }
}

impl Padding {
    /// Read the `justify` and `pad-character` options; `None` when neither is set
    pub fn from_options(options: &ConversionOptions) -> Result<Option<Self>, ConverterError> {
        if !options.contains_key("justify") && !options.contains_key("pad-character") {
            return Ok(None);
        }
        let justify = match options.get("justify") {
            Some(value) => Justify::from_str(value)
                .map_err(|message| ConverterError::invalid_option("justify", message))?,
            None => Justify::Left,
        };
        let pad = match options.get("pad-character") {
            Some(value) => value.chars().next().ok_or_else(|| {
                ConverterError::invalid_option("pad-character", "must not be empty")
            })?,
            None => ' ',
        };
        Ok(Some(Self { justify, pad }))
    }

    /// Padding applied to a field.
    ///
    /// Fixed-width columns fall back to left-justified spaces. Delimited
    /// tokens carry no padding unless their options ask for it.
    pub fn for_field(field: &FieldDefinition) -> Result<Option<Self>, ConverterError> {
        let configured = Self::from_options(&field.options)?;
        Ok(match field.extract {
            Extraction::Column { .. } => Some(configured.unwrap_or_default()),
            Extraction::Token { .. } => configured,
        })
    }

    /// Remove padding from raw column text.
    ///
    /// A column of nothing but whitespace is blank whatever the pad character.
    /// With `keep_digit`, a column made only of a digit pad keeps one of them,
    /// so `"0000"` zero-padded reads as `"0"` rather than as blank.
    pub fn strip(&self, raw: &str, keep_digit: bool) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }
        let pad = self.pad;
        let stripped = match self.justify {
            Justify::Left => raw.trim_end_matches(pad),
            Justify::Right => raw.trim_start_matches(pad),
            Justify::Both => raw.trim_matches(pad),
        };
        if stripped.is_empty() && keep_digit && pad.is_ascii_digit() {
            return pad.to_string();
        }
        stripped.to_string()
    }

    /// Pad or cut `text` to exactly `width` characters.
    ///
    /// Returns the fitted text and whether anything was cut off.
    pub fn fit(&self, text: &str, width: usize) -> (String, bool) {
        let length = text.chars().count();
        if length > width {
            return (text.chars().take(width).collect(), true);
        }

        let missing = width - length;
        let (before, after) = match self.justify {
            Justify::Left => (0, missing),
            Justify::Right => (missing, 0),
            Justify::Both => (missing / 2, missing - missing / 2),
        };
        let mut fitted = String::with_capacity(width);
        fitted.extend(std::iter::repeat(self.pad).take(before));
        fitted.push_str(text);
        fitted.extend(std::iter::repeat(self.pad).take(after));
        (fitted, false)
    }
}

/// Builds one fixed-width line by placing column text at character offsets
#[derive(Debug, Clone)]
pub struct FixedLine {
    chars: Vec<char>,
}

impl FixedLine {
    /// Blank line of `width` spaces
    pub fn new(width: usize) -> Self {
        Self {
            chars: vec![' '; width],
        }
    }

    /// Write `text` starting at character `start`, growing the line if needed
    pub fn place(&mut self, start: usize, text: &str) {
        for (offset, ch) in text.chars().enumerate() {
            let position = start + offset;
            if position >= self.chars.len() {
                self.chars.resize(position + 1, ' ');
            }
            self.chars[position] = ch;
        }
    }

    pub fn finish(self) -> String {
        self.chars.into_iter().collect()
    }
}

/// Join already-quoted tokens with the delimiter
pub fn join_delimited(tokens: &[String], delimiter: char) -> String {
    let mut line = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            line.push(delimiter);
        }
        line.push_str(token);
    }
    line
}
