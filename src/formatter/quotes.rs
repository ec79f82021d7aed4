//! Quoting of delimited output tokens
//!
//! Tokens are quoted only when they could not be split back unchanged: when
//! they contain the delimiter, the quote character or a line break.

use crate::error::ConverterError;

/// Quoting engine for one delimited layout
pub struct QuoteEngine {
    delimiter: char,
    quote: Option<char>,
}

impl QuoteEngine {
    /// Create a quote engine for the record's delimiter and quote character
    pub fn new(delimiter: char, quote: Option<char>) -> Self {
        Self { delimiter, quote }
    }

    /// Whether a token must be quoted to survive splitting
    pub fn needs_quoting(&self, value: &str) -> bool {
        value
            .chars()
            .any(|ch| ch == self.delimiter || Some(ch) == self.quote || ch == '\n' || ch == '\r')
    }

    /// Wrap in quotes, doubling embedded quote characters
    pub fn quote(&self, value: &str, quote: char) -> String {
        let mut result = String::with_capacity(value.len() + 2);
        result.push(quote);
        for ch in value.chars() {
            if ch == quote {
                result.push(quote);
            }
            result.push(ch);
        }
        result.push(quote);
        result
    }

    /// Token text as written to the line.
    ///
    /// A token that needs quoting in a layout without a quote character
    /// cannot be represented and is rejected.
    pub fn format(&self, value: &str) -> Result<String, ConverterError> {
        if !self.needs_quoting(value) {
            return Ok(value.to_string());
        }
        match self.quote {
            Some(quote) => Ok(self.quote(value, quote)),
            None => Err(ConverterError::invalid_value(
                value,
                format!(
                    "contains the delimiter '{}' and the record declares no quote character",
                    self.delimiter
                ),
            )),
        }
    }
}
