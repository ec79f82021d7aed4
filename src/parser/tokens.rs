//! Token extraction: one raw substring per field definition
//!
//! Fixed-width columns are sliced by character position, never by byte
//! offset, so multi-byte text lines up the same way it does on screen.

use crate::error::{StructuralError, StructuralResult};
use crate::schema::{Extraction, FieldDefinition, Layout, LineShape, RecordDefinition};
use std::iter::Peekable;
use std::str::Chars;

/// Iterator over the delimited tokens of one line.
///
/// A quoted span may contain the delimiter literally; a doubled quote inside a
/// quoted span stands for one quote character. Quote characters themselves
/// are not part of the token.
pub struct DelimitedTokens<'a> {
    chars: Peekable<Chars<'a>>,
    delimiter: char,
    quote: Option<char>,
    finished: bool,
}

impl<'a> DelimitedTokens<'a> {
    pub fn new(line: &'a str, delimiter: char, quote: Option<char>) -> Self {
        Self {
            chars: line.chars().peekable(),
            delimiter,
            quote,
            finished: false,
        }
    }
}

impl Iterator for DelimitedTokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        let mut token = String::new();
        let mut in_quote = false;
        while let Some(ch) = self.chars.next() {
            if Some(ch) == self.quote {
                if in_quote && self.chars.peek() == Some(&ch) {
                    self.chars.next();
                    token.push(ch);
                } else {
                    in_quote = !in_quote;
                }
            } else if ch == self.delimiter && !in_quote {
                return Some(token);
            } else {
                token.push(ch);
            }
        }

        // The last token runs to the end of the line, even when empty
        self.finished = true;
        Some(token)
    }
}

/// Split a whole line into delimited tokens
pub fn split_delimited(line: &str, delimiter: char, quote: Option<char>) -> Vec<String> {
    DelimitedTokens::new(line, delimiter, quote).collect()
}

/// Tokens of a line under the record's layout; a fixed-width line is one token
pub fn tokens_for(line: &str, layout: Layout) -> Vec<String> {
    match layout {
        Layout::Delimited { delimiter, quote } => split_delimited(line, delimiter, quote),
        Layout::Fixed => vec![line.to_string()],
    }
}

/// Characters `[start, start + length)` of a line, clipped to the line end
pub fn char_slice(line: &str, start: usize, length: usize) -> String {
    line.chars().skip(start).take(length).collect()
}

/// Extract the raw text of every field on the first line of `record`
pub fn extract(line: &str, record: &RecordDefinition) -> StructuralResult<Vec<String>> {
    extract_line(line, record.first_line())
}

/// Extract the raw text of every field of one line shape, in field order.
///
/// Missing trailing columns or tokens of optional fields come back as empty
/// strings; a required field that cannot be satisfied is a structural error.
pub fn extract_line(line: &str, shape: LineShape<'_>) -> StructuralResult<Vec<String>> {
    let fields = shape.fields;
    let line_length = line.chars().count();
    let tokens = if fields
        .iter()
        .any(|f| matches!(f.extract, Extraction::Token { .. }))
    {
        tokens_for(line, shape.layout)
    } else {
        Vec::new()
    };

    let mut raw = Vec::with_capacity(fields.len());
    for (position, field) in fields.iter().enumerate() {
        let text = match field.extract {
            Extraction::Column { start, length } => {
                let end = start + length;
                if end > line_length && field.required {
                    return Err(StructuralError::line_too_short(
                        shape.record,
                        &field.name,
                        end,
                        line_length,
                    ));
                }
                char_slice(line, start, length)
            }
            Extraction::Token { index } => match tokens.get(index) {
                Some(token) => token.clone(),
                None if field.required && !has_optional_after(fields, position) => {
                    return Err(StructuralError::delimiter_count_mismatch(
                        shape.record,
                        &field.name,
                        index,
                        tokens.len(),
                    ));
                }
                None => String::new(),
            },
        };
        raw.push(text);
    }
    Ok(raw)
}

fn has_optional_after(fields: &[FieldDefinition], position: usize) -> bool {
    fields[position + 1..].iter().any(|f| !f.required)
}
