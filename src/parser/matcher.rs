//! Record identification
//!
//! Candidates are tried in declaration order and the first whose identity
//! rules all accept the line wins. Rules only look at raw text; no converter
//! is ever invoked here.

use crate::parser::tokens::{char_slice, DelimitedTokens};
use crate::schema::{IdentityRule, Layout, RecordDefinition};

/// First candidate identifying `line`, or `None` when the line is unmatched
pub fn match_record<'s>(
    line: &str,
    candidates: &'s [RecordDefinition],
) -> Option<&'s RecordDefinition> {
    candidates.iter().find(|record| identifies(record, line))
}

/// Whether every identity rule of `record` accepts `line`.
///
/// A record without rules is a default record and accepts every line.
pub fn identifies(record: &RecordDefinition, line: &str) -> bool {
    rules_accept(&record.identity, record.layout, line)
}

/// Whether every rule accepts `line` read under `layout`
pub fn rules_accept(rules: &[IdentityRule], layout: Layout, line: &str) -> bool {
    rules.iter().all(|rule| rule_accepts(rule, layout, line))
}

fn rule_accepts(rule: &IdentityRule, layout: Layout, line: &str) -> bool {
    match rule {
        IdentityRule::Literal {
            start,
            values,
            ignore_case,
        } => values.iter().any(|value| {
            let width = value.chars().count();
            let column = char_slice(line, *start, width);
            column.chars().count() == width && text_eq(&column, value, *ignore_case)
        }),
        IdentityRule::Token {
            index,
            values,
            ignore_case,
        } => match token_at(line, layout, *index) {
            Some(token) => values.iter().any(|v| text_eq(&token, v, *ignore_case)),
            None => false,
        },
        IdentityRule::Pattern {
            start,
            length,
            regex,
        } => {
            let line_length = line.chars().count();
            let end = length.map_or(line_length, |len| start + len);
            if *start > line_length || end > line_length {
                return false;
            }
            regex.is_match(&char_slice(line, *start, end - start))
        }
        IdentityRule::Length { min, max } => {
            let line_length = line.chars().count();
            line_length >= *min && max.map_or(true, |max| line_length <= max)
        }
        IdentityRule::Predicate(predicate) => predicate.test(line),
    }
}

fn token_at(line: &str, layout: Layout, index: usize) -> Option<String> {
    match layout {
        Layout::Delimited { delimiter, quote } => {
            DelimitedTokens::new(line, delimiter, quote).nth(index)
        }
        Layout::Fixed if index == 0 => Some(line.to_string()),
        Layout::Fixed => None,
    }
}

fn text_eq(left: &str, right: &str, ignore_case: bool) -> bool {
    if ignore_case {
        left.to_lowercase() == right.to_lowercase()
    } else {
        left == right
    }
}
