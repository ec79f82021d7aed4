use assert_matches::assert_matches;
use flatconv::parser::{extract, split_delimited};
use flatconv::{FieldDefinition, RecordDefinition, StructuralError};
use pretty_assertions::assert_eq;

fn employee() -> RecordDefinition {
    RecordDefinition::fixed("EMP")
        .with_field(FieldDefinition::column("name", 0, 20))
        .with_field(FieldDefinition::column("salary", 20, 10).with_converter("decimal"))
}

#[test]
fn test_exact_fit_extracts_every_column() {
    let line = format!("{:<20}{:>10}", "Jane Doe", "12345.00");
    assert_eq!(line.chars().count(), 30);

    let raw = extract(&line, &employee()).unwrap();
    assert_eq!(raw, vec!["Jane Doe            ", "  12345.00"]);
}

#[test]
fn test_one_character_short_is_line_too_short() {
    let line = format!("{:<20}{:>9}", "Jane Doe", "2345.00");
    assert_eq!(line.chars().count(), 29);

    assert_matches!(
        extract(&line, &employee()),
        Err(StructuralError::LineTooShort { field, required: 30, actual: 29, .. }) if field == "salary"
    );
}

#[test]
fn test_short_line_with_optional_trailing_field() {
    let record = RecordDefinition::fixed("EMP")
        .with_field(FieldDefinition::column("name", 0, 20))
        .with_field(FieldDefinition::column("salary", 20, 10).optional());

    let raw = extract("Jane Doe", &record).unwrap();
    assert_eq!(raw, vec!["Jane Doe", ""]);
}

#[test]
fn test_columns_are_sliced_by_character() {
    let record = RecordDefinition::fixed("CITY")
        .with_field(FieldDefinition::column("name", 0, 6))
        .with_field(FieldDefinition::column("code", 6, 3));

    let raw = extract("Zürich ZH", &record).unwrap();
    assert_eq!(raw, vec!["Zürich", " ZH"]);
}

#[test]
fn test_delimited_fields_by_index() {
    let record = RecordDefinition::delimited("EMP", ',')
        .with_quote('"')
        .with_field(FieldDefinition::token("id", 0))
        .with_field(FieldDefinition::token("name", 1))
        .with_field(FieldDefinition::token("dept", 2));

    let raw = extract(r#"7,"Doe, Jane",Sales"#, &record).unwrap();
    assert_eq!(raw, vec!["7", "Doe, Jane", "Sales"]);
}

#[test]
fn test_missing_optional_trailing_tokens() {
    let record = RecordDefinition::delimited("EMP", '|')
        .with_field(FieldDefinition::token("id", 0))
        .with_field(FieldDefinition::token("name", 1).optional())
        .with_field(FieldDefinition::token("dept", 2).optional());

    let raw = extract("7", &record).unwrap();
    assert_eq!(raw, vec!["7", "", ""]);
}

#[test]
fn test_required_token_shortfall_explained_by_later_optional() {
    let record = RecordDefinition::delimited("EMP", '|')
        .with_field(FieldDefinition::token("id", 0))
        .with_field(FieldDefinition::token("name", 1))
        .with_field(FieldDefinition::token("note", 2).optional());

    assert_eq!(extract("7", &record).unwrap(), vec!["7", "", ""]);
}

#[test]
fn test_required_token_shortfall_is_delimiter_mismatch() {
    let record = RecordDefinition::delimited("EMP", '|')
        .with_field(FieldDefinition::token("id", 0))
        .with_field(FieldDefinition::token("name", 1))
        .with_field(FieldDefinition::token("dept", 2));

    assert_matches!(
        extract("7|Jane", &record),
        Err(StructuralError::DelimiterCountMismatch { field, index: 2, tokens: 2, .. }) if field == "dept"
    );
}

#[test]
fn test_split_without_quote_character() {
    assert_eq!(
        split_delimited(r#""a,b",c"#, ',', None),
        vec![r#""a"#, r#"b""#, "c"]
    );
}
