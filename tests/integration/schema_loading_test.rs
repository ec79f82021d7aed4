use assert_matches::assert_matches;
use flatconv::schema::{Binding, Extraction};
use flatconv::{
    BlankPolicy, ConverterRegistry, Engine, EngineConfig, IdentityRule, Layout, ReadEvent,
    RecordNode, Schema, SchemaError, Value,
};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const BANK_SCHEMA: &str = r#"{
  "records": [
    {
      "name": "HDR",
      "identity": [{ "type": "literal", "start": 0, "values": ["H"] }],
      "fields": [
        { "name": "type", "extract": { "start": 0, "length": 1 }, "binding": { "literal": "H" } },
        {
          "name": "batch",
          "extract": { "start": 1, "length": 6 },
          "converter": "int",
          "options": { "justify": "right", "pad-character": "0" }
        },
        { "name": "filler", "extract": { "start": 7, "length": 3 }, "binding": "ignore", "required": false }
      ]
    },
    {
      "name": "TXN",
      "layout": { "type": "delimited", "delimiter": "|", "quote": "\"" },
      "identity": [{ "type": "token", "index": 0, "values": ["T", "t"] }],
      "fields": [
        { "name": "type", "extract": { "index": 0 }, "binding": { "literal": "T" } },
        { "name": "account", "extract": { "index": 1 }, "binding": { "property": "accountNumber" } },
        {
          "name": "amount",
          "extract": { "index": 2 },
          "converter": "decimal",
          "options": { "decimal-places": "2" }
        },
        { "name": "memo", "extract": { "index": 3 }, "required": false, "blank": { "default": "n/a" } }
      ],
      "segments": [
        {
          "property": "tags",
          "min": 0,
          "max": 3,
          "record": {
            "name": "TAG",
            "layout": { "type": "delimited", "delimiter": "|" },
            "identity": [{ "type": "token", "index": 0, "values": ["G"] }],
            "fields": [
              { "name": "type", "extract": { "index": 0 }, "binding": { "literal": "G" } },
              { "name": "tag", "extract": { "index": 1 } }
            ]
          }
        }
      ]
    },
    {
      "name": "TRL",
      "identity": [
        { "type": "pattern", "start": 0, "length": 3, "regex": "^TRL$" },
        { "type": "length", "min": 9, "max": 9 }
      ],
      "fields": [
        { "name": "count", "extract": { "start": 3, "length": 6 }, "converter": "int" }
      ]
    }
  ]
}"#;

fn engine(schema: Schema) -> Engine {
    Engine::new(
        Arc::new(schema),
        Arc::new(ConverterRegistry::with_builtins()),
        EngineConfig::default(),
    )
    .unwrap()
}

#[test]
fn test_load_schema_from_json() {
    let schema = Schema::from_json_str(BANK_SCHEMA).unwrap();
    assert_eq!(schema.records.len(), 3);

    let header = schema.record("HDR").unwrap();
    assert_eq!(header.layout, Layout::Fixed);
    assert_eq!(header.fields[0].binding, Binding::Literal("H".to_string()));
    assert_eq!(header.fields[1].extract, Extraction::Column { start: 1, length: 6 });
    assert_eq!(header.fields[1].options["pad-character"], "0");
    assert_eq!(header.fields[2].binding, Binding::Ignore);
    assert!(!header.fields[2].required);

    let txn = schema.record("TXN").unwrap();
    assert_eq!(
        txn.layout,
        Layout::Delimited {
            delimiter: '|',
            quote: Some('"')
        }
    );
    assert_eq!(txn.fields[1].property(), Some("accountNumber"));
    assert_eq!(txn.fields[3].blank, BlankPolicy::Default("n/a".to_string()));
    assert_matches!(&txn.identity[0], IdentityRule::Token { index: 0, values, ignore_case: false } if values.len() == 2);

    let tags = txn.segment("tags").unwrap();
    assert_eq!((tags.min, tags.max), (0, Some(3)));
    assert_eq!(tags.record.name, "TAG");

    let trailer = schema.record("TRL").unwrap();
    assert_matches!(&trailer.identity[0], IdentityRule::Pattern { regex, .. } if regex.as_str() == "^TRL$");
}

#[test]
fn test_loaded_schema_parses_and_formats() {
    let engine = engine(Schema::from_json_str(BANK_SCHEMA).unwrap());
    let input = "H000042\nT|12-34|19.99|\nG|urgent\nG|review\nt|56-78|5.00|\"a|b\"\nTRL000002\n";

    let events = engine.read_str(input).read_all().unwrap();
    let records: Vec<_> = events.into_iter().filter_map(ReadEvent::into_record).collect();
    let names: Vec<_> = records.iter().map(|r| r.record.as_str()).collect();
    assert_eq!(names, vec!["HDR", "TXN", "TXN", "TRL"]);

    assert_eq!(records[1].defaults_applied.len(), 1);
    assert_eq!(records[1].defaults_applied[0].field, "memo");

    let nodes: Vec<RecordNode> = records.into_iter().map(|r| r.into_node().unwrap()).collect();
    assert_eq!(nodes[0].field("batch"), Some(&Value::Int(42)));
    assert_eq!(nodes[0].field("filler"), None);

    let first = &nodes[1];
    assert_eq!(first.field("accountNumber"), Some(&Value::from("12-34")));
    assert_eq!(first.field("memo"), Some(&Value::from("n/a")));
    assert_eq!(first.child_nodes("tags").len(), 2);
    assert_eq!(nodes[2].field("memo"), Some(&Value::from("a|b")));
    assert_eq!(nodes[3].field("count"), Some(&Value::Int(2)));

    let formatted = engine.format_named(first, "TXN").unwrap();
    assert_eq!(formatted.lines, vec!["T|12-34|19.99|n/a", "G|urgent", "G|review"]);
    let header = engine.format_named(&nodes[0], "HDR").unwrap();
    assert_eq!(header.lines, vec!["H000042   "]);
}

#[test]
fn test_load_schema_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(BANK_SCHEMA.as_bytes()).unwrap();

    let schema = Schema::from_path(file.path()).unwrap();
    assert!(schema.validate(&EngineConfig::default()).is_ok());
}

#[test]
fn test_missing_schema_file() {
    let dir = tempfile::tempdir().unwrap();
    assert_matches!(
        Schema::from_path(dir.path().join("absent.json")),
        Err(SchemaError::Io(_))
    );
}

#[test]
fn test_unknown_keys_rejected() {
    let json = r#"{"records": [{"name": "A", "fields": [], "colour": "red"}]}"#;
    assert_matches!(Schema::from_json_str(json), Err(SchemaError::Json(_)));
}

#[test]
fn test_invalid_regex_rejected_at_load() {
    let json = r#"{"records": [{"name": "A", "identity": [{"type": "pattern", "regex": "(open"}]}]}"#;
    assert_matches!(Schema::from_json_str(json), Err(SchemaError::Json(_)));
}

#[test]
fn test_child_without_identity_rejected() {
    let json = r#"{"records": [{
        "name": "P",
        "identity": [{ "type": "literal", "start": 0, "values": ["P"] }],
        "segments": [{ "property": "kids", "record": { "name": "C" } }]
    }]}"#;
    let schema = Schema::from_json_str(json).unwrap();
    let result = Engine::new(
        Arc::new(schema),
        Arc::new(ConverterRegistry::with_builtins()),
        EngineConfig::default(),
    );
    assert_matches!(result.err(), Some(SchemaError::InvalidSegment { segment, .. }) if segment == "kids");
}

#[test]
fn test_token_field_in_fixed_record_rejected() {
    let json = r#"{"records": [{"name": "A", "fields": [{"name": "x", "extract": {"index": 0}}]}]}"#;
    let schema = Schema::from_json_str(json).unwrap();
    assert_matches!(
        schema.validate(&EngineConfig::default()),
        Err(SchemaError::InvalidField { field, .. }) if field == "x"
    );
}

#[test]
fn test_nesting_deeper_than_configured_rejected() {
    let schema = Schema::from_json_str(BANK_SCHEMA).unwrap();
    assert!(schema.validate(&EngineConfig::default().with_max_depth(2)).is_ok());
    assert_matches!(
        schema.validate(&EngineConfig::default().with_max_depth(1)),
        Err(SchemaError::InvalidRecord { record, .. }) if record == "TAG"
    );
}

#[test]
fn test_duplicate_top_level_names_rejected() {
    let json = r#"{"records": [{"name": "A"}, {"name": "A"}]}"#;
    let schema = Schema::from_json_str(json).unwrap();
    assert_matches!(
        schema.validate(&EngineConfig::default()),
        Err(SchemaError::InvalidRecord { record, .. }) if record == "A"
    );
}

#[test]
fn test_unregistered_converters_listed() {
    let json = r#"{"records": [{"name": "A", "fields": [
        {"name": "x", "extract": {"start": 0, "length": 2}, "converter": "packed"},
        {"name": "y", "extract": {"start": 2, "length": 2}, "converter": "packed", "binding": "ignore"}
    ]}]}"#;
    let schema = Schema::from_json_str(json).unwrap();
    let unknown = schema.unknown_converters(&ConverterRegistry::with_builtins());
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].field, "x");
    assert_eq!(unknown[0].converter, "packed");

    // Still a usable engine; the field fails at conversion time
    let engine = engine(schema);
    let record = engine
        .read_str("12ab")
        .next_event()
        .unwrap()
        .unwrap()
        .into_record()
        .unwrap();
    assert!(record.errors[0].is_unknown_converter());
}
