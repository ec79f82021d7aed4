use assert_matches::assert_matches;
use flatconv::{
    ConverterRegistry, Engine, EngineConfig, EngineError, FieldDefinition, IdentityRule,
    LineDefinition, ReadEvent, RecordDefinition, RecordNode, Schema, StructuralError, Value,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const CUSTOMER_SCHEMA: &str = r#"{
  "records": [
    {
      "name": "CUST",
      "identity": [{ "type": "literal", "start": 0, "values": ["C"] }],
      "fields": [
        { "name": "type", "extract": { "start": 0, "length": 1 }, "binding": { "literal": "C" } },
        {
          "name": "id",
          "extract": { "start": 1, "length": 4 },
          "converter": "int",
          "options": { "justify": "right", "pad-character": "0" }
        },
        { "name": "name", "extract": { "start": 5, "length": 10 } }
      ],
      "lines": [
        {
          "layout": { "type": "delimited", "delimiter": ";" },
          "fields": [
            { "name": "street", "extract": { "index": 0 } },
            { "name": "city", "extract": { "index": 1 } }
          ]
        },
        {
          "identity": [{ "type": "literal", "start": 0, "values": ["P"] }],
          "fields": [
            { "name": "phone_type", "extract": { "start": 0, "length": 1 }, "binding": { "literal": "P" } },
            { "name": "phone", "extract": { "start": 1, "length": 10 } }
          ]
        },
        {
          "identity": [{ "type": "literal", "start": 0, "values": ["END"] }],
          "fields": [
            { "name": "marker", "extract": { "start": 0, "length": 3 }, "binding": { "literal": "END" } }
          ],
          "record_end": true
        }
      ],
      "segments": [
        {
          "property": "orders",
          "record": {
            "name": "ORD",
            "identity": [{ "type": "literal", "start": 0, "values": ["O"] }],
            "fields": [
              { "name": "type", "extract": { "start": 0, "length": 1 }, "binding": { "literal": "O" } },
              {
                "name": "amount",
                "extract": { "start": 1, "length": 7 },
                "converter": "decimal",
                "options": { "decimal-places": "2", "justify": "right" }
              }
            ]
          }
        }
      ]
    }
  ]
}"#;

const CUSTOMERS: &str = "C0001Ann Lee   \n12 Main St;Springfield\nP5550001   \nEND\nO  12.50\nC0002Bo        \n9 Elm;Shelbyville\nEND\n";

fn customer_engine() -> Engine {
    Engine::new(
        Arc::new(Schema::from_json_str(CUSTOMER_SCHEMA).unwrap()),
        Arc::new(ConverterRegistry::with_builtins()),
        EngineConfig::default(),
    )
    .unwrap()
}

fn expected_customers() -> Vec<RecordNode> {
    vec![
        RecordNode::new("CUST")
            .with_field("id", 1i64)
            .with_field("name", "Ann Lee")
            .with_field("street", "12 Main St")
            .with_field("city", "Springfield")
            .with_field("phone", "5550001")
            .with_children("orders", vec![RecordNode::new("ORD").with_field("amount", 12.5)]),
        RecordNode::new("CUST")
            .with_field("id", 2i64)
            .with_field("name", "Bo")
            .with_field("street", "9 Elm")
            .with_field("city", "Shelbyville"),
    ]
}

#[test]
fn test_parse_multi_line_records() {
    let engine = customer_engine();
    let mut reader = engine.read_str(CUSTOMERS);
    let records: Vec<_> = reader
        .read_all()
        .unwrap()
        .into_iter()
        .filter_map(ReadEvent::into_record)
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].line_number, 1);
    assert_eq!(records[0].line, "C0001Ann Lee   ");
    assert_eq!(records[1].line_number, 6);
    assert!(records.iter().all(|r| r.is_clean()));

    let nodes: Vec<RecordNode> = records.into_iter().map(|r| r.into_node().unwrap()).collect();
    assert_eq!(nodes, expected_customers());

    let stats = reader.statistics();
    assert_eq!(stats.records_parsed, 2);
    assert_eq!(stats.lines_read, 8);
}

#[test]
fn test_format_multi_line_records() {
    let engine = customer_engine();
    let mut writer = engine.writer(Vec::new());
    for node in expected_customers() {
        assert!(writer.write_node(&node).unwrap().is_empty());
    }
    assert_eq!(writer.statistics().lines_written, 8);
    assert_eq!(writer.into_sink().join("\n") + "\n", CUSTOMERS);
}

#[test]
fn test_input_ending_inside_record_is_incomplete() {
    let engine = customer_engine();
    let mut reader = engine.read_str("C0001Ann Lee   \n12 Main St;Springfield\nEND\nC0003Cy        \n");

    assert!(reader.next_event().unwrap().is_some());
    assert_matches!(
        reader.next_event(),
        Err(EngineError::Structural(StructuralError::IncompleteRecord {
            expected: 2,
            found: 1,
            line_number: Some(4),
            ..
        }))
    );
    assert!(reader.next_event().unwrap().is_none());
    assert_eq!(reader.statistics().structural_errors, 1);
}

#[test]
fn test_identified_lines_without_end_marker() {
    let record = RecordDefinition::fixed("ACCT")
        .with_identity(IdentityRule::literal(0, "A"))
        .with_field(FieldDefinition::column("type", 0, 1).literal("A"))
        .with_field(FieldDefinition::column("number", 1, 6))
        .with_line(
            LineDefinition::fixed()
                .with_identity(IdentityRule::literal(0, "N"))
                .with_field(FieldDefinition::column("type_n", 0, 1).literal("N"))
                .with_field(FieldDefinition::column("note", 1, 7)),
        )
        .with_line(
            LineDefinition::delimited(',')
                .with_identity(IdentityRule::literal(0, "B,"))
                .with_field(FieldDefinition::token("type_b", 0).literal("B"))
                .with_field(FieldDefinition::token("balance", 1).with_converter("decimal")),
        );
    let engine = Engine::new(
        Arc::new(Schema::new(vec![record])),
        Arc::new(ConverterRegistry::with_builtins()),
        EngineConfig::default(),
    )
    .unwrap();

    let nodes: Vec<RecordNode> = engine
        .read_str("A000001\nB,10.5\nNoverdue\nA000002\n")
        .read_all()
        .unwrap()
        .into_iter()
        .filter_map(ReadEvent::into_record)
        .map(|r| r.into_node().unwrap())
        .collect();

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].field("balance"), Some(&Value::Decimal(10.5)));
    assert_eq!(nodes[0].field("note"), Some(&Value::from("overdue")));
    assert_eq!(nodes[1].field("number"), Some(&Value::from("000002")));
    assert_eq!(nodes[1].field("note"), None);
}
