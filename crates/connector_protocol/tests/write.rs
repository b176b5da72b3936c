use connector_protocol::{
    format_message, parse_line, ActivateVersionMessage, BatchEncoding, BatchFileFormat,
    BatchMessage, Message, MessageWriter, RecordMessage, SchemaMessage, StateMessage,
};
use serde_json::{json, Map, Value};
use time::macros::datetime;

fn record(fields: Value) -> Map<String, Value> {
    match fields {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn schema_always_carries_key_properties() {
    let message = SchemaMessage::new("users", json!({"type": "object"}));
    assert_eq!(
        format_message(&message.clone().into()).unwrap(),
        r#"{"type":"SCHEMA","stream":"users","schema":{"type":"object"},"key_properties":[]}"#
    );

    let message = message
        .with_key_properties(["id"])
        .with_bookmark_properties(["updated_at"]);
    assert_eq!(
        format_message(&message.into()).unwrap(),
        r#"{"type":"SCHEMA","stream":"users","schema":{"type":"object"},"key_properties":["id"],"bookmark_properties":["updated_at"]}"#
    );
}

#[test]
fn record_optional_fields_are_omitted_until_set() {
    let message = RecordMessage::new("users", record(json!({"id": 1})));
    assert_eq!(
        format_message(&message.clone().into()).unwrap(),
        r#"{"type":"RECORD","stream":"users","record":{"id":1}}"#
    );

    let message = message
        .with_time_extracted(datetime!(2024-05-01 12:30:00 UTC))
        .with_version(3);
    assert_eq!(
        format_message(&message.into()).unwrap(),
        r#"{"type":"RECORD","stream":"users","record":{"id":1},"time_extracted":"2024-05-01T12:30:00Z","version":3}"#
    );
}

#[test]
fn batch_and_activate_version_encode_their_fields() {
    let batch = BatchMessage {
        stream: "events".to_string(),
        encoding: BatchEncoding {
            format: BatchFileFormat::Parquet,
            compression: None,
        },
        manifest: vec!["s3://bucket/part-0.parquet".to_string()],
    };
    assert_eq!(
        format_message(&batch.into()).unwrap(),
        r#"{"type":"BATCH","stream":"events","encoding":{"format":"parquet"},"manifest":["s3://bucket/part-0.parquet"]}"#
    );

    let activate = ActivateVersionMessage {
        stream: "events".to_string(),
        version: 12,
    };
    assert_eq!(
        format_message(&activate.into()).unwrap(),
        r#"{"type":"ACTIVATE_VERSION","stream":"events","version":12}"#
    );
}

#[test]
fn read_then_write_preserves_numbers_and_key_order() {
    let line = r#"{"type":"RECORD","stream":"prices","record":{"sku":"a-1","price":1.10,"units":18446744073709551616}}"#;
    let message = parse_line(1, line).unwrap();
    assert_eq!(format_message(&message).unwrap(), line);
}

#[test]
fn writer_emits_lines_in_call_order() {
    let mut writer = MessageWriter::new(Vec::new());
    let messages: Vec<Message> = vec![
        SchemaMessage::new("a", json!({})).into(),
        RecordMessage::new("a", record(json!({"id": 1}))).into(),
        StateMessage {
            value: json!({"a": 1}),
        }
        .into(),
    ];
    for message in &messages {
        writer.write_message(message).unwrap();
    }

    let out = String::from_utf8(writer.into_inner()).unwrap();
    let parsed: Vec<Message> = out
        .lines()
        .enumerate()
        .map(|(idx, line)| parse_line(idx + 1, line).unwrap())
        .collect();
    assert_eq!(parsed, messages);
    assert!(out.ends_with('\n'));
}
