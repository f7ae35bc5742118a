use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use yaml_events::{
    CollectionStyle, Emitter, Error, Event, Parser, ScalarStyle, TagDirective, VersionDirective,
};

const TEST_DATA_DIR: &str = "tests/test_data";

fn fixture(name: &str) -> String {
    let path: PathBuf = Path::new(TEST_DATA_DIR).join(name);
    if !path.exists() {
        panic!("File not found: {}", path.display());
    }
    fs::read_to_string(&path).unwrap()
}

/// Simplified event for comparisons (ignores marks, styles and the
/// implicit flags, which the emitter is free to choose).
#[derive(Debug, Clone, PartialEq)]
enum E {
    StreamStart,
    StreamEnd,
    DocStart(Option<(i32, i32)>, Vec<(String, String)>),
    DocEnd,
    MapStart(Option<String>, Option<String>),
    MapEnd,
    SeqStart(Option<String>, Option<String>),
    SeqEnd,
    Scalar(Option<String>, Option<String>, String),
    Alias(String),
}

impl From<Event> for E {
    fn from(event: Event) -> Self {
        match event {
            Event::StreamStart => E::StreamStart,
            Event::StreamEnd => E::StreamEnd,
            Event::DocumentStart {
                version_directive,
                tag_directives,
                ..
            } => E::DocStart(
                version_directive.map(|v| (v.major, v.minor)),
                tag_directives
                    .into_iter()
                    .map(|t| (t.handle, t.prefix))
                    .collect(),
            ),
            Event::DocumentEnd { .. } => E::DocEnd,
            Event::MappingStart { anchor, tag, .. } => E::MapStart(anchor, tag),
            Event::MappingEnd => E::MapEnd,
            Event::SequenceStart { anchor, tag, .. } => E::SeqStart(anchor, tag),
            Event::SequenceEnd => E::SeqEnd,
            Event::Scalar {
                anchor, tag, value, ..
            } => E::Scalar(anchor, tag, value),
            Event::Alias { anchor } => E::Alias(anchor),
        }
    }
}

fn decode(input: &str) -> Vec<E> {
    Parser::new(input)
        .unwrap()
        .map(|event| E::from(event.expect("Failed to parse YAML").event))
        .collect()
}

fn decode_tables(input: &str) -> Vec<Value> {
    Parser::new(input)
        .unwrap()
        .into_tables()
        .collect::<Result<_, _>>()
        .expect("Failed to parse YAML")
}

fn encode(events: &[Event]) -> String {
    let mut emitter = Emitter::new().unwrap();
    let mut text = None;
    for event in events {
        text = emitter.emit(event).expect("Failed to emit event");
    }
    text.expect("STREAM_END returns the document")
}

fn encode_tables(tables: &[Value]) -> String {
    let mut emitter = Emitter::new().unwrap();
    let mut text = None;
    for table in tables {
        text = emitter.emit_table(table).expect("Failed to emit table");
    }
    text.expect("STREAM_END returns the document")
}

fn scalar(value: &str, style: ScalarStyle) -> Event {
    Event::Scalar {
        anchor: None,
        tag: None,
        value: value.into(),
        plain_implicit: true,
        quoted_implicit: true,
        style,
    }
}

#[test]
fn test_every_kind_round_trips() {
    let events = vec![
        Event::StreamStart,
        Event::DocumentStart {
            implicit: false,
            version_directive: Some(VersionDirective { major: 1, minor: 1 }),
            tag_directives: vec![TagDirective {
                handle: "!e!".into(),
                prefix: "tag:example.com,2000:".into(),
            }],
        },
        Event::SequenceStart {
            anchor: Some("items".into()),
            tag: None,
            implicit: true,
            style: CollectionStyle::Block,
        },
        Event::Scalar {
            anchor: Some("s".into()),
            tag: Some("tag:example.com,2000:word".into()),
            value: "plain".into(),
            plain_implicit: false,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        },
        Event::alias("s"),
        Event::mapping_start(CollectionStyle::Flow),
        scalar("k", ScalarStyle::Any),
        scalar("v", ScalarStyle::DoubleQuoted),
        Event::MappingEnd,
        Event::SequenceEnd,
        Event::document_end(false),
        Event::StreamEnd,
    ];

    let text = encode(&events);
    let decoded = decode(&text);
    let expected: Vec<E> = events.into_iter().map(E::from).collect();
    assert_eq!(decoded, expected);
}

#[test]
fn test_independent_emitters_agree() {
    let events = [
        Event::StreamStart,
        Event::document_start(true),
        Event::mapping_start(CollectionStyle::Any),
        Event::scalar("k"),
        Event::scalar("v"),
        Event::MappingEnd,
        Event::document_end(true),
        Event::StreamEnd,
    ];
    let first = encode(&events);
    let second = encode(&events);
    assert_eq!(first, second);
    assert_eq!(first, "k: v\n");
}

#[test]
fn test_hello_document_from_tables() {
    let text = encode_tables(&[
        json!({ "type": "STREAM_START" }),
        json!({ "type": "DOCUMENT_START", "implicit": true }),
        json!({ "type": "SCALAR", "value": "hello", "style": "PLAIN" }),
        json!({ "type": "DOCUMENT_END", "implicit": true }),
        json!({ "type": "STREAM_END" }),
    ]);
    assert!(text.starts_with("hello\n"), "{text:?}");
    assert!(!text.contains(':') && !text.contains("- ") && !text.contains('['));
    assert_eq!(
        decode(&text),
        [
            E::StreamStart,
            E::DocStart(None, vec![]),
            E::Scalar(None, None, "hello".into()),
            E::DocEnd,
            E::StreamEnd,
        ]
    );
}

#[test]
fn test_decode_key_value_tables() {
    let tables = decode_tables("key: value\n");
    let types: Vec<_> = tables.iter().map(|t| t["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        [
            "STREAM_START",
            "DOCUMENT_START",
            "MAPPING_START",
            "SCALAR",
            "SCALAR",
            "MAPPING_END",
            "DOCUMENT_END",
            "STREAM_END",
        ]
    );

    assert_eq!(tables[0]["encoding"], "UTF8");
    assert_eq!(tables[1]["implicit"], true);
    assert_eq!(tables[2]["style"], "BLOCK");
    assert_eq!(tables[2]["implicit"], true);
    assert_eq!(tables[2]["anchor"], "");
    assert_eq!(tables[2]["tag"], "");
    assert_eq!(tables[3]["value"], "key");
    assert_eq!(tables[3]["plain_implicit"], false);
    assert_eq!(tables[3]["quoted_implicit"], false);
    assert_eq!(tables[4]["value"], "value");
    assert_eq!(tables[4]["style"], "PLAIN");
    assert_eq!(
        tables[3]["start_mark"],
        json!({ "index": 0, "line": 0, "column": 0 })
    );
    assert_eq!(
        tables[3]["end_mark"],
        json!({ "index": 3, "line": 0, "column": 3 })
    );

    let mut previous = 0;
    for table in &tables {
        let start = table["start_mark"]["index"].as_u64().unwrap();
        let end = table["end_mark"]["index"].as_u64().unwrap();
        assert!(start <= end);
        assert!(previous <= start);
        previous = start;
    }
}

#[test]
fn test_embedded_zero_byte() {
    let text = encode(&[
        Event::StreamStart,
        Event::document_start(true),
        scalar("a\0b", ScalarStyle::Any),
        Event::document_end(true),
        Event::StreamEnd,
    ]);
    let values: Vec<_> = decode(&text)
        .into_iter()
        .filter_map(|e| match e {
            E::Scalar(_, _, value) => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(values, ["a\0b"]);
}

#[test]
fn test_empty_root_scalar_round_trips() {
    for style in [Value::Null, json!("PLAIN"), json!("SINGLE_QUOTED")] {
        let text = encode_tables(&[
            json!({ "type": "STREAM_START" }),
            json!({ "type": "DOCUMENT_START" }),
            json!({ "type": "SCALAR", "value": "", "style": style }),
            json!({ "type": "DOCUMENT_END", "implicit": true }),
            json!({ "type": "STREAM_END" }),
        ]);
        assert_eq!(
            decode(&text),
            [
                E::StreamStart,
                E::DocStart(None, vec![]),
                E::Scalar(None, None, String::new()),
                E::DocEnd,
                E::StreamEnd,
            ],
            "{style}: {text:?}"
        );
    }
}

#[test]
fn test_document_end_marker_by_default() {
    let text = encode_tables(&[
        json!({ "type": "STREAM_START" }),
        json!({ "type": "DOCUMENT_START" }),
        json!({ "type": "SCALAR", "value": "hello", "style": "PLAIN" }),
        json!({ "type": "DOCUMENT_END" }),
        json!({ "type": "STREAM_END" }),
    ]);
    assert_eq!(text, "hello\n...\n");

    let tables = decode_tables(&text);
    assert_eq!(tables[3]["type"], "DOCUMENT_END");
    assert_eq!(tables[3]["implicit"], false);
}

#[test]
fn test_alias_without_anchor_is_a_decode_failure() {
    let last = Parser::new("list:\n  - *\n").unwrap().last();
    assert!(matches!(last, Some(Err(Error::DecodeFailure { .. }))));
}

#[test]
fn test_bogus_style_and_missing_major() {
    let mut emitter = Emitter::new().unwrap();
    emitter.emit_table(&json!({ "type": "STREAM_START" })).unwrap();

    let err = emitter
        .emit_table(&json!({ "type": "MAPPING_START", "style": "BOGUS" }))
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid mapping style 'BOGUS'");

    let err = emitter
        .emit_table(&json!({ "type": "DOCUMENT_START", "version_directive": { "minor": 1 } }))
        .unwrap_err();
    assert!(err.to_string().contains("major"));
}

#[test]
fn test_scalar_styles_fixture() {
    let tables = decode_tables(&fixture("scalars.yaml"));
    let styles: Vec<_> = tables
        .iter()
        .filter(|t| t["type"] == "SCALAR" && t["value"] != "")
        .filter(|t| t["style"] != "PLAIN" || t["value"] == "hello world")
        .map(|t| t["style"].as_str().unwrap())
        .collect();
    assert_eq!(
        styles,
        ["PLAIN", "SINGLE_QUOTED", "DOUBLE_QUOTED", "LITERAL", "FOLDED"]
    );

    let values: Vec<_> = tables
        .iter()
        .filter(|t| t["type"] == "SCALAR")
        .map(|t| t["value"].as_str().unwrap())
        .collect();
    assert!(values.contains(&"it's quoted"));
    assert!(values.contains(&"tab\there"));
    assert!(values.contains(&"line one\nline two\n"));
    assert!(values.contains(&"folded text\n"));
}

#[test]
fn test_directives_fixture() {
    let events = decode(&fixture("directives.yaml"));
    assert_eq!(
        events[1],
        E::DocStart(
            Some((1, 1)),
            vec![("!e!".into(), "tag:example.com,2000:".into())]
        )
    );
    assert_eq!(
        events[2],
        E::MapStart(None, Some("tag:example.com,2000:config".into()))
    );
    assert!(events.contains(&E::Scalar(None, None, "second".into())));
}

#[test]
fn test_anchors_fixture() {
    let events = decode(&fixture("anchors.yaml"));
    assert!(events.contains(&E::MapStart(Some("base".into()), None)));
    assert!(events.contains(&E::Alias("base".into())));
    assert!(events.contains(&E::Alias("first".into())));
    assert!(events.contains(&E::Scalar(
        None,
        Some("tag:yaml.org,2002:str".into()),
        "42".into()
    )));
}

#[test]
fn test_fixtures_survive_table_round_trip() {
    for name in ["scalars.yaml", "anchors.yaml", "directives.yaml"] {
        let source = fixture(name);
        let text = encode_tables(&decode_tables(&source));
        assert_eq!(decode(&text), decode(&source), "{name}: {text}");
    }
}

#[test]
fn test_broken_fixture_reports_document() {
    let results: Vec<_> = Parser::new(&fixture("broken.yaml")).unwrap().collect();
    let Some(Err(err)) = results.last() else {
        panic!("expected a parse error");
    };
    assert!(matches!(err, Error::DecodeFailure { document: 2, .. }), "{err}");
    assert!(err.to_string().contains("at document: 2"));
    assert!(results[..results.len() - 1].iter().all(Result::is_ok));
}
