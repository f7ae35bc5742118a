//! Mapping between [`Event`] and its generic table form.
//!
//! A table is a JSON object with a `type` field naming the event kind plus
//! the kind's own fields, e.g.
//!
//! ```json
//! {"type": "SCALAR", "value": "hello", "style": "PLAIN"}
//! ```
//!
//! `null` is treated the same as an absent field. Empty `anchor`/`tag`
//! strings are treated as absent too, so a table produced by the parser can
//! be handed straight back to the emitter.

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::event::{CollectionStyle, Event, Mark, ScalarStyle, TagDirective, VersionDirective};

/// Encoding token accepted on `STREAM_START`. The engine only writes UTF-8.
pub const UTF8: &str = "UTF8";

/// Converts a table into an event, validating every field the kind uses.
pub fn event_from_table(table: &Value) -> Result<Event> {
    let Some(table) = table.as_object() else {
        return Err(Error::invalid_option("event table", display(table)));
    };

    let kind = match field(table, "type") {
        None => return Err(Error::MissingKind),
        Some(Value::String(kind)) => kind.as_str(),
        Some(other) => return Err(Error::InvalidKind(display(other))),
    };

    match kind {
        "SCALAR" => scalar(table),
        "MAPPING_START" => {
            let (anchor, tag, implicit, style) = collection(table, "mapping style")?;
            Ok(Event::MappingStart {
                anchor,
                tag,
                implicit,
                style,
            })
        }
        "MAPPING_END" => Ok(Event::MappingEnd),
        "SEQUENCE_START" => {
            let (anchor, tag, implicit, style) = collection(table, "sequence style")?;
            Ok(Event::SequenceStart {
                anchor,
                tag,
                implicit,
                style,
            })
        }
        "SEQUENCE_END" => Ok(Event::SequenceEnd),
        "DOCUMENT_START" => document_start(table),
        // An end marker is written unless asked otherwise.
        "DOCUMENT_END" => Ok(Event::DocumentEnd {
            implicit: boolean(table, "implicit", false)?,
        }),
        "STREAM_START" => {
            if let Some(encoding) = field(table, "encoding") {
                if encoding.as_str() != Some(UTF8) {
                    return Err(Error::invalid_option("stream encoding", display(encoding)));
                }
            }
            Ok(Event::StreamStart)
        }
        "STREAM_END" => Ok(Event::StreamEnd),
        "ALIAS" => match string(table, "anchor", "alias anchor")? {
            Some(anchor) if !anchor.is_empty() => Ok(Event::Alias {
                anchor: anchor.to_owned(),
            }),
            _ => Err(Error::missing("ALIAS", "anchor")),
        },
        other => Err(Error::InvalidKind(other.to_owned())),
    }
}

/// Converts an event into its table form.
///
/// Anchors and tags that are absent are written as empty strings, matching
/// what the parser reports.
pub fn event_to_table(event: &Event) -> Value {
    let mut table = Map::new();
    table.insert("type".into(), json!(event.kind()));

    match event {
        Event::StreamStart => {
            table.insert("encoding".into(), json!(UTF8));
        }
        Event::DocumentStart {
            implicit,
            version_directive,
            tag_directives,
        } => {
            table.insert("implicit".into(), json!(implicit));
            if let Some(version) = version_directive {
                table.insert("version_directive".into(), json!(version));
            }
            if !tag_directives.is_empty() {
                table.insert("tag_directives".into(), json!(tag_directives));
            }
        }
        Event::DocumentEnd { implicit } => {
            table.insert("implicit".into(), json!(implicit));
        }
        Event::MappingStart {
            anchor,
            tag,
            implicit,
            style,
        }
        | Event::SequenceStart {
            anchor,
            tag,
            implicit,
            style,
        } => {
            table.insert("anchor".into(), json!(anchor.as_deref().unwrap_or("")));
            table.insert("tag".into(), json!(tag.as_deref().unwrap_or("")));
            table.insert("implicit".into(), json!(implicit));
            table.insert("style".into(), json!(style.as_str()));
        }
        Event::Scalar {
            anchor,
            tag,
            value,
            plain_implicit,
            quoted_implicit,
            style,
        } => {
            table.insert("anchor".into(), json!(anchor.as_deref().unwrap_or("")));
            table.insert("tag".into(), json!(tag.as_deref().unwrap_or("")));
            table.insert("value".into(), json!(value));
            table.insert("plain_implicit".into(), json!(plain_implicit));
            table.insert("quoted_implicit".into(), json!(quoted_implicit));
            table.insert("style".into(), json!(style.as_str()));
        }
        Event::Alias { anchor } => {
            table.insert("anchor".into(), json!(anchor));
        }
        Event::StreamEnd | Event::MappingEnd | Event::SequenceEnd => {}
    }

    Value::Object(table)
}

pub(crate) fn mark_to_table(mark: &Mark) -> Value {
    json!(mark)
}

fn scalar(table: &Map<String, Value>) -> Result<Event> {
    let style = match string(table, "style", "scalar style")? {
        None => ScalarStyle::Any,
        Some(token) => ScalarStyle::from_token(token)
            .ok_or_else(|| Error::invalid_option("scalar style", token))?,
    };
    let anchor = name(table, "anchor", "scalar anchor")?;
    let tag = name(table, "tag", "scalar tag")?;
    let value = string(table, "value", "scalar value")?
        .ok_or_else(|| Error::missing("SCALAR", "value"))?
        .to_owned();

    Ok(Event::Scalar {
        anchor,
        tag,
        value,
        plain_implicit: boolean(table, "plain_implicit", true)?,
        quoted_implicit: boolean(table, "quoted_implicit", true)?,
        style,
    })
}

type CollectionFields = (Option<String>, Option<String>, bool, CollectionStyle);

fn collection(table: &Map<String, Value>, what: &'static str) -> Result<CollectionFields> {
    let style = match string(table, "style", what)? {
        None => CollectionStyle::Any,
        Some(token) => {
            CollectionStyle::from_token(token).ok_or_else(|| Error::invalid_option(what, token))?
        }
    };
    let anchor = name(table, "anchor", "anchor")?;
    let tag = name(table, "tag", "tag")?;
    let implicit = boolean(table, "implicit", true)?;

    Ok((anchor, tag, implicit, style))
}

fn document_start(table: &Map<String, Value>) -> Result<Event> {
    let version_directive = match field(table, "version_directive") {
        None => None,
        Some(Value::Object(version)) => Some(VersionDirective {
            major: version_number(version, "major")?,
            minor: version_number(version, "minor")?,
        }),
        Some(other) => return Err(Error::invalid_option("version_directive", display(other))),
    };

    let tag_directives = match field(table, "tag_directives") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(tag_directive)
            .collect::<Result<Vec<_>>>()?,
        Some(other) => return Err(Error::invalid_option("tag_directives", display(other))),
    };

    Ok(Event::DocumentStart {
        implicit: boolean(table, "implicit", true)?,
        version_directive,
        tag_directives,
    })
}

fn version_number(version: &Map<String, Value>, key: &'static str) -> Result<i32> {
    let value = field(version, key).ok_or_else(|| Error::missing("version_directive", key))?;
    value
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| Error::invalid_option("version number", display(value)))
}

fn tag_directive(item: &Value) -> Result<TagDirective> {
    let Some(item) = item.as_object() else {
        return Err(Error::missing("tag_directives item", "handle"));
    };
    let handle = string(item, "handle", "tag handle")?
        .ok_or_else(|| Error::missing("tag_directives item", "handle"))?;
    let prefix = string(item, "prefix", "tag prefix")?
        .ok_or_else(|| Error::missing("tag_directives item", "prefix"))?;

    Ok(TagDirective {
        handle: handle.to_owned(),
        prefix: prefix.to_owned(),
    })
}

fn field<'a>(table: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    table.get(key).filter(|value| !value.is_null())
}

fn string<'a>(
    table: &'a Map<String, Value>,
    key: &str,
    what: &'static str,
) -> Result<Option<&'a str>> {
    match field(table, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(Error::invalid_option(what, display(other))),
    }
}

/// Anchor or tag; the empty string means "none".
fn name(table: &Map<String, Value>, key: &str, what: &'static str) -> Result<Option<String>> {
    Ok(string(table, key, what)?
        .filter(|s| !s.is_empty())
        .map(str::to_owned))
}

fn boolean(table: &Map<String, Value>, key: &str, default: bool) -> Result<bool> {
    match field(table, key) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(Error::invalid_option("boolean flag", display(other))),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
