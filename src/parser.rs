use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::os::raw::c_char;
use std::slice;

use serde_json::Value;
use unsafe_libyaml as sys;

use crate::error::{Error, Result};
use crate::event::{CollectionStyle, Event, Mark, ScalarStyle, TagDirective, VersionDirective};
use crate::table::{event_to_table, mark_to_table};

/// An event as reported by the parser, with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    pub event: Event,
    pub start_mark: Mark,
    pub end_mark: Mark,
}

impl ParsedEvent {
    /// Table form of the event, with `start_mark` and `end_mark` entries.
    pub fn to_table(&self) -> Value {
        let mut table = event_to_table(&self.event);
        if let Value::Object(fields) = &mut table {
            fields.insert("start_mark".into(), mark_to_table(&self.start_mark));
            fields.insert("end_mark".into(), mark_to_table(&self.end_mark));
        }
        table
    }
}

/// Pull parser over a complete YAML string.
///
/// Yields one [`ParsedEvent`] per engine event until `STREAM_END`, or a
/// single `Err` when the input cannot be parsed. The iterator is fused and
/// cannot be restarted; build a new parser for new input.
pub struct Parser {
    parser: *mut sys::yaml_parser_t,
    input: *mut [u8],
    // Engine-owned storage for the event currently in flight.
    event: *mut sys::yaml_event_t,
    holding_event: bool,
    document_count: usize,
    finished: bool,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self> {
        let parser = Box::into_raw(Box::new(MaybeUninit::<sys::yaml_parser_t>::uninit()))
            .cast::<sys::yaml_parser_t>();
        let event = Box::into_raw(Box::new(MaybeUninit::<sys::yaml_event_t>::uninit()))
            .cast::<sys::yaml_event_t>();
        let input = Box::into_raw(Box::<[u8]>::from(input.as_bytes()));

        unsafe {
            if sys::yaml_parser_initialize(parser).fail {
                drop(Box::from_raw(parser.cast::<MaybeUninit<sys::yaml_parser_t>>()));
                drop(Box::from_raw(event.cast::<MaybeUninit<sys::yaml_event_t>>()));
                drop(Box::from_raw(input));
                return Err(Error::EngineFailure("cannot initialize parser".into()));
            }
            sys::yaml_parser_set_input_string(parser, input.cast::<u8>(), input.len() as u64);
        }

        log::debug!("created parser over {} bytes", input.len());
        Ok(Self {
            parser,
            input,
            event,
            holding_event: false,
            document_count: 0,
            finished: false,
        })
    }

    /// Number of `DOCUMENT_START` events seen so far.
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// Adapts the parser to yield tables instead of typed events.
    pub fn into_tables(self) -> impl Iterator<Item = Result<Value>> {
        self.map(|event| event.map(|event| event.to_table()))
    }

    fn release_event(&mut self) {
        if self.holding_event {
            unsafe { sys::yaml_event_delete(self.event) };
            self.holding_event = false;
        }
    }

    fn parse_failure(&self) -> Error {
        let (problem, context, mark) = unsafe {
            let parser = &*self.parser;
            (
                c_text(parser.problem),
                c_text(parser.context),
                mark_of(&parser.problem_mark),
            )
        };
        let (problem, mark) = match problem {
            Some(problem) => (problem, Some(mark)),
            None => ("A problem".to_owned(), None),
        };
        let problem = match context {
            Some(context) => format!("{context}, {problem}"),
            None => problem,
        };
        log::warn!("parse failed in document {}: {}", self.document_count, problem);
        Error::DecodeFailure {
            problem,
            document: self.document_count,
            mark,
        }
    }

    /// Converts the event in flight. `Ok(None)` is the engine's "no event".
    unsafe fn convert(&mut self) -> Result<Option<ParsedEvent>> {
        let raw = unsafe { &*self.event };
        let start_mark = mark_of(&raw.start_mark);
        let end_mark = mark_of(&raw.end_mark);

        let event = match raw.type_ {
            sys::YAML_NO_EVENT => return Ok(None),
            sys::YAML_STREAM_START_EVENT => Event::StreamStart,
            sys::YAML_STREAM_END_EVENT => Event::StreamEnd,
            sys::YAML_DOCUMENT_START_EVENT => {
                self.document_count += 1;
                let data = unsafe { &raw.data.document_start };
                let version_directive = unsafe { data.version_directive.as_ref() }.map(|v| {
                    VersionDirective {
                        major: v.major,
                        minor: v.minor,
                    }
                });
                let mut tag_directives = Vec::new();
                let mut cursor = data.tag_directives.start;
                while !cursor.is_null() && cursor < data.tag_directives.end {
                    let tag = unsafe { &*cursor };
                    tag_directives.push(TagDirective {
                        handle: unsafe { c_text(tag.handle.cast::<c_char>()) }.unwrap_or_default(),
                        prefix: unsafe { c_text(tag.prefix.cast::<c_char>()) }.unwrap_or_default(),
                    });
                    cursor = unsafe { cursor.add(1) };
                }
                Event::DocumentStart {
                    implicit: data.implicit,
                    version_directive,
                    tag_directives,
                }
            }
            sys::YAML_DOCUMENT_END_EVENT => Event::DocumentEnd {
                implicit: unsafe { raw.data.document_end.implicit },
            },
            sys::YAML_ALIAS_EVENT => {
                let anchor = unsafe { c_text(raw.data.alias.anchor.cast::<c_char>()) };
                let Some(anchor) = anchor else {
                    return Err(Error::DecodeFailure {
                        problem: "alias without anchor text".into(),
                        document: self.document_count,
                        mark: Some(start_mark),
                    });
                };
                Event::Alias { anchor }
            }
            sys::YAML_SCALAR_EVENT => {
                let data = unsafe { &raw.data.scalar };
                let style = match data.style {
                    sys::YAML_ANY_SCALAR_STYLE => ScalarStyle::Any,
                    sys::YAML_PLAIN_SCALAR_STYLE => ScalarStyle::Plain,
                    sys::YAML_SINGLE_QUOTED_SCALAR_STYLE => ScalarStyle::SingleQuoted,
                    sys::YAML_DOUBLE_QUOTED_SCALAR_STYLE => ScalarStyle::DoubleQuoted,
                    sys::YAML_LITERAL_SCALAR_STYLE => ScalarStyle::Literal,
                    sys::YAML_FOLDED_SCALAR_STYLE => ScalarStyle::Folded,
                    #[allow(unreachable_patterns)]
                    _ => return Err(Error::InternalInconsistency("invalid scalar style".into())),
                };
                let value = if data.value.is_null() {
                    String::new()
                } else {
                    let bytes = unsafe { slice::from_raw_parts(data.value, data.length as usize) };
                    String::from_utf8(bytes.to_vec()).map_err(|_| {
                        Error::InternalInconsistency("scalar value is not UTF-8".into())
                    })?
                };
                Event::Scalar {
                    anchor: unsafe { c_text(data.anchor.cast::<c_char>()) },
                    tag: unsafe { c_text(data.tag.cast::<c_char>()) },
                    value,
                    // The engine does not report these.
                    plain_implicit: false,
                    quoted_implicit: false,
                    style,
                }
            }
            sys::YAML_SEQUENCE_START_EVENT => {
                let data = unsafe { &raw.data.sequence_start };
                let style = match data.style {
                    sys::YAML_ANY_SEQUENCE_STYLE => CollectionStyle::Any,
                    sys::YAML_BLOCK_SEQUENCE_STYLE => CollectionStyle::Block,
                    sys::YAML_FLOW_SEQUENCE_STYLE => CollectionStyle::Flow,
                    #[allow(unreachable_patterns)]
                    _ => {
                        return Err(Error::InternalInconsistency(
                            "invalid sequence style".into(),
                        ));
                    }
                };
                Event::SequenceStart {
                    anchor: unsafe { c_text(data.anchor.cast::<c_char>()) },
                    tag: unsafe { c_text(data.tag.cast::<c_char>()) },
                    implicit: data.implicit,
                    style,
                }
            }
            sys::YAML_SEQUENCE_END_EVENT => Event::SequenceEnd,
            sys::YAML_MAPPING_START_EVENT => {
                let data = unsafe { &raw.data.mapping_start };
                let style = match data.style {
                    sys::YAML_ANY_MAPPING_STYLE => CollectionStyle::Any,
                    sys::YAML_BLOCK_MAPPING_STYLE => CollectionStyle::Block,
                    sys::YAML_FLOW_MAPPING_STYLE => CollectionStyle::Flow,
                    #[allow(unreachable_patterns)]
                    _ => {
                        return Err(Error::InternalInconsistency(
                            "invalid mapping style".into(),
                        ));
                    }
                };
                Event::MappingStart {
                    anchor: unsafe { c_text(data.anchor.cast::<c_char>()) },
                    tag: unsafe { c_text(data.tag.cast::<c_char>()) },
                    implicit: data.implicit,
                    style,
                }
            }
            sys::YAML_MAPPING_END_EVENT => Event::MappingEnd,
            #[allow(unreachable_patterns)]
            _ => return Err(Error::InternalInconsistency("invalid event type".into())),
        };

        Ok(Some(ParsedEvent {
            event,
            start_mark,
            end_mark,
        }))
    }
}

impl Iterator for Parser {
    type Item = Result<ParsedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.release_event();
        if unsafe { sys::yaml_parser_parse(self.parser, self.event) }.fail {
            self.finished = true;
            return Some(Err(self.parse_failure()));
        }
        self.holding_event = true;

        match unsafe { self.convert() } {
            Ok(Some(parsed)) => {
                log::trace!("parsed {} at {:?}", parsed.event.kind(), parsed.start_mark);
                if matches!(parsed.event, Event::StreamEnd) {
                    self.finished = true;
                }
                Some(Ok(parsed))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Parser {}

impl Drop for Parser {
    fn drop(&mut self) {
        log::debug!("releasing parser after {} documents", self.document_count);
        self.release_event();
        unsafe {
            sys::yaml_parser_delete(self.parser);
            drop(Box::from_raw(
                self.parser.cast::<MaybeUninit<sys::yaml_parser_t>>(),
            ));
            drop(Box::from_raw(
                self.event.cast::<MaybeUninit<sys::yaml_event_t>>(),
            ));
            drop(Box::from_raw(self.input));
        }
    }
}

fn mark_of(mark: &sys::yaml_mark_t) -> Mark {
    Mark {
        index: mark.index as u64,
        line: mark.line as u64,
        column: mark.column as u64,
    }
}

/// Copies a NUL-terminated engine string; `None` for a null pointer.
unsafe fn c_text(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}
