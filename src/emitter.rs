use std::ffi::{CStr, CString, c_void};
use std::mem::{self, MaybeUninit};
use std::ptr;
use std::slice;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use unsafe_libyaml as sys;

use crate::error::{Error, Result};
use crate::event::{CollectionStyle, Event, ScalarStyle, TagDirective, VersionDirective};
use crate::table::event_from_table;

pub const DEFAULT_WIDTH: i32 = 80;
pub const DEFAULT_INDENT: i32 = 2;

/// Output formatting knobs handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterOptions {
    /// Preferred line width.
    pub width: i32,
    pub indent: i32,
    /// Write non-ASCII characters as-is instead of escaping them.
    pub unicode: bool,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            indent: DEFAULT_INDENT,
            unicode: true,
        }
    }
}

/// Event-driven YAML writer.
///
/// Feed events in stream order with [`Emitter::emit`]. Every accepted event
/// returns `Ok(None)`, except `STREAM_END`, which returns the complete
/// document text.
pub struct Emitter {
    emitter: *mut sys::yaml_emitter_t,
    output: *mut Vec<u8>,
}

impl Emitter {
    /// Creates an emitter with default options (width 80, indent 2).
    pub fn new() -> Result<Self> {
        Self::with_options(EmitterOptions::default())
    }

    pub fn with_options(options: EmitterOptions) -> Result<Self> {
        let emitter = Box::into_raw(Box::new(MaybeUninit::<sys::yaml_emitter_t>::uninit()))
            .cast::<sys::yaml_emitter_t>();
        let output = Box::into_raw(Box::<Vec<u8>>::default());

        unsafe {
            if sys::yaml_emitter_initialize(emitter).fail {
                drop(Box::from_raw(emitter.cast::<MaybeUninit<sys::yaml_emitter_t>>()));
                drop(Box::from_raw(output));
                return Err(Error::EngineFailure("cannot initialize emitter".into()));
            }
            sys::yaml_emitter_set_output(emitter, append_output, output.cast());
            sys::yaml_emitter_set_width(emitter, options.width);
            sys::yaml_emitter_set_indent(emitter, options.indent);
            sys::yaml_emitter_set_unicode(emitter, options.unicode);
        }

        log::debug!("created emitter with {:?}", options);
        Ok(Self { emitter, output })
    }

    /// Validates `table` and emits the event it describes.
    pub fn emit_table(&mut self, table: &Value) -> Result<Option<String>> {
        let event = event_from_table(table)?;
        self.emit(&event)
    }

    pub fn emit(&mut self, event: &Event) -> Result<Option<String>> {
        log::trace!("emit {}", event.kind());

        let mut sys_event = MaybeUninit::<sys::yaml_event_t>::uninit();
        let sys_event = sys_event.as_mut_ptr();

        unsafe {
            initialize_event(sys_event, event)?;
            // The engine takes ownership of the event, on failure too.
            if sys::yaml_emitter_emit(self.emitter, sys_event).fail {
                return Err(self.engine_failure());
            }
        }

        if !matches!(event, Event::StreamEnd) {
            return Ok(None);
        }

        if unsafe { sys::yaml_emitter_flush(self.emitter) }.fail {
            return Err(self.engine_failure());
        }
        Ok(Some(String::from_utf8_lossy(self.output()).into_owned()))
    }

    /// Text written so far. After a failed call this is whatever the engine
    /// had flushed before the failure.
    pub fn output(&self) -> &[u8] {
        unsafe { &*self.output }
    }

    fn engine_failure(&self) -> Error {
        let problem = unsafe { (&*self.emitter).problem };
        let message = if problem.is_null() {
            "libyaml emit failed".to_owned()
        } else {
            let problem = unsafe { CStr::from_ptr(problem) };
            format!("libyaml emit failed: {}", problem.to_string_lossy())
        };
        log::warn!("{}", message);
        Error::EngineFailure(message)
    }
}

impl Drop for Emitter {
    fn drop(&mut self) {
        log::debug!("releasing emitter");
        unsafe {
            sys::yaml_emitter_delete(self.emitter);
            drop(Box::from_raw(
                self.emitter.cast::<MaybeUninit<sys::yaml_emitter_t>>(),
            ));
            drop(Box::from_raw(self.output));
        }
    }
}

unsafe fn append_output(data: *mut c_void, buffer: *mut u8, size: u64) -> i32 {
    let output = unsafe { &mut *data.cast::<Vec<u8>>() };
    output.extend_from_slice(unsafe { slice::from_raw_parts(buffer, size as usize) });
    1
}

/// Fills `sys_event` from `event`. The engine copies every string, so the
/// temporaries built here only need to outlive the initializer call.
unsafe fn initialize_event(sys_event: *mut sys::yaml_event_t, event: &Event) -> Result<()> {
    let failed = match event {
        Event::StreamStart => unsafe {
            sys::yaml_stream_start_event_initialize(sys_event, sys::YAML_UTF8_ENCODING).fail
        },
        Event::StreamEnd => unsafe { sys::yaml_stream_end_event_initialize(sys_event).fail },
        Event::DocumentStart {
            implicit,
            version_directive,
            tag_directives,
        } => unsafe { document_start(sys_event, *implicit, *version_directive, tag_directives)? },
        Event::DocumentEnd { implicit } => unsafe {
            sys::yaml_document_end_event_initialize(sys_event, *implicit).fail
        },
        Event::MappingStart {
            anchor, tag, style, ..
        } => {
            let anchor = c_opt(anchor.as_deref(), "anchor")?;
            let tag = c_opt(tag.as_deref(), "tag")?;
            let style = match style {
                CollectionStyle::Any => sys::YAML_ANY_MAPPING_STYLE,
                CollectionStyle::Block => sys::YAML_BLOCK_MAPPING_STYLE,
                CollectionStyle::Flow => sys::YAML_FLOW_MAPPING_STYLE,
            };
            unsafe {
                sys::yaml_mapping_start_event_initialize(
                    sys_event,
                    c_ptr(&anchor),
                    c_ptr(&tag),
                    tag.is_none(),
                    style,
                )
                .fail
            }
        }
        Event::MappingEnd => unsafe { sys::yaml_mapping_end_event_initialize(sys_event).fail },
        Event::SequenceStart {
            anchor, tag, style, ..
        } => {
            let anchor = c_opt(anchor.as_deref(), "anchor")?;
            let tag = c_opt(tag.as_deref(), "tag")?;
            let style = match style {
                CollectionStyle::Any => sys::YAML_ANY_SEQUENCE_STYLE,
                CollectionStyle::Block => sys::YAML_BLOCK_SEQUENCE_STYLE,
                CollectionStyle::Flow => sys::YAML_FLOW_SEQUENCE_STYLE,
            };
            unsafe {
                sys::yaml_sequence_start_event_initialize(
                    sys_event,
                    c_ptr(&anchor),
                    c_ptr(&tag),
                    tag.is_none(),
                    style,
                )
                .fail
            }
        }
        Event::SequenceEnd => unsafe { sys::yaml_sequence_end_event_initialize(sys_event).fail },
        Event::Scalar {
            anchor,
            tag,
            value,
            style,
            ..
        } => {
            let anchor = c_opt(anchor.as_deref(), "scalar anchor")?;
            let tag = c_opt(tag.as_deref(), "scalar tag")?;
            let length = i32::try_from(value.len())
                .map_err(|_| Error::invalid_option("scalar length", value.len().to_string()))?;
            // An empty plain scalar at the root of an implicit document is
            // written as nothing, and the document is lost on reparse.
            let style = match style {
                ScalarStyle::Any | ScalarStyle::Plain if value.is_empty() => {
                    sys::YAML_SINGLE_QUOTED_SCALAR_STYLE
                }
                ScalarStyle::Any => sys::YAML_ANY_SCALAR_STYLE,
                ScalarStyle::Plain => sys::YAML_PLAIN_SCALAR_STYLE,
                ScalarStyle::SingleQuoted => sys::YAML_SINGLE_QUOTED_SCALAR_STYLE,
                ScalarStyle::DoubleQuoted => sys::YAML_DOUBLE_QUOTED_SCALAR_STYLE,
                ScalarStyle::Literal => sys::YAML_LITERAL_SCALAR_STYLE,
                ScalarStyle::Folded => sys::YAML_FOLDED_SCALAR_STYLE,
            };
            // Untagged scalars are implicit in both plain and quoted form,
            // tagged ones never are, so the tag is always written.
            unsafe {
                sys::yaml_scalar_event_initialize(
                    sys_event,
                    c_ptr(&anchor),
                    c_ptr(&tag),
                    value.as_ptr(),
                    length,
                    tag.is_none(),
                    tag.is_none(),
                    style,
                )
                .fail
            }
        }
        Event::Alias { anchor } => {
            let anchor = c_string(anchor, "alias anchor")?;
            unsafe { sys::yaml_alias_event_initialize(sys_event, anchor.as_ptr().cast()).fail }
        }
    };

    if failed {
        return Err(Error::EngineFailure(format!(
            "libyaml rejected {} event",
            event.kind()
        )));
    }
    Ok(())
}

unsafe fn document_start(
    sys_event: *mut sys::yaml_event_t,
    implicit: bool,
    version_directive: Option<VersionDirective>,
    tag_directives: &[TagDirective],
) -> Result<bool> {
    let mut version = version_directive.map(|v| {
        let mut version: sys::yaml_version_directive_t = unsafe { mem::zeroed() };
        version.major = v.major;
        version.minor = v.minor;
        version
    });
    let version_ptr = version
        .as_mut()
        .map_or(ptr::null_mut(), |v| v as *mut sys::yaml_version_directive_t);

    let strings = tag_directives
        .iter()
        .map(|tag| {
            Ok((
                c_string(&tag.handle, "tag handle")?,
                c_string(&tag.prefix, "tag prefix")?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut directives = strings
        .iter()
        .map(|(handle, prefix)| {
            let mut directive: sys::yaml_tag_directive_t = unsafe { mem::zeroed() };
            directive.handle = handle.as_ptr().cast_mut().cast();
            directive.prefix = prefix.as_ptr().cast_mut().cast();
            directive
        })
        .collect::<Vec<_>>();

    let (start, end) = if directives.is_empty() {
        (ptr::null_mut(), ptr::null_mut())
    } else {
        let range = directives.as_mut_ptr_range();
        (range.start, range.end)
    };

    Ok(unsafe {
        sys::yaml_document_start_event_initialize(sys_event, version_ptr, start, end, implicit)
            .fail
    })
}

fn c_string(value: &str, what: &'static str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::invalid_option(what, value))
}

fn c_opt(value: Option<&str>, what: &'static str) -> Result<Option<CString>> {
    value.map(|s| c_string(s, what)).transpose()
}

fn c_ptr(value: &Option<CString>) -> *const u8 {
    value.as_ref().map_or(ptr::null(), |s| s.as_ptr().cast())
}
