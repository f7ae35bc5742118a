//! The YAML event vocabulary shared by the emitter and the parser.
//!
//! A YAML stream is a flat sequence of events. Structure is expressed by
//! start/end pairs:
//!
//! ```text
//! StreamStart
//! DocumentStart { implicit: true, .. }
//! MappingStart { style: Block, .. }
//! Scalar { value: "key", .. }
//! Scalar { value: "value", .. }
//! MappingEnd
//! DocumentEnd { implicit: true }
//! StreamEnd
//! ```

use serde::Serialize;

/// Block/flow layout hint for mappings and sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionStyle {
    #[default]
    Any,
    Block,
    Flow,
}

impl CollectionStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionStyle::Any => "ANY",
            CollectionStyle::Block => "BLOCK",
            CollectionStyle::Flow => "FLOW",
        }
    }

    /// Style from its exact, case-sensitive table token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ANY" => Some(CollectionStyle::Any),
            "BLOCK" => Some(CollectionStyle::Block),
            "FLOW" => Some(CollectionStyle::Flow),
            _ => None,
        }
    }
}

/// Presentation hint for scalars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScalarStyle {
    #[default]
    Any,
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarStyle::Any => "ANY",
            ScalarStyle::Plain => "PLAIN",
            ScalarStyle::SingleQuoted => "SINGLE_QUOTED",
            ScalarStyle::DoubleQuoted => "DOUBLE_QUOTED",
            ScalarStyle::Literal => "LITERAL",
            ScalarStyle::Folded => "FOLDED",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ANY" => Some(ScalarStyle::Any),
            "PLAIN" => Some(ScalarStyle::Plain),
            "SINGLE_QUOTED" => Some(ScalarStyle::SingleQuoted),
            "DOUBLE_QUOTED" => Some(ScalarStyle::DoubleQuoted),
            "LITERAL" => Some(ScalarStyle::Literal),
            "FOLDED" => Some(ScalarStyle::Folded),
            _ => None,
        }
    }
}

/// `%YAML major.minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionDirective {
    pub major: i32,
    pub minor: i32,
}

/// `%TAG handle prefix`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDirective {
    pub handle: String,
    pub prefix: String,
}

/// Position in the parsed source. All fields are 0-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Mark {
    pub index: u64,
    pub line: u64,
    pub column: u64,
}

/// One unit of the YAML streaming model.
///
/// `implicit` on collection starts and `plain_implicit`/`quoted_implicit`
/// on scalars are carried for the parser's benefit. The emitter does not
/// consult them: a tag, when present, is always written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StreamStart,
    StreamEnd,
    DocumentStart {
        implicit: bool,
        version_directive: Option<VersionDirective>,
        tag_directives: Vec<TagDirective>,
    },
    DocumentEnd {
        implicit: bool,
    },
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    MappingEnd,
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    SequenceEnd,
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        value: String,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    Alias {
        anchor: String,
    },
}

impl Event {
    /// Table name of this event kind, e.g. `"MAPPING_START"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::StreamStart => "STREAM_START",
            Event::StreamEnd => "STREAM_END",
            Event::DocumentStart { .. } => "DOCUMENT_START",
            Event::DocumentEnd { .. } => "DOCUMENT_END",
            Event::MappingStart { .. } => "MAPPING_START",
            Event::MappingEnd => "MAPPING_END",
            Event::SequenceStart { .. } => "SEQUENCE_START",
            Event::SequenceEnd => "SEQUENCE_END",
            Event::Scalar { .. } => "SCALAR",
            Event::Alias { .. } => "ALIAS",
        }
    }

    /// Plain scalar with no anchor or tag.
    pub fn scalar(value: impl Into<String>) -> Self {
        Event::Scalar {
            anchor: None,
            tag: None,
            value: value.into(),
            plain_implicit: true,
            quoted_implicit: true,
            style: ScalarStyle::Any,
        }
    }

    pub fn mapping_start(style: CollectionStyle) -> Self {
        Event::MappingStart {
            anchor: None,
            tag: None,
            implicit: true,
            style,
        }
    }

    pub fn sequence_start(style: CollectionStyle) -> Self {
        Event::SequenceStart {
            anchor: None,
            tag: None,
            implicit: true,
            style,
        }
    }

    pub fn document_start(implicit: bool) -> Self {
        Event::DocumentStart {
            implicit,
            version_directive: None,
            tag_directives: Vec::new(),
        }
    }

    pub fn document_end(implicit: bool) -> Self {
        Event::DocumentEnd { implicit }
    }

    pub fn alias(anchor: impl Into<String>) -> Self {
        Event::Alias {
            anchor: anchor.into(),
        }
    }
}
