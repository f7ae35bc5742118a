//! Event-level YAML transcoder.
//!
//! [`Emitter`] turns a stream of [`Event`]s (or their table form) into YAML
//! text; [`Parser`] turns YAML text back into events annotated with source
//! marks. Both drive libyaml through `unsafe-libyaml`, one engine instance
//! per emitter or parser, released on drop.

mod emitter;
mod error;
mod event;
mod parser;
mod table;

pub use emitter::{DEFAULT_INDENT, DEFAULT_WIDTH, Emitter, EmitterOptions};
pub use error::{Error, Result};
pub use event::{CollectionStyle, Event, Mark, ScalarStyle, TagDirective, VersionDirective};
pub use parser::{ParsedEvent, Parser};
pub use table::{UTF8, event_from_table, event_to_table};
