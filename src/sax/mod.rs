//! Push-fed SAX-style parsing.
//!
//! The parser accepts raw byte spans in any split and emits structural
//! callbacks the moment a construct completes, which is what keeps callback
//! timing aligned with the span history in [`crate::feed::SourceCursor`].
//! Grammar-level well-formedness (name validity, attribute quoting, tag
//! balance, single root) is enforced here; tree shape is the handler's job.

mod entities;
mod handler;
mod parser;

pub use handler::{EventContext, RawAttribute, SaxHandler};
pub use parser::PushParser;
