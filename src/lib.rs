//! xmlcursor — chunk-fed XML parsing with source-text byte offsets.
//!
//! The parser accepts a document as any sequence of text chunks and builds a
//! tree in which every element and comment carries the exact byte spans of
//! its delimiters, independent of how the input was split. On top of that
//! tree sits an XPath 1.0 evaluator; alongside it, a purely text-offset
//! path index maps arbitrary byte positions to XPath-like path strings and
//! supports relative navigation (next/prev/parent/open/close) without
//! consulting the tree.
//!
//! ```
//! use xmlcursor::{build_path_index, parse_with_locations, Direction, PathIndexConfig, Span};
//!
//! let text = "<root><a/><b>x</b></root>";
//! let doc = parse_with_locations([text], 0, 0, None).unwrap();
//!
//! // The root element knows where its tags are.
//! let root = doc.node(doc.root()).unwrap();
//! assert_eq!(root.open_tag_position().unwrap().range(), (0, 6));
//! assert_eq!(root.close_tag_position().unwrap().range(), (18, 25));
//!
//! // The path index answers position and navigation queries by offset.
//! let index = build_path_index(text, &PathIndexConfig::default());
//! let next = index.navigate(Span::new(6, 10), Direction::Next).unwrap();
//! assert_eq!(next, Span::new(10, 13));
//! ```

mod error;
mod feed;
mod pathindex;
mod query;
mod sax;
mod span;
mod tree;

use tracing::debug;

pub use error::{Error, Result};
pub use feed::{ChunkScanner, SourceCursor};
pub use pathindex::{build_path_index, Direction, PathEntry, PathIndex, PathIndexConfig};
pub use query::{run_xpath, QueryResult, Value, XPathEngine};
pub use sax::{EventContext, PushParser, RawAttribute, SaxHandler};
pub use span::{Span, TagPosition};
pub use tree::{
    collapse_whitespace, Attribute, Document, NamespaceTable, Node, NodeData, NodeId, NodeKind,
    QName, TreeBuilder,
};

/// Parse a document supplied as consecutive text chunks, producing a tree
/// whose nodes carry source byte offsets.
///
/// `position_offset` shifts every recorded offset (for parsing a region out
/// of a larger buffer); `line_offset` shifts reported line numbers the same
/// way. `should_stop` is polled between chunks; when it returns true the
/// remaining chunks are skipped and the final flush runs on what was fed,
/// so a cancelled parse usually surfaces the truncation as a syntax error
/// and its output must be discarded either way.
///
/// Positions do not depend on chunk granularity: feeding one chunk or one
/// byte at a time yields identical trees.
pub fn parse_with_locations<I, S>(
    chunks: I,
    position_offset: usize,
    line_offset: u32,
    mut should_stop: Option<&mut dyn FnMut() -> bool>,
) -> Result<Document>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut scanner = ChunkScanner::new(position_offset, line_offset);
    let mut parser = PushParser::new(position_offset, line_offset);
    let mut builder = TreeBuilder::new();

    for chunk in chunks {
        if let Some(stop) = should_stop.as_mut() {
            if stop() {
                debug!("parse cancelled between chunks");
                break;
            }
        }
        scanner.feed(chunk.as_ref(), &mut parser, &mut builder)?;
    }
    scanner.close(&mut parser, &mut builder)?;
    builder.finish()
}
