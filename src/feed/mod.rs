//! Chunk feeding and source-position tracking.
//!
//! `ChunkScanner` splits raw text chunks on the three XML delimiter pairs
//! (`<![CDATA[ … ]]>`, `<!-- … -->`, `< … >`) without committing to a
//! classification while a delimiter could still be truncated by a chunk
//! boundary. `SourceCursor` keeps the absolute byte offset, line/column, and
//! the short history of tagged spans from which tag positions are derived.

mod cursor;
mod splitter;

pub use cursor::SourceCursor;
pub use splitter::ChunkScanner;
