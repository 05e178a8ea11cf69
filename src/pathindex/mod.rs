//! Text-offset path cache.
//!
//! Built by scanning tag boundaries in the raw text, independent of the
//! parsed tree: a run-length encoded mapping from byte regions to
//! XPath-like path strings, plus relative navigation over it. Rebuilt in
//! full whenever the text changes.

mod builder;
mod navigate;

pub use builder::{build_path_index, PathEntry, PathIndex, PathIndexConfig};
pub use navigate::Direction;
