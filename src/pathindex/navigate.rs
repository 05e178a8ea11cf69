//! Relative navigation over the path index.

use std::str::FromStr;

use super::builder::PathIndex;
use crate::error::Error;
use crate::span::Span;

/// A navigation direction. Parse user-supplied tokens with `FromStr` so an
/// unsupported token is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
    Parent,
    Open,
    Close,
    Self_,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "next" => Ok(Direction::Next),
            "prev" | "previous" => Ok(Direction::Prev),
            "parent" => Ok(Direction::Parent),
            "open" => Ok(Direction::Open),
            "close" => Ok(Direction::Close),
            "self" => Ok(Direction::Self_),
            other => Err(Error::UnknownDirection(other.to_string())),
        }
    }
}

impl PathIndex {
    /// Find the region relative to `current` in the given direction, or
    /// `None` when there is nothing there — callers keep their previous
    /// position and report a status message, never an error.
    ///
    /// The search is restricted to entries under the current node's parent
    /// path. `next` takes the first later entry that is neither the parent
    /// itself nor part of the current node; `prev` fixes on the nearest
    /// earlier distinct sibling and then walks to that sibling's first
    /// boundary; `parent` and `open` take the last match of a backward
    /// scan (boundaries arrive in reverse order there, so the last match
    /// is the tag itself); `close` takes the last match forward.
    pub fn navigate(&self, current: Span, direction: Direction) -> Option<Span> {
        let current_index = *self.indexes_at(&[current]).first()?;
        let entries = self.entries();
        let current_entry = &entries[current_index];
        let current_path = current_entry.joined().to_string();
        let parent_path = current_entry.parent_joined();

        match direction {
            Direction::Self_ => Some(current_entry.region()),
            Direction::Next => entries[current_index..]
                .iter()
                .take_while(|e| e.joined().starts_with(parent_path.as_str()))
                .find(|e| e.joined() != parent_path && !e.joined().starts_with(current_path.as_str()))
                .map(|e| e.region()),
            Direction::Close => entries[current_index..]
                .iter()
                .take_while(|e| e.joined().starts_with(parent_path.as_str()))
                .filter(|e| e.joined() == current_path)
                .last()
                .map(|e| e.region()),
            Direction::Open | Direction::Parent => {
                let wanted = if direction == Direction::Parent {
                    &parent_path
                } else {
                    &current_path
                };
                entries[..=current_index]
                    .iter()
                    .rev()
                    .take_while(|e| e.joined().starts_with(parent_path.as_str()))
                    .filter(|e| e.joined() == *wanted)
                    .last()
                    .map(|e| e.region())
            }
            Direction::Prev => {
                let parent_prefix = format!("{}/", parent_path);
                let mut found: Option<Span> = None;
                let mut wanted: Option<String> = None;
                for entry in entries[..=current_index]
                    .iter()
                    .rev()
                    .take_while(|e| e.joined().starts_with(parent_path.as_str()))
                {
                    let joined = entry.joined();
                    if !joined.starts_with(parent_prefix.as_str()) {
                        // Not a descendant of the parent; ignore but keep
                        // scanning.
                        continue;
                    }
                    match &wanted {
                        Some(sibling) => {
                            if joined == sibling.as_str() {
                                found = Some(entry.region());
                            } else if !joined.starts_with(sibling.as_str()) {
                                break;
                            }
                        }
                        None => {
                            if !joined.starts_with(current_path.as_str()) {
                                found = Some(entry.region());
                                wanted = Some(joined.to_string());
                            }
                        }
                    }
                }
                found
            }
        }
    }

    /// String-token variant of [`PathIndex::navigate`]; rejects unknown
    /// direction tokens.
    pub fn navigate_named(&self, current: Span, direction: &str) -> crate::error::Result<Option<Span>> {
        let direction = Direction::from_str(direction)?;
        Ok(self.navigate(current, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathindex::{build_path_index, PathIndexConfig};

    fn index(text: &str) -> PathIndex {
        build_path_index(text, &PathIndexConfig::default())
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("next".parse::<Direction>().unwrap(), Direction::Next);
        assert_eq!("previous".parse::<Direction>().unwrap(), Direction::Prev);
        let err = "sideways".parse::<Direction>().unwrap_err();
        assert!(matches!(err, Error::UnknownDirection(_)));
    }

    #[test]
    fn test_next_and_parent_concrete_offsets() {
        let idx = index("<root><a/><b>x</b></root>");
        // From <a/>'s open-tag region, next lands on <b>'s open tag.
        let next = idx.navigate(Span::new(6, 10), Direction::Next).unwrap();
        assert_eq!(next, Span::new(10, 13));
        // And parent from there is <root>'s open tag.
        let parent = idx.navigate(next, Direction::Parent).unwrap();
        assert_eq!(parent, Span::new(0, 6));
    }

    #[test]
    fn test_next_from_last_sibling_is_none() {
        let idx = index("<root><a/><b>x</b></root>");
        assert_eq!(idx.navigate(Span::new(10, 13), Direction::Next), None);
    }

    #[test]
    fn test_prev_returns_to_previous_sibling() {
        let idx = index("<root><a/><b>x</b></root>");
        let prev = idx.navigate(Span::new(10, 13), Direction::Prev).unwrap();
        assert_eq!(prev, Span::new(6, 10));
    }

    #[test]
    fn test_next_prev_symmetry() {
        let idx = index("<r><a>inner</a><b/><c><d/></c></r>");
        let a_open = idx.navigate(Span::new(3, 6), Direction::Self_).unwrap();
        let b = idx.navigate(a_open, Direction::Next).unwrap();
        let back = idx.navigate(b, Direction::Prev).unwrap();
        assert_eq!(back, a_open);
        let c = idx.navigate(b, Direction::Next).unwrap();
        assert_eq!(idx.navigate(c, Direction::Prev).unwrap(), b);
    }

    #[test]
    fn test_next_skips_own_descendants() {
        let idx = index("<r><a><x/><y/></a><b/></r>");
        let next = idx.navigate(Span::new(3, 6), Direction::Next).unwrap();
        // <b>'s open tag, not <x> or <y>.
        let entry = idx.entry_at(next).unwrap();
        assert_eq!(entry.joined(), "/r[1]/b[1]");
    }

    #[test]
    fn test_prev_fixes_on_nearest_sibling_boundary() {
        // prev from <c> must land on <b>'s open tag, not inside <b>'s
        // descendants and not on <a>.
        let idx = index("<r><a/><b><deep/></b><c/></r>");
        let c_entry = idx
            .entries()
            .iter()
            .find(|e| e.joined() == "/r[1]/c[1]")
            .unwrap()
            .region();
        let prev = idx.navigate(c_entry, Direction::Prev).unwrap();
        let entry = idx.entry_at(prev).unwrap();
        assert_eq!(entry.joined(), "/r[1]/b[1]");
        // The fixed sibling's earliest boundary is its open tag.
        assert_eq!(prev.start, 7);
    }

    #[test]
    fn test_prev_from_first_sibling_is_none() {
        let idx = index("<root><a/><b/></root>");
        assert_eq!(idx.navigate(Span::new(6, 10), Direction::Prev), None);
    }

    #[test]
    fn test_open_and_close_boundaries() {
        let idx = index("<root><a/><b>x</b></root>");
        // From inside <b>'s text content.
        let open = idx.navigate(Span::point(13), Direction::Open).unwrap();
        assert_eq!(open, Span::new(10, 13));
        let close = idx.navigate(Span::point(13), Direction::Close).unwrap();
        assert_eq!(close, Span::new(14, 18));
    }

    #[test]
    fn test_navigate_from_unmatched_region_is_none() {
        let idx = index("<root/>");
        assert_eq!(idx.navigate(Span::new(900, 901), Direction::Next), None);
    }

    #[test]
    fn test_navigate_named_rejects_unknown() {
        let idx = index("<root/>");
        assert!(idx.navigate_named(Span::new(0, 7), "upward").is_err());
        assert!(idx
            .navigate_named(Span::new(0, 7), "self")
            .unwrap()
            .is_some());
    }
}
