//! Offset-based path index construction.
//!
//! Works directly on the source text, independent of the parsed tree: a
//! lexical scan finds tag-name regions and records which XPath-like path
//! applies to every contiguous span of the document. The result is a
//! run-length encoding of position → path, cheap enough to rebuild in full
//! whenever the text changes.

use std::collections::HashMap;

use memchr::memchr;
use memchr::memmem;
use tracing::debug;

use crate::span::Span;

/// Configuration for [`build_path_index`].
#[derive(Debug, Clone)]
pub struct PathIndexConfig {
    /// Attribute names whose values become `[@name = "value"]` predicates
    /// on path segments. Supports `*:name` (any prefix) and `prefix:*`
    /// (any local name) wildcards.
    pub attribute_allow_list: Vec<String>,
    /// Include every attribute, ignoring the allow list.
    pub include_all_attributes: bool,
    /// Whether tag and attribute names are compared case-sensitively.
    pub case_sensitive: bool,
    /// First ordinal assigned per tag name per level.
    pub first_index: usize,
}

impl Default for PathIndexConfig {
    fn default() -> Self {
        PathIndexConfig {
            attribute_allow_list: Vec::new(),
            include_all_attributes: false,
            case_sensitive: true,
            first_index: 1,
        }
    }
}

/// One segment of the position → path encoding: the region of text the
/// path applies to, and the path as a segment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    region: Span,
    path: Vec<String>,
    joined: String,
}

impl PathEntry {
    fn new(start: usize, end: usize, path: &[String]) -> Self {
        PathEntry {
            region: Span::new(start, end),
            path: path.to_vec(),
            joined: path.join("/"),
        }
    }

    /// The text region this entry covers.
    #[inline]
    pub fn region(&self) -> Span {
        self.region
    }

    /// Path segments; the leading segment is empty so joining yields an
    /// absolute `/name[1]/...` form.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The `/`-joined path string.
    pub fn joined(&self) -> &str {
        &self.joined
    }

    /// Joined path of this entry's parent.
    pub(crate) fn parent_joined(&self) -> String {
        match self.path.len() {
            0 | 1 => String::new(),
            n => self.path[..n - 1].join("/"),
        }
    }
}

/// The position → path index for one version of the text.
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    entries: Vec<PathEntry>,
}

impl PathIndex {
    /// Entries in document order.
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve sorted, non-overlapping query regions to entry indexes with
    /// a single merge-style co-scan: both lists are in document order, so
    /// each is advanced at most once end to end. A region matches the first
    /// entry that intersects it or that begins exactly where it begins.
    /// Returns matches in input order; a region with no match is skipped.
    pub fn indexes_at(&self, regions: &[Span]) -> Vec<usize> {
        let mut matches = Vec::with_capacity(regions.len());
        let mut current = 0;
        if regions.is_empty() {
            return matches;
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.region.intersects(&regions[current])
                || entry.region.start == regions[current].start
            {
                matches.push(index);
                current += 1;
                if current == regions.len() {
                    break;
                }
            }
        }
        matches
    }

    /// The entry covering a region, if any.
    pub fn entry_at(&self, region: Span) -> Option<&PathEntry> {
        self.indexes_at(&[region])
            .first()
            .and_then(|&i| self.entries.get(i))
    }

    /// Render an entry's path, optionally stripping the `[n]` ordinals
    /// and/or the attribute predicates.
    pub fn format_path(
        &self,
        entry: &PathEntry,
        include_indexes: bool,
        include_attributes: bool,
    ) -> String {
        if include_indexes && include_attributes {
            return entry.joined.clone();
        }
        let mut parts = Vec::with_capacity(entry.path.len());
        for part in &entry.path {
            match part.find('[') {
                None => parts.push(part.clone()),
                Some(begin) => {
                    let end = part[begin..]
                        .find(']')
                        .map(|i| begin + i + 1)
                        .unwrap_or(part.len());
                    let mut rendered = part[..begin].to_string();
                    if include_indexes {
                        rendered.push_str(&part[begin..end]);
                    }
                    if include_attributes {
                        rendered.push_str(&part[end..]);
                    }
                    parts.push(rendered);
                }
            }
        }
        parts.join("/")
    }
}

/// Scan `text` and build its path index.
pub fn build_path_index(text: &str, config: &PathIndexConfig) -> PathIndex {
    let bytes = text.as_bytes();
    let allow_list: Vec<String> = if config.case_sensitive {
        config.attribute_allow_list.clone()
    } else {
        config
            .attribute_allow_list
            .iter()
            .map(|a| a.to_lowercase())
            .collect()
    };

    let mut entries: Vec<PathEntry> = Vec::new();
    let mut path: Vec<String> = vec![String::new()];
    let mut counters: Vec<HashMap<String, usize>> = vec![HashMap::new()];
    let mut position = 0;
    let mut pos = 0;

    let push = |entries: &mut Vec<PathEntry>, start: usize, end: usize, path: &[String]| {
        if end > start {
            entries.push(PathEntry::new(start, end, path));
        }
    };

    while pos < bytes.len() {
        let lt = match memchr(b'<', &bytes[pos..]) {
            Some(rel) => pos + rel,
            None => break,
        };
        let rest = &bytes[lt..];

        if rest.starts_with(b"<!--") {
            pos = skip_past(bytes, lt + 4, b"-->");
            continue;
        }
        if rest.starts_with(b"<![CDATA[") {
            pos = skip_past(bytes, lt + 9, b"]]>");
            continue;
        }
        if rest.starts_with(b"<?") {
            pos = skip_past(bytes, lt + 2, b"?>");
            continue;
        }
        if rest.starts_with(b"</") {
            let name_begin = lt + 2;
            let name_end = scan_name(bytes, name_begin);
            let close_end = match memchr(b'>', &bytes[name_end..]) {
                Some(rel) => name_end + rel + 1,
                None => bytes.len(),
            };
            // Intervening text and the close tag both belong to the element
            // being closed; pop only afterwards.
            push(&mut entries, position, lt, &path);
            push(&mut entries, lt, close_end, &path);
            if path.len() > 1 {
                path.pop();
            }
            if counters.len() > 1 {
                counters.pop();
            }
            position = close_end;
            pos = close_end;
            continue;
        }
        if rest.starts_with(b"<!") {
            pos = skip_past(bytes, lt + 2, b">");
            continue;
        }

        let name_begin = lt + 1;
        if name_begin >= bytes.len() || !is_name_start_char(bytes[name_begin]) {
            pos = name_begin;
            continue;
        }
        let name_end = scan_name(bytes, name_begin);
        let gt = match find_tag_end_quoted(bytes, name_end) {
            Some(at) => at,
            // Unterminated tag; nothing structural past this point.
            None => break,
        };
        let tag_end = gt + 1;
        let self_closing = gt > 0 && bytes[gt - 1] == b'/';
        let attrs_end = if self_closing { gt - 1 } else { gt };

        let tag_name = &text[name_begin..name_end];
        let predicates =
            attribute_predicates(text, name_end, attrs_end, &allow_list, config);

        let check = if config.case_sensitive {
            tag_name.to_string()
        } else {
            tag_name.to_lowercase()
        };
        let level = counters.len() - 1;
        let slot = counters[level].entry(check).or_insert(config.first_index);
        let ordinal = *slot;
        *slot += 1;

        push(&mut entries, position, lt, &path);
        path.push(format!("{}[{}]{}", tag_name, ordinal, predicates));
        push(&mut entries, lt, tag_end, &path);
        push(&mut entries, name_begin, name_end, &path);

        if self_closing {
            path.pop();
        } else {
            counters.push(HashMap::new());
        }
        position = tag_end;
        pos = tag_end;
    }

    // Tail entry from the last recorded position to end of document.
    entries.push(PathEntry::new(position, bytes.len(), &path));

    debug!(entries = entries.len(), "path index built");
    PathIndex { entries }
}

/// Build the `[@a = "v" and ...]` predicate string from the attributes in
/// `[start, end)` that pass the allow list.
fn attribute_predicates(
    text: &str,
    start: usize,
    end: usize,
    allow_list: &[String],
    config: &PathIndexConfig,
) -> String {
    let bytes = text.as_bytes();
    let mut found: Vec<String> = Vec::new();
    let mut pos = start;

    while pos < end {
        while pos < end && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'/') {
            pos += 1;
        }
        if pos >= end {
            break;
        }
        if !is_name_start_char(bytes[pos]) {
            pos += 1;
            continue;
        }
        let name_begin = pos;
        while pos < end && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &text[name_begin..pos];

        while pos < end && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= end || bytes[pos] != b'=' {
            continue;
        }
        pos += 1;
        while pos < end && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= end {
            break;
        }
        let quote = bytes[pos];
        if quote != b'"' && quote != b'\'' {
            while pos < end && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            continue;
        }
        let value_begin = pos;
        pos += 1;
        while pos < end && bytes[pos] != quote {
            pos += 1;
        }
        if pos >= end {
            break;
        }
        pos += 1;
        // Value kept exactly as written, quotes included.
        let value = &text[value_begin..pos];

        let (ns, local) = match name.split_once(':') {
            Some((prefix, local)) => (format!("{}:", prefix), local),
            None => (String::new(), name),
        };
        let (key_ns, key_local) = if config.case_sensitive {
            (ns.clone(), local.to_string())
        } else {
            (ns.to_lowercase(), local.to_lowercase())
        };
        let wanted = config.include_all_attributes
            || allow_list.iter().any(|a| {
                *a == format!("{}{}", key_ns, key_local)
                    || *a == format!("*:{}", key_local)
                    || *a == format!("{}*", key_ns)
            });
        if wanted {
            found.push(format!("@{} = {}", name, value));
        }
    }

    if found.is_empty() {
        String::new()
    } else {
        format!("[{}]", found.join(" and "))
    }
}

/// Offset just past the next occurrence of `marker`, or end of input.
fn skip_past(bytes: &[u8], from: usize, marker: &[u8]) -> usize {
    if from >= bytes.len() {
        return bytes.len();
    }
    match memmem::find(&bytes[from..], marker) {
        Some(rel) => from + rel + marker.len(),
        None => bytes.len(),
    }
}

fn scan_name(bytes: &[u8], from: usize) -> usize {
    let mut pos = from;
    while pos < bytes.len() && is_name_char(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// `>` that ends the tag, skipping quoted attribute values.
fn find_tag_end_quoted(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    let mut in_single = false;
    let mut in_double = false;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' if !in_single => in_double = !in_double,
            b'\'' if !in_double => in_single = !in_single,
            b'>' if !in_single && !in_double => return Some(pos),
            _ => {}
        }
        pos += 1;
    }
    None
}

#[inline]
fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}
