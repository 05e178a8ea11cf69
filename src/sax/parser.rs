//! Incremental push parser.
//!
//! Buffers whatever has been fed so far and drains every construct that is
//! already complete, firing handler callbacks synchronously with the feed
//! that completed the construct. The caller decides when input ends; until
//! then a truncated delimiter simply waits in the buffer.

use memchr::memchr;
use memchr::memmem;

use super::entities::decode_entities;
use super::handler::{EventContext, RawAttribute, SaxHandler};
use crate::error::{Error, Result};
use crate::feed::SourceCursor;

/// Markers that need more than one byte after `<` to classify. While the
/// buffer is still a strict prefix of one of these, classification waits
/// for more input instead of guessing.
const MARKERS: [&[u8]; 5] = [b"<![CDATA[", b"<!--", b"<!DOCTYPE", b"<?", b"</"];

/// Stateful, push-fed XML parser.
pub struct PushParser {
    /// Unconsumed fed bytes.
    buffer: Vec<u8>,
    /// Absolute byte offset of `buffer[0]` in the overall document.
    consumed: usize,
    /// 1-based line of `buffer[0]`.
    line: u32,
    /// 1-based byte column of `buffer[0]`.
    column: u32,
    /// Names of currently open elements.
    open: Vec<String>,
    seen_root: bool,
    root_closed: bool,
}

impl PushParser {
    /// Create a parser whose error positions start from the given offsets.
    pub fn new(position_offset: usize, line_offset: u32) -> Self {
        PushParser {
            buffer: Vec::with_capacity(1024),
            consumed: position_offset,
            line: 1 + line_offset,
            column: 1,
            open: Vec::with_capacity(16),
            seen_root: false,
            root_closed: false,
        }
    }

    /// Feed a span of bytes and drain every construct it completes.
    pub fn feed<H: SaxHandler>(
        &mut self,
        bytes: &[u8],
        cursor: &SourceCursor,
        handler: &mut H,
    ) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        self.process(false, cursor, handler)
    }

    /// Signal end of input: drain the remainder and enforce document-level
    /// well-formedness (all tags closed, exactly one root).
    pub fn finish<H: SaxHandler>(&mut self, cursor: &SourceCursor, handler: &mut H) -> Result<()> {
        self.process(true, cursor, handler)?;
        if let Some(name) = self.open.last() {
            return Err(self.error_at_end(format!("unexpected end of document: unclosed element <{}>", name)));
        }
        if !self.seen_root {
            return Err(self.error_at_end("no element found".to_string()));
        }
        Ok(())
    }

    fn process<H: SaxHandler>(
        &mut self,
        at_eof: bool,
        cursor: &SourceCursor,
        handler: &mut H,
    ) -> Result<()> {
        loop {
            if self.buffer.is_empty() {
                return Ok(());
            }
            if self.buffer[0] != b'<' {
                match memchr(b'<', &self.buffer) {
                    Some(i) => self.emit_text(i, handler)?,
                    None => {
                        if at_eof {
                            let len = self.buffer.len();
                            self.emit_text(len, handler)?;
                        }
                        return Ok(());
                    }
                }
                continue;
            }

            if !at_eof && self.awaiting_marker() {
                return Ok(());
            }

            let progressed = if self.buffer.starts_with(b"<!--") {
                self.take_comment(at_eof, cursor, handler)?
            } else if self.buffer.starts_with(b"<![CDATA[") {
                self.take_cdata(at_eof, handler)?
            } else if self.buffer.starts_with(b"<!DOCTYPE") {
                self.take_doctype(at_eof, cursor, handler)?
            } else if self.buffer.starts_with(b"<?") {
                self.take_pi(at_eof, cursor, handler)?
            } else if self.buffer.starts_with(b"</") {
                self.take_end_tag(at_eof, cursor, handler)?
            } else if self.buffer.starts_with(b"<!") {
                return Err(self.error_in_buffer(0, "unsupported markup declaration"));
            } else {
                self.take_start_tag(at_eof, cursor, handler)?
            };

            if !progressed {
                return Ok(());
            }
        }
    }

    /// Whether the buffer is a strict prefix of a multi-byte marker and the
    /// construct kind is therefore still ambiguous.
    fn awaiting_marker(&self) -> bool {
        MARKERS
            .iter()
            .any(|m| self.buffer.len() < m.len() && m.starts_with(&self.buffer))
    }

    // ------------------------------------------------------------------
    // Construct handlers. Each returns Ok(true) after consuming, Ok(false)
    // when it needs more input.
    // ------------------------------------------------------------------

    fn take_comment<H: SaxHandler>(
        &mut self,
        at_eof: bool,
        cursor: &SourceCursor,
        handler: &mut H,
    ) -> Result<bool> {
        match memmem::find(&self.buffer[4..], b"-->") {
            Some(rel) => {
                let content = self.buffer_str(4, 4 + rel)?;
                let ctx = self.event_ctx(cursor);
                handler.comment(&content, &ctx)?;
                self.consume(4 + rel + 3);
                Ok(true)
            }
            None => {
                if at_eof {
                    Err(self.error_at_end("unterminated comment".to_string()))
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn take_cdata<H: SaxHandler>(&mut self, at_eof: bool, handler: &mut H) -> Result<bool> {
        match memmem::find(&self.buffer[9..], b"]]>") {
            Some(rel) => {
                if self.open.is_empty() {
                    return Err(self.error_in_buffer(0, "CDATA section outside the root element"));
                }
                let content = self.buffer_str(9, 9 + rel)?;
                // CDATA content is literal; no entity decoding.
                handler.text(&content)?;
                self.consume(9 + rel + 3);
                Ok(true)
            }
            None => {
                if at_eof {
                    Err(self.error_at_end("unterminated CDATA section".to_string()))
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn take_doctype<H: SaxHandler>(
        &mut self,
        at_eof: bool,
        cursor: &SourceCursor,
        handler: &mut H,
    ) -> Result<bool> {
        match memchr(b'>', &self.buffer[9..]) {
            Some(rel) => {
                if self.seen_root {
                    return Err(self.error_in_buffer(0, "misplaced DOCTYPE declaration"));
                }
                let content = self.buffer_str(9, 9 + rel)?;
                let ctx = self.event_ctx(cursor);
                handler.doctype(content.trim(), &ctx)?;
                self.consume(9 + rel + 1);
                Ok(true)
            }
            None => {
                if at_eof {
                    Err(self.error_at_end("unterminated DOCTYPE declaration".to_string()))
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn take_pi<H: SaxHandler>(
        &mut self,
        at_eof: bool,
        cursor: &SourceCursor,
        handler: &mut H,
    ) -> Result<bool> {
        match memmem::find(&self.buffer[2..], b"?>") {
            Some(rel) => {
                let content = self.buffer_str(2, 2 + rel)?;
                let name_len = content
                    .bytes()
                    .take_while(|b| !b.is_ascii_whitespace())
                    .count();
                if name_len == 0 {
                    return Err(self.error_in_buffer(2, "invalid processing instruction target"));
                }
                let (target, data) = content.split_at(name_len);
                if !target.eq_ignore_ascii_case("xml") {
                    let ctx = self.event_ctx(cursor);
                    handler.processing_instruction(target, data.trim_start(), &ctx)?;
                }
                self.consume(2 + rel + 2);
                Ok(true)
            }
            None => {
                if at_eof {
                    Err(self.error_at_end("unterminated processing instruction".to_string()))
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn take_end_tag<H: SaxHandler>(
        &mut self,
        at_eof: bool,
        cursor: &SourceCursor,
        handler: &mut H,
    ) -> Result<bool> {
        let gt = match memchr(b'>', &self.buffer[2..]) {
            Some(rel) => 2 + rel,
            None => {
                return if at_eof {
                    Err(self.error_at_end("unterminated close tag".to_string()))
                } else {
                    Ok(false)
                };
            }
        };
        let name = self.buffer_str(2, gt)?;
        let name = name.trim_end();
        if name.is_empty() || name.bytes().any(|b| b.is_ascii_whitespace()) {
            return Err(self.error_in_buffer(2, "invalid close tag"));
        }
        validate_name(name).map_err(|msg| self.error_in_buffer(2, msg))?;
        let name = name.to_string();
        let expected = match self.open.last() {
            Some(expected) => expected.clone(),
            None => return Err(self.error_in_buffer(0, "close tag without matching open tag")),
        };
        if expected != name {
            return Err(self.error_in_buffer(
                gt + 1,
                format!("mismatched tag: expected </{}>, found </{}>", expected, name),
            ));
        }
        self.open.pop();
        if self.open.is_empty() {
            self.root_closed = true;
        }
        let ctx = self.event_ctx(cursor);
        handler.element_end(&name, &ctx)?;
        self.consume(gt + 1);
        Ok(true)
    }

    fn take_start_tag<H: SaxHandler>(
        &mut self,
        at_eof: bool,
        cursor: &SourceCursor,
        handler: &mut H,
    ) -> Result<bool> {
        let gt = match find_tag_end_quoted(&self.buffer, 1) {
            Some(pos) => pos,
            None => {
                return if at_eof {
                    Err(self.error_at_end("unexpected end of document inside tag".to_string()))
                } else {
                    Ok(false)
                };
            }
        };
        if self.root_closed {
            return Err(self.error_in_buffer(0, "unexpected content after root element"));
        }

        let self_closing = gt > 1 && self.buffer[gt - 1] == b'/';
        let content_end = if self_closing { gt - 1 } else { gt };
        let content = self.buffer_str(1, content_end)?;

        let name_len = content
            .bytes()
            .take_while(|&b| !b.is_ascii_whitespace() && b != b'/')
            .count();
        let name = &content[..name_len];
        if name.is_empty() {
            return Err(self.error_in_buffer(1, "invalid element name"));
        }
        validate_name(name).map_err(|msg| self.error_in_buffer(1, msg))?;

        let attributes = self
            .parse_attributes(&content[name_len..], 1 + name_len)
            .map_err(|(rel, msg)| self.error_in_buffer(rel, msg))?;

        let ctx = self.event_ctx(cursor);
        handler.element_start(name, &attributes, &ctx)?;
        self.seen_root = true;
        if self_closing {
            handler.element_end(name, &ctx)?;
            if self.open.is_empty() {
                self.root_closed = true;
            }
        } else {
            self.open.push(name.to_string());
        }
        self.consume(gt + 1);
        Ok(true)
    }

    /// Parse attributes from the tag content after the element name.
    /// `base` is the buffer offset of the slice start, used for error
    /// positions. Strict: every attribute needs `=` and a quoted value.
    fn parse_attributes(
        &self,
        input: &str,
        base: usize,
    ) -> std::result::Result<Vec<RawAttribute>, (usize, String)> {
        let bytes = input.as_bytes();
        let mut attrs: Vec<RawAttribute> = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                break;
            }

            let name_start = pos;
            if !is_name_start_char(bytes[pos]) {
                return Err((base + pos, "invalid attribute name".to_string()));
            }
            while pos < bytes.len() && is_name_char(bytes[pos]) {
                pos += 1;
            }
            let name = &input[name_start..pos];

            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() || bytes[pos] != b'=' {
                return Err((base + pos, format!("attribute \"{}\" is missing '='", name)));
            }
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                return Err((base + pos, format!("attribute \"{}\" is missing a value", name)));
            }

            let quote = bytes[pos];
            if quote != b'"' && quote != b'\'' {
                return Err((base + pos, "attribute value must be quoted".to_string()));
            }
            pos += 1;
            let value_start = pos;
            while pos < bytes.len() && bytes[pos] != quote {
                if bytes[pos] == b'<' {
                    return Err((base + pos, "attribute value cannot contain '<'".to_string()));
                }
                pos += 1;
            }
            if pos >= bytes.len() {
                return Err((base + value_start, "unterminated attribute value".to_string()));
            }
            let raw_value = &input[value_start..pos];
            pos += 1;

            let value = decode_entities(raw_value)
                .map_err(|(rel, msg)| (base + value_start + rel, msg))?;

            if attrs.iter().any(|a| a.name == name) {
                return Err((base + name_start, format!("duplicate attribute \"{}\"", name)));
            }
            attrs.push(RawAttribute {
                name: name.to_string(),
                value,
            });
        }

        Ok(attrs)
    }

    /// Emit the first `len` buffered bytes as character data.
    fn emit_text<H: SaxHandler>(&mut self, len: usize, handler: &mut H) -> Result<()> {
        if self.open.is_empty() {
            // Outside the root element only whitespace is tolerated.
            if let Some(i) = self.buffer[..len].iter().position(|b| !b.is_ascii_whitespace()) {
                let message = if self.root_closed {
                    "unexpected content after root element"
                } else {
                    "unexpected content before root element"
                };
                return Err(self.error_in_buffer(i, message));
            }
            let ws = self.buffer_str(0, len)?;
            handler.text(&ws)?;
        } else {
            let raw = self.buffer_str(0, len)?;
            let decoded =
                decode_entities(&raw).map_err(|(rel, msg)| self.error_in_buffer(rel, msg))?;
            handler.text(&decoded)?;
        }
        self.consume(len);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    fn event_ctx(&self, cursor: &SourceCursor) -> EventContext {
        EventContext {
            location: cursor.current_tag_position(),
            line: cursor.line(),
            column: cursor.column(),
        }
    }

    fn buffer_str(&self, start: usize, end: usize) -> Result<String> {
        match std::str::from_utf8(&self.buffer[start..end]) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(self.error_in_buffer(start, "invalid UTF-8 in document")),
        }
    }

    /// Advance the consume point over `n` buffered bytes, maintaining
    /// line/column for future error positions.
    fn consume(&mut self, n: usize) {
        let (line, column) = self.position_after(n);
        self.line = line;
        self.column = column;
        self.consumed += n;
        self.buffer.drain(..n);
    }

    /// Line/column after walking `n` bytes of the buffer, without consuming.
    fn position_after(&self, n: usize) -> (u32, u32) {
        let segment = &self.buffer[..n];
        let newlines = segment.iter().filter(|&&b| b == b'\n').count();
        if newlines > 0 {
            let last = segment
                .iter()
                .rposition(|&b| b == b'\n')
                .unwrap_or(0);
            (self.line + newlines as u32, (n - last) as u32)
        } else {
            (self.line, self.column + n as u32)
        }
    }

    fn error_in_buffer(&self, pos: usize, message: impl Into<String>) -> Error {
        let (line, column) = self.position_after(pos.min(self.buffer.len()));
        Error::syntax(message, self.consumed + pos, line, column)
    }

    fn error_at_end(&self, message: String) -> Error {
        self.error_in_buffer(self.buffer.len(), message)
    }
}

/// Find the `>` that closes the tag starting at `from`, skipping `>` inside
/// quoted attribute values.
fn find_tag_end_quoted(input: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    let mut in_single = false;
    let mut in_double = false;
    while pos < input.len() {
        match input[pos] {
            b'"' if !in_single => in_double = !in_double,
            b'\'' if !in_double => in_single = !in_single,
            b'>' if !in_single && !in_double => return Some(pos),
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Validate an element or attribute name: first character must be a name
/// start character (in particular, not a digit), the rest name characters.
fn validate_name(name: &str) -> std::result::Result<(), String> {
    let bytes = name.as_bytes();
    match bytes.first() {
        None => return Err("empty name".to_string()),
        Some(b) if b.is_ascii_digit() => {
            return Err("element name cannot start with a digit".to_string());
        }
        Some(&b) if !is_name_start_char(b) => {
            return Err(format!("invalid name start character {:?}", b as char));
        }
        Some(_) => {}
    }
    if let Some(&bad) = bytes.iter().find(|&&b| !is_name_char(b)) {
        return Err(format!("invalid name character {:?}", bad as char));
    }
    Ok(())
}

/// Valid XML name start character. ASCII letters, underscore, colon; bytes
/// >= 0x80 pass through for UTF-8 names.
#[inline]
fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Valid XML name character.
#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::TagPosition;

    #[derive(Default, Debug)]
    struct Recorder {
        events: Vec<String>,
        locations: Vec<Option<TagPosition>>,
    }

    impl SaxHandler for Recorder {
        fn element_start(
            &mut self,
            name: &str,
            attributes: &[RawAttribute],
            ctx: &EventContext,
        ) -> Result<()> {
            let attrs: Vec<String> = attributes
                .iter()
                .map(|a| format!("{}={}", a.name, a.value))
                .collect();
            self.events.push(format!("start {} [{}]", name, attrs.join(",")));
            self.locations.push(ctx.location);
            Ok(())
        }

        fn element_end(&mut self, name: &str, ctx: &EventContext) -> Result<()> {
            self.events.push(format!("end {}", name));
            self.locations.push(ctx.location);
            Ok(())
        }

        fn text(&mut self, data: &str) -> Result<()> {
            self.events.push(format!("text {:?}", data));
            Ok(())
        }

        fn comment(&mut self, text: &str, _ctx: &EventContext) -> Result<()> {
            self.events.push(format!("comment {:?}", text));
            Ok(())
        }
    }

    fn run(doc: &str) -> Result<Recorder> {
        let mut parser = PushParser::new(0, 0);
        let cursor = SourceCursor::new(0);
        let mut handler = Recorder::default();
        parser.feed(doc.as_bytes(), &cursor, &mut handler)?;
        parser.finish(&cursor, &mut handler)?;
        Ok(handler)
    }

    #[test]
    fn test_simple_document_events() {
        let handler = run("<root a=\"1\"><child>hi</child></root>").unwrap();
        assert_eq!(
            handler.events,
            vec![
                "start root [a=1]",
                "start child []",
                "text \"hi\"",
                "end child",
                "end root",
            ]
        );
    }

    #[test]
    fn test_self_closing_fires_both_events() {
        let handler = run("<root/>").unwrap();
        assert_eq!(handler.events, vec!["start root []", "end root"]);
    }

    #[test]
    fn test_split_feed_matches_whole_feed() {
        let doc = "<root><a x=\"1\"/>text<!-- c --></root>";
        let whole = run(doc).unwrap();

        let mut parser = PushParser::new(0, 0);
        let cursor = SourceCursor::new(0);
        let mut split = Recorder::default();
        for chunk in doc.as_bytes().chunks(1) {
            parser.feed(chunk, &cursor, &mut split).unwrap();
        }
        parser.finish(&cursor, &mut split).unwrap();

        assert_eq!(whole.events, split.events);
    }

    #[test]
    fn test_entity_decoding_in_text_and_attrs() {
        let handler = run("<r a=\"&lt;x&gt;\">&amp;</r>").unwrap();
        assert_eq!(
            handler.events,
            vec!["start r [a=<x>]", "text \"&\"", "end r"]
        );
    }

    #[test]
    fn test_cdata_is_literal() {
        let handler = run("<r><![CDATA[a < b & c]]></r>").unwrap();
        assert_eq!(handler.events[1], "text \"a < b & c\"");
    }

    #[test]
    fn test_comment_with_markup_inside() {
        let handler = run("<r><!-- <foobar><example /></foobar> --></r>").unwrap();
        assert_eq!(handler.events[1], "comment \" <foobar><example /></foobar> \"");
    }

    #[test]
    fn test_digit_name_error_offset() {
        let err = run("<root>\n\t<1hello />\n</root>").unwrap_err();
        match err {
            Error::Syntax { offset, .. } => assert_eq!(offset, "<root>\n\t<".len()),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_tag_error_offset() {
        let err = run("<root>\n\t<hello></nothello>\n</root>").unwrap_err();
        match err {
            Error::Syntax { offset, message, .. } => {
                assert_eq!(offset, "<root>\n\t<hello></nothello>".len());
                assert!(message.contains("mismatched"));
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_missing_equals_offset() {
        let err = run("<root>\n\t<hello test test2 />\n</root>").unwrap_err();
        match err {
            Error::Syntax { offset, .. } => assert_eq!(offset, "<root>\n\t<hello test ".len()),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_missing_value_offset() {
        let err = run("<root>\n\t<hello test= />\n</root>").unwrap_err();
        match err {
            Error::Syntax { offset, .. } => assert_eq!(offset, "<root>\n\t<hello test= ".len()),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_missing_quotes_offset() {
        let err = run("<root>\n\t<hello test=test2 />\n</root>").unwrap_err();
        match err {
            Error::Syntax { offset, .. } => assert_eq!(offset, "<root>\n\t<hello test=".len()),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_comment_offset() {
        let err = run("<root>\n\t<!-- ").unwrap_err();
        match err {
            Error::Syntax { offset, message, .. } => {
                assert_eq!(offset, "<root>\n\t<!-- ".len());
                assert!(message.contains("comment"));
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_content_after_root_offset() {
        let err = run("<root>\n</root> text").unwrap_err();
        match err {
            Error::Syntax { offset, .. } => assert_eq!(offset, "<root>\n</root> ".len()),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_after_root_is_fine() {
        assert!(run("<root/>\n\t ").is_ok());
    }

    #[test]
    fn test_unclosed_element() {
        let err = run("<root><a>").unwrap_err();
        assert!(err.to_string().contains("unclosed element <a>"));
    }

    #[test]
    fn test_pi_and_doctype_tolerated() {
        let handler = run("<?xml version=\"1.0\"?><!DOCTYPE r><r/>").unwrap();
        assert_eq!(handler.events, vec!["start r []", "end r"]);
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        let handler = run("<r a=\"x>y\"/>").unwrap();
        assert_eq!(handler.events, vec!["start r [a=x>y]", "end r"]);
    }
}
