//! Chunk tokenizer: splits a byte stream on XML delimiter pairs.
//!
//! The scanner never commits to a delimiter decision while the trailing
//! bytes of the current chunk could still be the truncated beginning of a
//! longer token: everything within `LARGEST_TOKEN` bytes of the chunk end is
//! carried forward to the next feed. Each recognised span is recorded with
//! its absolute byte range before being handed to the push parser, so the
//! parser's callbacks line up with a known span history.

use memchr::memchr;
use memchr::memmem;
use tracing::debug;

use super::cursor::SourceCursor;
use crate::error::Result;
use crate::sax::{PushParser, SaxHandler};
use crate::span::Span;

/// Delimiter pairs, tried in order at each `<`. CDATA and comment come
/// before the bare tag so the longest marker wins.
const SPLIT_TOKENS: [(&[u8], &[u8]); 3] = [
    (b"<![CDATA[", b"]]>"),
    (b"<!--", b"-->"),
    (b"<", b">"),
];

/// Length of the longest begin or end token (`<![CDATA[`).
const LARGEST_TOKEN: usize = 9;

/// Splits fed chunks into tagged spans and feeds them to a [`PushParser`].
///
/// `feed` may be called any number of times with consecutive fragments of
/// one document; `close` flushes the held-back tail and resets the scanner
/// for reuse. Documents shorter than `LARGEST_TOKEN` never enter the main
/// loop until the final flush, which processes everything.
pub struct ChunkScanner {
    remainder: Vec<u8>,
    expect_end: Option<&'static [u8]>,
    position_offset: usize,
    initial_position_offset: usize,
    initial_line_offset: u32,
    cursor: SourceCursor,
    final_chunk: bool,
}

impl ChunkScanner {
    /// Create a scanner whose recorded offsets start at `position_offset`
    /// and whose line numbers start at `1 + line_offset`.
    pub fn new(position_offset: usize, line_offset: u32) -> Self {
        ChunkScanner {
            remainder: Vec::new(),
            expect_end: None,
            position_offset,
            initial_position_offset: position_offset,
            initial_line_offset: line_offset,
            cursor: SourceCursor::new(line_offset),
            final_chunk: false,
        }
    }

    /// The cursor tracking line/column and the tagged-span history.
    pub fn cursor(&self) -> &SourceCursor {
        &self.cursor
    }

    /// Feed the next chunk of the document.
    pub fn feed<H: SaxHandler>(
        &mut self,
        chunk: &str,
        parser: &mut PushParser,
        handler: &mut H,
    ) -> Result<()> {
        let mut data = std::mem::take(&mut self.remainder);
        data.extend_from_slice(chunk.as_bytes());

        // Hold back enough trailing bytes to tell `<![CDATA[`, `<!--` and a
        // plain `<` apart across the chunk boundary.
        let process_until = if self.final_chunk {
            data.len()
        } else {
            data.len().saturating_sub(LARGEST_TOKEN)
        };

        let mut offset = 0;
        while offset < process_until {
            if let Some(end_token) = self.expect_end {
                // Looking for the end delimiter of an open token.
                match memmem::find(&data[offset..process_until], end_token) {
                    None => {
                        if self.final_chunk {
                            break;
                        }
                        // The delimiter may straddle the hold-back line, so
                        // nothing past this point can be consumed yet: carry
                        // the whole remainder forward and retry once more
                        // input arrives.
                        self.position_offset += offset;
                        self.remainder = data.split_off(offset);
                        return Ok(());
                    }
                    Some(rel) => {
                        let pos = offset + rel;
                        self.emit(&data, offset, pos, parser, handler)?;
                        self.emit(&data, pos, pos + end_token.len(), parser, handler)?;
                        offset = pos + end_token.len();
                        self.expect_end = None;
                    }
                }
            }
            if self.expect_end.is_none() {
                if offset >= process_until {
                    break;
                }
                match memchr(b'<', &data[offset..process_until]) {
                    None => break,
                    Some(rel) => {
                        let pos = offset + rel;
                        let mut begin_len = 1;
                        for (begin, end_token) in SPLIT_TOKENS {
                            if data[pos..].starts_with(begin) {
                                self.expect_end = Some(end_token);
                                begin_len = begin.len();
                                break;
                            }
                        }
                        self.emit(&data, offset, pos, parser, handler)?;
                        self.emit(&data, pos, pos + begin_len, parser, handler)?;
                        offset = pos + begin_len;
                    }
                }
            }
        }

        // The last matched delimiter may extend past the hold-back line.
        let consumed_to = process_until.max(offset);

        // Feed the unclassified tail without recording a position.
        let tail = &data[offset..consumed_to];
        self.cursor.advance(tail);
        if !tail.is_empty() {
            parser.feed(tail, &self.cursor, handler)?;
        }

        self.position_offset += consumed_to;
        self.remainder = data[consumed_to..].to_vec();
        Ok(())
    }

    /// Signal end of input: process the whole remainder, finish the parser,
    /// and reset internal state to initial for reuse.
    pub fn close<H: SaxHandler>(
        &mut self,
        parser: &mut PushParser,
        handler: &mut H,
    ) -> Result<()> {
        self.final_chunk = true;
        debug!(remainder = self.remainder.len(), "flushing final chunk");
        let flush = self.feed("", parser, handler);
        let finish = flush.and_then(|_| parser.finish(&self.cursor, handler));
        self.reset();
        finish
    }

    /// Record a tagged span, then feed its text to the parser, then advance
    /// line/column. Empty spans are recorded but not fed; the span history
    /// arithmetic counts them.
    fn emit<H: SaxHandler>(
        &mut self,
        data: &[u8],
        start: usize,
        end: usize,
        parser: &mut PushParser,
        handler: &mut H,
    ) -> Result<()> {
        let span = Span::new(self.position_offset + start, self.position_offset + end);
        self.cursor.record(span);
        let text = &data[start..end];
        if !text.is_empty() {
            parser.feed(text, &self.cursor, handler)?;
        }
        self.cursor.advance(text);
        Ok(())
    }

    fn reset(&mut self) {
        self.remainder = Vec::new();
        self.expect_end = None;
        self.position_offset = self.initial_position_offset;
        self.cursor.reset(self.initial_line_offset);
        self.final_chunk = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::sax::{EventContext, RawAttribute};
    use crate::span::TagPosition;

    /// Records the location attached to each structural event.
    #[derive(Default)]
    struct LocationLog {
        starts: Vec<(String, Option<TagPosition>)>,
        ends: Vec<(String, Option<TagPosition>)>,
        comments: Vec<Option<TagPosition>>,
    }

    impl SaxHandler for LocationLog {
        fn element_start(
            &mut self,
            name: &str,
            _attributes: &[RawAttribute],
            ctx: &EventContext,
        ) -> Result<()> {
            self.starts.push((name.to_string(), ctx.location));
            Ok(())
        }

        fn element_end(&mut self, name: &str, ctx: &EventContext) -> Result<()> {
            self.ends.push((name.to_string(), ctx.location));
            Ok(())
        }

        fn text(&mut self, _data: &str) -> Result<()> {
            Ok(())
        }

        fn comment(&mut self, _text: &str, ctx: &EventContext) -> Result<()> {
            self.comments.push(ctx.location);
            Ok(())
        }
    }

    fn scan_chunks(chunks: &[&str]) -> LocationLog {
        let mut scanner = ChunkScanner::new(0, 0);
        let mut parser = PushParser::new(0, 0);
        let mut log = LocationLog::default();
        for chunk in chunks {
            scanner.feed(chunk, &mut parser, &mut log).unwrap();
        }
        scanner.close(&mut parser, &mut log).unwrap();
        log
    }

    #[test]
    fn test_single_chunk_positions() {
        let log = scan_chunks(&["<root>x</root>"]);
        let (name, open) = &log.starts[0];
        assert_eq!(name, "root");
        assert_eq!(open.unwrap().range(), (0, 6));
        let (_, close) = &log.ends[0];
        assert_eq!(close.unwrap().range(), (7, 14));
    }

    #[test]
    fn test_self_closing_positions_coincide() {
        let log = scan_chunks(&["<root/>"]);
        assert_eq!(log.starts[0].1, log.ends[0].1);
        assert_eq!(log.starts[0].1.unwrap().range(), (0, 7));
    }

    #[test]
    fn test_two_chunk_split_inside_tag() {
        let log = scan_chunks(&["<roo", "t/>"]);
        assert_eq!(log.starts[0].1, log.ends[0].1);
        assert_eq!(log.starts[0].1.unwrap().range(), (0, 7));
    }

    #[test]
    fn test_per_byte_chunks_match_single_chunk() {
        let doc = "<a><b attr=\"v\">text</b><!-- note --><c/></a>";
        let whole = scan_chunks(&[doc]);
        let bytes: Vec<String> = doc.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = bytes.iter().map(|s| s.as_str()).collect();
        let split = scan_chunks(&refs);
        assert_eq!(whole.starts, split.starts);
        assert_eq!(whole.ends, split.ends);
        assert_eq!(whole.comments, split.comments);
    }

    #[test]
    fn test_comment_position_covers_markers() {
        let doc = "<r><!-- hi --></r>";
        let log = scan_chunks(&[doc]);
        let pos = log.comments[0].unwrap();
        assert_eq!(pos.range(), (3, 14));
        assert_eq!(&doc[pos.start.start..pos.end.end], "<!-- hi -->");
    }

    #[test]
    fn test_position_offset_is_applied() {
        let mut scanner = ChunkScanner::new(100, 0);
        let mut parser = PushParser::new(100, 0);
        let mut log = LocationLog::default();
        scanner.feed("<r/>", &mut parser, &mut log).unwrap();
        scanner.close(&mut parser, &mut log).unwrap();
        assert_eq!(log.starts[0].1.unwrap().range(), (100, 104));
    }

    #[test]
    fn test_end_delimiter_straddling_holdback_line() {
        // Certain cuts leave "-->" or "]]>" half inside the hold-back
        // region; the scanner must defer rather than consume past it.
        for doc in [
            "<r><!-- note -->tail text</r>",
            "<r><![CDATA[hello]]>tail text</r>",
        ] {
            let whole = scan_chunks(&[doc]);
            for cut in 1..doc.len() {
                let split = scan_chunks(&[&doc[..cut], &doc[cut..]]);
                assert_eq!(whole.starts, split.starts, "doc {:?} cut {}", doc, cut);
                assert_eq!(whole.ends, split.ends, "doc {:?} cut {}", doc, cut);
                assert_eq!(whole.comments, split.comments, "doc {:?} cut {}", doc, cut);
            }
        }
    }

    #[test]
    fn test_cdata_split_across_chunks() {
        let doc = "<r><![CDATA[a]]b]]></r>";
        let whole = scan_chunks(&[doc]);
        let split = scan_chunks(&["<r><![CD", "ATA[a]]b]]", "></r>"]);
        assert_eq!(whole.starts, split.starts);
        assert_eq!(whole.ends, split.ends);
    }
}
