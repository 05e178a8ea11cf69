//! End-to-end location tracking: chunk feeds, tag positions, error offsets.

use pretty_assertions::assert_eq;
use xmlcursor::{parse_with_locations, Document, Error, NodeId, NodeKind};

fn parse(text: &str) -> Document {
    parse_with_locations([text], 0, 0, None).unwrap()
}

fn parse_per_byte(text: &str) -> Document {
    let chunks: Vec<String> = text.chars().map(|c| c.to_string()).collect();
    parse_with_locations(chunks.iter(), 0, 0, None).unwrap()
}

/// A structural fingerprint of a document: kind, name, positions, content.
fn fingerprint(doc: &Document) -> Vec<String> {
    doc.node_ids()
        .filter_map(|id| {
            let node = doc.node(id)?;
            Some(match node.kind() {
                NodeKind::Document => "document".to_string(),
                NodeKind::Element => format!(
                    "element {} open={:?} close={:?} attrs={:?}",
                    node.name().map(|q| q.full_name()).unwrap_or_default(),
                    node.open_tag_position().map(|p| p.range()),
                    node.close_tag_position().map(|p| p.range()),
                    node.attributes()
                        .iter()
                        .map(|a| format!("{}={}", a.name.full_name(), a.value))
                        .collect::<Vec<_>>(),
                ),
                NodeKind::Text => format!("text {:?}", node.content()),
                NodeKind::Comment => format!(
                    "comment {:?} at {:?}",
                    node.content(),
                    node.open_tag_position().map(|p| p.range()),
                ),
            })
        })
        .collect()
}

fn elements(doc: &Document) -> Vec<NodeId> {
    doc.node_ids()
        .filter(|&id| doc.node(id).map(|n| n.is_element()).unwrap_or(false))
        .collect()
}

const SAMPLE: &str = concat!(
    "<?xml version=\"1.0\"?>\n",
    "<catalog xmlns:m=\"http://media\" lang=\"en\">\n",
    "  <!-- first batch -->\n",
    "  <m:item id=\"1\">alpha &amp; bêta</m:item>\n",
    "  <m:item id=\"2\"><![CDATA[raw <stuff>]]></m:item>\n",
    "  <empty/>\n",
    "</catalog>\n",
);

#[test]
fn chunking_invariance_per_byte() {
    let whole = parse(SAMPLE);
    let split = parse_per_byte(SAMPLE);
    assert_eq!(fingerprint(&whole), fingerprint(&split));
}

#[test]
fn chunking_invariance_arbitrary_splits() {
    let whole = fingerprint(&parse(SAMPLE));
    for size in [2, 3, 5, 7, 11, 64] {
        let mut chunks = Vec::new();
        let mut rest = SAMPLE;
        while !rest.is_empty() {
            let mut cut = size.min(rest.len());
            while !rest.is_char_boundary(cut) {
                cut += 1;
            }
            let (head, tail) = rest.split_at(cut);
            chunks.push(head);
            rest = tail;
        }
        let split = parse_with_locations(chunks, 0, 0, None).unwrap();
        assert_eq!(whole, fingerprint(&split), "chunk size {}", size);
    }
}

#[test]
fn chunking_invariance_all_two_chunk_splits() {
    // Every possible cut point, including ones that land inside `<![CDATA[`,
    // `]]>`, `<!--` and `-->`.
    let text = "<r a=\"1\"><![CDATA[x <&> y]]><!-- c --><b/></r>";
    let whole = fingerprint(&parse(text));
    for cut in 1..text.len() {
        let split = parse_with_locations([&text[..cut], &text[cut..]], 0, 0, None).unwrap();
        assert_eq!(whole, fingerprint(&split), "cut {}", cut);
    }
}

#[test]
fn round_trip_offsets_cover_exact_extents() {
    let doc = parse(SAMPLE);
    for id in elements(&doc) {
        let node = doc.node(id).unwrap();
        let open = node.open_tag_position().unwrap();
        let close = node.close_tag_position().unwrap();
        let (start, _) = open.range();
        let (_, end) = close.range();
        let extent = &SAMPLE[start..end];
        assert!(extent.starts_with('<'), "extent {:?}", extent);
        assert!(extent.ends_with('>'), "extent {:?}", extent);
    }

    let doc = parse("<root><a/><b>x</b></root>");
    let text = "<root><a/><b>x</b></root>";
    let names: Vec<(String, usize, usize)> = elements(&doc)
        .into_iter()
        .map(|id| {
            let node = doc.node(id).unwrap();
            let (start, _) = node.open_tag_position().unwrap().range();
            let (_, end) = node.close_tag_position().unwrap().range();
            (node.name().unwrap().full_name(), start, end)
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("root".to_string(), 0, 25),
            ("a".to_string(), 6, 10),
            ("b".to_string(), 10, 18),
        ]
    );
    assert_eq!(&text[10..18], "<b>x</b>");
}

#[test]
fn self_closing_iff_syntax() {
    let doc = parse("<root><a/><b></b></root>");
    let ids = elements(&doc);
    let a = doc.node(ids[1]).unwrap();
    let b = doc.node(ids[2]).unwrap();
    assert!(a.is_self_closing());
    assert!(!b.is_self_closing());
}

#[test]
fn self_closing_root_split_across_chunks() {
    let doc = parse_with_locations(["<roo", "t/>"], 0, 0, None).unwrap();
    let root = doc.node(doc.root()).unwrap();
    assert!(root.is_self_closing());
    assert_eq!(root.open_tag_position(), root.close_tag_position());
    assert_eq!(root.open_tag_position().unwrap().range(), (0, 7));
}

#[test]
fn comment_positions_cover_markers() {
    let text = "<r><!-- note --></r>";
    let doc = parse(text);
    let comment = doc.children(doc.root())[0];
    let pos = doc.node(comment).unwrap().open_tag_position().unwrap();
    let (start, end) = pos.range();
    assert_eq!(&text[start..end], "<!-- note -->");
}

#[test]
fn commented_out_markup_stays_one_comment() {
    let text = "<r><!-- <foobar><example /></foobar> --></r>";
    let doc = parse(text);
    let children = doc.children(doc.root());
    assert_eq!(children.len(), 1);
    let node = doc.node(children[0]).unwrap();
    assert_eq!(node.kind(), NodeKind::Comment);
    let (start, end) = node.open_tag_position().unwrap().range();
    assert_eq!(&text[start..end], "<!-- <foobar><example /></foobar> -->");
}

#[test]
fn digit_element_name_fails_after_open_angle() {
    let err = parse_with_locations(["<root>\n\t<1hello />\n</root>"], 0, 0, None).unwrap_err();
    match err {
        Error::Syntax {
            offset,
            line,
            column,
            message,
        } => {
            assert_eq!(offset, "<root>\n\t<".len());
            assert_eq!(line, 2);
            assert_eq!(column, 3);
            assert!(message.contains("digit"), "message: {}", message);
        }
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn line_offset_shifts_reported_lines() {
    let err = parse_with_locations(["<root>\n\t<1hello />\n</root>"], 0, 10, None).unwrap_err();
    match err {
        Error::Syntax { line, .. } => assert_eq!(line, 12),
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn position_offset_shifts_every_span() {
    let doc = parse_with_locations(["<r><a/></r>"], 500, 0, None).unwrap();
    let root = doc.node(doc.root()).unwrap();
    assert_eq!(root.open_tag_position().unwrap().range(), (500, 503));
    let a = doc.children(doc.root())[0];
    assert_eq!(
        doc.node(a).unwrap().open_tag_position().unwrap().range(),
        (503, 507)
    );
}

#[test]
fn namespace_table_accumulates_in_first_seen_order() {
    let text = concat!(
        "<r xmlns:p=\"http://one\">",
        "<p:a xmlns:q=\"http://two\"/>",
        "<p:b xmlns:p=\"http://three\"/>",
        "<p:c xmlns:p=\"http://one\"/>",
        "</r>",
    );
    let doc = parse(text);
    let table = doc.namespaces();
    let prefixes: Vec<_> = table.iter().map(|(p, _)| p.map(str::to_string)).collect();
    assert_eq!(
        prefixes,
        vec![Some("p".to_string()), Some("q".to_string())]
    );
    assert_eq!(
        table.uris(Some("p")),
        &["http://one".to_string(), "http://three".to_string()]
    );
}

#[test]
fn cancellation_discards_parse() {
    let mut calls = 0;
    let mut stop = move || {
        calls += 1;
        calls > 1
    };
    let result = parse_with_locations(
        ["<root>", "<a/>", "</root>"],
        0,
        0,
        Some(&mut stop),
    );
    assert!(result.is_err());
}

#[test]
fn whitespace_only_document_has_no_root() {
    let err = parse_with_locations(["   \n  "], 0, 0, None).unwrap_err();
    assert!(matches!(err, Error::Syntax { .. }));
}

#[test]
fn trailing_whitespace_after_root_is_kept_addressable() {
    let doc = parse("<r/>\n");
    // Document node, root, stray trailing text node.
    assert_eq!(doc.len(), 3);
    assert_eq!(doc.node(2).unwrap().content(), Some("\n"));
    assert_eq!(doc.parent_of(2), None);
}

#[test]
fn undeclared_prefix_reported_as_malformed_name() {
    let err = parse_with_locations(["<x:r/>"], 0, 0, None).unwrap_err();
    assert!(matches!(err, Error::MalformedName { .. }));
}

#[test]
fn mismatched_close_tag_reports_offset_after_tag() {
    let input = "<root>\n\t<hello>foobar</world>\n</root>";
    let err = parse_with_locations([input], 0, 0, None).unwrap_err();
    match err {
        Error::Syntax { offset, .. } => {
            assert_eq!(offset, "<root>\n\t<hello>foobar</world>".len());
        }
        other => panic!("expected syntax error, got {:?}", other),
    }
}
