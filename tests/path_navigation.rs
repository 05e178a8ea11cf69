//! Path index scan correctness and relative navigation, cross-checked
//! against the parsed tree.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use xmlcursor::{
    build_path_index, parse_with_locations, run_xpath, Direction, PathIndex, PathIndexConfig,
    QueryResult, Span,
};

fn index(text: &str) -> PathIndex {
    build_path_index(text, &PathIndexConfig::default())
}

#[test]
fn next_then_parent_concrete_offsets() {
    let idx = index("<root><a/><b>x</b></root>");
    let next = idx.navigate(Span::new(6, 10), Direction::Next).unwrap();
    assert_eq!(next, Span::new(10, 13));
    let parent = idx.navigate(next, Direction::Parent).unwrap();
    assert_eq!(parent, Span::new(0, 6));
}

#[test]
fn scan_results_agree_with_tree_paths() {
    let text = "<shop><item><name>tea</name></item><item/><note/></shop>";
    let idx = index(text);
    let doc = parse_with_locations([text], 0, 0, None).unwrap();

    // For every element, the index resolves the open-tag region to a path
    // whose XPath form selects exactly that element in the tree.
    for id in doc.node_ids() {
        let Some(node) = doc.node(id) else { continue };
        if !node.is_element() {
            continue;
        }
        let pos = node.open_tag_position().unwrap();
        let (start, _) = pos.range();
        // Full open tag runs from '<' to the matching '>'.
        let open_region = Span::new(pos.start.start, pos.end.end);
        let entry = idx.entry_at(open_region).unwrap();
        let results = run_xpath(
            entry.joined(),
            &doc,
            None,
            doc.namespaces(),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(
            results,
            vec![QueryResult::Node(id)],
            "path {:?} for element at {}",
            entry.joined(),
            start
        );
    }
}

#[test]
fn indexes_at_returns_matches_in_input_order() {
    let text = "<r><a/><b/><c/></r>";
    let idx = index(text);
    // Open-tag regions of a, b, c in document order.
    let regions = [Span::new(3, 7), Span::new(7, 11), Span::new(11, 15)];
    let found = idx.indexes_at(&regions);
    assert_eq!(found.len(), 3);
    let paths: Vec<&str> = found.iter().map(|&i| idx.entries()[i].joined()).collect();
    assert_eq!(paths, vec!["/r[1]/a[1]", "/r[1]/b[1]", "/r[1]/c[1]"]);
    // Indexes are strictly increasing because both lists are sorted.
    assert!(found.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn unmatched_regions_are_skipped() {
    let idx = index("<r><a/></r>");
    let found = idx.indexes_at(&[Span::new(3, 7), Span::new(4000, 4001)]);
    assert_eq!(found.len(), 1);
}

#[test]
fn navigation_symmetry_over_sibling_sequences() {
    // next followed by prev returns to the same region for every sibling
    // that is not the last one.
    let docs = [
        "<r><a/><b/></r>",
        "<r><a/><b/><c/><d/></r>",
        "<r><a>x</a><b><c/></b><d/></r>",
        "<r><s><a/><b/></s><t><a/><b/><c/></t></r>",
    ];
    for text in docs {
        let idx = index(text);
        for entry in idx.entries() {
            let region = entry.region();
            let Some(next) = idx.navigate(region, Direction::Next) else {
                continue;
            };
            let open = idx.navigate(region, Direction::Open);
            let Some(open) = open else { continue };
            let back = idx.navigate(next, Direction::Prev).unwrap();
            assert_eq!(
                back, open,
                "doc {:?}: prev after next from {:?} landed on {:?}",
                text, region, back
            );
        }
    }
}

#[test]
fn prev_sibling_fixing_with_interleaved_comments() {
    // The asymmetric prev rule: fix on the nearest distinct sibling and
    // land on its earliest boundary, even with comments and nesting in
    // between.
    let text = "<r><a/><!-- noise --><b><x/><!-- more --></b><c/></r>";
    let idx = index(text);
    let c_open = idx
        .entries()
        .iter()
        .find(|e| e.joined() == "/r[1]/c[1]")
        .unwrap()
        .region();
    let prev = idx.navigate(c_open, Direction::Prev).unwrap();
    let landed = idx.entry_at(prev).unwrap();
    assert_eq!(landed.joined(), "/r[1]/b[1]");
    // Earliest boundary of <b> is its open tag.
    assert_eq!(&text[prev.start..prev.end], "<b>");

    let b_open = prev;
    let back = idx.navigate(b_open, Direction::Prev).unwrap();
    assert_eq!(idx.entry_at(back).unwrap().joined(), "/r[1]/a[1]");
}

#[test]
fn open_close_and_self_round_trip() {
    let text = "<root><a/><b>hello</b></root>";
    let idx = index(text);
    // Caret inside <b>'s text.
    let caret = Span::point(15);
    let open = idx.navigate(caret, Direction::Open).unwrap();
    assert_eq!(&text[open.start..open.end], "<b>");
    let close = idx.navigate(caret, Direction::Close).unwrap();
    assert_eq!(&text[close.start..close.end], "</b>");
    // self resolves to the entry the caret sits in.
    let this = idx.navigate(caret, Direction::Self_).unwrap();
    assert_eq!(&text[this.start..this.end], "hello");
}

#[test]
fn navigation_returns_none_not_error_at_edges() {
    let idx = index("<r><a/><b/></r>");
    let a = Span::new(3, 7);
    let b = Span::new(7, 11);
    assert_eq!(idx.navigate(a, Direction::Prev), None);
    assert_eq!(idx.navigate(b, Direction::Next), None);
    // Root has no parent path entries.
    assert_eq!(idx.navigate(Span::new(0, 3), Direction::Parent), None);
}

#[test]
fn deep_nesting_parent_chain() {
    let text = "<a><b><c><d/></c></b></a>";
    let idx = index(text);
    let d_open = idx
        .entries()
        .iter()
        .find(|e| e.joined() == "/a[1]/b[1]/c[1]/d[1]")
        .unwrap()
        .region();
    let c = idx.navigate(d_open, Direction::Parent).unwrap();
    assert_eq!(idx.entry_at(c).unwrap().joined(), "/a[1]/b[1]/c[1]");
    let b = idx.navigate(c, Direction::Parent).unwrap();
    assert_eq!(idx.entry_at(b).unwrap().joined(), "/a[1]/b[1]");
    let a = idx.navigate(b, Direction::Parent).unwrap();
    assert_eq!(idx.entry_at(a).unwrap().joined(), "/a[1]");
}

#[test]
fn index_rebuild_reflects_changed_text() {
    // Full rebuild is the contract; a new text gets a fresh index.
    let before = index("<r><a/></r>");
    let after = index("<r><b/><a/></r>");
    assert!(before.entries().iter().any(|e| e.joined() == "/r[1]/a[1]"));
    assert!(after.entries().iter().any(|e| e.joined() == "/r[1]/b[1]"));
    assert!(after.entries().iter().any(|e| e.joined() == "/r[1]/a[2]"));
}
