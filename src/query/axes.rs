//! Axis traversals over the document arena.

use std::collections::HashSet;

use super::parser::Axis;
use crate::tree::{Document, NodeId, NodeKind};

/// Nodes reached from `context` along `axis`, in axis order (reverse
/// document order for the reverse axes, so `position()` counts proximity).
pub fn navigate(doc: &Document, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children(context).to_vec(),
        Axis::Descendant => doc.descendants(context),
        Axis::DescendantOrSelf => {
            let mut out = vec![context];
            out.extend(doc.descendants(context));
            out
        }
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestors(doc, context),
        Axis::AncestorOrSelf => {
            let mut out = vec![context];
            out.extend(ancestors(doc, context));
            out
        }
        Axis::FollowingSibling => {
            let mut out = Vec::new();
            let mut sibling = doc.next_sibling(context);
            while let Some(id) = sibling {
                out.push(id);
                sibling = doc.next_sibling(id);
            }
            out
        }
        Axis::PrecedingSibling => {
            let mut out = Vec::new();
            let mut sibling = doc.prev_sibling(context);
            while let Some(id) = sibling {
                out.push(id);
                sibling = doc.prev_sibling(id);
            }
            out
        }
        Axis::Following => following(doc, context),
        Axis::Preceding => preceding(doc, context),
        Axis::Self_ => vec![context],
        // The attribute axis is resolved against attribute values in the
        // evaluator; namespace nodes are not modeled.
        Axis::Attribute | Axis::Namespace => Vec::new(),
    }
}

fn ancestors(doc: &Document, context: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = context;
    while let Some(parent) = doc.parent_of(current) {
        out.push(parent);
        current = parent;
    }
    out
}

/// Everything after the context node in document order, minus descendants:
/// following siblings with their subtrees, then each ancestor's following
/// siblings with theirs.
fn following(doc: &Document, context: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut node = context;
    loop {
        let mut sibling = doc.next_sibling(node);
        while let Some(id) = sibling {
            out.push(id);
            out.extend(doc.descendants(id));
            sibling = doc.next_sibling(id);
        }
        match doc.parent_of(node) {
            Some(parent) => node = parent,
            None => break,
        }
    }
    out
}

/// Everything before the context node in document order, minus ancestors,
/// in reverse document order.
fn preceding(doc: &Document, context: NodeId) -> Vec<NodeId> {
    let ancestor_set: HashSet<NodeId> = ancestors(doc, context).into_iter().collect();
    let mut out = Vec::new();
    for id in doc.descendants(Document::DOCUMENT_NODE) {
        if id == context {
            break;
        }
        if !ancestor_set.contains(&id) {
            out.push(id);
        }
    }
    out.reverse();
    out
}

/// A node test with its namespace prefix already resolved to a URI.
#[derive(Debug, Clone)]
pub enum ResolvedTest {
    Any,
    Name(String),
    QName(String, String),
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Whether an element/text/comment node passes a resolved node test.
pub fn matches_test(doc: &Document, id: NodeId, test: &ResolvedTest) -> bool {
    let Some(kind) = doc.kind(id) else {
        return false;
    };
    match test {
        ResolvedTest::Any => kind == NodeKind::Element,
        ResolvedTest::Name(local) => {
            kind == NodeKind::Element
                && doc
                    .node(id)
                    .and_then(|n| n.name())
                    .map(|q| q.uri.is_none() && q.local == *local)
                    .unwrap_or(false)
        }
        ResolvedTest::QName(uri, local) => {
            kind == NodeKind::Element
                && doc
                    .node(id)
                    .and_then(|n| n.name())
                    .map(|q| q.uri.as_deref() == Some(uri.as_str()) && q.local == *local)
                    .unwrap_or(false)
        }
        ResolvedTest::NamespaceWildcard(uri) => {
            kind == NodeKind::Element
                && doc
                    .node(id)
                    .and_then(|n| n.name())
                    .map(|q| q.uri.as_deref() == Some(uri.as_str()))
                    .unwrap_or(false)
        }
        ResolvedTest::Node => true,
        ResolvedTest::Text => kind == NodeKind::Text,
        ResolvedTest::Comment => kind == NodeKind::Comment,
        // Processing instructions are not represented in the tree.
        ResolvedTest::ProcessingInstruction => false,
    }
}
