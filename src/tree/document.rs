//! The parsed document: an arena of location-tagged nodes.

use super::namespace::NamespaceTable;
use super::node::{Node, NodeData, NodeId, NodeKind};
use crate::pathindex::Direction;

/// A parsed document.
///
/// Nodes are stored in an arena in document order, so `NodeId` order is
/// document order. The arena is also the flat "all nodes" list: stray nodes
/// (document-level comments after the root element, trailing whitespace)
/// stay addressable here even though nothing in the tree points at them.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    namespaces: NamespaceTable,
}

impl Document {
    /// The synthetic document node sitting above the root element.
    pub const DOCUMENT_NODE: NodeId = 0;

    pub(crate) fn new(nodes: Vec<Node>, root: NodeId, namespaces: NamespaceTable) -> Self {
        Document {
            nodes,
            root,
            namespaces,
        }
    }

    /// The root element.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Every distinct prefix binding observed while parsing, in document
    /// order.
    #[inline]
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Look up a node by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Number of nodes in the arena (including the document node).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in document order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len() as NodeId
    }

    /// Kind of a node; `None` for an invalid id.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(Node::kind)
    }

    /// Children of a node in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Parent of a node.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Next sibling of any kind (element, text, comment).
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&s| s == id)?;
        siblings.get(index + 1).copied()
    }

    /// Previous sibling of any kind.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&s| s == id)?;
        index.checked_sub(1).and_then(|i| siblings.get(i)).copied()
    }

    /// All descendants of a node in document order, excluding the node.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            for &child in self.children(next).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// XPath string-value: text content for text/comment nodes, the
    /// concatenation of all descendant text for elements and the document.
    pub fn string_value(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        match &node.data {
            NodeData::Text { content } => content.clone(),
            NodeData::Comment { text, .. } => text.clone(),
            NodeData::Element { .. } | NodeData::Document => {
                let mut out = String::new();
                for descendant in self.descendants(id) {
                    if let Some(NodeData::Text { content }) =
                        self.node(descendant).map(|n| &n.data)
                    {
                        out.push_str(content);
                    }
                }
                out
            }
        }
    }

    /// Attribute value by the name as written in source (`prefix:local` or
    /// plain `local`).
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?
            .attributes()
            .iter()
            .find(|a| a.name.full_name() == name)
            .map(|a| a.value.as_str())
    }

    /// The namespace URI, local name, and prefixed name of an element.
    pub fn tag_name(&self, id: NodeId) -> Option<(Option<&str>, &str, String)> {
        let name = self.node(id)?.name()?;
        Some((name.uri.as_deref(), name.local.as_str(), name.full_name()))
    }

    /// Tree-relative navigation: the node next to `id` in the given
    /// direction, skipping text nodes for sibling moves. `Open` and `Close`
    /// address tag boundaries, not nodes, so they resolve to nothing here.
    pub fn relative(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
        match direction {
            Direction::Self_ => Some(id),
            Direction::Parent => {
                let parent = self.parent_of(id)?;
                (parent != Self::DOCUMENT_NODE).then_some(parent)
            }
            Direction::Next => {
                let mut current = self.next_sibling(id);
                while let Some(sibling) = current {
                    match self.kind(sibling) {
                        Some(NodeKind::Text) => current = self.next_sibling(sibling),
                        _ => return Some(sibling),
                    }
                }
                None
            }
            Direction::Prev => {
                let mut current = self.prev_sibling(id);
                while let Some(sibling) = current {
                    match self.kind(sibling) {
                        Some(NodeKind::Text) => current = self.prev_sibling(sibling),
                        _ => return Some(sibling),
                    }
                }
                None
            }
            Direction::Open | Direction::Close => None,
        }
    }
}

/// Flatten text for one-line display: trim, turn tabs and newlines into
/// spaces, squeeze runs of spaces, and truncate to `max_len` characters
/// with a `...` marker (`None` means no limit).
pub fn collapse_whitespace(text: &str, max_len: Option<usize>) -> String {
    let trimmed = text.trim();
    let limited: String = match max_len {
        Some(max) => trimmed.chars().take(max + 1).collect(),
        None => trimmed.to_string(),
    };
    let mut squeezed = String::with_capacity(limited.len());
    let mut last_was_space = false;
    for c in limited.chars() {
        let c = if c == '\n' || c == '\t' { ' ' } else { c };
        if c == ' ' {
            if !last_was_space {
                squeezed.push(c);
            }
            last_was_space = true;
        } else {
            squeezed.push(c);
            last_was_space = false;
        }
    }
    match max_len {
        None => squeezed,
        Some(max) => {
            if squeezed.chars().count() > max {
                let cut: String = squeezed.chars().take(max.saturating_sub(3)).collect();
                format!("{}...", cut)
            } else {
                squeezed
            }
        }
    }
}
