//! Location-tagged tree nodes.
//!
//! Nodes live in an arena owned by [`crate::tree::Document`] and are
//! addressed by `NodeId` handles. Position data is part of each variant's
//! definition rather than attached after the fact.

use crate::span::TagPosition;

/// Compact node identifier (index into the document arena).
pub type NodeId = u32;

/// Type of node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic document node above the root element.
    Document,
    /// Element node.
    Element,
    /// Text content (adjacent runs are merged before attachment).
    Text,
    /// Comment.
    Comment,
}

/// A namespace-resolved name: optional prefix, local part, and the URI the
/// prefix was bound to in scope (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub uri: Option<String>,
}

impl QName {
    /// The name as written in source: `prefix:local` or just `local`.
    pub fn full_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

/// A resolved attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// Variant payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Element {
        name: QName,
        /// Attributes in source order, xmlns declarations excluded.
        attributes: Vec<Attribute>,
        /// Delimiter spans of the open tag; absent while still being opened.
        open_tag_position: Option<TagPosition>,
        /// Delimiter spans of the close tag; equals the open position for
        /// self-closing syntax.
        close_tag_position: Option<TagPosition>,
    },
    Text {
        content: String,
    },
    Comment {
        text: String,
        tag_position: Option<TagPosition>,
    },
}

/// A node in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Parent node; `None` for the document node and for stray nodes that
    /// are addressable but outside the tree (document-level comments after
    /// the root, trailing whitespace).
    pub parent: Option<NodeId>,
    /// Children in document order.
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(parent: Option<NodeId>, data: NodeData) -> Self {
        Node {
            parent,
            children: Vec::new(),
            data,
        }
    }

    /// Node kind.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text { .. } => NodeKind::Text,
            NodeData::Comment { .. } => NodeKind::Comment,
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind() == NodeKind::Text
    }

    #[inline]
    pub fn is_comment(&self) -> bool {
        self.kind() == NodeKind::Comment
    }

    /// Element name, if this is an element.
    pub fn name(&self) -> Option<&QName> {
        match &self.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Attributes, empty for non-elements.
    pub fn attributes(&self) -> &[Attribute] {
        match &self.data {
            NodeData::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Open-tag position for elements, the single tag position for comments.
    pub fn open_tag_position(&self) -> Option<TagPosition> {
        match &self.data {
            NodeData::Element {
                open_tag_position, ..
            } => *open_tag_position,
            NodeData::Comment { tag_position, .. } => *tag_position,
            _ => None,
        }
    }

    /// Close-tag position for elements, the single tag position for comments.
    pub fn close_tag_position(&self) -> Option<TagPosition> {
        match &self.data {
            NodeData::Element {
                close_tag_position, ..
            } => *close_tag_position,
            NodeData::Comment { tag_position, .. } => *tag_position,
            _ => None,
        }
    }

    /// Whether the element was written with self-closing syntax: the open
    /// and close tag positions coincide.
    pub fn is_self_closing(&self) -> bool {
        match &self.data {
            NodeData::Element {
                open_tag_position: Some(open),
                close_tag_position: Some(close),
                ..
            } => open == close,
            _ => false,
        }
    }

    /// Text content of text and comment nodes.
    pub fn content(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text { content } => Some(content),
            NodeData::Comment { text, .. } => Some(text),
            _ => None,
        }
    }
}
