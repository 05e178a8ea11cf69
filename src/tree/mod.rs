//! Location-aware document tree.
//!
//! Nodes live in an arena addressed by [`NodeId`] handles; the arena doubles
//! as the flat all-nodes list, so stray document-level nodes stay reachable.

mod builder;
mod document;
mod namespace;
mod node;

pub use builder::TreeBuilder;
pub use document::{collapse_whitespace, Document};
pub use namespace::{ns, NamespaceTable};
pub use node::{Attribute, Node, NodeData, NodeId, NodeKind, QName};
