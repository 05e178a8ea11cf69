//! Location-aware tree construction from parse events.

use tracing::debug;

use super::document::Document;
use super::namespace::{ns, NamespaceTable};
use super::node::{Attribute, Node, NodeData, NodeId, QName};
use crate::error::{Error, Result};
use crate::sax::{EventContext, RawAttribute, SaxHandler};

/// Builds a [`Document`] from SAX callbacks, stamping tag positions as the
/// events arrive.
///
/// State is an explicit stack of open elements plus a pending-text buffer.
/// Text fragments are concatenated until the next structural event and then
/// attached as a single node; whether that lands as leading content of an
/// open element or as trailing text after a just-closed node falls out of
/// the arena's child ordering.
pub struct TreeBuilder {
    nodes: Vec<Node>,
    stack: Vec<NodeId>,
    pending_text: String,
    most_recent: Option<NodeId>,
    root: Option<NodeId>,
    namespaces: NamespaceTable,
    /// Namespace bindings declared by each open element, innermost last.
    scopes: Vec<Vec<(Option<String>, String)>>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            nodes: vec![Node::new(None, NodeData::Document)],
            stack: Vec::with_capacity(16),
            pending_text: String::new(),
            most_recent: None,
            root: None,
            namespaces: NamespaceTable::new(),
            scopes: Vec::with_capacity(16),
        }
    }

    /// Consume the builder and produce the finished document.
    pub fn finish(mut self) -> Result<Document> {
        self.flush();
        let root = self
            .root
            .ok_or_else(|| Error::syntax("no element found", 0, 1, 1))?;
        debug!(nodes = self.nodes.len(), "document built");
        Ok(Document::new(self.nodes, root, self.namespaces))
    }

    /// Attach pending text as a single node in document order. Text seen
    /// before any node exists is whitespace (the parser rejects anything
    /// else outside the root) and is discarded.
    fn flush(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let value = std::mem::take(&mut self.pending_text);
        if self.most_recent.is_none() {
            return;
        }
        self.append_node(Node::new(None, NodeData::Text { content: value }));
    }

    /// Add a node to the arena: as a child of the innermost open element,
    /// as the root if none is set yet, or as an addressable stray at
    /// document level.
    fn append_node(&mut self, mut node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        if let Some(&top) = self.stack.last() {
            node.parent = Some(top);
            self.nodes[top as usize].children.push(id);
        } else if self.root.is_none() && node.is_element() {
            node.parent = Some(Document::DOCUMENT_NODE);
            self.nodes[Document::DOCUMENT_NODE as usize].children.push(id);
            self.root = Some(id);
        }
        self.nodes.push(node);
        id
    }

    /// Resolve a prefix against the scope stack and the built-in bindings.
    fn resolve_prefix(&self, prefix: Option<&str>) -> Option<String> {
        for scope in self.scopes.iter().rev() {
            for (bound, uri) in scope.iter().rev() {
                if bound.as_deref() == prefix {
                    // xmlns="" undeclares the default namespace.
                    if uri.is_empty() {
                        return None;
                    }
                    return Some(uri.clone());
                }
            }
        }
        match prefix {
            Some("xml") => Some(ns::XML.to_string()),
            Some("xmlns") => Some(ns::XMLNS.to_string()),
            _ => None,
        }
    }

    /// Split and resolve a raw name. Elements pick up the default
    /// namespace; attributes only have a namespace when prefixed.
    fn make_qname(&self, raw: &str, use_default_ns: bool, ctx: &EventContext) -> Result<QName> {
        match raw.split_once(':') {
            Some((prefix, local)) => {
                if prefix.is_empty() || local.is_empty() || local.contains(':') {
                    return Err(Error::MalformedName {
                        message: format!("invalid name {:?}", raw),
                        line: ctx.line,
                        column: ctx.column,
                    });
                }
                let uri = self.resolve_prefix(Some(prefix)).ok_or_else(|| {
                    Error::MalformedName {
                        message: format!("undeclared namespace prefix {:?}", prefix),
                        line: ctx.line,
                        column: ctx.column,
                    }
                })?;
                Ok(QName {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                    uri: Some(uri),
                })
            }
            None => Ok(QName {
                prefix: None,
                local: raw.to_string(),
                uri: if use_default_ns {
                    self.resolve_prefix(None)
                } else {
                    None
                },
            }),
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SaxHandler for TreeBuilder {
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[RawAttribute],
        ctx: &EventContext,
    ) -> Result<()> {
        let mut declared: Vec<(Option<String>, String)> = Vec::new();
        let mut plain: Vec<&RawAttribute> = Vec::new();
        for attr in attributes {
            if attr.name == "xmlns" {
                declared.push((None, attr.value.clone()));
            } else if let Some(local) = attr.name.strip_prefix("xmlns:") {
                declared.push((Some(local.to_string()), attr.value.clone()));
            } else {
                plain.push(attr);
            }
        }

        for (prefix, uri) in &declared {
            if !uri.is_empty() {
                self.namespaces.insert(prefix.as_deref(), uri);
            }
        }
        self.scopes.push(declared);

        let qname = self.make_qname(name, true, ctx)?;
        let resolved: Result<Vec<Attribute>> = plain
            .iter()
            .map(|a| {
                Ok(Attribute {
                    name: self.make_qname(&a.name, false, ctx)?,
                    value: a.value.clone(),
                })
            })
            .collect();
        let resolved = resolved?;

        self.flush();
        let id = self.append_node(Node::new(
            None,
            NodeData::Element {
                name: qname,
                attributes: resolved,
                open_tag_position: ctx.location,
                close_tag_position: None,
            },
        ));
        self.stack.push(id);
        self.most_recent = Some(id);
        Ok(())
    }

    fn element_end(&mut self, _name: &str, ctx: &EventContext) -> Result<()> {
        self.flush();
        if let Some(id) = self.stack.pop() {
            if let Some(node) = self.nodes.get_mut(id as usize) {
                if let NodeData::Element {
                    close_tag_position, ..
                } = &mut node.data
                {
                    *close_tag_position = ctx.location;
                }
            }
            self.most_recent = Some(id);
        }
        self.scopes.pop();
        Ok(())
    }

    fn text(&mut self, data: &str) -> Result<()> {
        self.pending_text.push_str(data);
        Ok(())
    }

    fn comment(&mut self, text: &str, ctx: &EventContext) -> Result<()> {
        // A comment before the root element has nothing to attach to and is
        // dropped; this is documented behavior, not an error.
        if self.most_recent.is_none() {
            return Ok(());
        }
        self.flush();
        let id = self.append_node(Node::new(
            None,
            NodeData::Comment {
                text: text.to_string(),
                tag_position: ctx.location,
            },
        ));
        self.most_recent = Some(id);
        Ok(())
    }
}
