//! Query entry points: prefix-map preparation, context normalization, and
//! result marshaling.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use tracing::trace;

use super::eval::{evaluate, EvalContext};
use super::parser::{parse, Expr};
use super::value::Value;
use crate::error::{Error, Result};
use crate::tree::{Document, NamespaceTable, NodeId, NodeKind};

/// One element of a normalized query result list.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Node(NodeId),
    Boolean(bool),
    Number(f64),
    String(String),
}

/// Compile and run a query against a document.
///
/// The prefix map is built from the first URI recorded for each prefix in
/// `namespaces`. A comment context node is substituted with its parent
/// (comments are not usable as XPath context). Scalar results come back as
/// a one-element list; node-sets pass through element by element.
pub fn run_xpath(
    query: &str,
    doc: &Document,
    context: Option<NodeId>,
    namespaces: &NamespaceTable,
    variables: &HashMap<String, Value>,
) -> Result<Vec<QueryResult>> {
    let expr = parse(query).map_err(Error::QueryCompile)?;
    execute(&expr, doc, context, namespaces, variables)
}

/// Reusable query engine with an LRU cache of parsed expressions.
///
/// Owned by the caller; there is no process-wide cache. Repeated queries
/// (status-bar updates, live query panels) skip the parse.
pub struct XPathEngine {
    cache: LruCache<String, Rc<Expr>>,
}

impl XPathEngine {
    /// Create an engine caching up to `capacity` parsed queries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        XPathEngine {
            cache: LruCache::new(capacity),
        }
    }

    /// Compile (or fetch from cache) and run a query.
    pub fn run(
        &mut self,
        query: &str,
        doc: &Document,
        context: Option<NodeId>,
        namespaces: &NamespaceTable,
        variables: &HashMap<String, Value>,
    ) -> Result<Vec<QueryResult>> {
        let expr = match self.cache.get(query) {
            Some(cached) => Rc::clone(cached),
            None => {
                let parsed = Rc::new(parse(query).map_err(Error::QueryCompile)?);
                self.cache.put(query.to_string(), Rc::clone(&parsed));
                parsed
            }
        };
        execute(&expr, doc, context, namespaces, variables)
    }
}

impl Default for XPathEngine {
    fn default() -> Self {
        // Enough for an editor's rotating set of status/live queries.
        XPathEngine::new(64)
    }
}

fn execute(
    expr: &Expr,
    doc: &Document,
    context: Option<NodeId>,
    namespaces: &NamespaceTable,
    variables: &HashMap<String, Value>,
) -> Result<Vec<QueryResult>> {
    let mut prefixes: HashMap<String, String> = HashMap::new();
    for (prefix, uris) in namespaces.iter() {
        if let (Some(prefix), Some(uri)) = (prefix, uris.first()) {
            prefixes
                .entry(prefix.to_string())
                .or_insert_with(|| uri.clone());
        }
    }

    let context_node = match context {
        Some(id) => match doc.kind(id) {
            Some(NodeKind::Comment) => doc.parent_of(id).unwrap_or(id),
            _ => id,
        },
        None => doc.root(),
    };

    let ctx = EvalContext {
        doc,
        prefixes: &prefixes,
        variables,
        context_node,
        position: 1,
        size: 1,
    };
    let value = evaluate(expr, &ctx)?;
    trace!(?value, "query evaluated");
    Ok(normalize(value))
}

/// Flatten an XPath value into the public result list.
fn normalize(value: Value) -> Vec<QueryResult> {
    match value {
        Value::NodeSet(nodes) => nodes.into_iter().map(QueryResult::Node).collect(),
        Value::Boolean(b) => vec![QueryResult::Boolean(b)],
        Value::Number(n) => vec![QueryResult::Number(n)],
        Value::String(s) => vec![QueryResult::String(s)],
        Value::StringList(list) => list.into_iter().map(QueryResult::String).collect(),
    }
}
