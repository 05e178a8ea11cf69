//! XPath expression evaluation over the document tree.

use std::collections::{HashMap, HashSet};

use super::axes::{matches_test, navigate, ResolvedTest};
use super::functions;
use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use super::value::Value;
use crate::error::{Error, Result};
use crate::tree::{Document, NodeId};

/// Evaluation context: the document, the query's prefix map, variable
/// bindings, and the current context node with its position in the
/// surrounding node list.
pub struct EvalContext<'a> {
    pub doc: &'a Document,
    pub prefixes: &'a HashMap<String, String>,
    pub variables: &'a HashMap<String, Value>,
    pub context_node: NodeId,
    pub position: usize,
    pub size: usize,
}

impl<'a> EvalContext<'a> {
    fn at(&self, node: NodeId, position: usize, size: usize) -> EvalContext<'a> {
        EvalContext {
            doc: self.doc,
            prefixes: self.prefixes,
            variables: self.variables,
            context_node: node,
            position,
            size,
        }
    }
}

/// Evaluate an expression.
pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> Result<Value> {
    match expr {
        Expr::Root => Ok(Value::single_node(Document::DOCUMENT_NODE)),
        Expr::Context => Ok(Value::single_node(ctx.context_node)),
        Expr::Parent => Ok(Value::NodeSet(
            ctx.doc.parent_of(ctx.context_node).into_iter().collect(),
        )),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::String(s) => Ok(Value::String(s.clone())),
        Expr::Variable(name) => ctx.variables.get(name).cloned().ok_or_else(|| {
            Error::QueryEvaluation(format!("undefined variable ${}", name))
        }),
        Expr::Negate(inner) => {
            let value = evaluate(inner, ctx)?;
            Ok(Value::Number(-value.to_number(ctx.doc)))
        }
        Expr::Binary(left, op, right) => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            Ok(apply_binary(*op, &left, &right, ctx.doc))
        }
        Expr::Union(left, right) => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            match (left, right) {
                (Value::NodeSet(l), Value::NodeSet(r)) => {
                    let mut seen: HashSet<NodeId> = l.iter().copied().collect();
                    let mut merged = l;
                    for node in r {
                        if seen.insert(node) {
                            merged.push(node);
                        }
                    }
                    merged.sort_unstable();
                    Ok(Value::NodeSet(merged))
                }
                _ => Err(Error::QueryEvaluation(
                    "union requires two node-sets".to_string(),
                )),
            }
        }
        Expr::Path(base, step) => {
            let base = evaluate(base, ctx)?;
            match base {
                Value::NodeSet(nodes) => eval_step(ctx, &nodes, step),
                _ => Err(Error::QueryEvaluation(
                    "location step applied to a non node-set".to_string(),
                )),
            }
        }
        Expr::Filter(base, pred) => {
            let base = evaluate(base, ctx)?;
            match base {
                Value::NodeSet(nodes) => {
                    let filtered = apply_predicate(ctx, nodes, pred)?;
                    Ok(Value::NodeSet(filtered))
                }
                _ => Err(Error::QueryEvaluation(
                    "predicate applied to a non node-set".to_string(),
                )),
            }
        }
        Expr::Step(step) => eval_step(ctx, &[ctx.context_node], step),
        Expr::Function(name, args) => {
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(evaluate(arg, ctx)?);
            }
            functions::call(
                name,
                evaluated,
                ctx.doc,
                ctx.context_node,
                ctx.position,
                ctx.size,
            )
        }
    }
}

/// Apply one location step to every node of the base set. Predicates are
/// applied per context node, so `position()` counts among each parent's own
/// candidates before the results merge.
fn eval_step(ctx: &EvalContext, base: &[NodeId], step: &Step) -> Result<Value> {
    if step.axis == Axis::Attribute {
        return eval_attribute_step(ctx, base, step);
    }

    let test = resolve_test(ctx, &step.node_test)?;
    let mut seen: HashSet<NodeId> = HashSet::with_capacity(base.len());
    let mut out: Vec<NodeId> = Vec::with_capacity(base.len());

    for &node in base {
        let mut candidates: Vec<NodeId> = navigate(ctx.doc, node, step.axis)
            .into_iter()
            .filter(|&c| matches_test(ctx.doc, c, &test))
            .collect();
        for pred in &step.predicates {
            candidates = filter_candidates(ctx, candidates, pred)?;
        }
        for candidate in candidates {
            if seen.insert(candidate) {
                out.push(candidate);
            }
        }
    }

    // Node ids are assigned in document order.
    out.sort_unstable();
    Ok(Value::NodeSet(out))
}

/// The attribute axis yields attribute value strings rather than node
/// handles; attribute positions live in the path index, not the tree.
fn eval_attribute_step(ctx: &EvalContext, base: &[NodeId], step: &Step) -> Result<Value> {
    let test = resolve_test(ctx, &step.node_test)?;
    let mut values: Vec<String> = Vec::new();

    for &node in base {
        let Some(element) = ctx.doc.node(node) else {
            continue;
        };
        for attr in element.attributes() {
            let matches = match &test {
                ResolvedTest::Any | ResolvedTest::Node => true,
                ResolvedTest::Name(local) => {
                    attr.name.prefix.is_none() && attr.name.local == *local
                }
                ResolvedTest::QName(uri, local) => {
                    attr.name.uri.as_deref() == Some(uri.as_str()) && attr.name.local == *local
                }
                ResolvedTest::NamespaceWildcard(uri) => {
                    attr.name.uri.as_deref() == Some(uri.as_str())
                }
                _ => false,
            };
            if matches {
                values.push(attr.value.clone());
            }
        }
    }

    if !step.predicates.is_empty() {
        // Attribute values are not nodes; a predicate cannot select among
        // them and the result set degenerates to empty.
        return Ok(Value::empty_nodeset());
    }
    match values.len() {
        0 => Ok(Value::empty_nodeset()),
        1 => Ok(Value::String(values.remove(0))),
        _ => Ok(Value::StringList(values)),
    }
}

/// Keep the candidates that satisfy a predicate, counting positions within
/// this candidate list.
fn filter_candidates(
    ctx: &EvalContext,
    candidates: Vec<NodeId>,
    pred: &Expr,
) -> Result<Vec<NodeId>> {
    let size = candidates.len();
    let mut kept = Vec::with_capacity(size);
    for (i, &candidate) in candidates.iter().enumerate() {
        let pred_ctx = ctx.at(candidate, i + 1, size);
        let value = evaluate(pred, &pred_ctx)?;
        let include = match value {
            Value::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            kept.push(candidate);
        }
    }
    Ok(kept)
}

/// Apply a trailing `[...]` predicate to a computed node-set.
fn apply_predicate(ctx: &EvalContext, nodes: Vec<NodeId>, pred: &Expr) -> Result<Vec<NodeId>> {
    filter_candidates(ctx, nodes, pred)
}

/// Resolve the namespace prefix of a node test against the query's map.
fn resolve_test(ctx: &EvalContext, test: &NodeTest) -> Result<ResolvedTest> {
    let lookup = |prefix: &str| -> Result<String> {
        ctx.prefixes.get(prefix).cloned().ok_or_else(|| {
            Error::QueryEvaluation(format!("undefined namespace prefix {:?}", prefix))
        })
    };
    Ok(match test {
        NodeTest::Any => ResolvedTest::Any,
        NodeTest::Name(name) => ResolvedTest::Name(name.clone()),
        NodeTest::QName(prefix, local) => ResolvedTest::QName(lookup(prefix)?, local.clone()),
        NodeTest::NamespaceWildcard(prefix) => ResolvedTest::NamespaceWildcard(lookup(prefix)?),
        NodeTest::Node => ResolvedTest::Node,
        NodeTest::Text => ResolvedTest::Text,
        NodeTest::Comment => ResolvedTest::Comment,
        NodeTest::ProcessingInstruction(_) => ResolvedTest::ProcessingInstruction,
    })
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value, doc: &Document) -> Value {
    match op {
        BinaryOp::Or => Value::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::And => Value::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Eq => compare_values(doc, left, right, |a, b| a == b),
        BinaryOp::NotEq => compare_values(doc, left, right, |a, b| a != b),
        BinaryOp::Lt => compare_numbers(doc, left, right, |a, b| a < b),
        BinaryOp::LtEq => compare_numbers(doc, left, right, |a, b| a <= b),
        BinaryOp::Gt => compare_numbers(doc, left, right, |a, b| a > b),
        BinaryOp::GtEq => compare_numbers(doc, left, right, |a, b| a >= b),
        BinaryOp::Add => Value::Number(left.to_number(doc) + right.to_number(doc)),
        BinaryOp::Sub => Value::Number(left.to_number(doc) - right.to_number(doc)),
        BinaryOp::Mul => Value::Number(left.to_number(doc) * right.to_number(doc)),
        BinaryOp::Div => Value::Number(left.to_number(doc) / right.to_number(doc)),
        BinaryOp::Mod => Value::Number(left.to_number(doc) % right.to_number(doc)),
    }
}

/// Equality comparison per XPath 1.0: node-sets compare through their
/// members' string-values, existentially.
fn compare_values<F>(doc: &Document, left: &Value, right: &Value, cmp: F) -> Value
where
    F: Fn(&str, &str) -> bool,
{
    match (left, right) {
        (Value::NodeSet(ln), Value::NodeSet(rn)) => {
            for &l in ln {
                let ls = doc.string_value(l);
                for &r in rn {
                    if cmp(&ls, &doc.string_value(r)) {
                        return Value::Boolean(true);
                    }
                }
            }
            Value::Boolean(false)
        }
        (Value::NodeSet(nodes), other) | (other, Value::NodeSet(nodes)) => {
            let other_str = other.string_value(doc);
            for &n in nodes {
                if cmp(&doc.string_value(n), &other_str) {
                    return Value::Boolean(true);
                }
            }
            Value::Boolean(false)
        }
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => Value::Boolean(cmp(
            &left.to_boolean().to_string(),
            &right.to_boolean().to_string(),
        )),
        (Value::Number(_), _) | (_, Value::Number(_)) => Value::Boolean(cmp(
            &left.to_number(doc).to_string(),
            &right.to_number(doc).to_string(),
        )),
        (Value::String(ls), Value::String(rs)) => Value::Boolean(cmp(ls, rs)),
        _ => Value::Boolean(cmp(&left.string_value(doc), &right.string_value(doc))),
    }
}

fn compare_numbers<F>(doc: &Document, left: &Value, right: &Value, cmp: F) -> Value
where
    F: Fn(f64, f64) -> bool,
{
    Value::Boolean(cmp(left.to_number(doc), right.to_number(doc)))
}
