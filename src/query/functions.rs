//! XPath 1.0 core function library.

use super::value::Value;
use crate::error::{Error, Result};
use crate::tree::{Document, NodeId};

/// Evaluate a core function call.
pub fn call(
    name: &str,
    args: Vec<Value>,
    doc: &Document,
    context: NodeId,
    position: usize,
    size: usize,
) -> Result<Value> {
    match name {
        // Node-set functions
        "position" => Ok(Value::Number(position as f64)),
        "last" => Ok(Value::Number(size as f64)),
        "count" => fn_count(args),
        "local-name" => fn_local_name(args, doc, context),
        "namespace-uri" => fn_namespace_uri(args, doc, context),
        "name" => fn_name(args, doc, context),

        // String functions
        "string" => fn_string(args, doc, context),
        "concat" => fn_concat(args, doc),
        "starts-with" => fn_starts_with(args, doc),
        "contains" => fn_contains(args, doc),
        "substring" => fn_substring(args, doc),
        "substring-before" => fn_substring_before(args, doc),
        "substring-after" => fn_substring_after(args, doc),
        "string-length" => fn_string_length(args, doc, context),
        "normalize-space" => fn_normalize_space(args, doc, context),
        "translate" => fn_translate(args, doc),

        // Boolean functions
        "boolean" => fn_boolean(args),
        "not" => fn_not(args),
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),
        "lang" => fn_lang(args, doc, context),

        // Number functions
        "number" => fn_number(args, doc, context),
        "sum" => fn_sum(args, doc),
        "floor" => fn_floor(args, doc),
        "ceiling" => fn_ceiling(args, doc),
        "round" => fn_round(args, doc),

        _ => Err(Error::QueryEvaluation(format!("unknown function: {}()", name))),
    }
}

fn arity_error(name: &str, expected: &str) -> Error {
    Error::QueryEvaluation(format!("{}() requires {} argument(s)", name, expected))
}

/// First node of a node-set argument, or the context node when absent.
fn node_argument(
    name: &str,
    args: &[Value],
    context: NodeId,
) -> Result<Option<NodeId>> {
    match args.first() {
        None => Ok(Some(context)),
        Some(Value::NodeSet(nodes)) => Ok(nodes.first().copied()),
        Some(_) => Err(Error::QueryEvaluation(format!(
            "{}() argument must be a node-set",
            name
        ))),
    }
}

/// String-value of an argument, resolving node-sets through the document.
fn string_arg(value: &Value, doc: &Document) -> String {
    value.string_value(doc)
}

fn fn_count(args: Vec<Value>) -> Result<Value> {
    match args.as_slice() {
        [Value::NodeSet(nodes)] => Ok(Value::Number(nodes.len() as f64)),
        [_] => Err(Error::QueryEvaluation(
            "count() argument must be a node-set".to_string(),
        )),
        _ => Err(arity_error("count", "exactly 1")),
    }
}

fn fn_local_name(args: Vec<Value>, doc: &Document, context: NodeId) -> Result<Value> {
    let node = node_argument("local-name", &args, context)?;
    let name = node
        .and_then(|id| doc.tag_name(id))
        .map(|(_, local, _)| local.to_string())
        .unwrap_or_default();
    Ok(Value::String(name))
}

fn fn_namespace_uri(args: Vec<Value>, doc: &Document, context: NodeId) -> Result<Value> {
    let node = node_argument("namespace-uri", &args, context)?;
    let uri = node
        .and_then(|id| doc.tag_name(id))
        .and_then(|(uri, _, _)| uri.map(str::to_string))
        .unwrap_or_default();
    Ok(Value::String(uri))
}

fn fn_name(args: Vec<Value>, doc: &Document, context: NodeId) -> Result<Value> {
    let node = node_argument("name", &args, context)?;
    let name = node
        .and_then(|id| doc.tag_name(id))
        .map(|(_, _, full)| full)
        .unwrap_or_default();
    Ok(Value::String(name))
}

fn fn_string(args: Vec<Value>, doc: &Document, context: NodeId) -> Result<Value> {
    let value = match args.first() {
        None => doc.string_value(context),
        Some(v) => string_arg(v, doc),
    };
    Ok(Value::String(value))
}

fn fn_concat(args: Vec<Value>, doc: &Document) -> Result<Value> {
    if args.len() < 2 {
        return Err(arity_error("concat", "at least 2"));
    }
    let out: String = args.iter().map(|a| string_arg(a, doc)).collect();
    Ok(Value::String(out))
}

fn fn_starts_with(args: Vec<Value>, doc: &Document) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error("starts-with", "exactly 2"));
    }
    let s = string_arg(&args[0], doc);
    let prefix = string_arg(&args[1], doc);
    Ok(Value::Boolean(s.starts_with(&prefix)))
}

fn fn_contains(args: Vec<Value>, doc: &Document) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error("contains", "exactly 2"));
    }
    let s = string_arg(&args[0], doc);
    let pattern = string_arg(&args[1], doc);
    Ok(Value::Boolean(s.contains(&pattern)))
}

fn fn_substring(args: Vec<Value>, doc: &Document) -> Result<Value> {
    if args.len() < 2 || args.len() > 3 {
        return Err(arity_error("substring", "2 or 3"));
    }
    let s = string_arg(&args[0], doc);
    let chars: Vec<char> = s.chars().collect();
    // XPath positions are 1-based.
    let start = (args[1].to_number(doc).round() as i64 - 1).max(0) as usize;
    let out: String = if args.len() == 3 {
        let len = args[2].to_number(doc).round().max(0.0) as usize;
        let end = (start + len).min(chars.len());
        chars[start.min(chars.len())..end].iter().collect()
    } else {
        chars[start.min(chars.len())..].iter().collect()
    };
    Ok(Value::String(out))
}

fn fn_substring_before(args: Vec<Value>, doc: &Document) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error("substring-before", "exactly 2"));
    }
    let s = string_arg(&args[0], doc);
    let pattern = string_arg(&args[1], doc);
    let out = match s.find(&pattern) {
        Some(pos) => s[..pos].to_string(),
        None => String::new(),
    };
    Ok(Value::String(out))
}

fn fn_substring_after(args: Vec<Value>, doc: &Document) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error("substring-after", "exactly 2"));
    }
    let s = string_arg(&args[0], doc);
    let pattern = string_arg(&args[1], doc);
    let out = match s.find(&pattern) {
        Some(pos) => s[pos + pattern.len()..].to_string(),
        None => String::new(),
    };
    Ok(Value::String(out))
}

fn fn_string_length(args: Vec<Value>, doc: &Document, context: NodeId) -> Result<Value> {
    if args.len() > 1 {
        return Err(arity_error("string-length", "0 or 1"));
    }
    let s = match args.first() {
        None => doc.string_value(context),
        Some(v) => string_arg(v, doc),
    };
    Ok(Value::Number(s.chars().count() as f64))
}

fn fn_normalize_space(args: Vec<Value>, doc: &Document, context: NodeId) -> Result<Value> {
    if args.len() > 1 {
        return Err(arity_error("normalize-space", "0 or 1"));
    }
    let s = match args.first() {
        None => doc.string_value(context),
        Some(v) => string_arg(v, doc),
    };
    Ok(Value::String(
        s.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}

fn fn_translate(args: Vec<Value>, doc: &Document) -> Result<Value> {
    if args.len() != 3 {
        return Err(arity_error("translate", "exactly 3"));
    }
    let s = string_arg(&args[0], doc);
    let from: Vec<char> = string_arg(&args[1], doc).chars().collect();
    let to: Vec<char> = string_arg(&args[2], doc).chars().collect();
    let out: String = s
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Value::String(out))
}

fn fn_boolean(args: Vec<Value>) -> Result<Value> {
    match args.as_slice() {
        [value] => Ok(Value::Boolean(value.to_boolean())),
        _ => Err(arity_error("boolean", "exactly 1")),
    }
}

fn fn_not(args: Vec<Value>) -> Result<Value> {
    match args.as_slice() {
        [value] => Ok(Value::Boolean(!value.to_boolean())),
        _ => Err(arity_error("not", "exactly 1")),
    }
}

fn fn_lang(args: Vec<Value>, doc: &Document, context: NodeId) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error("lang", "exactly 1"));
    }
    let target = string_arg(&args[0], doc).to_lowercase();
    let mut node = Some(context);
    while let Some(id) = node {
        if let Some(value) = doc.attribute(id, "xml:lang") {
            let lang = value.to_lowercase();
            let matches = lang == target
                || (lang.starts_with(&target)
                    && lang.as_bytes().get(target.len()) == Some(&b'-'));
            return Ok(Value::Boolean(matches));
        }
        node = doc.parent_of(id);
    }
    Ok(Value::Boolean(false))
}

fn fn_number(args: Vec<Value>, doc: &Document, context: NodeId) -> Result<Value> {
    if args.len() > 1 {
        return Err(arity_error("number", "0 or 1"));
    }
    let n = match args.first() {
        None => doc.string_value(context).trim().parse().unwrap_or(f64::NAN),
        Some(v) => v.to_number(doc),
    };
    Ok(Value::Number(n))
}

fn fn_sum(args: Vec<Value>, doc: &Document) -> Result<Value> {
    match args.as_slice() {
        [Value::NodeSet(nodes)] => {
            let mut total = 0.0;
            for &node in nodes {
                match doc.string_value(node).trim().parse::<f64>() {
                    Ok(n) => total += n,
                    Err(_) => return Ok(Value::Number(f64::NAN)),
                }
            }
            Ok(Value::Number(total))
        }
        [_] => Err(Error::QueryEvaluation(
            "sum() argument must be a node-set".to_string(),
        )),
        _ => Err(arity_error("sum", "exactly 1")),
    }
}

fn fn_floor(args: Vec<Value>, doc: &Document) -> Result<Value> {
    match args.as_slice() {
        [value] => Ok(Value::Number(value.to_number(doc).floor())),
        _ => Err(arity_error("floor", "exactly 1")),
    }
}

fn fn_ceiling(args: Vec<Value>, doc: &Document) -> Result<Value> {
    match args.as_slice() {
        [value] => Ok(Value::Number(value.to_number(doc).ceil())),
        _ => Err(arity_error("ceiling", "exactly 1")),
    }
}

fn fn_round(args: Vec<Value>, doc: &Document) -> Result<Value> {
    match args.as_slice() {
        [value] => {
            let n = value.to_number(doc);
            // XPath rounds halves toward positive infinity.
            let rounded = if n.fract().abs() == 0.5 { (n + 0.5).floor() } else { n.round() };
            Ok(Value::Number(rounded))
        }
        _ => Err(arity_error("round", "exactly 1")),
    }
}
