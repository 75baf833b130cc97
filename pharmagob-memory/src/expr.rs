//! Aggregation expressions and projections.
//!
//! Supported expressions: field paths (`"$item.id"`), the `$$NOW` and `$$ROOT`
//! variables, `$arrayElemAt`, `$literal`, and object/array literals whose members
//! are expressions. Evaluation yields `None` for a missing value so callers can
//! leave the output field out, the way the store does.

use bson::{Bson, Document, datetime::DateTime};

use crate::{
    error::{MemoryResult, MemoryStoreError},
    evaluator::{set_path, truthy},
};

/// Values fixed for the duration of one pipeline run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExprContext {
    pub now: DateTime,
}

impl ExprContext {
    pub fn now() -> Self {
        Self { now: DateTime::now() }
    }
}

/// Evaluates `expr` against `document`.
pub(crate) fn evaluate(expr: &Bson, document: &Document, ctx: &ExprContext) -> MemoryResult<Option<Bson>> {
    match expr {
        Bson::String(s) if s.starts_with("$$") => variable(s, document, ctx),
        Bson::String(s) if s.starts_with('$') => Ok(field_path(document, &s[1..])),
        Bson::Document(doc) => match doc.iter().next() {
            Some((op, operand)) if op.starts_with('$') => {
                if doc.len() != 1 {
                    return Err(MemoryStoreError::InvalidStage {
                        stage: "expression".into(),
                        reason: format!("operator {op} must be the only key"),
                    });
                }
                operator(op, operand, document, ctx)
            }
            _ => {
                let mut out = Document::new();
                for (key, member) in doc {
                    if let Some(value) = evaluate(member, document, ctx)? {
                        out.insert(key.clone(), value);
                    }
                }
                Ok(Some(Bson::Document(out)))
            }
        },
        Bson::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(evaluate(item, document, ctx)?.unwrap_or(Bson::Null));
            }
            Ok(Some(Bson::Array(out)))
        }
        literal => Ok(Some(literal.clone())),
    }
}

fn variable(name: &str, document: &Document, ctx: &ExprContext) -> MemoryResult<Option<Bson>> {
    let (var, path) = match name[2..].split_once('.') {
        Some((var, path)) => (var, Some(path)),
        None => (&name[2..], None),
    };
    let root = match var {
        "NOW" => return Ok(Some(Bson::DateTime(ctx.now))),
        "ROOT" | "CURRENT" => document,
        other => return Err(MemoryStoreError::UnsupportedOperator(format!("$${other}"))),
    };
    Ok(match path {
        None => Some(Bson::Document(root.clone())),
        Some(path) => field_path(root, path),
    })
}

/// Resolves a field path the way expressions do: traversing an array yields the
/// array of the values found in its elements.
fn field_path(document: &Document, path: &str) -> Option<Bson> {
    let mut parts = path.split('.');
    let head = parts.next()?;
    let mut current = document.get(head)?.clone();
    for part in parts {
        current = step(&current, part)?;
    }
    Some(current)
}

fn step(value: &Bson, part: &str) -> Option<Bson> {
    match value {
        Bson::Document(doc) => doc.get(part).cloned(),
        Bson::Array(items) => Some(Bson::Array(
            items.iter().filter_map(|item| step(item, part)).collect(),
        )),
        _ => None,
    }
}

fn operator(op: &str, operand: &Bson, document: &Document, ctx: &ExprContext) -> MemoryResult<Option<Bson>> {
    match op {
        "$literal" => Ok(Some(operand.clone())),
        "$arrayElemAt" => {
            let args = match operand {
                Bson::Array(args) if args.len() == 2 => args,
                _ => {
                    return Err(MemoryStoreError::invalid_stage(
                        "$arrayElemAt",
                        "expects [array, index]",
                    ));
                }
            };
            let array = evaluate(&args[0], document, ctx)?;
            let index = evaluate(&args[1], document, ctx)?;
            let (Some(Bson::Array(items)), Some(index)) = (array, index) else {
                return Ok(None);
            };
            let index = match index {
                Bson::Int32(i) => i as i64,
                Bson::Int64(i) => i,
                Bson::Double(d) if d.fract() == 0.0 => d as i64,
                other => {
                    return Err(MemoryStoreError::invalid_stage(
                        "$arrayElemAt",
                        format!("index must be an integer, got {other}"),
                    ));
                }
            };
            let position = if index < 0 { items.len() as i64 + index } else { index };
            Ok(usize::try_from(position).ok().and_then(|p| items.get(p).cloned()))
        }
        other => Err(MemoryStoreError::UnsupportedOperator(other.to_string())),
    }
}

/// Applies a projection document.
///
/// A projection is either exclusive (every non-`_id` entry is falsy) or inclusive.
/// Inclusive projections copy truthy numeric/boolean entries and evaluate every
/// other entry as an expression; `_id` is kept unless set to a falsy value.
pub(crate) fn project(document: &Document, spec: &Document, ctx: &ExprContext) -> MemoryResult<Document> {
    let is_flag = |v: &Bson| matches!(v, Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_));
    let exclusive = spec
        .iter()
        .filter(|(key, _)| key.as_str() != "_id")
        .all(|(_, value)| is_flag(value) && !truthy(value));
    let keep_id = spec.get("_id").is_none_or(truthy);

    if exclusive {
        let mut out = document.clone();
        for (key, value) in spec {
            if !truthy(value) {
                crate::evaluator::remove_path(&mut out, key);
            }
        }
        return Ok(out);
    }

    let mut out = Document::new();
    if keep_id {
        if let Some(id) = document.get("_id") {
            out.insert("_id", id.clone());
        }
    }
    for (key, value) in spec {
        if key == "_id" && is_flag(value) {
            continue;
        }
        let projected = if is_flag(value) {
            if !truthy(value) {
                return Err(MemoryStoreError::invalid_stage(
                    "$project",
                    format!("cannot exclude {key} in an inclusion projection"),
                ));
            }
            field_path(document, key)
        } else {
            evaluate(value, document, ctx)?
        };
        if let Some(projected) = projected {
            set_path(&mut out, key, projected)?;
        }
    }
    Ok(out)
}
