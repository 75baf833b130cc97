//! Filter and sort evaluation for in-memory documents.
//!
//! Filters follow the store's query language for the subset the repositories emit:
//! implicit equality, `$eq $ne $gt $gte $lt $lte $in $nin $exists` per field, and
//! `$and $or $nor` at the top level. Dotted paths descend into embedded documents
//! and fan out over arrays met on the way.

use std::cmp::Ordering;

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use crate::error::{MemoryResult, MemoryStoreError};

/// Comparable view of a BSON value.
///
/// Integers and doubles collapse into one numeric class, so `Int32(5)`, `Int64(5)`
/// and `Double(5.0)` compare equal. Range comparisons only succeed within one class.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(f64),
    String(&'a str),
    Document(&'a Document),
    Array(&'a [Bson]),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Document(doc) => Comparable::Document(doc),
            Bson::Array(items) => Comparable::Array(items),
            Bson::ObjectId(oid) => Comparable::ObjectId(*oid),
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    /// Cross-type ordering rank: null, numbers, strings, documents, arrays, ids, booleans, dates.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Document(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
            Comparable::Other(_) => 10,
        }
    }

    /// Total order used for sorting.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.cmp(b),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| Comparable::from(x).total_cmp(&Comparable::from(y)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Document(a), Comparable::Document(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| Comparable::from(x) == Comparable::from(y))
            }
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    /// Only values of the same class are ordered; anything else never satisfies a range.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Document(_), Comparable::Document(_)) | (Comparable::Other(_), _) => None,
            (a, b) if a.rank() == b.rank() => Some(a.total_cmp(b)),
            _ => None,
        }
    }
}

/// Values reachable at a dotted `path`.
///
/// Arrays met before the last segment are traversed element-wise; a numeric segment
/// indexes into an array instead.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut found = Vec::new();
    if let Some((head, rest)) = parts.split_first() {
        if let Some(value) = document.get(*head) {
            descend(value, rest, &mut found);
        }
    }
    found
}

fn descend<'a>(value: &'a Bson, parts: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = parts.split_first() else {
        found.push(value);
        return;
    };
    match value {
        Bson::Document(doc) => {
            if let Some(next) = doc.get(*head) {
                descend(next, rest, found);
            }
        }
        Bson::Array(items) => match head.parse::<usize>() {
            Ok(index) => {
                if let Some(item) = items.get(index) {
                    descend(item, rest, found);
                }
            }
            Err(_) => {
                for item in items.iter().filter(|i| matches!(i, Bson::Document(_))) {
                    descend(item, parts, found);
                }
            }
        },
        _ => {}
    }
}

/// First value at `path`, if any.
pub(crate) fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    lookup(document, path).into_iter().next()
}

/// Writes `value` at a dotted `path`, creating embedded documents as needed.
pub(crate) fn set_path(document: &mut Document, path: &str, value: Bson) -> MemoryResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(MemoryStoreError::InvalidUpdate(format!(
                    "cannot create field {rest:?} inside non-document {head:?}"
                ))),
            }
        }
    }
}

/// Removes the value at a dotted `path`. Missing paths are ignored.
pub(crate) fn remove_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

/// Whether a BSON value counts as true in projections and `$exists`.
pub(crate) fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// Evaluates a filter document against `document`.
pub(crate) fn matches(document: &Document, filter: &Document) -> MemoryResult<bool> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => any_clause(document, key, condition)?,
            "$nor" => !any_clause(document, key, condition)?,
            op if op.starts_with('$') => {
                return Err(MemoryStoreError::UnsupportedOperator(op.to_string()));
            }
            field => field_matches(document, field, condition)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(operator: &str, condition: &'a Bson) -> MemoryResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(MemoryStoreError::InvalidFilter(format!("{operator} expects an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(doc) => Ok(doc),
            other => Err(MemoryStoreError::InvalidFilter(format!(
                "{operator} expects documents, got {other}"
            ))),
        })
        .collect()
}

fn any_clause(document: &Document, operator: &str, condition: &Bson) -> MemoryResult<bool> {
    for clause in clauses(operator, condition)? {
        if matches(document, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_operator_document(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn field_matches(document: &Document, field: &str, condition: &Bson) -> MemoryResult<bool> {
    let values = lookup(document, field);
    match condition {
        Bson::Document(ops) if is_operator_document(ops) => {
            for (op, operand) in ops {
                if !operator_matches(&values, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => Ok(equals_any(&values, literal)),
    }
}

fn operator_matches(values: &[&Bson], op: &str, operand: &Bson) -> MemoryResult<bool> {
    Ok(match op {
        "$eq" => equals_any(values, operand),
        "$ne" => !equals_any(values, operand),
        "$gt" => compare_any(values, operand, |o| o == Ordering::Greater),
        "$gte" => compare_any(values, operand, |o| o != Ordering::Less),
        "$lt" => compare_any(values, operand, |o| o == Ordering::Less),
        "$lte" => compare_any(values, operand, |o| o != Ordering::Greater),
        "$in" => in_any(values, op, operand)?,
        "$nin" => !in_any(values, op, operand)?,
        "$exists" => truthy(operand) == !values.is_empty(),
        other => return Err(MemoryStoreError::UnsupportedOperator(other.to_string())),
    })
}

/// A field equals `target` when it is equal, or is an array holding an equal element.
/// A missing field equals null.
pub(crate) fn equals_any(values: &[&Bson], target: &Bson) -> bool {
    let target = Comparable::from(target);
    if values.is_empty() {
        return target == Comparable::Null;
    }
    values.iter().any(|value| {
        Comparable::from(*value) == target
            || matches!(value, Bson::Array(items) if items.iter().any(|i| Comparable::from(i) == target))
    })
}

/// True when any value (or array element) orders against `operand` as `accept` wants.
pub(crate) fn compare_any(values: &[&Bson], operand: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);
    values.iter().any(|value| {
        let check = |v: &Bson| {
            Comparable::from(v)
                .partial_cmp(&operand)
                .is_some_and(accept)
        };
        match value {
            Bson::Array(items) => items.iter().any(check),
            single => check(single),
        }
    })
}

fn in_any(values: &[&Bson], op: &str, operand: &Bson) -> MemoryResult<bool> {
    let Bson::Array(candidates) = operand else {
        return Err(MemoryStoreError::InvalidFilter(format!("{op} expects an array")));
    };
    Ok(candidates.iter().any(|candidate| equals_any(values, candidate)))
}

/// Sort keys parsed from a sort document: field and whether it is descending.
pub(crate) fn sort_keys(sort: &Document) -> MemoryResult<Vec<(String, bool)>> {
    sort.iter()
        .map(|(field, direction)| {
            let descending = match direction {
                Bson::Int32(1) | Bson::Int64(1) => false,
                Bson::Int32(-1) | Bson::Int64(-1) => true,
                Bson::Double(d) if *d == 1.0 => false,
                Bson::Double(d) if *d == -1.0 => true,
                other => {
                    return Err(MemoryStoreError::invalid_stage(
                        "$sort",
                        format!("direction of {field} must be 1 or -1, got {other}"),
                    ));
                }
            };
            Ok((field.clone(), descending))
        })
        .collect()
}

/// Stable sort of `documents` by `keys`. Missing fields sort as null.
pub(crate) fn sort_documents(documents: &mut [Document], keys: &[(String, bool)]) {
    documents.sort_by(|a, b| {
        for (field, descending) in keys {
            let left = get_path(a, field).map(Comparable::from).unwrap_or(Comparable::Null);
            let right = get_path(b, field).map(Comparable::from).unwrap_or(Comparable::Null);
            let ordering = left.total_cmp(&right);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
