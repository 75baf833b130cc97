//! Translation of generic `(field, operator, value)` conditions into filter documents.
//!
//! Conditions are the small declarative language the service layer uses for plain
//! find/count queries. Every condition on the same field is merged into one
//! per-field predicate, so `created_at > 100` and `created_at < 200` become
//! `{ "created_at": { "$gt": 100, "$lt": 200 } }`.
//!
//! ```ignore
//! use pharmagob_core::condition::{translate_str, Condition};
//!
//! let tree = translate_str([
//!     ("created_at", ">", 100),
//!     ("created_at", "<", 200),
//! ])?;
//! assert_eq!(tree.to_document(), doc! { "created_at": { "$gt": 100, "$lt": 200 } });
//! ```
//!
//! Values are passed through unchanged. Matching the stored type of the field is the
//! caller's job.

use std::{fmt, str::FromStr};

use bson::{Bson, Document};
use tracing::warn;

use crate::error::{RepositoryError, RepositoryResult};

/// The comparison operators accepted in generic conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl ComparisonOp {
    /// The operator as written in a condition.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
        }
    }

    /// The query operator key the store understands.
    pub fn operator_key(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "$eq",
            ComparisonOp::Gt => "$gt",
            ComparisonOp::Gte => "$gte",
            ComparisonOp::Lt => "$lt",
            ComparisonOp::Lte => "$lte",
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(ComparisonOp::Eq),
            ">" => Ok(ComparisonOp::Gt),
            ">=" => Ok(ComparisonOp::Gte),
            "<" => Ok(ComparisonOp::Lt),
            "<=" => Ok(ComparisonOp::Lte),
            other => Err(RepositoryError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single `(field, operator, value)` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: ComparisonOp,
    pub value: Bson,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: ComparisonOp, value: impl Into<Bson>) -> Self {
        Self { field: field.into(), op, value: value.into() }
    }

    /// Builds a condition from a raw operator string.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::UnsupportedOperator`] naming the operator when it is
    /// not one of `=`, `>`, `<`, `>=`, `<=`.
    pub fn parse(
        field: impl Into<String>,
        op: &str,
        value: impl Into<Bson>,
    ) -> RepositoryResult<Self> {
        Ok(Self::new(field, op.parse()?, value))
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, ComparisonOp::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, ComparisonOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, ComparisonOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, ComparisonOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, ComparisonOp::Lte, value)
    }
}

/// The bounds applied to one field, in first-seen operator order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPredicate {
    bounds: Vec<(ComparisonOp, Bson)>,
}

impl FieldPredicate {
    /// Returns the value bound to `op`, if any.
    pub fn get(&self, op: ComparisonOp) -> Option<&Bson> {
        self.bounds
            .iter()
            .find(|(o, _)| *o == op)
            .map(|(_, v)| v)
    }

    pub fn operators(&self) -> impl Iterator<Item = ComparisonOp> + '_ {
        self.bounds.iter().map(|(op, _)| *op)
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Sets the bound for `op`, returning the value it replaced.
    fn set(&mut self, op: ComparisonOp, value: Bson) -> Option<Bson> {
        match self.bounds.iter_mut().find(|(o, _)| *o == op) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.bounds.push((op, value));
                None
            }
        }
    }

    pub fn to_document(&self) -> Document {
        self.bounds
            .iter()
            .map(|(op, value)| (op.operator_key().to_string(), value.clone()))
            .collect()
    }
}

/// A condition that replaced an earlier bound with the same field and operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Overwrite {
    pub field: String,
    pub op: ComparisonOp,
    pub previous: Bson,
    pub value: Bson,
}

/// Field name to merged predicate, in first-seen field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateTree {
    fields: Vec<(String, FieldPredicate)>,
    overwrites: Vec<Overwrite>,
}

impl PredicateTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a condition into the predicate for its field.
    ///
    /// Repeating a field and operator keeps the last value; the replaced bound is
    /// logged and recorded in [`PredicateTree::overwrites`].
    pub fn insert(&mut self, condition: Condition) {
        let Condition { field, op, value } = condition;

        let index = match self.fields.iter().position(|(f, _)| *f == field) {
            Some(index) => index,
            None => {
                self.fields.push((field.clone(), FieldPredicate::default()));
                self.fields.len() - 1
            }
        };

        if let Some(previous) = self.fields[index].1.set(op, value.clone()) {
            warn!(
                field = %field,
                operator = %op,
                previous = %previous,
                value = %value,
                "condition overwrites an earlier bound on the same field and operator"
            );
            self.overwrites.push(Overwrite { field, op, previous, value });
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldPredicate> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, p)| p)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldPredicate)> {
        self.fields.iter().map(|(f, p)| (f.as_str(), p))
    }

    /// Number of distinct fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Conditions that silently replaced an earlier bound.
    pub fn overwrites(&self) -> &[Overwrite] {
        &self.overwrites
    }

    /// Renders the tree as a filter document.
    pub fn to_document(&self) -> Document {
        self.fields
            .iter()
            .map(|(field, predicate)| (field.clone(), Bson::Document(predicate.to_document())))
            .collect()
    }
}

impl FromIterator<Condition> for PredicateTree {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        let mut tree = PredicateTree::new();
        for condition in iter {
            tree.insert(condition);
        }
        tree
    }
}

impl From<PredicateTree> for Document {
    fn from(tree: PredicateTree) -> Self {
        tree.to_document()
    }
}

/// Merges typed conditions into a predicate tree.
pub fn translate(conditions: impl IntoIterator<Item = Condition>) -> PredicateTree {
    conditions.into_iter().collect()
}

/// Parses and merges raw `(field, operator, value)` triples.
///
/// Every operator is validated before anything is merged, so an unsupported operator
/// never yields a partial tree.
///
/// # Errors
///
/// Returns [`RepositoryError::UnsupportedOperator`] for the first operator outside
/// `=`, `>`, `<`, `>=`, `<=`.
pub fn translate_str<I, F, O, V>(conditions: I) -> RepositoryResult<PredicateTree>
where
    I: IntoIterator<Item = (F, O, V)>,
    F: Into<String>,
    O: AsRef<str>,
    V: Into<Bson>,
{
    let conditions = conditions
        .into_iter()
        .map(|(field, op, value)| Condition::parse(field, op.as_ref(), value))
        .collect::<RepositoryResult<Vec<_>>>()?;

    Ok(translate(conditions))
}
