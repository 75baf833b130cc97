//! Evaluation of `$search` stages.
//!
//! Only the compound operator is understood, with `must`, `filter` and `mustNot`
//! sections over `autocomplete`, `range`, `equals` and `in` clauses, plus the
//! optional `sort`. The index name is accepted and ignored: every document of the
//! collection is searchable.
//!
//! Autocomplete matches case-insensitively when the query is a prefix of the whole
//! value or of any of its words.

use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::{
    error::{MemoryResult, MemoryStoreError},
    evaluator::{compare_any, equals_any, lookup, sort_documents, sort_keys},
};

const STAGE: &str = "$search";

/// Keeps the documents matching the search and applies its sort.
pub(crate) fn run(documents: Vec<Document>, stage: &Document) -> MemoryResult<Vec<Document>> {
    let compound = match stage.get("compound") {
        Some(Bson::Document(compound)) => compound,
        _ => return Err(MemoryStoreError::invalid_stage(STAGE, "only compound searches are supported")),
    };
    for key in compound.keys() {
        if !matches!(key.as_str(), "must" | "filter" | "mustNot") {
            return Err(MemoryStoreError::UnsupportedOperator(format!("compound.{key}")));
        }
    }

    let must = section(compound, "must")?;
    let filter = section(compound, "filter")?;
    let must_not = section(compound, "mustNot")?;

    let mut hits = Vec::new();
    for document in documents {
        if all_match(&document, &must)? && all_match(&document, &filter)? && !any_match(&document, &must_not)? {
            hits.push(document);
        }
    }

    match stage.get("sort") {
        None => {}
        Some(Bson::Document(sort)) => sort_documents(&mut hits, &sort_keys(sort)?),
        Some(other) => {
            return Err(MemoryStoreError::invalid_stage(STAGE, format!("sort must be a document, got {other}")));
        }
    }
    Ok(hits)
}

fn section<'a>(compound: &'a Document, name: &str) -> MemoryResult<Vec<&'a Document>> {
    match compound.get(name) {
        None => Ok(Vec::new()),
        Some(Bson::Array(clauses)) => clauses
            .iter()
            .map(|clause| match clause {
                Bson::Document(doc) => Ok(doc),
                other => Err(MemoryStoreError::invalid_stage(
                    STAGE,
                    format!("{name} clauses must be documents, got {other}"),
                )),
            })
            .collect(),
        Some(other) => Err(MemoryStoreError::invalid_stage(STAGE, format!("{name} must be an array, got {other}"))),
    }
}

fn all_match(document: &Document, clauses: &[&Document]) -> MemoryResult<bool> {
    for clause in clauses {
        if !clause_matches(document, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_match(document: &Document, clauses: &[&Document]) -> MemoryResult<bool> {
    for clause in clauses {
        if clause_matches(document, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn clause_matches(document: &Document, clause: &Document) -> MemoryResult<bool> {
    let Some((kind, body)) = clause.iter().next() else {
        return Err(MemoryStoreError::invalid_stage(STAGE, "empty clause"));
    };
    let Bson::Document(body) = body else {
        return Err(MemoryStoreError::invalid_stage(STAGE, format!("{kind} body must be a document")));
    };
    let path = body
        .get_str("path")
        .map_err(|_| MemoryStoreError::invalid_stage(STAGE, format!("{kind} needs a string path")))?;
    let values = lookup(document, path);

    match kind.as_str() {
        "autocomplete" => {
            let query = body
                .get_str("query")
                .map_err(|_| MemoryStoreError::invalid_stage(STAGE, "autocomplete needs a string query"))?;
            Ok(values.iter().any(|value| autocompletes(value, query)))
        }
        "range" => {
            let bounds: [(&str, fn(Ordering) -> bool); 4] = [
                ("gt", |o| o == Ordering::Greater),
                ("gte", |o| o != Ordering::Less),
                ("lt", |o| o == Ordering::Less),
                ("lte", |o| o != Ordering::Greater),
            ];
            let mut any_bound = false;
            for (key, accept) in bounds {
                if let Some(bound) = body.get(key) {
                    any_bound = true;
                    if !compare_any(&values, bound, accept) {
                        return Ok(false);
                    }
                }
            }
            if !any_bound {
                return Err(MemoryStoreError::invalid_stage(STAGE, format!("range on {path} has no bound")));
            }
            Ok(true)
        }
        "equals" => {
            let value = body
                .get("value")
                .ok_or_else(|| MemoryStoreError::invalid_stage(STAGE, "equals needs a value"))?;
            Ok(!values.is_empty() && equals_any(&values, value))
        }
        "in" => match body.get("value") {
            Some(Bson::Array(candidates)) => Ok(!values.is_empty()
                && candidates.iter().any(|candidate| equals_any(&values, candidate))),
            Some(single) => Ok(!values.is_empty() && equals_any(&values, single)),
            None => Err(MemoryStoreError::invalid_stage(STAGE, "in needs a value")),
        },
        other => Err(MemoryStoreError::UnsupportedOperator(other.to_string())),
    }
}

fn autocompletes(value: &Bson, query: &str) -> bool {
    match value {
        Bson::String(text) => {
            let text = text.to_lowercase();
            let query = query.to_lowercase();
            text.starts_with(&query)
                || text
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| word.starts_with(&query))
        }
        Bson::Array(items) => items.iter().any(|item| autocompletes(item, query)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn shipments() -> Vec<Document> {
        vec![
            doc! { "_id": 1, "order_number": "AB-100", "umu_id": "U-1", "created_at": 10, "review_status": "PENDING" },
            doc! { "_id": 2, "order_number": "AB-200", "umu_id": "U-2", "created_at": 30, "review_status": "APPROVED" },
            doc! { "_id": 3, "order_number": "XY-300", "umu_id": "U-1", "created_at": 20, "review_status": "PENDING" },
            doc! { "_id": 4, "order_number": "ab-400", "umu_id": "U-1", "created_at": 40, "review_status": "REJECTED" },
        ]
    }

    fn ids(documents: &[Document]) -> Vec<i32> {
        documents.iter().map(|d| d.get_i32("_id").unwrap()).collect()
    }

    #[test]
    fn autocomplete_is_a_case_insensitive_prefix() {
        let stage = doc! {
            "index": "autocomplete_order_number_range_created_at",
            "compound": { "must": [ { "autocomplete": { "query": "AB", "path": "order_number" } } ] },
        };

        assert_eq!(ids(&run(shipments(), &stage).unwrap()), vec![1, 2, 4]);
    }

    #[test]
    fn autocomplete_matches_word_prefixes() {
        let stage = doc! {
            "compound": { "must": [ { "autocomplete": { "query": "30", "path": "order_number" } } ] },
        };

        assert_eq!(ids(&run(shipments(), &stage).unwrap()), vec![3]);
    }

    #[test]
    fn filters_ranges_and_exclusions_combine() {
        let stage = doc! {
            "compound": {
                "must": [
                    { "autocomplete": { "query": "ab", "path": "order_number" } },
                    { "range": { "path": "created_at", "gt": 5, "lt": 35 } },
                ],
                "filter": [ { "in": { "path": "review_status", "value": ["PENDING", "APPROVED"] } } ],
                "mustNot": [ { "in": { "path": "umu_id", "value": ["U-2"] } } ],
            },
            "sort": { "created_at": -1 },
        };

        assert_eq!(ids(&run(shipments(), &stage).unwrap()), vec![1]);
    }

    #[test]
    fn sort_is_applied() {
        let stage = doc! {
            "compound": {
                "must": [ { "autocomplete": { "query": "ab", "path": "order_number" } } ],
                "filter": [ { "equals": { "path": "umu_id", "value": "U-1" } } ],
            },
            "sort": { "created_at": -1 },
        };

        assert_eq!(ids(&run(shipments(), &stage).unwrap()), vec![4, 1]);
    }

    #[test]
    fn should_clauses_are_rejected() {
        let stage = doc! { "compound": { "should": [] } };
        assert!(matches!(
            run(shipments(), &stage).unwrap_err(),
            MemoryStoreError::UnsupportedOperator(_)
        ));
    }
}
