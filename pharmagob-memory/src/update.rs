//! Update documents: `$set`, `$setOnInsert` and `$unset`.

use bson::{Bson, Document};

use crate::{
    error::{MemoryResult, MemoryStoreError},
    evaluator::{remove_path, set_path},
};

/// Applies `update` to `document`. `inserting` enables `$setOnInsert`.
pub(crate) fn apply(document: &mut Document, update: &Document, inserting: bool) -> MemoryResult<()> {
    if update.is_empty() {
        return Err(MemoryStoreError::InvalidUpdate("update document is empty".into()));
    }
    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(MemoryStoreError::InvalidUpdate(format!("{op} expects a document")));
        };
        match op.as_str() {
            "$set" => set_all(document, fields)?,
            "$setOnInsert" => {
                if inserting {
                    set_all(document, fields)?;
                }
            }
            "$unset" => {
                for field in fields.keys() {
                    remove_path(document, field);
                }
            }
            other if other.starts_with('$') => {
                return Err(MemoryStoreError::UnsupportedOperator(other.to_string()));
            }
            other => {
                return Err(MemoryStoreError::InvalidUpdate(format!(
                    "replacement documents are not supported (field {other})"
                )));
            }
        }
    }
    Ok(())
}

fn set_all(document: &mut Document, fields: &Document) -> MemoryResult<()> {
    for (field, value) in fields {
        if field == "_id" && document.get("_id").is_some_and(|id| id != value) {
            return Err(MemoryStoreError::InvalidUpdate("_id is immutable".into()));
        }
        set_path(document, field, value.clone())?;
    }
    Ok(())
}

/// Seed of an upserted document: the equality conditions of the filter.
pub(crate) fn upsert_seed(filter: &Document) -> MemoryResult<Document> {
    let mut seed = Document::new();
    for (field, condition) in filter {
        if field.starts_with('$') {
            continue;
        }
        match condition {
            Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
                if let Some(value) = ops.get("$eq") {
                    set_path(&mut seed, field, value.clone())?;
                }
            }
            value => set_path(&mut seed, field, value.clone())?,
        }
    }
    Ok(seed)
}
