//! Aggregation pipeline evaluation.
//!
//! Stages run in order over an owned vector of documents. `$search` must come first
//! and `$out` last. A pipeline ending in `$out` produces no output documents; the
//! caller receives the target collection name alongside the documents to write.

use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::{
    error::{MemoryResult, MemoryStoreError},
    evaluator::{Comparable, matches, set_path, sort_documents, sort_keys},
    expr::{ExprContext, evaluate, project},
    search,
};

/// Result of running a pipeline.
#[derive(Debug, Default)]
pub(crate) struct PipelineOutput {
    pub documents: Vec<Document>,
    /// Collection to replace with `documents` when the pipeline ended in `$out`.
    pub out: Option<String>,
}

pub(crate) fn run(input: Vec<Document>, pipeline: &[Document], ctx: &ExprContext) -> MemoryResult<PipelineOutput> {
    let mut documents = input;
    let mut out = None;

    for (position, stage) in pipeline.iter().enumerate() {
        let (name, body) = single_key(stage)?;
        if out.is_some() {
            return Err(MemoryStoreError::invalid_stage("$out", "must be the last stage"));
        }
        documents = match name {
            "$search" if position == 0 => search::run(documents, as_document(name, body)?)?,
            "$search" => {
                return Err(MemoryStoreError::invalid_stage(name, "must be the first stage"));
            }
            "$out" => {
                let Bson::String(target) = body else {
                    return Err(MemoryStoreError::invalid_stage(name, "expects a collection name"));
                };
                out = Some(target.clone());
                documents
            }
            _ => run_stage(documents, name, body, ctx)?,
        };
    }

    Ok(PipelineOutput { documents, out })
}

fn run_stage(documents: Vec<Document>, name: &str, body: &Bson, ctx: &ExprContext) -> MemoryResult<Vec<Document>> {
    match name {
        "$match" => {
            let filter = as_document(name, body)?;
            let mut kept = Vec::with_capacity(documents.len());
            for document in documents {
                if matches(&document, filter)? {
                    kept.push(document);
                }
            }
            Ok(kept)
        }
        "$sort" => {
            let keys = sort_keys(as_document(name, body)?)?;
            let mut documents = documents;
            sort_documents(&mut documents, &keys);
            Ok(documents)
        }
        "$skip" => Ok(documents.into_iter().skip(as_count(name, body)?).collect()),
        "$limit" => Ok(documents.into_iter().take(as_count(name, body)?).collect()),
        "$count" => {
            let Bson::String(field) = body else {
                return Err(MemoryStoreError::invalid_stage(name, "expects a field name"));
            };
            if documents.is_empty() {
                return Ok(Vec::new());
            }
            let mut counted = Document::new();
            counted.insert(field.clone(), count_value(documents.len()));
            Ok(vec![counted])
        }
        "$facet" => {
            let facets = as_document(name, body)?;
            let mut combined = Document::new();
            for (facet, sub) in facets {
                let Bson::Array(stages) = sub else {
                    return Err(MemoryStoreError::invalid_stage(name, format!("{facet} must be a pipeline")));
                };
                let stages = stages
                    .iter()
                    .map(|s| as_document(name, s).cloned())
                    .collect::<MemoryResult<Vec<_>>>()?;
                if stages.iter().any(|s| s.contains_key("$out") || s.contains_key("$search") || s.contains_key("$facet")) {
                    return Err(MemoryStoreError::invalid_stage(name, format!("{facet} uses a stage not allowed in $facet")));
                }
                let output = run(documents.clone(), &stages, ctx)?;
                combined.insert(
                    facet.clone(),
                    output.documents.into_iter().map(Bson::Document).collect::<Vec<_>>(),
                );
            }
            Ok(vec![combined])
        }
        "$addFields" | "$set" => {
            let fields = as_document(name, body)?;
            let mut updated = Vec::with_capacity(documents.len());
            for mut document in documents {
                let source = document.clone();
                for (field, expr) in fields {
                    if let Some(value) = evaluate(expr, &source, ctx)? {
                        set_path(&mut document, field, value)?;
                    }
                }
                updated.push(document);
            }
            Ok(updated)
        }
        "$project" => {
            let spec = as_document(name, body)?;
            documents.iter().map(|d| project(d, spec, ctx)).collect()
        }
        "$group" => group(documents, as_document(name, body)?, ctx),
        other => Err(MemoryStoreError::UnsupportedStage(other.to_string())),
    }
}

fn single_key(stage: &Document) -> MemoryResult<(&str, &Bson)> {
    match (stage.len(), stage.iter().next()) {
        (1, Some((name, body))) => Ok((name.as_str(), body)),
        _ => Err(MemoryStoreError::invalid_stage(
            "pipeline",
            format!("each stage needs exactly one key, got {stage}"),
        )),
    }
}

fn as_document<'a>(stage: &str, body: &'a Bson) -> MemoryResult<&'a Document> {
    match body {
        Bson::Document(doc) => Ok(doc),
        other => Err(MemoryStoreError::invalid_stage(stage, format!("expects a document, got {other}"))),
    }
}

fn as_count(stage: &str, body: &Bson) -> MemoryResult<usize> {
    let n = match body {
        Bson::Int32(n) => *n as i64,
        Bson::Int64(n) => *n,
        Bson::Double(d) if d.fract() == 0.0 => *d as i64,
        other => return Err(MemoryStoreError::invalid_stage(stage, format!("expects an integer, got {other}"))),
    };
    usize::try_from(n).map_err(|_| MemoryStoreError::invalid_stage(stage, format!("must not be negative, got {n}")))
}

/// Integer `$sum` step; moves the running total to the double once it would overflow.
fn add_or_promote(int: &mut i64, float: &mut f64, is_float: &mut bool, n: i64) {
    if *is_float {
        *float += n as f64;
        return;
    }
    match int.checked_add(n) {
        Some(total) => *int = total,
        None => {
            *float += *int as f64 + n as f64;
            *int = 0;
            *is_float = true;
        }
    }
}

fn count_value(n: usize) -> Bson {
    match i32::try_from(n) {
        Ok(n) => Bson::Int32(n),
        Err(_) => Bson::Int64(n as i64),
    }
}

/// Running state of one accumulator.
#[derive(Debug)]
enum Accumulator {
    Sum { int: i64, float: f64, is_float: bool, wide: bool },
    Avg { total: f64, n: u64 },
    Min(Option<Bson>),
    Max(Option<Bson>),
    First(Option<Bson>),
    Last(Option<Bson>),
    Push(Vec<Bson>),
    Count(u64),
}

impl Accumulator {
    fn new(op: &str) -> MemoryResult<Self> {
        Ok(match op {
            "$sum" => Accumulator::Sum { int: 0, float: 0.0, is_float: false, wide: false },
            "$avg" => Accumulator::Avg { total: 0.0, n: 0 },
            "$min" => Accumulator::Min(None),
            "$max" => Accumulator::Max(None),
            "$first" => Accumulator::First(None),
            "$last" => Accumulator::Last(None),
            "$push" => Accumulator::Push(Vec::new()),
            "$count" => Accumulator::Count(0),
            other => return Err(MemoryStoreError::UnsupportedOperator(other.to_string())),
        })
    }

    fn add(&mut self, value: Option<Bson>) {
        match self {
            Accumulator::Sum { int, float, is_float, wide } => match value {
                Some(Bson::Int32(n)) => add_or_promote(int, float, is_float, n as i64),
                Some(Bson::Int64(n)) => {
                    add_or_promote(int, float, is_float, n);
                    *wide = true;
                }
                Some(Bson::Double(d)) => {
                    *float += d;
                    *is_float = true;
                }
                _ => {}
            },
            Accumulator::Avg { total, n } => match value {
                Some(Bson::Int32(v)) => {
                    *total += v as f64;
                    *n += 1;
                }
                Some(Bson::Int64(v)) => {
                    *total += v as f64;
                    *n += 1;
                }
                Some(Bson::Double(v)) => {
                    *total += v;
                    *n += 1;
                }
                _ => {}
            },
            Accumulator::Min(current) => keep_extreme(current, value, Ordering::Less),
            Accumulator::Max(current) => keep_extreme(current, value, Ordering::Greater),
            Accumulator::First(current) => {
                if current.is_none() {
                    *current = Some(value.unwrap_or(Bson::Null));
                }
            }
            Accumulator::Last(current) => *current = Some(value.unwrap_or(Bson::Null)),
            Accumulator::Push(items) => {
                if let Some(value) = value {
                    items.push(value);
                }
            }
            Accumulator::Count(n) => *n += 1,
        }
    }

    fn finish(self) -> Bson {
        match self {
            Accumulator::Sum { int, float, is_float, wide } => {
                if is_float {
                    Bson::Double(float + int as f64)
                } else if !wide && i32::try_from(int).is_ok() {
                    Bson::Int32(int as i32)
                } else {
                    Bson::Int64(int)
                }
            }
            Accumulator::Avg { total, n } => {
                if n == 0 {
                    Bson::Null
                } else {
                    Bson::Double(total / n as f64)
                }
            }
            Accumulator::Min(v) | Accumulator::Max(v) | Accumulator::First(v) | Accumulator::Last(v) => {
                v.unwrap_or(Bson::Null)
            }
            Accumulator::Push(items) => Bson::Array(items),
            Accumulator::Count(n) => count_value(n as usize),
        }
    }
}

fn keep_extreme(current: &mut Option<Bson>, value: Option<Bson>, want: Ordering) {
    let Some(value) = value.filter(|v| !matches!(v, Bson::Null)) else {
        return;
    };
    let replace = current
        .as_ref()
        .is_none_or(|c| Comparable::from(&value).total_cmp(&Comparable::from(c)) == want);
    if replace {
        *current = Some(value);
    }
}

/// Groups in order of first appearance.
fn group(documents: Vec<Document>, spec: &Document, ctx: &ExprContext) -> MemoryResult<Vec<Document>> {
    const STAGE: &str = "$group";
    let key_expr = spec
        .get("_id")
        .ok_or_else(|| MemoryStoreError::invalid_stage(STAGE, "needs an _id"))?;

    let mut fields = Vec::new();
    for (name, acc) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
        let acc = as_document(STAGE, acc)?;
        let (op, operand) = single_key(acc)?;
        Accumulator::new(op)?;
        fields.push((name.clone(), op.to_string(), operand.clone()));
    }

    let mut groups: Vec<(Bson, Vec<Accumulator>)> = Vec::new();
    for document in &documents {
        let key = evaluate(key_expr, document, ctx)?.unwrap_or(Bson::Null);
        let index = match groups.iter().position(|(k, _)| Comparable::from(k) == Comparable::from(&key)) {
            Some(index) => index,
            None => {
                let accumulators = fields
                    .iter()
                    .map(|(_, op, _)| Accumulator::new(op))
                    .collect::<MemoryResult<Vec<_>>>()?;
                groups.push((key, accumulators));
                groups.len() - 1
            }
        };
        for ((_, op, operand), accumulator) in fields.iter().zip(groups[index].1.iter_mut()) {
            let value = if op == "$count" { None } else { evaluate(operand, document, ctx)? };
            accumulator.add(value);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, accumulators)| {
            let mut out = Document::new();
            out.insert("_id", key);
            for ((name, _, _), accumulator) in fields.iter().zip(accumulators) {
                out.insert(name.clone(), accumulator.finish());
            }
            out
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{datetime::DateTime, doc};
    use pretty_assertions::assert_eq;

    fn ctx() -> ExprContext {
        ExprContext { now: DateTime::from_millis(1_000) }
    }

    fn contents() -> Vec<Document> {
        vec![
            doc! { "umu_id": "U-1", "item": { "id": "I-1" }, "quantity": 5, "lot": "L1" },
            doc! { "umu_id": "U-1", "item": { "id": "I-1" }, "quantity": 3, "lot": "L2" },
            doc! { "umu_id": "U-2", "item": { "id": "I-1" }, "quantity": 4, "lot": "L1" },
            doc! { "umu_id": "U-1", "item": { "id": "I-2" }, "quantity": 1.5, "lot": "L3" },
        ]
    }

    #[test]
    fn facet_paginates_and_counts() {
        let pipeline = vec![
            doc! { "$facet": {
                "results": [ { "$skip": 1_i64 }, { "$limit": 2_i64 } ],
                "totalCount": [ { "$count": "count" } ],
            } },
            doc! { "$addFields": { "count": { "$arrayElemAt": ["$totalCount.count", 0] } } },
        ];

        let output = run(contents(), &pipeline, &ctx()).unwrap();

        assert_eq!(output.documents.len(), 1);
        let facet = &output.documents[0];
        assert_eq!(facet.get_i32("count").unwrap(), 4);
        assert_eq!(facet.get_array("results").unwrap().len(), 2);
    }

    #[test]
    fn facet_over_nothing_has_no_count() {
        let pipeline = vec![
            doc! { "$facet": {
                "results": [ { "$skip": 0_i64 }, { "$limit": 10_i64 } ],
                "totalCount": [ { "$count": "count" } ],
            } },
            doc! { "$addFields": { "count": { "$arrayElemAt": ["$totalCount.count", 0] } } },
        ];

        let output = run(Vec::new(), &pipeline, &ctx()).unwrap();

        assert_eq!(output.documents, vec![doc! { "results": [], "totalCount": [] }]);
    }

    #[test]
    fn group_sums_per_compound_key() {
        let pipeline = vec![
            doc! { "$match": { "item.id": "I-1" } },
            doc! { "$group": {
                "_id": { "umu_id": "$umu_id", "item_id": "$item.id" },
                "quantity": { "$sum": "$quantity" },
                "lots": { "$push": "$lot" },
                "first_lot": { "$first": "$lot" },
            } },
        ];

        let output = run(contents(), &pipeline, &ctx()).unwrap();

        assert_eq!(
            output.documents,
            vec![
                doc! { "_id": { "umu_id": "U-1", "item_id": "I-1" }, "quantity": 8, "lots": ["L1", "L2"], "first_lot": "L1" },
                doc! { "_id": { "umu_id": "U-2", "item_id": "I-1" }, "quantity": 4, "lots": ["L1"], "first_lot": "L1" },
            ]
        );
    }

    #[test]
    fn sum_widens_to_double() {
        let pipeline = vec![doc! { "$group": { "_id": null, "quantity": { "$sum": "$quantity" }, "n": { "$sum": 1 } } }];
        let output = run(contents(), &pipeline, &ctx()).unwrap();

        assert_eq!(output.documents, vec![doc! { "_id": null, "quantity": 13.5, "n": 4 }]);
    }

    #[test]
    fn integer_sum_overflow_promotes_to_double() {
        let documents = vec![doc! { "quantity": i64::MAX }, doc! { "quantity": 2_i64 }];
        let pipeline = vec![doc! { "$group": { "_id": null, "quantity": { "$sum": "$quantity" } } }];
        let output = run(documents, &pipeline, &ctx()).unwrap();

        assert_eq!(output.documents[0].get_f64("quantity").unwrap(), i64::MAX as f64 + 2.0);
    }

    #[test]
    fn min_max_avg() {
        let pipeline = vec![doc! { "$group": {
            "_id": "$umu_id",
            "low": { "$min": "$quantity" },
            "high": { "$max": "$quantity" },
            "mean": { "$avg": "$quantity" },
        } }];
        let output = run(contents(), &pipeline, &ctx()).unwrap();

        assert_eq!(output.documents[1], doc! { "_id": "U-2", "low": 4, "high": 4, "mean": 4.0 });
        assert_eq!(output.documents[0].get_f64("low").unwrap(), 1.5);
        assert_eq!(output.documents[0].get_i32("high").unwrap(), 5);
    }

    #[test]
    fn out_names_the_target_and_must_be_last() {
        let pipeline = vec![doc! { "$match": {} }, doc! { "$out": "report_r1" }];
        let output = run(contents(), &pipeline, &ctx()).unwrap();
        assert_eq!(output.out.as_deref(), Some("report_r1"));
        assert_eq!(output.documents.len(), 4);

        let pipeline = vec![doc! { "$out": "report_r1" }, doc! { "$match": {} }];
        assert!(run(contents(), &pipeline, &ctx()).is_err());
    }

    #[test]
    fn search_must_be_first() {
        let pipeline = vec![
            doc! { "$match": {} },
            doc! { "$search": { "compound": { "must": [] } } },
        ];
        assert!(matches!(
            run(contents(), &pipeline, &ctx()).unwrap_err(),
            MemoryStoreError::InvalidStage { .. }
        ));
    }

    #[test]
    fn unknown_stage_is_reported() {
        let pipeline = vec![doc! { "$lookup": {} }];
        assert_eq!(
            run(contents(), &pipeline, &ctx()).unwrap_err(),
            MemoryStoreError::UnsupportedStage("$lookup".into())
        );
    }
}
