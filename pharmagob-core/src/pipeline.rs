//! Paginated search execution.
//!
//! A search runs as a single aggregation so the page of results and the total match
//! count come back in one round trip:
//!
//! ```text
//! [ { $search: <spec> },
//!   { $facet: { results: [ { $skip }, { $limit } ], totalCount: [ { $count: "count" } ] } },
//!   { $addFields: { count: { $arrayElemAt: [ "$totalCount.count", 0 ] } } } ]
//! ```
//!
//! The store answers with one document `{ results: [...], totalCount: [...], count: N }`.
//! When nothing matched, `count` is missing and the envelope reports zero.

use bson::{Bson, Document, doc};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    error::{RepositoryError, RepositoryResult},
    page::{PageWindow, SearchResultEnvelope},
    search::SearchSpec,
};

/// Builds the three-stage search pipeline for one page of `spec`.
pub fn build_pipeline(spec: &SearchSpec, window: PageWindow) -> Vec<Document> {
    vec![
        doc! { "$search": spec.to_search_stage() },
        doc! {
            "$facet": {
                "results": [
                    { "$skip": window.skip() as i64 },
                    { "$limit": window.limit as i64 },
                ],
                "totalCount": [ { "$count": "count" } ],
            }
        },
        doc! {
            "$addFields": {
                "count": { "$arrayElemAt": ["$totalCount.count", 0] },
            }
        },
    ]
}

/// Runs `spec` against `collection` and returns one page plus the total count.
pub async fn execute<B>(
    backend: &B,
    collection: &str,
    spec: &SearchSpec,
    window: PageWindow,
) -> RepositoryResult<SearchResultEnvelope<Document>>
where
    B: StoreBackend + ?Sized,
{
    let pipeline = build_pipeline(spec, window);
    debug!(
        collection,
        index = %spec.index,
        page = window.page,
        limit = window.limit,
        "running search"
    );

    let mut output = backend.aggregate(collection, pipeline).await?;
    if output.is_empty() {
        return Ok(SearchResultEnvelope::empty());
    }
    parse_facet(output.swap_remove(0))
}

/// Reads the facet output document into an envelope.
pub fn parse_facet(mut facet: Document) -> RepositoryResult<SearchResultEnvelope<Document>> {
    let count = match facet.get("count") {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(n)) => non_negative(*n as i64)?,
        Some(Bson::Int64(n)) => non_negative(*n)?,
        Some(Bson::Double(n)) if n.fract() == 0.0 => non_negative(*n as i64)?,
        Some(other) => {
            return Err(RepositoryError::MalformedResponse(format!(
                "count is not an integer: {other}"
            )));
        }
    };

    let results = match facet.remove("results") {
        None | Some(Bson::Null) => Vec::new(),
        Some(Bson::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Bson::Document(doc) => Ok(doc),
                other => Err(RepositoryError::MalformedResponse(format!(
                    "search result is not a document: {other}"
                ))),
            })
            .collect::<RepositoryResult<Vec<_>>>()?,
        Some(other) => {
            return Err(RepositoryError::MalformedResponse(format!(
                "results is not an array: {other}"
            )));
        }
    };

    Ok(SearchResultEnvelope::new(count, results))
}

fn non_negative(n: i64) -> RepositoryResult<u64> {
    u64::try_from(n)
        .map_err(|_| RepositoryError::MalformedResponse(format!("negative count: {n}")))
}
