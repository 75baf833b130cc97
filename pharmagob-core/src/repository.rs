//! Collection-scoped repository with the operations every entity shares.
//!
//! [`BaseRepository`] owns a shared backend, a collection name and the repository
//! settings. Entity repositories wrap one and add named business operations on top.
//!
//! Two query paths exist and are kept apart:
//!
//! - generic conditions go through [`translate`](crate::condition::translate) and feed
//!   plain `find`/`count_documents` ([`BaseRepository::get_paginated`],
//!   [`BaseRepository::update_many`]);
//! - search specs feed the `$search` pipeline ([`BaseRepository::search`]).

use std::sync::Arc;

use bson::{Bson, Document, doc};
use tracing::{debug, instrument};

use crate::{
    backend::StoreBackend,
    collection::Collection,
    condition::{Condition, translate},
    config::RepositoryConfig,
    error::{RepositoryError, RepositoryResult},
    page::{PageLimits, PageRequest, PageWindow, SearchResultEnvelope},
    query::{FindOptions, Projection, Sort},
    report::{ReportHandle, ReportJob, ReportMaterializer},
    search::SearchSpec,
};

/// Optional parts of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Conditions combined with AND.
    pub conditions: Vec<Condition>,
    /// Tenant restriction; replaces any `umu_id` condition.
    pub umu_id: Option<String>,
    pub sort: Vec<Sort>,
    pub projection: Option<Projection>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    pub fn umu_id(mut self, umu_id: impl Into<String>) -> Self {
        self.umu_id = Some(umu_id.into());
        self
    }

    pub fn sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// Shared operations over one collection.
#[derive(Debug)]
pub struct BaseRepository<B: StoreBackend> {
    collection: String,
    backend: Arc<B>,
    config: RepositoryConfig,
}

impl<B: StoreBackend> Clone for BaseRepository<B> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
        }
    }
}

impl<B: StoreBackend> BaseRepository<B> {
    pub fn new(backend: Arc<B>, collection: impl Into<String>, config: RepositoryConfig) -> Self {
        Self { collection: collection.into(), backend, config }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Handle on this repository's collection.
    pub fn collection(&self) -> Collection<'_, B> {
        Collection::new(self.collection.as_str(), self.backend.as_ref())
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn page_limits(&self) -> PageLimits {
        self.config.page_limits()
    }

    /// Normalizes a caller's page request against this repository's limits.
    pub fn window(&self, page: PageRequest) -> PageWindow {
        page.normalize(&self.page_limits())
    }

    /// Limit applied to unpaginated reads when the caller passes none.
    pub fn default_limit(&self) -> i64 {
        self.page_limits().default_limit as i64
    }

    pub async fn create(&self, document: Document) -> RepositoryResult<()> {
        self.collection().insert_one(document).await
    }

    /// Sets `data` on the document with `id`. Never inserts.
    ///
    /// Returns the number of modified documents (0 or 1).
    pub async fn update(&self, id: impl Into<Bson>, data: Document) -> RepositoryResult<u64> {
        let update = set_update("$set", data)?;
        let outcome = self
            .collection()
            .update_one(doc! { "_id": id.into() }, update, false)
            .await?;
        Ok(outcome.modified_count)
    }

    /// Sets `data` on every document matching all `conditions`. Never inserts.
    ///
    /// An empty condition list matches every document.
    pub async fn update_many(
        &self,
        conditions: impl IntoIterator<Item = Condition>,
        data: Document,
    ) -> RepositoryResult<u64> {
        let filter = translate(conditions).to_document();
        let update = set_update("$set", data)?;
        let outcome = self.collection().update_many(filter, update, false).await?;
        Ok(outcome.modified_count)
    }

    /// Upserts the document with `id`.
    ///
    /// With `write_only_if_insert` the data is written only when the document does not
    /// exist yet (`$setOnInsert`); an existing document is left untouched. Returns the
    /// number of documents that matched `id` (0 means it was inserted).
    pub async fn set(
        &self,
        id: impl Into<Bson>,
        data: Document,
        write_only_if_insert: bool,
    ) -> RepositoryResult<u64> {
        let operator = if write_only_if_insert { "$setOnInsert" } else { "$set" };
        let update = set_update(operator, data)?;
        let outcome = self
            .collection()
            .update_one(doc! { "_id": id.into() }, update, true)
            .await?;
        Ok(outcome.matched_count)
    }

    /// Finds the document with `id`, optionally restricted to a tenant.
    pub async fn get(
        &self,
        id: impl Into<Bson>,
        umu_id: Option<&str>,
        sort: Vec<Sort>,
        projection: Option<Projection>,
    ) -> RepositoryResult<Option<Document>> {
        let mut filter = doc! { "_id": id.into() };
        if let Some(umu_id) = umu_id {
            filter.insert("umu_id", umu_id);
        }
        self.collection().find_one(filter, sort, projection).await
    }

    /// Lists one page of documents matching the translated conditions.
    ///
    /// Issues a count and a find. The count covers all matches, not just the page.
    #[instrument(level = "debug", skip(self, query), fields(collection = %self.collection))]
    pub async fn get_paginated(
        &self,
        page: PageRequest,
        query: ListQuery,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let mut filter = translate(query.conditions).to_document();
        if let Some(umu_id) = query.umu_id {
            filter.insert("umu_id", umu_id);
        }
        let window = self.window(page);
        let options = FindOptions::builder()
            .sorts(query.sort)
            .projection(query.projection)
            .skip(window.skip())
            .limit(window.limit as i64)
            .build();

        self.find_by(filter, options).await
    }

    /// Counts and fetches documents matching `filter`.
    ///
    /// A missing or non-positive limit is replaced by the default limit.
    pub async fn find_by(
        &self,
        filter: Document,
        mut options: FindOptions,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        match options.limit {
            Some(limit) if limit > 0 => {}
            _ => options.limit = Some(self.default_limit()),
        }
        debug!(collection = %self.collection, %filter, "find_by");

        let collection = self.collection();
        let count = collection.count(filter.clone()).await?;
        let results = collection.find(filter, options).await?;
        Ok(SearchResultEnvelope::new(count, results))
    }

    /// Runs a paginated `$search`.
    #[instrument(level = "debug", skip(self, spec), fields(collection = %self.collection, index = %spec.index))]
    pub async fn search(
        &self,
        spec: &SearchSpec,
        page: PageRequest,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let window = self.window(page);
        self.collection().search(spec, window).await
    }

    /// Materializes `job` from this repository's collection.
    pub async fn materialize(&self, job: ReportJob) -> RepositoryResult<ReportHandle> {
        ReportMaterializer::from_config(&self.config)
            .materialize(self.backend.as_ref(), &self.collection, job)
            .await
    }
}

fn set_update(operator: &str, data: Document) -> RepositoryResult<Document> {
    if data.is_empty() {
        return Err(RepositoryError::InvalidDocument(format!(
            "{operator} requires at least one field"
        )));
    }
    let mut update = Document::new();
    update.insert(operator, data);
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_update_wraps_data() {
        assert_eq!(
            set_update("$setOnInsert", doc! { "status": "PENDING" }).unwrap(),
            doc! { "$setOnInsert": { "status": "PENDING" } }
        );
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = set_update("$set", Document::new()).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidDocument(_)));
    }

    #[test]
    fn list_query_collects_parts() {
        let query = ListQuery::new()
            .condition(Condition::gt("created_at", 100_i64))
            .umu_id("U-1")
            .sort(vec![Sort::desc("created_at")]);

        assert_eq!(query.conditions.len(), 1);
        assert_eq!(query.umu_id.as_deref(), Some("U-1"));
        assert_eq!(query.sort, vec![Sort::desc("created_at")]);
    }
}
