//! Named collection handles.
//!
//! A [`Collection`] pairs a collection name with a borrowed backend, so callers do
//! not repeat the name on every call. Each method is exactly one backend request.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use pharmagob_core::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let shipments = store.collection("shipments");
//!
//! shipments.insert_one(doc! { "order_number": "AB123" }).await?;
//! let total = shipments.count(doc! {}).await?;
//! ```

use bson::Document;
use tracing::debug;

use crate::{
    backend::StoreBackend,
    document::{Model, ModelExt},
    error::RepositoryResult,
    page::{PageWindow, SearchResultEnvelope},
    pipeline,
    query::{FindOptions, IndexSpec, Projection, Sort, UpdateOutcome},
    search::SearchSpec,
};

/// A collection name bound to a backend reference.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend + ?Sized> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend + ?Sized> Collection<'a, B> {
    pub fn new(name: impl Into<String>, backend: &'a B) -> Self {
        Self { name: name.into(), backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    pub async fn insert_one(&self, document: Document) -> RepositoryResult<()> {
        debug!(collection = %self.name, "insert_one");
        self.backend.insert_one(&self.name, document).await
    }

    /// Serializes and inserts a model.
    pub async fn insert_model<M: Model>(&self, model: &M) -> RepositoryResult<()> {
        self.insert_one(model.to_document()?).await
    }

    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        debug!(collection = %self.name, %filter, %update, upsert, "update_one");
        self.backend
            .update_one(&self.name, filter, update, upsert)
            .await
    }

    pub async fn update_many(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        debug!(collection = %self.name, %filter, %update, upsert, "update_many");
        self.backend
            .update_many(&self.name, filter, update, upsert)
            .await
    }

    pub async fn find_one(
        &self,
        filter: Document,
        sort: Vec<Sort>,
        projection: Option<Projection>,
    ) -> RepositoryResult<Option<Document>> {
        debug!(collection = %self.name, %filter, "find_one");
        self.backend
            .find_one(&self.name, filter, sort, projection)
            .await
    }

    pub async fn find(&self, filter: Document, options: FindOptions) -> RepositoryResult<Vec<Document>> {
        debug!(
            collection = %self.name,
            %filter,
            skip = ?options.skip,
            limit = ?options.limit,
            "find"
        );
        self.backend.find(&self.name, filter, options).await
    }

    pub async fn count(&self, filter: Document) -> RepositoryResult<u64> {
        self.backend.count_documents(&self.name, filter).await
    }

    pub async fn aggregate(&self, pipeline: Vec<Document>) -> RepositoryResult<Vec<Document>> {
        debug!(collection = %self.name, stages = pipeline.len(), "aggregate");
        self.backend.aggregate(&self.name, pipeline).await
    }

    /// Runs a paginated `$search` and returns the page with the total match count.
    pub async fn search(
        &self,
        spec: &SearchSpec,
        window: PageWindow,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        pipeline::execute(self.backend, &self.name, spec, window).await
    }

    pub async fn create_index(&self, index: IndexSpec) -> RepositoryResult<()> {
        debug!(collection = %self.name, field = %index.field, "create_index");
        self.backend.create_index(&self.name, index).await
    }
}
