//! Storage backend abstraction for the repositories.
//!
//! This module defines the narrow capability set the repository layer needs from a
//! document store. The core depends only on this trait; connection management lives
//! in the implementations.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for single-document
//! inserts, filtered updates, finds, counts, aggregation pipelines and index creation.
//! Implementations are required to be thread-safe (`Send + Sync`).
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use pharmagob_core::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! backend.insert_one("shipments", doc! { "_id": "S-1", "order_number": "AB123" }).await?;
//! let count = backend.count_documents("shipments", doc! {}).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::Document;

use crate::{
    error::RepositoryResult,
    query::{FindOptions, IndexSpec, Projection, Sort, UpdateOutcome},
};

/// Abstract interface for document storage backends.
///
/// Every method maps to exactly one request to the store. Implementations must not
/// retry, cache or swallow errors: a failed store call is returned as
/// [`RepositoryError::Backend`](crate::error::RepositoryError::Backend).
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts a single document into a collection.
    ///
    /// If the document has no `_id`, the backend assigns one.
    async fn insert_one(&self, collection: &str, document: Document) -> RepositoryResult<()>;

    /// Applies `update` to the first document matching `filter`.
    ///
    /// When `upsert` is true and nothing matches, a new document is inserted.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome>;

    /// Applies `update` to every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome>;

    /// Returns the first document matching `filter` in `sort` order.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Vec<Sort>,
        projection: Option<Projection>,
    ) -> RepositoryResult<Option<Document>>;

    /// Returns every document matching `filter`, honoring sort, skip, limit and projection.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> RepositoryResult<Vec<Document>>;

    /// Counts the documents matching `filter`.
    async fn count_documents(&self, collection: &str, filter: Document) -> RepositoryResult<u64>;

    /// Runs an aggregation pipeline and returns all output documents.
    ///
    /// Pipelines ending in `$out` write their result to the named collection and
    /// return no documents.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> RepositoryResult<Vec<Document>>;

    /// Creates an index on a collection. Expiring indexes let the store reap
    /// documents without manual cleanup.
    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> RepositoryResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_one(&self, collection: &str, document: Document) -> RepositoryResult<()> {
        (*self).insert_one(collection, document).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        (*self)
            .update_one(collection, filter, update, upsert)
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        (*self)
            .update_many(collection, filter, update, upsert)
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Vec<Sort>,
        projection: Option<Projection>,
    ) -> RepositoryResult<Option<Document>> {
        (*self)
            .find_one(collection, filter, sort, projection)
            .await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        (*self).find(collection, filter, options).await
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> RepositoryResult<u64> {
        (*self).count_documents(collection, filter).await
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> RepositoryResult<Vec<Document>> {
        (*self).aggregate(collection, pipeline).await
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        (*self).create_index(collection, index).await
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend,
{
    async fn insert_one(&self, collection: &str, document: Document) -> RepositoryResult<()> {
        (**self).insert_one(collection, document).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        (**self)
            .update_one(collection, filter, update, upsert)
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        (**self)
            .update_many(collection, filter, update, upsert)
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Vec<Sort>,
        projection: Option<Projection>,
    ) -> RepositoryResult<Option<Document>> {
        (**self)
            .find_one(collection, filter, sort, projection)
            .await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        (**self).find(collection, filter, options).await
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> RepositoryResult<u64> {
        (**self).count_documents(collection, filter).await
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> RepositoryResult<Vec<Document>> {
        (**self).aggregate(collection, pipeline).await
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        (**self).create_index(collection, index).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> RepositoryResult<Self::Backend>;
}
