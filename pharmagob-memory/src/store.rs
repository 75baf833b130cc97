//! In-memory storage implementation of [`StoreBackend`].
//!
//! Collections are ordered vectors of BSON documents behind an async-aware
//! read-write lock, so natural order is insertion order. Index specifications are
//! recorded per collection; unique indexes are enforced on insert and expiring
//! indexes can be applied with [`InMemoryStore::reap_expired`].

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use mea::rwlock::RwLock;
use tracing::debug;

use pharmagob_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::RepositoryResult,
    query::{FindOptions, IndexSpec, Projection, Sort, SortDirection, UpdateOutcome},
};

use crate::{
    aggregate,
    error::{MemoryResult, MemoryStoreError},
    evaluator::{Comparable, get_path, matches, sort_documents},
    expr::{ExprContext, project},
    update,
};

type StoreMap = HashMap<String, Vec<Document>>;
type IndexMap = HashMap<String, Vec<IndexSpec>>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses `Arc`-wrapped internal state; clones share
/// the same data.
///
/// Queries scan every document of a collection. Search indexes are not modelled:
/// a `$search` stage sees the whole collection.
///
/// # Example
///
/// ```ignore
/// use pharmagob_memory::InMemoryStore;
/// use pharmagob_core::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert_one("patients", doc! { "curp": "GOMA800101" }).await?;
/// assert_eq!(store.count_documents("patients", doc! {}).await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
    indexes: Arc<RwLock<IndexMap>>,
    fixed_now: Option<DateTime>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn context(&self) -> ExprContext {
        match self.fixed_now {
            Some(now) => ExprContext { now },
            None => ExprContext::now(),
        }
    }

    /// Snapshot of a collection in natural order.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.store
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Names of the collections holding at least one document.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .store
            .read()
            .await
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Index specifications recorded for a collection.
    pub async fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.indexes
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Removes documents whose expiring index date is older than its TTL.
    ///
    /// Returns the number of removed documents.
    pub async fn reap_expired(&self) -> usize {
        let now = self.context().now.timestamp_millis();
        let indexes = self.indexes.read().await.clone();
        let mut store = self.store.write().await;
        let mut removed = 0;

        for (collection, specs) in indexes {
            let Some(documents) = store.get_mut(&collection) else {
                continue;
            };
            for spec in specs {
                let Some(ttl) = spec.expire_after else {
                    continue;
                };
                let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                let before = documents.len();
                documents.retain(|doc| match get_path(doc, &spec.field) {
                    Some(Bson::DateTime(at)) => at.timestamp_millis().saturating_add(ttl) > now,
                    _ => true,
                });
                removed += before - documents.len();
            }
        }
        if removed > 0 {
            debug!(removed, "reaped expired documents");
        }
        removed
    }

    fn check_unique(
        collection: &str,
        documents: &[Document],
        candidate: &Document,
        unique_fields: &[String],
        skip: Option<usize>,
    ) -> MemoryResult<()> {
        for field in unique_fields {
            let Some(value) = get_path(candidate, field) else {
                continue;
            };
            let clash = documents.iter().enumerate().any(|(i, existing)| {
                Some(i) != skip
                    && get_path(existing, field)
                        .is_some_and(|v| Comparable::from(v) == Comparable::from(value))
            });
            if clash {
                return Err(MemoryStoreError::DuplicateKey {
                    collection: collection.to_string(),
                    id: format!("{field}: {value}"),
                });
            }
        }
        Ok(())
    }

    async fn unique_fields(&self, collection: &str) -> Vec<String> {
        let mut fields = vec!["_id".to_string()];
        if let Some(specs) = self.indexes.read().await.get(collection) {
            fields.extend(specs.iter().filter(|s| s.unique).map(|s| s.field.clone()));
        }
        fields
    }

    async fn apply_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
        many: bool,
    ) -> MemoryResult<UpdateOutcome> {
        let unique = self.unique_fields(collection).await;
        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();
        let mut outcome = UpdateOutcome::default();

        for index in 0..documents.len() {
            if !matches(&documents[index], &filter)? {
                continue;
            }
            outcome.matched_count += 1;

            let mut updated = documents[index].clone();
            update::apply(&mut updated, &update, false)?;
            if updated != documents[index] {
                Self::check_unique(collection, documents, &updated, &unique, Some(index))?;
                documents[index] = updated;
                outcome.modified_count += 1;
            }
            if !many {
                break;
            }
        }

        if outcome.matched_count == 0 && upsert {
            let mut inserted = update::upsert_seed(&filter)?;
            update::apply(&mut inserted, &update, true)?;
            let inserted = with_id(inserted);
            Self::check_unique(collection, documents, &inserted, &unique, None)?;
            outcome.upserted_id = inserted.get("_id").cloned();
            documents.push(inserted);
        }

        Ok(outcome)
    }
}

/// Puts an `_id` first, generating an ObjectId when the document has none.
fn with_id(mut document: Document) -> Document {
    let id = document
        .remove("_id")
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
    let mut out = Document::new();
    out.insert("_id", id);
    for (key, value) in document {
        out.insert(key, value);
    }
    out
}

fn sort_keys(sort: &[Sort]) -> Vec<(String, bool)> {
    sort.iter()
        .map(|s| (s.field.clone(), s.direction == SortDirection::Desc))
        .collect()
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, collection: &str, document: Document) -> RepositoryResult<()> {
        let document = with_id(document);
        let unique = self.unique_fields(collection).await;
        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        Self::check_unique(collection, documents, &document, &unique, None)?;
        documents.push(document);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        Ok(self
            .apply_update(collection, filter, update, upsert, false)
            .await?)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        Ok(self
            .apply_update(collection, filter, update, upsert, true)
            .await?)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Vec<Sort>,
        projection: Option<Projection>,
    ) -> RepositoryResult<Option<Document>> {
        let options = FindOptions::builder()
            .sorts(sort)
            .projection(projection)
            .limit(1)
            .build();
        let mut found = self.find(collection, filter, options).await?;
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for document in documents {
            if matches(document, &filter)? {
                hits.push(document.clone());
            }
        }
        drop(store);

        if !options.sort.is_empty() {
            sort_documents(&mut hits, &sort_keys(&options.sort));
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let limit = match options.limit {
            Some(0) | None => usize::MAX,
            Some(limit) => limit.unsigned_abs() as usize,
        };
        let page = hits.into_iter().skip(skip).take(limit);

        match options.projection {
            None => Ok(page.collect()),
            Some(projection) => {
                let spec = projection.to_document();
                let ctx = self.context();
                Ok(page
                    .map(|doc| project(&doc, &spec, &ctx))
                    .collect::<MemoryResult<Vec<_>>>()?)
            }
        }
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> RepositoryResult<u64> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(0);
        };
        let mut count = 0;
        for document in documents {
            if matches(document, &filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> RepositoryResult<Vec<Document>> {
        let input = self.documents(collection).await;
        let output = aggregate::run(input, &pipeline, &self.context())?;

        match output.out {
            None => Ok(output.documents),
            Some(target) => {
                let documents: Vec<Document> = output.documents.into_iter().map(with_id).collect();
                debug!(source = collection, target = %target, written = documents.len(), "$out replaced collection");
                self.store.write().await.insert(target, documents);
                Ok(Vec::new())
            }
        }
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        let mut indexes = self.indexes.write().await;
        let specs = indexes.entry(collection.to_string()).or_default();
        match specs.iter_mut().find(|s| s.field == index.field) {
            Some(existing) => *existing = index,
            None => specs.push(index),
        }
        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use pharmagob_memory::InMemoryStore;
/// use pharmagob_core::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .with_documents("patients", vec![doc! { "curp": "GOMA800101" }])
///     .build()
///     .await?;
/// ```
#[derive(Default, Debug)]
pub struct InMemoryStoreBuilder {
    seed: Vec<(String, Vec<Document>)>,
    fixed_now: Option<DateTime>,
}

impl InMemoryStoreBuilder {
    /// Preloads a collection. Documents without `_id` get an ObjectId.
    pub fn with_documents(mut self, collection: impl Into<String>, documents: Vec<Document>) -> Self {
        self.seed.push((collection.into(), documents));
        self
    }

    /// Pins the time used for `$$NOW` and expiry checks.
    pub fn with_fixed_now(mut self, now: DateTime) -> Self {
        self.fixed_now = Some(now);
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        let store = InMemoryStore { fixed_now: self.fixed_now, ..InMemoryStore::default() };
        for (collection, documents) in self.seed {
            for document in documents {
                store.insert_one(&collection, document).await?;
            }
        }
        Ok(store)
    }
}
