use async_trait::async_trait;
use bson::Document;
use futures::TryStreamExt;
use mongodb::{Client, Collection as MongoCollection, options::ClientOptions};
use tracing::debug;

use pharmagob_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    config::StoreConfig,
    error::{RepositoryError, RepositoryResult},
    query::{FindOptions, IndexSpec, Projection, Sort, UpdateOutcome},
};

use crate::query::{find_one_options, find_options, index_model};

/// [`StoreBackend`] over a MongoDB database. Every call is one driver request.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri, database)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_one(&self, collection: &str, document: Document) -> RepositoryResult<()> {
        self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(RepositoryError::backend)?;

        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        let result = self
            .get_collection(collection)
            .update_one(filter, update)
            .upsert(upsert)
            .await
            .map_err(RepositoryError::backend)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> RepositoryResult<UpdateOutcome> {
        let result = self
            .get_collection(collection)
            .update_many(filter, update)
            .upsert(upsert)
            .await
            .map_err(RepositoryError::backend)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Vec<Sort>,
        projection: Option<Projection>,
    ) -> RepositoryResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .with_options(find_one_options(&sort, projection.as_ref()))
            .await
            .map_err(RepositoryError::backend)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        self.get_collection(collection)
            .find(filter)
            .with_options(find_options(&options))
            .await
            .map_err(RepositoryError::backend)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(RepositoryError::backend)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> RepositoryResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(RepositoryError::backend)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> RepositoryResult<Vec<Document>> {
        debug!(database = %self.database, collection, stages = pipeline.len(), "aggregate");

        self.get_collection(collection)
            .aggregate(pipeline)
            .await
            .map_err(RepositoryError::backend)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(RepositoryError::backend)
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        self.get_collection(collection)
            .create_index(index_model(&index))
            .await
            .map_err(RepositoryError::backend)?;

        Ok(())
    }

    async fn shutdown(self) -> RepositoryResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[derive(Debug)]
pub struct MongoDbStoreBuilder {
    uri: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(&config.uri, &config.database)
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.uri)
                    .await
                    .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
            )
            .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
