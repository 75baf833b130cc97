use bson::{Bson, Document};
use tracing::instrument;

use pharmagob_core::{
    backend::StoreBackend,
    error::RepositoryResult,
    page::SearchResultEnvelope,
    repository::BaseRepository,
    store::DocumentStore,
};

use super::{LookupOptions, foreign_id_filter, lookup};

#[derive(Debug, Clone)]
pub struct ItemRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> ItemRepository<B> {
    pub const COLLECTION: &'static str = "items";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    #[instrument(skip(self, foreign_id, options))]
    pub async fn get_by_foreign_id(
        &self,
        foreign_id: impl Into<Bson>,
        umu_id: Option<&str>,
        options: LookupOptions,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        lookup(&self.base, foreign_id_filter("foreign_id", foreign_id, umu_id), options).await
    }
}
