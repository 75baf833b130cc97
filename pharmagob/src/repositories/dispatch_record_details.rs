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
pub struct DispatchRecordDetailRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> DispatchRecordDetailRepository<B> {
    pub const COLLECTION: &'static str = "dispatch_record_details";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    /// Details whose `dispatch_record.id` is `dispatch_record_id`.
    #[instrument(skip(self, dispatch_record_id, options))]
    pub async fn get_by_dispatch_record_id(
        &self,
        dispatch_record_id: impl Into<Bson>,
        umu_id: Option<&str>,
        options: LookupOptions,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let filter = foreign_id_filter("dispatch_record.id", dispatch_record_id, umu_id);

        lookup(&self.base, filter, options).await
    }
}
