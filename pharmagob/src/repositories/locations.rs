use bson::{Document, doc};
use tracing::instrument;

use pharmagob_core::{
    backend::StoreBackend,
    error::RepositoryResult,
    page::SearchResultEnvelope,
    repository::BaseRepository,
    store::DocumentStore,
};

use super::{LookupOptions, lookup};

#[derive(Debug, Clone)]
pub struct LocationRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> LocationRepository<B> {
    pub const COLLECTION: &'static str = "locations";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    /// Locations of one tenant, narrowed to a label code when given.
    #[instrument(skip(self, options))]
    pub async fn get_by_umu_id(
        &self,
        umu_id: &str,
        label_code: Option<&str>,
        options: LookupOptions,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let mut filter = doc! { "umu_id": umu_id };
        if let Some(label_code) = label_code {
            filter.insert("label_code", label_code);
        }

        lookup(&self.base, filter, options).await
    }
}
