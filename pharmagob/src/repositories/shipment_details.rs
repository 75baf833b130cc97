use bson::{Bson, Document, doc};
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
pub struct ShipmentDetailRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> ShipmentDetailRepository<B> {
    pub const COLLECTION: &'static str = "shipment_details";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    /// Details whose `shipment.id` is `shipment_id`.
    #[instrument(skip(self, shipment_id, options))]
    pub async fn get_by_shipment_id(
        &self,
        shipment_id: impl Into<Bson>,
        options: LookupOptions,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        lookup(&self.base, doc! { "shipment.id": shipment_id.into() }, options).await
    }
}
