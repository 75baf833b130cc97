use bson::{Bson, Document, doc};
use tracing::instrument;

use pharmagob_core::{
    backend::StoreBackend,
    error::RepositoryResult,
    page::SearchResultEnvelope,
    query::Sort,
    repository::BaseRepository,
    store::DocumentStore,
};

use super::{LookupOptions, lookup};

#[derive(Debug, Clone)]
pub struct StockTransferEventRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> StockTransferEventRepository<B> {
    pub const COLLECTION: &'static str = "stock_transfer_events";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    /// Events of one transfer, newest transition first unless sorted otherwise.
    ///
    /// `umu_ids` keeps events of any of the listed tenants; `None` or an empty list
    /// keeps all of them.
    #[instrument(skip(self, options))]
    pub async fn get_by_stock_transfer_id(
        &self,
        stock_transfer_id: &str,
        umu_ids: Option<Vec<String>>,
        options: LookupOptions,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let mut filter = doc! { "stock_transfer_id": stock_transfer_id };
        if let Some(umu_ids) = umu_ids.filter(|ids| !ids.is_empty()) {
            let umu_ids: Vec<Bson> = umu_ids.into_iter().map(Bson::String).collect();
            filter.insert("umu_id", doc! { "$in": umu_ids });
        }
        let options = options.or_sort(vec![Sort::desc("transition_timestamp")]);

        lookup(&self.base, filter, options).await
    }
}
