use bson::Document;
use tracing::instrument;

use pharmagob_core::{
    backend::StoreBackend,
    error::RepositoryResult,
    page::{PageRequest, SearchResultEnvelope},
    query::{Sort, SortDirection},
    repository::BaseRepository,
    search::{RangeBounds, SearchFilters, SearchProfile, SearchSpecBuilder},
    store::DocumentStore,
};

/// Oldest transfers first unless the caller sorts otherwise.
const REFERENCE: SearchProfile = SearchProfile {
    index: "autocomplete_reference_id_range_created_at",
    path: "reference_id",
    default_sort: &[("created_at", SortDirection::Asc)],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockTransferSearchFilters {
    pub last_event: Option<String>,
    pub umu_id: Option<String>,
    /// Tenant on the receiving side of the transfer.
    pub foreign_umu_id: Option<String>,
    pub created_at_gt: Option<i64>,
    pub created_at_lt: Option<i64>,
}

impl SearchFilters for StockTransferSearchFilters {
    fn apply(self, builder: SearchSpecBuilder) -> SearchSpecBuilder {
        builder
            .equals("umu_id", self.umu_id)
            .equals("last_event", self.last_event)
            .equals("foreign_location_content.umu_id", self.foreign_umu_id)
            .range("created_at", RangeBounds::exclusive(self.created_at_gt, self.created_at_lt))
    }
}

#[derive(Debug, Clone)]
pub struct StockTransferRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> StockTransferRepository<B> {
    pub const COLLECTION: &'static str = "stock_transfers";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    #[instrument(skip(self, filters, sort))]
    pub async fn search_by_reference_id(
        &self,
        search: &str,
        page: PageRequest,
        filters: StockTransferSearchFilters,
        sort: Option<Vec<Sort>>,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let spec = REFERENCE.builder(search).filters(filters).sort(sort).build();

        self.base.search(&spec, page).await
    }
}
