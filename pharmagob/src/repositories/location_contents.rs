use bson::Document;
use tracing::instrument;

use pharmagob_core::{
    backend::StoreBackend,
    condition::{Condition, translate},
    error::RepositoryResult,
    page::{PageRequest, SearchResultEnvelope},
    query::{Sort, SortDirection},
    report::{Aggregate, ReportHandle, ReportJob},
    repository::BaseRepository,
    search::{RangeBounds, SearchFilters, SearchProfile, SearchSpecBuilder},
    store::DocumentStore,
};

const ITEM: SearchProfile = SearchProfile {
    index: "autocomplete_item_id_range_created_at_range_quantity",
    path: "item.id",
    default_sort: &[("created_at", SortDirection::Desc)],
};

/// Optional filters of [`LocationContentRepository::search_by_item`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationContentSearchFilters {
    pub umu_id: Option<String>,
    pub quantity_gt: Option<i64>,
    pub quantity_lt: Option<i64>,
    pub lot: Option<String>,
    /// Tenants whose stock is left out.
    pub excluded_umu_ids: Option<Vec<String>>,
}

impl SearchFilters for LocationContentSearchFilters {
    fn apply(self, builder: SearchSpecBuilder) -> SearchSpecBuilder {
        builder
            .range("quantity", RangeBounds::exclusive(self.quantity_gt, self.quantity_lt))
            .equals("umu_id", self.umu_id)
            .equals("lot", self.lot)
            .none_of("umu_id", self.excluded_umu_ids)
    }
}

/// Inventory: what is stored where.
#[derive(Debug, Clone)]
pub struct LocationContentRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> LocationContentRepository<B> {
    pub const COLLECTION: &'static str = "location_contents";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    /// Stock of `item_id` created strictly inside `(created_at_gt, created_at_lt)`.
    #[instrument(skip(self, filters, sort))]
    pub async fn search_by_item(
        &self,
        item_id: &str,
        created_at_gt: i64,
        created_at_lt: i64,
        page: PageRequest,
        filters: LocationContentSearchFilters,
        sort: Option<Vec<Sort>>,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let spec = ITEM
            .builder(item_id)
            .range(
                "created_at",
                RangeBounds::exclusive(Some(created_at_gt), Some(created_at_lt)),
            )
            .filters(filters)
            .sort(sort)
            .build();

        self.base.search(&spec, page).await
    }

    /// Materializes total quantity per tenant and item for the stock matching
    /// `conditions`.
    ///
    /// The output rows are `{ umu_id, item_id, quantity, created_at }`.
    #[instrument(skip(self, conditions))]
    pub async fn materialize_stock_report(
        &self,
        report_id: &str,
        conditions: Vec<Condition>,
    ) -> RepositoryResult<ReportHandle> {
        let job = ReportJob::new(report_id, translate(conditions).to_document())
            .group_by("umu_id", "umu_id")
            .group_by("item_id", "item.id")
            .aggregate(Aggregate::sum("quantity", "quantity"));

        self.base.materialize(job).await
    }
}
