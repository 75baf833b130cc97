use bson::{Bson, Document};
use tracing::instrument;

use pharmagob_core::{
    backend::StoreBackend,
    error::RepositoryResult,
    page::{PageRequest, SearchResultEnvelope},
    query::{Projection, Sort, SortDirection},
    repository::BaseRepository,
    search::{RangeBounds, SearchFilters, SearchProfile, SearchSpecBuilder},
    store::DocumentStore,
};

const ORDER_NUMBER: SearchProfile = SearchProfile {
    index: "autocomplete_order_number_range_created_at",
    path: "order_number",
    default_sort: &[("created_at", SortDirection::Desc)],
};

/// Optional filters of [`ShipmentRepository::search_by_order_number`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentSearchFilters {
    pub umu_id: Option<String>,
    pub created_at_gt: Option<i64>,
    pub created_at_lt: Option<i64>,
    /// Shipment must be in one of these review states.
    pub review_status: Option<Vec<String>>,
}

impl SearchFilters for ShipmentSearchFilters {
    fn apply(self, builder: SearchSpecBuilder) -> SearchSpecBuilder {
        builder
            .range("created_at", RangeBounds::exclusive(self.created_at_gt, self.created_at_lt))
            .equals("umu_id", self.umu_id)
            .any_of("review_status", self.review_status)
    }
}

#[derive(Debug, Clone)]
pub struct ShipmentRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> ShipmentRepository<B> {
    pub const COLLECTION: &'static str = "shipments";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    #[instrument(skip(self, filters, sort))]
    pub async fn search_by_order_number(
        &self,
        order_number: &str,
        page: PageRequest,
        filters: ShipmentSearchFilters,
        sort: Option<Vec<Sort>>,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let spec = ORDER_NUMBER
            .builder(order_number)
            .filters(filters)
            .sort(sort)
            .build();

        self.base.search(&spec, page).await
    }

    /// Review status of one shipment, `None` when the shipment or the field is missing.
    #[instrument(skip(self, shipment_id))]
    pub async fn get_review_status(
        &self,
        shipment_id: impl Into<Bson>,
    ) -> RepositoryResult<Option<String>> {
        let shipment = self
            .base
            .get(shipment_id, None, Vec::new(), Some(Projection::fields(["review_status"])))
            .await?;

        Ok(shipment.and_then(|doc| doc.get_str("review_status").ok().map(str::to_string)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn created_at_window_becomes_a_must_range() {
        let spec = ORDER_NUMBER
            .builder("AB1")
            .filters(ShipmentSearchFilters {
                created_at_gt: Some(100),
                created_at_lt: Some(200),
                review_status: Some(vec!["PENDING".into()]),
                ..Default::default()
            })
            .build();

        assert_eq!(
            spec.to_search_stage(),
            doc! {
                "index": "autocomplete_order_number_range_created_at",
                "compound": {
                    "must": [
                        { "autocomplete": { "query": "AB1", "path": "order_number" } },
                        { "range": { "path": "created_at", "gt": 100_i64, "lt": 200_i64 } },
                    ],
                    "filter": [{ "in": { "path": "review_status", "value": ["PENDING"] } }],
                },
                "sort": { "created_at": -1 },
            }
        );
    }
}
