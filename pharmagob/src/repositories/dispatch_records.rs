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

const REFERENCE: SearchProfile = SearchProfile {
    index: "autocomplete_reference_id_range_created_at_and_dispatch",
    path: "reference_id",
    default_sort: &[("created_at", SortDirection::Desc)],
};

/// Optional filters of [`DispatchRecordRepository::search_by_reference`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchRecordSearchFilters {
    pub umu_id: Option<String>,
    pub created_at_gt: Option<i64>,
    pub created_at_lt: Option<i64>,
    pub dispatch_gt: Option<i64>,
    pub dispatch_lt: Option<i64>,
    pub service: Option<String>,
}

impl SearchFilters for DispatchRecordSearchFilters {
    fn apply(self, builder: SearchSpecBuilder) -> SearchSpecBuilder {
        builder
            .range("created_at", RangeBounds::exclusive(self.created_at_gt, self.created_at_lt))
            .range("dispatch", RangeBounds::exclusive(self.dispatch_gt, self.dispatch_lt))
            .equals("umu_id", self.umu_id)
            .equals("service", self.service)
    }
}

#[derive(Debug, Clone)]
pub struct DispatchRecordRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> DispatchRecordRepository<B> {
    pub const COLLECTION: &'static str = "dispatch_records";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    #[instrument(skip(self, filters, sort))]
    pub async fn search_by_reference(
        &self,
        reference_id: &str,
        page: PageRequest,
        filters: DispatchRecordSearchFilters,
        sort: Option<Vec<Sort>>,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let spec = REFERENCE.builder(reference_id).filters(filters).sort(sort).build();

        self.base.search(&spec, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn each_range_is_its_own_must_clause() {
        let spec = REFERENCE
            .builder("R-1")
            .filters(DispatchRecordSearchFilters {
                created_at_gt: Some(1),
                dispatch_lt: Some(9),
                service: Some("urgencias".into()),
                ..Default::default()
            })
            .build();

        let must: Vec<_> = spec.must.iter().map(|c| c.to_document()).collect();
        assert_eq!(
            must,
            vec![
                doc! { "autocomplete": { "query": "R-1", "path": "reference_id" } },
                doc! { "range": { "path": "created_at", "gt": 1_i64 } },
                doc! { "range": { "path": "dispatch", "lt": 9_i64 } },
            ]
        );
        assert_eq!(spec.filter.len(), 1);
        assert_eq!(spec.filter[0].path(), "service");
    }
}
