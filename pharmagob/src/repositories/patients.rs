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

const CURP: SearchProfile = SearchProfile {
    index: "autocomplete_curp_range_created_at",
    path: "curp",
    default_sort: &[("created_at", SortDirection::Desc)],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientSearchFilters {
    pub created_at_gt: Option<i64>,
    pub created_at_lt: Option<i64>,
    pub umu_id: Option<String>,
}

impl SearchFilters for PatientSearchFilters {
    fn apply(self, builder: SearchSpecBuilder) -> SearchSpecBuilder {
        builder
            .range("created_at", RangeBounds::exclusive(self.created_at_gt, self.created_at_lt))
            .equals("umu_id", self.umu_id)
    }
}

#[derive(Debug, Clone)]
pub struct PatientRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> PatientRepository<B> {
    pub const COLLECTION: &'static str = "patients";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    /// Patients whose CURP starts with (or contains a word starting with) `curp`.
    #[instrument(skip(self, filters, sort))]
    pub async fn search_by_curp(
        &self,
        curp: &str,
        page: PageRequest,
        filters: PatientSearchFilters,
        sort: Option<Vec<Sort>>,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let spec = CURP.builder(curp).filters(filters).sort(sort).build();

        self.base.search(&spec, page).await
    }
}
