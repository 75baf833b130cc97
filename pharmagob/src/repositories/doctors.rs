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

const EMPLOYEE_OR_LICENCE: SearchProfile = SearchProfile {
    index: "autocomplete_employee_or_licence_range_created_at",
    path: "employee_number",
    default_sort: &[("created_at", SortDirection::Desc)],
};

const FULL_NAME: SearchProfile = SearchProfile {
    index: "autocomplete_fullname_range_created_at",
    path: "full_name",
    default_sort: &[("created_at", SortDirection::Desc)],
};

/// Optional filters shared by both doctor searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorSearchFilters {
    pub created_at_gt: Option<i64>,
    pub created_at_lt: Option<i64>,
    pub umu_id: Option<String>,
}

impl SearchFilters for DoctorSearchFilters {
    fn apply(self, builder: SearchSpecBuilder) -> SearchSpecBuilder {
        builder
            .range("created_at", RangeBounds::exclusive(self.created_at_gt, self.created_at_lt))
            .equals("umu_id", self.umu_id)
    }
}

#[derive(Debug, Clone)]
pub struct DoctorRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> DoctorRepository<B> {
    pub const COLLECTION: &'static str = "doctors";

    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(Self::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    #[instrument(skip(self, filters, sort))]
    pub async fn search_by_employee_or_licence(
        &self,
        employee_number: &str,
        page: PageRequest,
        filters: DoctorSearchFilters,
        sort: Option<Vec<Sort>>,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let spec = EMPLOYEE_OR_LICENCE
            .builder(employee_number)
            .filters(filters)
            .sort(sort)
            .build();

        self.base.search(&spec, page).await
    }

    #[instrument(skip(self, filters, sort))]
    pub async fn search_by_full_name(
        &self,
        full_name: &str,
        page: PageRequest,
        filters: DoctorSearchFilters,
        sort: Option<Vec<Sort>>,
    ) -> RepositoryResult<SearchResultEnvelope<Document>> {
        let spec = FULL_NAME.builder(full_name).filters(filters).sort(sort).build();

        self.base.search(&spec, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn searches_use_their_own_index_and_path() {
        let by_number = EMPLOYEE_OR_LICENCE.builder("E-1").build();
        let by_name = FULL_NAME.builder("Ana").build();

        assert_eq!(by_number.index, "autocomplete_employee_or_licence_range_created_at");
        assert_eq!(by_number.must[0].path(), "employee_number");
        assert_eq!(by_name.index, "autocomplete_fullname_range_created_at");
        assert_eq!(by_name.must[0].path(), "full_name");
    }
}
