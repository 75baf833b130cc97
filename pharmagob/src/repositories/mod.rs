//! One repository per domain entity.
//!
//! Each repository wraps a [`BaseRepository`] bound to its collection and adds the
//! entity's named operations. Searches go through the `$search` pipeline with a typed
//! filter struct; lookups by a foreign key go through a plain count and find.
//!
//! ```ignore
//! use pharmagob::{prelude::*, repositories::{PatientRepository, PatientSearchFilters}};
//!
//! let patients = PatientRepository::new(&store);
//! let found = patients
//!     .search_by_curp(
//!         "GOMA",
//!         PageRequest::new(2, 10),
//!         PatientSearchFilters { umu_id: Some("U-1".into()), ..Default::default() },
//!         None,
//!     )
//!     .await?;
//! ```

use bson::{Bson, Document};

use pharmagob_core::{
    backend::StoreBackend,
    error::RepositoryResult,
    page::SearchResultEnvelope,
    query::{FindOptions, Projection, Sort},
    repository::BaseRepository,
};

mod dispatch_record_details;
mod dispatch_records;
mod doctors;
mod item_logs;
mod items;
mod location_contents;
mod locations;
mod patients;
mod reports;
mod shipment_details;
mod shipments;
mod stock_transfer_events;
mod stock_transfers;

pub use dispatch_record_details::DispatchRecordDetailRepository;
pub use dispatch_records::{DispatchRecordRepository, DispatchRecordSearchFilters};
pub use doctors::{DoctorRepository, DoctorSearchFilters};
pub use item_logs::ItemLogRepository;
pub use items::ItemRepository;
pub use location_contents::{LocationContentRepository, LocationContentSearchFilters};
pub use locations::LocationRepository;
pub use patients::{PatientRepository, PatientSearchFilters};
pub use reports::ReportRepository;
pub use shipment_details::ShipmentDetailRepository;
pub use shipments::{ShipmentRepository, ShipmentSearchFilters};
pub use stock_transfer_events::StockTransferEventRepository;
pub use stock_transfers::{StockTransferRepository, StockTransferSearchFilters};

/// Sort, projection and limit of a lookup by foreign key.
///
/// A missing limit falls back to the repository's default limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupOptions {
    pub sort: Vec<Sort>,
    pub projection: Option<Projection>,
    pub limit: Option<i64>,
}

impl LookupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Uses `sort` when no sort keys were given.
    fn or_sort(mut self, sort: Vec<Sort>) -> Self {
        if self.sort.is_empty() {
            self.sort = sort;
        }
        self
    }

    fn into_find_options(self) -> FindOptions {
        FindOptions {
            sort: self.sort,
            projection: self.projection,
            skip: None,
            limit: self.limit,
        }
    }
}

/// `{ key: id }`, restricted to one tenant when `umu_id` is given.
fn foreign_id_filter(key: &str, id: impl Into<Bson>, umu_id: Option<&str>) -> Document {
    let mut filter = Document::new();
    filter.insert(key, id.into());
    if let Some(umu_id) = umu_id {
        filter.insert("umu_id", umu_id);
    }
    filter
}

/// Count plus the first `limit` documents matching `filter`.
async fn lookup<B: StoreBackend>(
    base: &BaseRepository<B>,
    filter: Document,
    options: LookupOptions,
) -> RepositoryResult<SearchResultEnvelope<Document>> {
    base.find_by(filter, options.into_find_options()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_id_filter_adds_tenant_only_when_given() {
        assert_eq!(
            foreign_id_filter("dispatch_record.id", "D-1", Some("U-1")),
            bson::doc! { "dispatch_record.id": "D-1", "umu_id": "U-1" }
        );
        assert_eq!(foreign_id_filter("foreign_id", 7, None), bson::doc! { "foreign_id": 7 });
    }

    #[test]
    fn caller_sort_wins_over_fallback() {
        let options = LookupOptions::new()
            .sort(vec![Sort::asc("created_at")])
            .or_sort(vec![Sort::desc("transition_timestamp")]);

        assert_eq!(options.sort, vec![Sort::asc("created_at")]);
    }

    #[test]
    fn fallback_sort_fills_empty_sort() {
        let options = LookupOptions::new()
            .limit(5)
            .or_sort(vec![Sort::desc("transition_timestamp")])
            .into_find_options();

        assert_eq!(options.sort, vec![Sort::desc("transition_timestamp")]);
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, None);
    }
}
