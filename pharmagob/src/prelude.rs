//! Convenient re-exports of commonly used types from pharmagob.
//!
//! ```ignore
//! use pharmagob::prelude::*;
//! ```
//!
//! This provides access to:
//! - The store, base repository and backend traits
//! - Conditions, search specs and pagination types
//! - Report jobs
//! - Error types

pub use pharmagob_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    condition::{ComparisonOp, Condition, PredicateTree, translate, translate_str},
    config::{PharmagobConfig, RepositoryConfig, StoreConfig},
    document::{Model, ModelExt},
    error::{RepositoryError, RepositoryResult},
    page::{Page, PageRequest, SearchResultEnvelope},
    query::{FindOptions, Projection, Sort, SortDirection},
    report::{Aggregate, AggregateOp, ReportHandle, ReportJob},
    repository::{BaseRepository, ListQuery},
    search::{RangeBounds, SearchFilters, SearchSpec},
    store::DocumentStore,
};

pub use crate::repositories::LookupOptions;
