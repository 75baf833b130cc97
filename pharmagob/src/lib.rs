//! Repositories for the PharmaGob document store.
//!
//! This crate is the entry point of the repository layer. It re-exports the core
//! builders and pipelines from `pharmagob-core`, gives each domain entity its own
//! repository and exposes the available storage backends.
//!
//! # Features
//!
//! - **Condition translation** - `(field, operator, value)` triples merged into one filter per field
//! - **Atlas Search** - compound searches with typed optional filters, paginated with a total count
//! - **Report materialization** - grouped aggregates written to an expiring collection
//! - **Multiple backends** - in-memory for tests and development, MongoDB behind the `mongodb` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use pharmagob::{
//!     prelude::*,
//!     memory::InMemoryStore,
//!     repositories::{PatientRepository, PatientSearchFilters},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let patients = PatientRepository::new(&store);
//!
//!     let found = patients
//!         .search_by_curp(
//!             "GOMA",
//!             PageRequest::new(1, 20),
//!             PatientSearchFilters { umu_id: Some("U-1".into()), ..Default::default() },
//!             None,
//!         )
//!         .await?;
//!     println!("{} patients, {} on this page", found.count, found.results.len());
//!
//!     // Plain listings use generic conditions instead of a search index.
//!     let recent = patients
//!         .base()
//!         .get_paginated(
//!             PageRequest::first(),
//!             ListQuery::new().condition(Condition::parse("created_at", ">", 1_700_000_000_000_i64)?),
//!         )
//!         .await?;
//!     println!("{} recent patients", recent.count);
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Reports
//!
//! ```ignore
//! use pharmagob::{prelude::*, repositories::LocationContentRepository};
//!
//! let inventory = LocationContentRepository::new(&store);
//! let handle = inventory
//!     .materialize_stock_report("r-2024-06", vec![Condition::eq("umu_id", "U-1")])
//!     .await?;
//!
//! // Rows live in `handle.output_name` until the expiry index reaps them.
//! let rows = store.repository(&handle.output_name).get_paginated(PageRequest::first(), ListQuery::new()).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process store evaluating everything the repositories emit
//! - [`mongodb`] - MongoDB and Atlas Search (requires `mongodb` feature)

pub mod models;
pub mod prelude;
pub mod repositories;

pub use pharmagob_core::{
    backend, collection, condition, config, document, error, page, pipeline, query, report,
    repository, search, store,
};
pub use pharmagob_core::store::DocumentStore;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use pharmagob_memory::{InMemoryStore, InMemoryStoreBuilder, MemoryStoreError};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use pharmagob_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
