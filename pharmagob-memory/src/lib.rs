//! In-memory storage backend for the PharmaGob repositories.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend`
//! trait. It evaluates the filters, updates and aggregation pipelines the
//! repositories emit, including `$search` stages, which makes it the backend for
//! tests and local development.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Filters and updates** - Comparison, membership and logical operators over dotted paths
//! - **Search** - Compound `autocomplete`/`range`/`equals`/`in` searches with sort
//! - **Aggregation** - `$facet`, `$group`, `$project`, `$out` and friends
//! - **Index bookkeeping** - Unique indexes enforced, expiring indexes reapable
//!
//! # Quick Start
//!
//! ```ignore
//! use pharmagob::{
//!     DocumentStore,
//!     memory::InMemoryStore,
//!     page::PageRequest,
//!     repositories::{PatientRepository, PatientSearchFilters},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let patients = PatientRepository::new(&store);
//!
//!     let found = patients
//!         .search_by_curp("GOMA", PageRequest::first(), PatientSearchFilters::default(), None)
//!         .await?;
//!     println!("{} patients", found.count);
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as pharmagob_memory;

mod aggregate;
pub mod error;
mod evaluator;
mod expr;
mod search;
pub mod store;
mod update;

pub use error::MemoryStoreError;
pub use store::{InMemoryStore, InMemoryStoreBuilder};
