//! Core of the PharmaGob repository layer.
//!
//! This crate provides:
//!
//! - **Condition translation** ([`condition`]) - `(field, operator, value)` triples merged into filter documents
//! - **Search specifications** ([`search`]) - compound `$search` clauses with typed optional filters
//! - **Paginated search** ([`pipeline`]) - one aggregation returning a page and the total count
//! - **Report materialization** ([`report`]) - `$out` pipelines with an expiring output collection
//! - **Store backend abstraction** ([`backend`]) - the narrow set of store calls repositories need
//! - **Repositories** ([`repository`], [`store`], [`collection`]) - shared CRUD over a collection
//! - **Models** ([`document`]) - serde types bound to a collection
//! - **Configuration** ([`config`]) and **errors** ([`error`])
//!
//! # Example
//!
//! ```ignore
//! use pharmagob_core::{page::PageRequest, search::SearchSpec, store::DocumentStore};
//!
//! let store = DocumentStore::new(backend);
//! let spec = SearchSpec::builder("autocomplete_curp_range_created_at", "curp", "GOMA")
//!     .equals("umu_id", Some("U-1"))
//!     .build();
//!
//! let envelope = store.repository("patients").search(&spec, PageRequest::first()).await?;
//! println!("{} matches", envelope.count);
//! ```

#[allow(unused_extern_crates)]
extern crate self as pharmagob_core;

pub mod backend;
pub mod collection;
pub mod condition;
pub mod config;
pub mod document;
pub mod error;
pub mod page;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod repository;
pub mod search;
pub mod store;
