//! MongoDB backend for the PharmaGob repositories.
//!
//! This crate provides a MongoDB implementation of the `StoreBackend` trait. Filters,
//! updates and pipelines built by the repositories are passed to the driver as is,
//! so Atlas Search `$search` stages run against the cluster's search indexes.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! pharmagob = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pharmagob::{backend::StoreBackendBuilder, config::PharmagobConfig, mongodb::MongoDbStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PharmagobConfig::load()?;
//!     let backend = MongoDbStoreBuilder::from_config(&config.store).build().await?;
//!     let store = pharmagob::DocumentStore::with_config(backend, config.repository);
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as pharmagob_mongodb;

mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
