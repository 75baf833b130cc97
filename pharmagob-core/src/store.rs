//! Entry point binding a backend to the repository settings.
//!
//! # Example
//!
//! ```ignore
//! use pharmagob_core::{config::RepositoryConfig, store::DocumentStore};
//!
//! let store = DocumentStore::with_config(backend, RepositoryConfig::default());
//! let patients = store.repository("patients");
//! let page = patients.get_paginated(PageRequest::first(), ListQuery::new()).await?;
//! ```

use std::sync::Arc;

use tracing::warn;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    config::RepositoryConfig,
    error::RepositoryResult,
    repository::BaseRepository,
};

/// A backend shared by every repository created from it.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: Arc<B>,
    config: RepositoryConfig,
}

impl<B: StoreBackend> Clone for DocumentStore<B> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend), config: self.config.clone() }
    }
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a store with the default repository settings.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, RepositoryConfig::default())
    }

    pub fn with_config(backend: B, config: RepositoryConfig) -> Self {
        Self { backend: Arc::new(backend), config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Gets a collection handle with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name, self.backend.as_ref())
    }

    /// Creates a repository over the named collection sharing this store's backend.
    pub fn repository(&self, collection: &str) -> BaseRepository<B> {
        BaseRepository::new(Arc::clone(&self.backend), collection, self.config.clone())
    }

    /// Shuts the backend down.
    ///
    /// When repositories created from this store are still alive the backend stays
    /// open and is released when the last of them is dropped.
    pub async fn shutdown(self) -> RepositoryResult<()> {
        match Arc::try_unwrap(self.backend) {
            Ok(backend) => backend.shutdown().await,
            Err(_) => {
                warn!("backend still shared by repositories, skipping shutdown");
                Ok(())
            }
        }
    }
}
