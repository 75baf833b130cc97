//! Options shared by the plain find/count query path.
//!
//! This module provides sort specifications, projections, find options and index
//! specifications passed to a [`StoreBackend`](crate::backend::StoreBackend).
//!
//! # Query Building
//!
//! Find options can be constructed using the fluent builder API:
//!
//! ```ignore
//! use pharmagob_core::query::{FindOptions, SortDirection};
//!
//! let options = FindOptions::builder()
//!     .sort("created_at", SortDirection::Desc)
//!     .skip(20)
//!     .limit(10)
//!     .build();
//! ```

use std::time::Duration;

use bson::{Bson, Document};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The numeric direction used by the store (`1` or `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Sort specification for query results.
///
/// Specifies which field to sort by and in which direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Renders an ordered list of sort keys as a sort document.
    pub fn to_document(sort: &[Sort]) -> Document {
        sort.iter()
            .map(|s| (s.field.clone(), Bson::Int32(s.direction.as_i32())))
            .collect()
    }
}

/// Fields to return from a find.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Return only the listed fields (plus `_id`).
    Fields(Vec<String>),
    /// A raw projection document such as `{ "review_status": 1 }`.
    Document(Document),
}

impl Projection {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Fields(fields.into_iter().map(Into::into).collect())
    }

    pub fn to_document(&self) -> Document {
        match self {
            Projection::Fields(fields) => fields
                .iter()
                .map(|f| (f.clone(), Bson::Int32(1)))
                .collect(),
            Projection::Document(doc) => doc.clone(),
        }
    }
}

/// Options for a plain find against a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Ordered sort keys. Empty means natural order.
    pub sort: Vec<Sort>,
    /// Optional projection.
    pub projection: Option<Projection>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
}

impl FindOptions {
    /// Creates a new find options builder for fluent construction.
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }

    /// Returns the sort document, or `None` when no sort keys were given.
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            None
        } else {
            Some(Sort::to_document(&self.sort))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    /// Creates a new find options builder.
    pub fn new() -> Self {
        FindOptionsBuilder { options: FindOptions::default() }
    }

    /// Appends a sort key.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.sort.push(Sort::new(field, direction));
        self
    }

    /// Replaces all sort keys.
    pub fn sorts(mut self, sort: Vec<Sort>) -> Self {
        self.options.sort = sort;
        self
    }

    pub fn projection(mut self, projection: Option<Projection>) -> Self {
        self.options.projection = projection;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Builds and returns the final options.
    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Specification of a single-field index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    /// The indexed field.
    pub field: String,
    /// Key direction.
    pub direction: SortDirection,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// When set, documents expire this long after the date stored in `field`.
    pub expire_after: Option<Duration>,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
            unique: false,
            expire_after: None,
        }
    }

    /// An index whose documents are reaped `ttl` after the indexed date.
    pub fn expiring(field: impl Into<String>, ttl: Duration) -> Self {
        Self { expire_after: Some(ttl), ..Self::new(field) }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
}

/// Result of an update issued against the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Number of documents matched by the filter.
    pub matched_count: u64,
    /// Number of documents actually modified.
    pub modified_count: u64,
    /// Identifier of the inserted document when the update upserted.
    pub upserted_id: Option<Bson>,
}
