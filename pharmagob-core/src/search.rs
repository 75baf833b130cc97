//! Compound search specifications for Atlas Search `$search` stages.
//!
//! A [`SearchSpec`] always starts with one required autocomplete clause (the primary
//! search term). Optional parameters each map to exactly one clause kind:
//!
//! | Parameter kind          | Clause       | Section   |
//! |-------------------------|--------------|-----------|
//! | partial text match      | `autocomplete` | `must`    |
//! | numeric/date range      | `range`      | `must`    |
//! | exact match             | `equals`     | `filter`  |
//! | set membership          | `in`         | `filter`  |
//! | set exclusion           | `in`         | `mustNot` |
//!
//! Absent parameters never produce a clause. A range with neither bound set is
//! omitted instead of being emitted as an empty range.
//!
//! ```ignore
//! use pharmagob_core::search::{RangeBounds, SearchSpec};
//!
//! let spec = SearchSpec::builder("autocomplete_curp_range_created_at", "curp", "GOMA8")
//!     .range("created_at", RangeBounds::exclusive(Some(100_i64), None::<i64>))
//!     .equals("umu_id", Some("U-1"))
//!     .build();
//! ```

use bson::{Bson, Document, doc};

use crate::query::{Sort, SortDirection};

/// Lower and upper bounds of a range clause. Only the bounds that are set are emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<Bson>,
    pub gte: Option<Bson>,
    pub lt: Option<Bson>,
    pub lte: Option<Bson>,
}

impl RangeBounds {
    /// Exclusive bounds on both sides, either of which may be absent.
    pub fn exclusive<L, U>(gt: Option<L>, lt: Option<U>) -> Self
    where
        L: Into<Bson>,
        U: Into<Bson>,
    {
        Self {
            gt: gt.map(Into::into),
            lt: lt.map(Into::into),
            ..Self::default()
        }
    }

    /// Inclusive bounds on both sides, either of which may be absent.
    pub fn inclusive<L, U>(gte: Option<L>, lte: Option<U>) -> Self
    where
        L: Into<Bson>,
        U: Into<Bson>,
    {
        Self {
            gte: gte.map(Into::into),
            lte: lte.map(Into::into),
            ..Self::default()
        }
    }

    /// True when no bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    fn write_into(&self, target: &mut Document) {
        for (key, bound) in [("gt", &self.gt), ("gte", &self.gte), ("lt", &self.lt), ("lte", &self.lte)] {
            if let Some(value) = bound {
                target.insert(key, value.clone());
            }
        }
    }
}

/// A single operator inside a compound search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchClause {
    /// Partial (prefix) text match on an autocomplete-indexed path.
    Autocomplete { path: String, query: String },
    /// Numeric or date range on a path.
    Range { path: String, bounds: RangeBounds },
    /// Exact match on a path.
    Equals { path: String, value: Bson },
    /// Path value is one of `values`.
    In { path: String, values: Vec<Bson> },
}

impl SearchClause {
    pub fn path(&self) -> &str {
        match self {
            SearchClause::Autocomplete { path, .. }
            | SearchClause::Range { path, .. }
            | SearchClause::Equals { path, .. }
            | SearchClause::In { path, .. } => path,
        }
    }

    pub fn to_document(&self) -> Document {
        match self {
            SearchClause::Autocomplete { path, query } => doc! {
                "autocomplete": { "query": query, "path": path },
            },
            SearchClause::Range { path, bounds } => {
                let mut range = doc! { "path": path };
                bounds.write_into(&mut range);
                doc! { "range": range }
            }
            SearchClause::Equals { path, value } => doc! {
                "equals": { "path": path, "value": value.clone() },
            },
            SearchClause::In { path, values } => doc! {
                "in": { "path": path, "value": values.clone() },
            },
        }
    }
}

/// A compound search against one search index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpec {
    /// Name of the search index.
    pub index: String,
    /// Clauses that must match and contribute to scoring. The first is the primary term.
    pub must: Vec<SearchClause>,
    /// Clauses that must match without scoring.
    pub filter: Vec<SearchClause>,
    /// Clauses that must not match.
    pub must_not: Vec<SearchClause>,
    /// Ordered sort keys applied by the search stage.
    pub sort: Vec<Sort>,
}

impl SearchSpec {
    /// Starts a spec whose primary clause is an autocomplete of `query` on `path`.
    pub fn builder(
        index: impl Into<String>,
        path: impl Into<String>,
        query: impl Into<String>,
    ) -> SearchSpecBuilder {
        SearchSpecBuilder::new(index, path, query)
    }

    /// Renders the body of the `$search` stage.
    ///
    /// Empty `filter` and `mustNot` sections are left out; `sort` is left out when no
    /// sort keys are set.
    pub fn to_search_stage(&self) -> Document {
        let render = |clauses: &[SearchClause]| {
            clauses
                .iter()
                .map(|c| Bson::Document(c.to_document()))
                .collect::<Vec<_>>()
        };

        let mut compound = doc! { "must": render(&self.must) };
        if !self.filter.is_empty() {
            compound.insert("filter", render(&self.filter));
        }
        if !self.must_not.is_empty() {
            compound.insert("mustNot", render(&self.must_not));
        }

        let mut stage = doc! {
            "index": self.index.clone(),
            "compound": compound,
        };
        if !self.sort.is_empty() {
            stage.insert("sort", Sort::to_document(&self.sort));
        }
        stage
    }
}

/// Entity-level search defaults: index, primary path and canonical sort.
#[derive(Debug, Clone, Copy)]
pub struct SearchProfile {
    pub index: &'static str,
    pub path: &'static str,
    pub default_sort: &'static [(&'static str, SortDirection)],
}

impl SearchProfile {
    /// Starts a builder for `query` with this profile's index, path and default sort.
    pub fn builder(&self, query: impl Into<String>) -> SearchSpecBuilder {
        SearchSpec::builder(self.index, self.path, query).default_sort(
            self.default_sort
                .iter()
                .map(|(field, direction)| Sort::new(*field, *direction))
                .collect(),
        )
    }
}

/// Typed optional filters of one entity search.
///
/// Each field of an implementing struct maps to exactly one builder call, so the set
/// of recognised filters and their clause effect is checked at compile time.
pub trait SearchFilters {
    fn apply(self, builder: SearchSpecBuilder) -> SearchSpecBuilder;
}

impl SearchFilters for () {
    fn apply(self, builder: SearchSpecBuilder) -> SearchSpecBuilder {
        builder
    }
}

#[derive(Debug, Clone)]
pub struct SearchSpecBuilder {
    spec: SearchSpec,
    default_sort: Vec<Sort>,
    sort: Option<Vec<Sort>>,
}

impl SearchSpecBuilder {
    pub fn new(index: impl Into<String>, path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            spec: SearchSpec {
                index: index.into(),
                must: vec![SearchClause::Autocomplete { path: path.into(), query: query.into() }],
                filter: Vec::new(),
                must_not: Vec::new(),
                sort: Vec::new(),
            },
            default_sort: Vec::new(),
            sort: None,
        }
    }

    /// Adds a partial-match clause to `must` when `query` is present.
    pub fn autocomplete(mut self, path: impl Into<String>, query: Option<impl Into<String>>) -> Self {
        if let Some(query) = query {
            self.spec.must.push(SearchClause::Autocomplete { path: path.into(), query: query.into() });
        }
        self
    }

    /// Adds a range clause to `must` carrying only the set bounds.
    ///
    /// Nothing is added when no bound is set. Several ranges on the same path are
    /// separate clauses and must all hold.
    pub fn range(mut self, path: impl Into<String>, bounds: RangeBounds) -> Self {
        if !bounds.is_unbounded() {
            self.spec.must.push(SearchClause::Range { path: path.into(), bounds });
        }
        self
    }

    /// Adds an exact-match clause to `filter` when `value` is present.
    pub fn equals(mut self, path: impl Into<String>, value: Option<impl Into<Bson>>) -> Self {
        if let Some(value) = value {
            self.spec.filter.push(SearchClause::Equals { path: path.into(), value: value.into() });
        }
        self
    }

    /// Adds a membership clause to `filter` when `values` is present and not empty.
    pub fn any_of<T: Into<Bson>>(mut self, path: impl Into<String>, values: Option<Vec<T>>) -> Self {
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            self.spec.filter.push(SearchClause::In {
                path: path.into(),
                values: values.into_iter().map(Into::into).collect(),
            });
        }
        self
    }

    /// Adds an exclusion clause to `mustNot` when `values` is present and not empty.
    pub fn none_of<T: Into<Bson>>(mut self, path: impl Into<String>, values: Option<Vec<T>>) -> Self {
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            self.spec.must_not.push(SearchClause::In {
                path: path.into(),
                values: values.into_iter().map(Into::into).collect(),
            });
        }
        self
    }

    /// Applies a typed filter set.
    pub fn filters<F: SearchFilters>(self, filters: F) -> Self {
        filters.apply(self)
    }

    /// Sort used when the caller does not pass one.
    pub fn default_sort(mut self, sort: Vec<Sort>) -> Self {
        self.default_sort = sort;
        self
    }

    /// Caller-supplied sort; `None` or an empty list falls back to the default.
    pub fn sort(mut self, sort: Option<Vec<Sort>>) -> Self {
        self.sort = sort.filter(|s| !s.is_empty());
        self
    }

    pub fn build(mut self) -> SearchSpec {
        self.spec.sort = self.sort.unwrap_or(self.default_sort);
        self.spec
    }
}
