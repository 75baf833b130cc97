//! Materialized reports.
//!
//! A report is an aggregation written into its own collection with `$out`. The
//! output collection is named from the report id and gets an expiring index on
//! `created_at`, so the store reaps it after the job's TTL without any cleanup
//! from this crate.
//!
//! Writing to an existing output name replaces that collection. Two jobs with the
//! same report id running at once race on the same output; nothing here guards it.
//!
//! ```ignore
//! let job = ReportJob::new("65f0c0ffee", doc! { "umu_id": "U-1" })
//!     .group_by("umu_id", "umu_id")
//!     .group_by("item_id", "item.id")
//!     .aggregate(Aggregate::sum("quantity", "quantity"));
//!
//! let handle = materializer.materialize(&backend, "location_contents", job).await?;
//! ```

use std::time::Duration;

use bson::{Bson, Document, doc};
use tracing::{debug, info};

use crate::{
    backend::StoreBackend,
    config::RepositoryConfig,
    error::{RepositoryError, RepositoryResult},
    query::IndexSpec,
};

/// Field written on every output document and indexed for expiry.
pub const REPORT_TIMESTAMP_FIELD: &str = "created_at";

/// Accumulator applied to a grouped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
    Push,
    /// Number of documents in the group; ignores the path.
    Count,
}

impl AggregateOp {
    pub fn operator_key(&self) -> &'static str {
        match self {
            AggregateOp::Sum | AggregateOp::Count => "$sum",
            AggregateOp::Avg => "$avg",
            AggregateOp::Min => "$min",
            AggregateOp::Max => "$max",
            AggregateOp::First => "$first",
            AggregateOp::Last => "$last",
            AggregateOp::Push => "$push",
        }
    }
}

/// One computed column of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub name: String,
    pub op: AggregateOp,
    pub path: String,
}

impl Aggregate {
    pub fn new(name: impl Into<String>, op: AggregateOp, path: impl Into<String>) -> Self {
        Self { name: name.into(), op, path: path.into() }
    }

    pub fn sum(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, AggregateOp::Sum, path)
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, AggregateOp::Count, "")
    }

    fn accumulator(&self) -> Document {
        let operand = match self.op {
            AggregateOp::Count => Bson::Int32(1),
            _ => Bson::String(format!("${}", self.path)),
        };
        let mut acc = Document::new();
        acc.insert(self.op.operator_key(), operand);
        acc
    }
}

/// A grouping aggregation to materialize.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportJob {
    pub report_id: String,
    pub filter: Document,
    /// Output column name and the source path it is grouped on.
    pub group_key: Vec<(String, String)>,
    pub aggregates: Vec<Aggregate>,
    /// Overrides the configured TTL when set.
    pub ttl: Option<Duration>,
}

impl ReportJob {
    pub fn new(report_id: impl Into<String>, filter: Document) -> Self {
        Self {
            report_id: report_id.into(),
            filter,
            group_key: Vec::new(),
            aggregates: Vec::new(),
            ttl: None,
        }
    }

    pub fn group_by(mut self, alias: impl Into<String>, path: impl Into<String>) -> Self {
        self.group_key.push((alias.into(), path.into()));
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn validate(&self) -> RepositoryResult<()> {
        if self.report_id.is_empty() {
            return Err(RepositoryError::InvalidDocument("report id is empty".into()));
        }
        if self.report_id.contains(['$', '\0']) {
            return Err(RepositoryError::InvalidDocument(format!(
                "invalid report id: {:?}",
                self.report_id
            )));
        }
        let names = self
            .group_key
            .iter()
            .map(|(alias, _)| alias.as_str())
            .chain(self.aggregates.iter().map(|a| a.name.as_str()));
        for name in names {
            if name.is_empty() || name.starts_with('$') || name.contains('.') || name == "_id" {
                return Err(RepositoryError::InvalidDocument(format!(
                    "invalid report column name: {name:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Where a materialized report lives and how long it is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHandle {
    pub output_name: String,
    pub ttl: Duration,
}

/// Runs report jobs against a store.
#[derive(Debug, Clone)]
pub struct ReportMaterializer {
    prefix: String,
    ttl: Duration,
}

impl ReportMaterializer {
    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self { prefix: prefix.into(), ttl }
    }

    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::new(config.report_prefix.clone(), config.report_ttl())
    }

    /// Output collection name for a report id. Always the same for the same id.
    pub fn output_name(&self, report_id: &str) -> String {
        format!("{}{}", self.prefix, report_id)
    }

    /// Renders `$match`, `$group`, `$project` and `$out` for `job`.
    pub fn build_pipeline(&self, job: &ReportJob) -> RepositoryResult<Vec<Document>> {
        job.validate()?;

        let mut group_id = Document::new();
        let mut group = Document::new();
        let mut project = doc! { "_id": 0 };

        for (alias, path) in &job.group_key {
            group_id.insert(alias.clone(), format!("${path}"));
            project.insert(alias.clone(), format!("$_id.{alias}"));
        }
        group.insert("_id", group_id);
        for aggregate in &job.aggregates {
            group.insert(aggregate.name.clone(), aggregate.accumulator());
            project.insert(aggregate.name.clone(), 1);
        }
        project.insert(REPORT_TIMESTAMP_FIELD, "$$NOW");

        Ok(vec![
            doc! { "$match": job.filter.clone() },
            doc! { "$group": group },
            doc! { "$project": project },
            doc! { "$out": self.output_name(&job.report_id) },
        ])
    }

    /// Writes the report into its output collection and indexes it for expiry.
    pub async fn materialize<B>(
        &self,
        backend: &B,
        source: &str,
        job: ReportJob,
    ) -> RepositoryResult<ReportHandle>
    where
        B: StoreBackend + ?Sized,
    {
        let pipeline = self.build_pipeline(&job)?;
        let handle = ReportHandle {
            output_name: self.output_name(&job.report_id),
            ttl: job.ttl.unwrap_or(self.ttl),
        };
        debug!(source, output = %handle.output_name, stages = pipeline.len(), "materializing report");

        backend.aggregate(source, pipeline).await?;
        backend
            .create_index(
                &handle.output_name,
                IndexSpec::expiring(REPORT_TIMESTAMP_FIELD, handle.ttl),
            )
            .await?;

        info!(
            report_id = %job.report_id,
            output = %handle.output_name,
            ttl_secs = handle.ttl.as_secs(),
            "report materialized"
        );
        Ok(handle)
    }
}

impl Default for ReportMaterializer {
    fn default() -> Self {
        Self::from_config(&RepositoryConfig::default())
    }
}
