use bson::{doc, oid::ObjectId};
use chrono::Utc;
use tracing::{debug, instrument};

use pharmagob_core::{
    backend::StoreBackend,
    document::{Model, ModelExt},
    error::RepositoryResult,
    repository::BaseRepository,
    store::DocumentStore,
};

use crate::models::ReportRequest;

/// Report requests, keyed by ObjectId.
///
/// Ids arrive as hex strings; a string that is not a valid ObjectId never reaches the
/// store and reads as "not found".
#[derive(Debug, Clone)]
pub struct ReportRepository<B: StoreBackend> {
    base: BaseRepository<B>,
}

impl<B: StoreBackend> ReportRepository<B> {
    pub fn new(store: &DocumentStore<B>) -> Self {
        Self { base: store.repository(ReportRequest::COLLECTION) }
    }

    pub fn base(&self) -> &BaseRepository<B> {
        &self.base
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, report_id: &str) -> RepositoryResult<Option<ReportRequest>> {
        let Some(id) = parse_id(report_id) else {
            return Ok(None);
        };

        self.base
            .get(id, None, Vec::new(), None)
            .await?
            .map(ReportRequest::from_document)
            .transpose()
    }

    #[instrument(skip(self, report), fields(report_id = %report.id))]
    pub async fn create(&self, report: ReportRequest) -> RepositoryResult<ReportRequest> {
        self.base.create(report.to_document()?).await?;

        Ok(report)
    }

    /// Sets status and progress and stamps `updated_at`.
    ///
    /// Returns whether a report was modified.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        report_id: &str,
        status: &str,
        progress: i32,
    ) -> RepositoryResult<bool> {
        let Some(id) = parse_id(report_id) else {
            return Ok(false);
        };

        let modified = self
            .base
            .update(
                id,
                doc! {
                    "status": status,
                    "progress": progress,
                    "updated_at": Utc::now().timestamp_millis(),
                },
            )
            .await?;

        Ok(modified > 0)
    }
}

fn parse_id(report_id: &str) -> Option<ObjectId> {
    match ObjectId::parse_str(report_id) {
        Ok(id) => Some(id),
        Err(_) => {
            debug!(report_id, "not an ObjectId");
            None
        }
    }
}
