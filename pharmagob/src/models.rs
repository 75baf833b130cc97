//! Typed documents the repositories read and write as models.

use bson::{Document, oid::ObjectId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use pharmagob_core::document::Model;

/// A request to build a report, tracked while it is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub status: String,
    /// Completion percentage.
    pub progress: i32,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds of the last status change.
    #[serde(default)]
    pub updated_at: Option<i64>,
    /// Caller-defined report parameters.
    #[serde(default)]
    pub parameters: Document,
}

impl ReportRequest {
    /// A fresh request with a new id and no progress.
    pub fn new(status: impl Into<String>, parameters: Document) -> Self {
        Self {
            id: ObjectId::new(),
            status: status.into(),
            progress: 0,
            created_at: Utc::now().timestamp_millis(),
            updated_at: None,
            parameters,
        }
    }
}

impl Model for ReportRequest {
    const COLLECTION: &'static str = "reports";
}
