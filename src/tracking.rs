//! Job-tracking store: the append-only log of confirmed applications.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::router::QaEntry;

/// Status literal written for every recorded application.
pub const STATUS_SUBMITTED: &str = "SUBMITTED";

/// One row of the applications log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub job_id: String,
    pub company: String,
    pub role: String,
    pub resume_file: String,
    /// JSON-serialized question/answer audit trail.
    pub responses: String,
    pub application_date: String,
    pub status: String,
    pub notes: String,
}

impl ApplicationRecord {
    pub fn submitted(
        job: &crate::jobs::JobPosting,
        resume_file: &Path,
        answers: &[QaEntry],
        reason: &str,
    ) -> Result<Self> {
        Ok(Self {
            job_id: job.job_id.clone(),
            company: job.company.clone(),
            role: job.role.clone(),
            resume_file: resume_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            responses: serde_json::to_string(answers)?,
            application_date: chrono::Utc::now().to_rfc3339(),
            status: STATUS_SUBMITTED.to_string(),
            notes: reason.to_string(),
        })
    }
}

#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Ids of jobs already recorded as applied.
    async fn applied_job_ids(&self) -> Result<HashSet<String>>;

    async fn append(&self, record: &ApplicationRecord) -> Result<()>;
}

/// Applications log kept as a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvTrackingStore {
    path: PathBuf,
}

impl CsvTrackingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TrackingStore for CsvTrackingStore {
    async fn applied_job_ids(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut ids = HashSet::new();
        for row in reader.deserialize::<ApplicationRecord>() {
            ids.insert(row?.job_id);
        }
        Ok(ids)
    }

    async fn append(&self, record: &ApplicationRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let is_new = !self.path.exists()
            || std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Upstream(format!("tracking store {}: {e}", self.path.display())))?;
        let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}
