//! Résumé artifacts for the upload step.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::jobs::JobPosting;

/// Supplies the document uploaded with an application.
pub trait DocumentGenerator: Send + Sync {
    /// Path of an existing résumé tailored for `job`.
    fn resume_for(&self, job: &JobPosting) -> Result<PathBuf>;
}

/// Résumés rendered ahead of time as `resume_<job_id>.pdf` in one directory,
/// with an optional generic fallback.
#[derive(Debug, Clone)]
pub struct ResumeDirectory {
    dir: PathBuf,
    fallback: Option<PathBuf>,
}

impl ResumeDirectory {
    pub fn new(dir: impl Into<PathBuf>, fallback: Option<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallback,
        }
    }

    pub fn tailored_path(&self, job: &JobPosting) -> PathBuf {
        self.dir.join(format!("resume_{}.pdf", job.job_id))
    }
}

impl DocumentGenerator for ResumeDirectory {
    fn resume_for(&self, job: &JobPosting) -> Result<PathBuf> {
        let tailored = self.tailored_path(job);
        if tailored.is_file() {
            return Ok(tailored);
        }
        match self.fallback.as_deref().filter(|p| p.is_file()) {
            Some(path) => Ok(path.to_path_buf()),
            None => Err(Error::Upstream(format!(
                "no résumé for {} (looked for {})",
                job.job_id,
                tailored.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> JobPosting {
        JobPosting {
            job_id: id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn tailored_then_fallback_then_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("resume_JOB-1.pdf"), b"%PDF").unwrap();

        let without_fallback = ResumeDirectory::new(dir.path(), None);
        assert_eq!(
            without_fallback.resume_for(&job("JOB-1")).unwrap(),
            dir.path().join("resume_JOB-1.pdf")
        );
        assert!(matches!(
            without_fallback.resume_for(&job("JOB-2")),
            Err(Error::Upstream(_))
        ));

        let generic = dir.path().join("resume.pdf");
        std::fs::write(&generic, b"%PDF").unwrap();
        let with_fallback = ResumeDirectory::new(dir.path(), Some(generic.clone()));
        assert_eq!(with_fallback.resume_for(&job("JOB-2")).unwrap(), generic);
    }
}
