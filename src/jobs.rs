//! Job intake: postings exported from the intake sheet, plus keyword filters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One job to apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPosting {
    #[serde(alias = "Job_ID", alias = "external_id")]
    pub job_id: String,
    #[serde(alias = "Company")]
    pub company: String,
    #[serde(alias = "Role")]
    pub role: String,
    #[serde(alias = "Location")]
    pub location: String,
    #[serde(alias = "Apply_URL", alias = "applyUrl")]
    pub apply_url: String,
    #[serde(alias = "Description", alias = "jobDescription")]
    pub description: String,
    #[serde(alias = "Source")]
    pub source: String,
}

/// Read postings from a CSV file with a header row. Rows without an id or
/// apply URL are dropped.
pub fn load_jobs(path: impl AsRef<Path>) -> Result<Vec<JobPosting>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut jobs = Vec::new();
    for row in reader.deserialize::<JobPosting>() {
        let job = row?;
        if !job.job_id.is_empty() && !job.apply_url.is_empty() {
            jobs.push(job);
        }
    }
    Ok(jobs)
}

/// Keyword screens applied before a posting is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    /// At least one must appear in the title or description.
    pub role_keywords: Vec<String>,
    /// None may appear in the title or description.
    pub excluded_roles: Vec<String>,
    /// Location phrases that rule a posting out.
    pub location_rejects: Vec<String>,
    /// At least one must appear in the location or description.
    pub location_accepts: Vec<String>,
}

impl Default for JobFilter {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            role_keywords: list(&[
                "google ads",
                "ppc",
                "paid media",
                "performance marketing",
                "demand generation",
                "growth marketing",
                "crm",
                "marketing automation",
                "email marketing",
                "lifecycle marketing",
                "abm",
                "paid search",
                "digital marketing",
            ]),
            excluded_roles: list(&[
                "content marketing",
                "seo specialist",
                "technical seo",
                "copywriter",
                "content writer",
                "community manager",
                "graphic designer",
                "video editor",
            ]),
            location_rejects: list(&[
                "remote - us only",
                "remote - uk only",
                "must be located",
                "must reside in",
                "us only",
                "uk only",
            ]),
            location_accepts: list(&[
                "remote",
                "worldwide",
                "work from anywhere",
                "global",
                "visa sponsorship",
                "sponsorship available",
                "relocation support",
            ]),
        }
    }
}

impl JobFilter {
    pub fn role_matches(&self, job: &JobPosting) -> bool {
        let text = format!("{} {}", job.role, job.description).to_lowercase();
        contains_any(&text, &self.role_keywords) && !contains_any(&text, &self.excluded_roles)
    }

    pub fn location_allowed(&self, job: &JobPosting) -> bool {
        let text = format!("{} {}", job.location, job.description).to_lowercase();
        !contains_any(&text, &self.location_rejects) && contains_any(&text, &self.location_accepts)
    }

    pub fn accepts(&self, job: &JobPosting) -> bool {
        self.role_matches(job) && self.location_allowed(job)
    }
}

fn contains_any(text: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| text.contains(&n.to_lowercase()))
}
