//! The run loop: one job at a time, scan → fill → answer → attach → submit → verify.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::answer::AnswerProvider;
use crate::config::EngineConfig;
use crate::documents::DocumentGenerator;
use crate::error::{Error, Result};
use crate::fill::{DeterministicFiller, ProfilePatterns};
use crate::form::{fields_from_scan, Classifier, FieldKind, FormField};
use crate::jobs::{JobFilter, JobPosting};
use crate::profile::CandidateProfile;
use crate::router::CustomQuestionRouter;
use crate::submit::{SubmissionConfig, SubmissionValidator, SubmitLocators};
use crate::surface::{bounded, FormSurface};
use crate::tracking::{ApplicationRecord, TrackingStore};

const RESUME_SIGNALS: &[&str] = &["resume", "résumé", "cv", "curriculum", "lebenslauf", "currículo"];

/// The form engine's components, built once per run.
pub struct Engine {
    pub filler: DeterministicFiller,
    pub router: CustomQuestionRouter,
    pub validator: SubmissionValidator,
    pub locators: SubmitLocators,
    pub config: EngineConfig,
}

impl Engine {
    /// Default signals, patterns and locators under the given bounds.
    pub fn new(config: EngineConfig, submission: SubmissionConfig) -> Self {
        Self {
            filler: DeterministicFiller::new(Classifier::default(), ProfilePatterns::default(), config.clone()),
            router: CustomQuestionRouter::new(Classifier::default(), config.clone()),
            validator: SubmissionValidator::new(submission),
            locators: SubmitLocators::default(),
            config,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), SubmissionConfig::default())
    }
}

/// External collaborators borrowed for the duration of a run.
pub struct Collaborators<'a> {
    pub profile: &'a CandidateProfile,
    pub provider: &'a dyn AnswerProvider,
    pub tracker: &'a dyn TrackingStore,
    pub documents: &'a dyn DocumentGenerator,
}

/// What happened to one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Submitted {
        job_id: String,
        reason: String,
        answers: usize,
    },
    Rejected {
        job_id: String,
        reason: String,
        http_status: Option<u16>,
    },
    Failed {
        job_id: String,
        error: String,
    },
    Skipped {
        job_id: String,
        reason: String,
    },
    /// Filled but deliberately not submitted.
    DryRun {
        job_id: String,
        answers: usize,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub submitted: usize,
    pub outcomes: Vec<JobOutcome>,
}

pub struct ApplicationRunner<'a> {
    engine: Engine,
    deps: Collaborators<'a>,
    max_applications: usize,
    filter: Option<JobFilter>,
    dry_run: bool,
}

impl<'a> ApplicationRunner<'a> {
    pub fn new(engine: Engine, deps: Collaborators<'a>, max_applications: usize) -> Self {
        Self {
            engine,
            deps,
            max_applications,
            filter: None,
            dry_run: false,
        }
    }

    /// Only attempt jobs accepted by `filter`.
    pub fn with_filter(mut self, filter: JobFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Fill forms but stop before clicking submit.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process `jobs` sequentially on the single shared `surface`.
    ///
    /// Fails only when the tracking store cannot be read up front; every
    /// per-job failure is recorded in the summary and the run continues.
    pub async fn run(&self, surface: &dyn FormSurface, jobs: Vec<JobPosting>) -> Result<RunSummary> {
        let applied: HashSet<String> = self
            .deps
            .tracker
            .applied_job_ids()
            .await
            .map_err(|e| Error::Upstream(format!("tracking store unreadable: {e}")))?;

        let mut summary = RunSummary::default();
        for job in jobs {
            if summary.attempted >= self.max_applications {
                info!(cap = self.max_applications, "application cap reached");
                break;
            }
            if applied.contains(&job.job_id) {
                summary.outcomes.push(JobOutcome::Skipped {
                    job_id: job.job_id,
                    reason: "already applied".into(),
                });
                continue;
            }
            if let Some(ref filter) = self.filter {
                if !filter.accepts(&job) {
                    summary.outcomes.push(JobOutcome::Skipped {
                        job_id: job.job_id,
                        reason: "filtered out".into(),
                    });
                    continue;
                }
            }

            // A job with no résumé never reaches the portal and does not use up the cap.
            let resume = match self.deps.documents.resume_for(&job) {
                Ok(resume) => resume,
                Err(e) => {
                    warn!(job = %job.job_id, error = %e, "no résumé for job");
                    summary.outcomes.push(JobOutcome::Failed {
                        job_id: job.job_id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            summary.attempted += 1;
            let span = info_span!("job", id = %job.job_id, company = %job.company);
            let outcome = match self.apply(surface, &job, &resume).instrument(span).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(job = %job.job_id, error = %e, "job failed");
                    JobOutcome::Failed {
                        job_id: job.job_id.clone(),
                        error: e.to_string(),
                    }
                }
            };
            if matches!(outcome, JobOutcome::Submitted { .. }) {
                summary.submitted += 1;
            }
            summary.outcomes.push(outcome);
        }

        info!(
            attempted = summary.attempted,
            submitted = summary.submitted,
            "run finished"
        );
        Ok(summary)
    }

    async fn apply(&self, surface: &dyn FormSurface, job: &JobPosting, resume: &Path) -> Result<JobOutcome> {
        info!(role = %job.role, url = %job.apply_url, "applying");

        surface.navigate(&job.apply_url).await?;

        let report = self
            .engine
            .filler
            .fill_standard_fields(surface, self.deps.profile)
            .await?;
        info!(filled = report.filled, failures = report.failures, "standard fields done");

        let answers = self
            .engine
            .router
            .answer_custom_questions(surface, self.deps.provider, self.deps.profile, job)
            .await?;

        self.attach_resume(surface, resume).await?;
        let submit = self.engine.locators.locate(surface).await?;

        if self.dry_run {
            info!(answers = answers.len(), "dry run, not submitting");
            return Ok(JobOutcome::DryRun {
                job_id: job.job_id.clone(),
                answers: answers.len(),
            });
        }

        let verdict = self
            .engine
            .validator
            .submit(surface, &job.job_id, surface.click(&submit))
            .await;
        if !verdict.success() {
            return Ok(JobOutcome::Rejected {
                job_id: job.job_id.clone(),
                reason: verdict.reason().to_string(),
                http_status: verdict.http_status(),
            });
        }

        let record = ApplicationRecord::submitted(job, resume, &answers, verdict.reason())?;
        self.deps
            .tracker
            .append(&record)
            .await
            .map_err(|e| Error::Upstream(format!("submitted but not recorded: {e}")))?;

        Ok(JobOutcome::Submitted {
            job_id: job.job_id.clone(),
            reason: verdict.reason().to_string(),
            answers: answers.len(),
        })
    }

    async fn attach_resume(&self, surface: &dyn FormSurface, resume: &Path) -> Result<()> {
        let uploads: Vec<FormField> = fields_from_scan(surface.scan().await?, self.engine.config.label_depth)
            .into_iter()
            .filter(|f| f.kind == FieldKind::File)
            .collect();
        let target = uploads
            .iter()
            .find(|f| RESUME_SIGNALS.iter().any(|s| f.combined_signal.contains(*s)))
            .or_else(|| uploads.first())
            .ok_or_else(|| Error::MissingControl("résumé upload control".into()))?;

        bounded(
            self.engine.config.field_timeout,
            "attach résumé",
            surface.attach_file(&target.key, resume),
        )
        .await
    }
}
