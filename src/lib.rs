//! Browser-driven job application engine.
//!
//! A run reads job postings, opens each application form, fills the
//! candidate's personal fields deterministically, answers custom questions
//! through an [`AnswerProvider`], attaches a résumé and submits. A submission
//! only counts once the [`SubmissionValidator`] has evidence the portal
//! accepted it.

pub mod answer;
pub mod browser;
pub mod config;
pub mod documents;
pub mod element;
pub mod error;
pub mod fakes;
pub mod fill;
pub mod form;
pub mod jobs;
pub mod page;
pub mod profile;
pub mod router;
pub mod runner;
pub mod scripts;
pub mod stealth;
pub mod submit;
pub mod surface;
pub mod telemetry;
pub mod tracking;

pub use answer::{AnswerProvider, OpenAiAnswerProvider};
pub use browser::PortalBrowser;
pub use config::{AppConfig, BrowserConfig, EngineConfig};
pub use error::{Error, Result};
pub use fill::DeterministicFiller;
pub use form::{Bucket, Classifier, FieldClassification, FormField, Partition};
pub use page::Page;
pub use router::{CustomQuestionRouter, QaEntry};
pub use runner::{ApplicationRunner, Collaborators, Engine, JobOutcome, RunSummary};
pub use submit::{SubmissionValidator, SubmissionVerdict};
pub use surface::FormSurface;
