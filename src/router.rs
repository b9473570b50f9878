//! Routing of custom questions to widget-specific fillers.

use futures::Stream;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::answer::AnswerProvider;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::form::partition::RoutedField;
use crate::form::{fields_from_scan, Bucket, Classifier, FormField, Partition};
use crate::jobs::JobPosting;
use crate::profile::CandidateProfile;
use crate::surface::{bounded, FormSurface, SelectOption};

/// One answered custom question, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
}

const PLACEHOLDER_OPTION: &str = r"(?i)^\s*(?:-+|—+|\.{3}|(?:please\s+)?(?:select|choose)\b|bitte\s+w[äa]hlen|ausw[äa]hlen|s[ée]lectionne[rz]?\b|choisi(?:r|ssez)\b|seleccion[ea]\b|selecione\b|escolha\b|kies\b|selecteer\b)";

pub struct CustomQuestionRouter {
    classifier: Classifier,
    config: EngineConfig,
    placeholder: Regex,
}

impl CustomQuestionRouter {
    pub fn new(classifier: Classifier, config: EngineConfig) -> Self {
        Self {
            classifier,
            config,
            placeholder: Regex::new(PLACEHOLDER_OPTION).expect("valid placeholder regex"),
        }
    }

    /// Options of a native select that represent a real choice.
    pub fn real_options(&self, options: Vec<SelectOption>) -> Vec<SelectOption> {
        options
            .into_iter()
            .filter(|o| !o.text.trim().is_empty() && !self.placeholder.is_match(&o.text))
            .collect()
    }

    /// Context text sent with every question for this job.
    pub fn job_context(&self, profile: &CandidateProfile, job: &JobPosting) -> String {
        let description: String = job.description.chars().take(self.config.context_limit).collect();
        format!(
            "Role: {}\nEmployer: {}\nLocation: {}\n\nJob description:\n{}\n\n{}",
            job.role,
            job.company,
            job.location,
            description,
            profile.background()
        )
    }

    /// Scan and partition the page once, returning a one-shot pass over its
    /// custom questions. Calling `begin` again re-scans the live page.
    pub async fn begin<'a>(
        &'a self,
        surface: &'a dyn FormSurface,
        provider: &'a dyn AnswerProvider,
        profile: &CandidateProfile,
        job: &JobPosting,
    ) -> Result<QuestionPass<'a>> {
        let fields = fields_from_scan(surface.scan().await?, self.config.label_depth);
        let partition = Partition::build(fields, &self.classifier);
        debug!(
            text = partition.custom_text.len(),
            select = partition.custom_select.len(),
            picker = partition.custom_picker.len(),
            "custom questions partitioned"
        );
        Ok(QuestionPass {
            router: self,
            surface,
            provider,
            context: self.job_context(profile, job),
            pending: partition.into_custom().into_iter(),
        })
    }

    /// Answer every custom question on the page, in discovery order.
    pub async fn answer_custom_questions(
        &self,
        surface: &dyn FormSurface,
        provider: &dyn AnswerProvider,
        profile: &CandidateProfile,
        job: &JobPosting,
    ) -> Result<Vec<QaEntry>> {
        let pass = self.begin(surface, provider, profile, job).await?;
        let answers = pass.collect_all().await;
        info!(answered = answers.len(), "custom questions answered");
        Ok(answers)
    }
}

impl Default for CustomQuestionRouter {
    fn default() -> Self {
        Self::new(Classifier::default(), EngineConfig::default())
    }
}

/// Lazy, finite pass over the custom-question buckets of one scan.
pub struct QuestionPass<'a> {
    router: &'a CustomQuestionRouter,
    surface: &'a dyn FormSurface,
    provider: &'a dyn AnswerProvider,
    context: String,
    pending: std::vec::IntoIter<RoutedField>,
}

impl<'a> QuestionPass<'a> {
    /// Fields not yet visited.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Process fields until one yields an answer.
    pub async fn next(&mut self) -> Option<QaEntry> {
        while let Some(routed) = self.pending.next() {
            if routed.field.is_filled() {
                debug!(field = %routed.field.question(), "already filled");
                continue;
            }
            let entry = match routed.bucket {
                Bucket::CustomText => self.answer_text(&routed.field).await,
                Bucket::CustomSelect => self.answer_select(&routed.field).await,
                Bucket::CustomPicker => self.answer_picker(&routed.field).await,
                Bucket::Standard | Bucket::Skipped => None,
            };
            if entry.is_some() {
                return entry;
            }
        }
        None
    }

    pub fn into_stream(self) -> impl Stream<Item = QaEntry> + 'a {
        futures::stream::unfold(self, |mut pass| async move {
            let entry = pass.next().await;
            entry.map(|qa| (qa, pass))
        })
    }

    pub async fn collect_all(mut self) -> Vec<QaEntry> {
        let mut answers = Vec::new();
        while let Some(entry) = self.next().await {
            answers.push(entry);
        }
        answers
    }

    async fn answer_text(&self, field: &FormField) -> Option<QaEntry> {
        let question = field.question().to_string();
        let answer = self.provider.text_answer(&question, &self.context).await?;
        let answer = answer.trim().to_string();
        if answer.is_empty() {
            return None;
        }
        let limit = self.router.config.field_timeout;
        if let Err(e) = bounded(limit, "write answer", self.surface.write_text(&field.key, &answer)).await {
            warn!(question = %question, error = %e, "could not write answer");
            return None;
        }
        Some(QaEntry { question, answer })
    }

    async fn answer_select(&self, field: &FormField) -> Option<QaEntry> {
        let question = field.question().to_string();
        let limit = self.router.config.field_timeout;
        let options = match bounded(limit, "enumerate options", self.surface.enumerate_options(&field.key)).await {
            Ok(options) => self.router.real_options(options),
            Err(e) => {
                warn!(question = %question, error = %e, "could not read options");
                return None;
            }
        };
        if options.is_empty() {
            debug!(question = %question, "no real options, skipping");
            return None;
        }

        let choice = self.provider.best_option(&question, &options, &self.context).await;
        let option = match choice.as_deref().and_then(|v| options.iter().find(|o| o.value == v)) {
            Some(option) => option,
            None => {
                warn!(question = %question, choice = ?choice, "choice not among options, using first");
                &options[0]
            }
        };

        if let Err(e) = bounded(limit, "choose option", self.surface.choose_option(&field.key, &option.value)).await {
            warn!(question = %question, error = %e, "could not commit option");
            return None;
        }
        Some(QaEntry {
            question,
            answer: option.text.clone(),
        })
    }

    async fn answer_picker(&self, field: &FormField) -> Option<QaEntry> {
        let question = field.question().to_string();
        let limit = self.router.config.field_timeout;
        let term = self
            .provider
            .short_search_term(&question, &self.context)
            .await
            .trim()
            .to_string();

        if let Err(e) = bounded(limit, "open picker", self.surface.open_picker(&field.key)).await {
            warn!(question = %question, error = %e, "could not open picker");
            self.dismiss(field).await;
            return None;
        }
        if !term.is_empty() {
            if let Err(e) = bounded(limit, "type search", self.surface.type_search(&field.key, &term)).await {
                warn!(question = %question, error = %e, "could not type search term");
                self.dismiss(field).await;
                return None;
            }
        }

        let rendered = self.wait_for_panel().await;
        if rendered.is_empty() {
            debug!(question = %question, term = %term, "picker rendered no options");
            self.dismiss(field).await;
            return None;
        }

        let needle = term.to_lowercase();
        let index = rendered
            .iter()
            .position(|text| !needle.is_empty() && text.to_lowercase().contains(&needle))
            .unwrap_or(0);

        if let Err(e) = bounded(limit, "pick option", self.surface.pick_rendered_option(index)).await {
            warn!(question = %question, error = %e, "could not pick option");
            self.dismiss(field).await;
            return None;
        }
        Some(QaEntry {
            question,
            answer: rendered[index].clone(),
        })
    }

    async fn wait_for_panel(&self) -> Vec<String> {
        let config = &self.router.config;
        let deadline = tokio::time::Instant::now() + config.picker_wait;
        loop {
            match self.surface.picker_options().await {
                Ok(options) if !options.is_empty() => return options,
                Ok(_) => {}
                Err(e) => debug!(error = %e, "options panel not readable yet"),
            }
            if tokio::time::Instant::now() >= deadline {
                return Vec::new();
            }
            tokio::time::sleep(config.picker_poll).await;
        }
    }

    async fn dismiss(&self, field: &FormField) {
        let limit = self.router.config.field_timeout;
        if let Err(e) = bounded(limit, "dismiss picker", self.surface.press_key(&field.key, "Escape")).await {
            debug!(error = %e, "escape failed");
        }
    }
}
