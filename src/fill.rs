//! Deterministic filling of contact fields, consent checkboxes and radio defaults.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::form::{fields_from_scan, Classifier, FieldKind, FormField, Partition};
use crate::profile::CandidateProfile;
use crate::surface::{bounded, FormSurface};

/// Profile attribute a standard field maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAttribute {
    Email,
    Phone,
    ProfileLink,
    FullName,
    LastName,
    FirstName,
}

impl ProfileAttribute {
    pub fn value(self, profile: &CandidateProfile) -> String {
        match self {
            ProfileAttribute::Email => profile.email.clone(),
            ProfileAttribute::Phone => profile.phone.clone(),
            ProfileAttribute::ProfileLink => profile.linkedin_url.clone(),
            ProfileAttribute::FullName => profile.full_name(),
            ProfileAttribute::LastName => profile.last_name.clone(),
            ProfileAttribute::FirstName => profile.first_name.clone(),
        }
    }
}

/// Locale-aware patterns mapping a combined signal to a profile attribute.
/// Evaluated in order; the first match wins.
#[derive(Debug, Clone)]
pub struct ProfilePatterns {
    patterns: Vec<(ProfileAttribute, Regex)>,
}

impl ProfilePatterns {
    pub fn new(patterns: Vec<(ProfileAttribute, Regex)>) -> Self {
        Self { patterns }
    }

    pub fn attribute_for(&self, combined_signal: &str) -> Option<ProfileAttribute> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(combined_signal))
            .map(|(attr, _)| *attr)
    }
}

impl Default for ProfilePatterns {
    fn default() -> Self {
        let table: [(ProfileAttribute, &str); 6] = [
            (ProfileAttribute::Email, r"(?i)e-?mail|courriel|correo"),
            (
                ProfileAttribute::Phone,
                r"(?i)phone|mobile|telefon|t[ée]l[ée]phone|tel[ée]fono|telem[óo]vel|handy",
            ),
            (
                ProfileAttribute::ProfileLink,
                r"(?i)linkedin|profile[\s_-]?(url|link)",
            ),
            (
                ProfileAttribute::FullName,
                r"(?i)full[\s_-]?name|vollst[äa]ndiger name|nom complet|nombre completo",
            ),
            (
                ProfileAttribute::LastName,
                r"(?i)last[\s_-]?name|family[\s_-]?name|surname|nachname|nom de famille|apellido|achternaam|sobrenome",
            ),
            (
                ProfileAttribute::FirstName,
                r"(?i)first[\s_-]?name|given[\s_-]?name|vorname|pr[ée]nom|voornaam|nombre",
            ),
        ];
        Self::new(
            table
                .into_iter()
                .map(|(attr, pattern)| (attr, Regex::new(pattern).expect("valid profile regex")))
                .collect(),
        )
    }
}

/// Outcome counts of one deterministic pass. Failures are counted, never raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub filled: usize,
    pub skipped: usize,
    pub failures: usize,
}

pub struct DeterministicFiller {
    classifier: Classifier,
    patterns: ProfilePatterns,
    config: EngineConfig,
}

impl DeterministicFiller {
    pub fn new(classifier: Classifier, patterns: ProfilePatterns, config: EngineConfig) -> Self {
        Self {
            classifier,
            patterns,
            config,
        }
    }

    /// Fill every standard-personal field that is still empty, check consent
    /// boxes and give each unanswered radio group its first option.
    pub async fn fill_standard_fields(
        &self,
        surface: &dyn FormSurface,
        profile: &CandidateProfile,
    ) -> Result<FillReport> {
        let fields = fields_from_scan(surface.scan().await?, self.config.label_depth);
        let partition = Partition::build(fields, &self.classifier);

        let mut report = FillReport::default();
        let mut radio_groups: Vec<(String, Vec<FormField>)> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        for routed in partition.standard {
            let field = routed.field;
            match field.kind {
                FieldKind::Text | FieldKind::Textarea => {
                    self.fill_text(surface, profile, &field, &mut report).await;
                }
                FieldKind::Checkbox => {
                    if field.checked {
                        report.skipped += 1;
                    } else {
                        self.check(surface, &field, &mut report).await;
                    }
                }
                FieldKind::Radio => {
                    let group = if field.name.is_empty() {
                        field.key.to_string()
                    } else {
                        field.name.clone()
                    };
                    let idx = *group_index.entry(group.clone()).or_insert_with(|| {
                        radio_groups.push((group, Vec::new()));
                        radio_groups.len() - 1
                    });
                    radio_groups[idx].1.push(field);
                }
                FieldKind::Select | FieldKind::CustomPicker | FieldKind::File => {
                    report.skipped += 1;
                }
            }
        }

        for (group, members) in radio_groups {
            if members.iter().any(|m| m.checked) {
                report.skipped += 1;
                continue;
            }
            debug!(group = %group, "selecting first radio option");
            self.check(surface, &members[0], &mut report).await;
        }

        debug!(?report, "standard fields processed");
        Ok(report)
    }

    async fn fill_text(
        &self,
        surface: &dyn FormSurface,
        profile: &CandidateProfile,
        field: &FormField,
        report: &mut FillReport,
    ) {
        if field.is_filled() {
            report.skipped += 1;
            return;
        }
        let Some(attribute) = self.patterns.attribute_for(&field.combined_signal) else {
            report.skipped += 1;
            return;
        };
        let value = attribute.value(profile);
        if value.is_empty() {
            report.skipped += 1;
            return;
        }
        let limit = self.config.field_timeout;
        match bounded(limit, "write text", surface.write_text(&field.key, &value)).await {
            Ok(()) => {
                debug!(field = %field.question(), ?attribute, "filled standard field");
                report.filled += 1;
            }
            Err(e) => {
                warn!(field = %field.question(), error = %e, "standard field write failed");
                report.failures += 1;
            }
        }
    }

    async fn check(&self, surface: &dyn FormSurface, field: &FormField, report: &mut FillReport) {
        let limit = self.config.field_timeout;
        match bounded(limit, "check control", surface.set_checked(&field.key)).await {
            Ok(()) => report.filled += 1,
            Err(e) => {
                warn!(field = %field.question(), error = %e, "check failed");
                report.failures += 1;
            }
        }
    }
}

impl Default for DeterministicFiller {
    fn default() -> Self {
        Self::new(
            Classifier::default(),
            ProfilePatterns::default(),
            EngineConfig::default(),
        )
    }
}
