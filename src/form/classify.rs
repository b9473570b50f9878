//! Signal-list classification of form fields.

use serde::{Deserialize, Serialize};

/// Handling lane for a field, decided from its combined signal alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldClassification {
    /// Anti-automation trap or token; never touched.
    Blocked,
    /// Contact or identity data filled from the candidate profile.
    StandardPersonal,
    /// Anything else; answered through the answer provider.
    CustomQuestion,
}

/// Substring signal lists used by the [`Classifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub blocked: Vec<String>,
    pub standard: Vec<String>,
}

const BLOCKED_SIGNALS: &[&str] = &[
    "honeypot",
    "hp_field",
    "bot_field",
    "leave this field blank",
    "do not fill",
    "captcha",
    "recaptcha",
    "hcaptcha",
    "turnstile",
    "csrf",
    "xsrf",
    "authenticity_token",
    "_token",
    "nonce",
    "session_id",
    "utm_",
    "gclid",
    "fbclid",
    "mc_cid",
    "tracking_id",
    "tracking_code",
    "trk_",
    "referrer_source",
];

const STANDARD_SIGNALS: &[&str] = &[
    // en
    "first_name",
    "first name",
    "firstname",
    "given name",
    "last_name",
    "last name",
    "lastname",
    "family name",
    "surname",
    "full name",
    "full_name",
    "email",
    "e-mail",
    "phone",
    "mobile",
    "linkedin",
    "resume",
    "résumé",
    "curriculum",
    "cover letter",
    "cover_letter",
    // de
    "vorname",
    "nachname",
    "telefon",
    "handynummer",
    "lebenslauf",
    "anschreiben",
    // fr
    "prénom",
    "prenom",
    "nom de famille",
    "courriel",
    "téléphone",
    "lettre de motivation",
    // es
    "nombre",
    "apellido",
    "correo",
    "teléfono",
    "telefono",
    "carta de presentación",
    // nl
    "voornaam",
    "achternaam",
    "telefoonnummer",
    // pt
    "sobrenome",
    "telemóvel",
    "currículo",
];

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            blocked: BLOCKED_SIGNALS.iter().map(|s| s.to_string()).collect(),
            standard: STANDARD_SIGNALS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Assigns [`FieldClassification`]s using an immutable [`SignalConfig`].
#[derive(Debug, Clone)]
pub struct Classifier {
    blocked: Vec<String>,
    standard: Vec<String>,
}

impl Classifier {
    pub fn new(config: SignalConfig) -> Self {
        let lower = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .map(|s| s.to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            blocked: lower(config.blocked),
            standard: lower(config.standard),
        }
    }

    /// Classify a combined signal. Blocked beats standard beats custom.
    pub fn classify(&self, combined_signal: &str) -> FieldClassification {
        let signal = combined_signal.to_lowercase();
        if self.blocked.iter().any(|s| signal.contains(s.as_str())) {
            FieldClassification::Blocked
        } else if self.standard.iter().any(|s| signal.contains(s.as_str())) {
            FieldClassification::StandardPersonal
        } else {
            FieldClassification::CustomQuestion
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_takes_precedence() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("email_honeypot  leave this field blank"),
            FieldClassification::Blocked
        );
        assert_eq!(
            classifier.classify("g-recaptcha-response"),
            FieldClassification::Blocked
        );
    }

    #[test]
    fn standard_fields_in_several_locales() {
        let classifier = Classifier::default();
        for signal in [
            "job_application[first_name] first name",
            "vorname",
            "Prénom",
            "correo electrónico",
            "achternaam",
            "LinkedIn Profile",
        ] {
            assert_eq!(
                classifier.classify(signal),
                FieldClassification::StandardPersonal,
                "signal: {signal}"
            );
        }
    }

    #[test]
    fn incidental_standard_word_is_swept_into_standard() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("question_123 may we contact you by phone about other roles?"),
            FieldClassification::StandardPersonal
        );
    }

    #[test]
    fn tracking_parameters_are_blocked_but_tracking_questions_are_not() {
        let classifier = Classifier::default();
        for signal in ["tracking_id", "hidden tracking_code", "trk_source"] {
            assert_eq!(
                classifier.classify(signal),
                FieldClassification::Blocked,
                "signal: {signal}"
            );
        }
        assert_eq!(
            classifier.classify("question_412 describe your conversion tracking experience"),
            FieldClassification::CustomQuestion
        );
    }

    #[test]
    fn unmatched_signal_is_custom() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("question_987 why do you want to work here?"),
            FieldClassification::CustomQuestion
        );
    }

    #[test]
    fn custom_lists_replace_defaults() {
        let classifier = Classifier::new(SignalConfig {
            blocked: vec!["Secret".into()],
            standard: vec!["Badge".into()],
        });
        assert_eq!(classifier.classify("secret_field"), FieldClassification::Blocked);
        assert_eq!(classifier.classify("badge number"), FieldClassification::StandardPersonal);
        assert_eq!(classifier.classify("email"), FieldClassification::CustomQuestion);
    }
}
