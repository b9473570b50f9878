//! Form model: discovered fields, their question text and their lane.

pub mod classify;
pub mod label;
pub mod partition;

use serde::{Deserialize, Serialize};

use crate::surface::{ControlKey, RawControl};

pub use classify::{Classifier, FieldClassification, SignalConfig};
pub use label::resolve_label;
pub use partition::{assign_bucket, Bucket, Partition};

/// Widget family of a discovered control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    CustomPicker,
    Checkbox,
    Radio,
    File,
}

impl FieldKind {
    /// Map a scanned control to its kind; `None` for controls the engine
    /// never interacts with (buttons, hidden inputs).
    pub fn of(raw: &RawControl) -> Option<Self> {
        if raw.picker {
            return Some(FieldKind::CustomPicker);
        }
        match raw.tag.to_ascii_lowercase().as_str() {
            "select" => Some(FieldKind::Select),
            "textarea" => Some(FieldKind::Textarea),
            "input" => match raw.input_type.to_ascii_lowercase().as_str() {
                "checkbox" => Some(FieldKind::Checkbox),
                "radio" => Some(FieldKind::Radio),
                "file" => Some(FieldKind::File),
                "hidden" | "submit" | "button" | "reset" | "image" => None,
                _ => Some(FieldKind::Text),
            },
            _ => None,
        }
    }
}

/// A control discovered on the current page. Rebuilt on every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub key: ControlKey,
    pub kind: FieldKind,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub resolved_label: String,
    /// Lower-cased name, id, placeholder and label; the classifier's only input.
    pub combined_signal: String,
    pub current_value: Option<String>,
    pub checked: bool,
    pub picker_shadow: bool,
}

impl FormField {
    pub fn from_raw(raw: RawControl, label_depth: usize) -> Option<Self> {
        let kind = FieldKind::of(&raw)?;
        let resolved_label = resolve_label(&raw.evidence, label_depth);
        let combined_signal = combine_signal(&raw.name, &raw.id, &raw.placeholder, &resolved_label);
        Some(Self {
            key: raw.key,
            kind,
            name: raw.name,
            id: raw.id,
            placeholder: raw.placeholder,
            resolved_label,
            combined_signal,
            current_value: raw.value,
            checked: raw.checked,
            picker_shadow: raw.picker_shadow,
        })
    }

    /// Whether the control already holds an answer.
    pub fn is_filled(&self) -> bool {
        match self.kind {
            FieldKind::Checkbox | FieldKind::Radio => self.checked,
            _ => self
                .current_value
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty()),
        }
    }

    /// Best available question text: label, then placeholder, name, id.
    pub fn question(&self) -> &str {
        [
            self.resolved_label.as_str(),
            self.placeholder.as_str(),
            self.name.as_str(),
            self.id.as_str(),
        ]
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("")
    }
}

pub fn combine_signal(name: &str, id: &str, placeholder: &str, label: &str) -> String {
    [name, id, placeholder, label]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Build fields from a raw scan, dropping controls the engine ignores.
pub fn fields_from_scan(raw: Vec<RawControl>, label_depth: usize) -> Vec<FormField> {
    raw.into_iter()
        .filter_map(|control| FormField::from_raw(control, label_depth))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::LabelEvidence;

    fn raw(tag: &str, input_type: &str) -> RawControl {
        RawControl {
            key: ControlKey::new("k1"),
            tag: tag.into(),
            input_type: input_type.into(),
            ..Default::default()
        }
    }

    #[test]
    fn kinds_from_markup() {
        assert_eq!(FieldKind::of(&raw("input", "email")), Some(FieldKind::Text));
        assert_eq!(FieldKind::of(&raw("INPUT", "")), Some(FieldKind::Text));
        assert_eq!(FieldKind::of(&raw("textarea", "")), Some(FieldKind::Textarea));
        assert_eq!(FieldKind::of(&raw("select", "select-one")), Some(FieldKind::Select));
        assert_eq!(FieldKind::of(&raw("input", "checkbox")), Some(FieldKind::Checkbox));
        assert_eq!(FieldKind::of(&raw("input", "file")), Some(FieldKind::File));
        assert_eq!(FieldKind::of(&raw("input", "hidden")), None);
        assert_eq!(FieldKind::of(&raw("button", "submit")), None);

        let mut picker = raw("input", "text");
        picker.picker = true;
        assert_eq!(FieldKind::of(&picker), Some(FieldKind::CustomPicker));
    }

    #[test]
    fn combined_signal_is_lowercase_concatenation() {
        let mut control = raw("input", "text");
        control.name = "job_application[answers][0]".into();
        control.id = "Question_42".into();
        control.evidence = LabelEvidence {
            bound_label: Some("Why Us?".into()),
            ..Default::default()
        };
        let field = FormField::from_raw(control, 8).unwrap();
        assert_eq!(field.resolved_label, "Why Us?");
        assert_eq!(
            field.combined_signal,
            "job_application[answers][0] question_42 why us?"
        );
        assert_eq!(field.question(), "Why Us?");
    }

    #[test]
    fn question_falls_back_to_placeholder_then_name() {
        let mut control = raw("input", "text");
        control.name = "q_salary".into();
        let field = FormField::from_raw(control.clone(), 8).unwrap();
        assert_eq!(field.question(), "q_salary");

        control.placeholder = "Expected salary".into();
        let field = FormField::from_raw(control, 8).unwrap();
        assert_eq!(field.question(), "Expected salary");
    }

    #[test]
    fn whitespace_value_is_not_filled() {
        let mut control = raw("input", "text");
        control.value = Some("   ".into());
        assert!(!FormField::from_raw(control, 8).unwrap().is_filled());
    }
}
