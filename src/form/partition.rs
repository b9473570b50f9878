//! Disjoint handler buckets for one page scan.

use serde::{Deserialize, Serialize};

use super::classify::{Classifier, FieldClassification};
use super::{FieldKind, FormField};

/// The single handler a field is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Standard,
    CustomText,
    CustomSelect,
    CustomPicker,
    Skipped,
}

/// Route one field. Total over every kind and classification.
pub fn assign_bucket(field: &FormField, classification: FieldClassification) -> Bucket {
    use FieldClassification::*;

    if classification == Blocked || field.kind == FieldKind::File || field.picker_shadow {
        return Bucket::Skipped;
    }
    match (classification, field.kind) {
        (_, FieldKind::Checkbox | FieldKind::Radio) | (StandardPersonal, _) => Bucket::Standard,
        (_, FieldKind::Text | FieldKind::Textarea) => Bucket::CustomText,
        (_, FieldKind::Select) => Bucket::CustomSelect,
        (_, FieldKind::CustomPicker) => Bucket::CustomPicker,
        (_, FieldKind::File) => Bucket::Skipped,
    }
}

/// A field together with the lane decisions made for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedField {
    /// Index of the field in the page scan.
    pub position: usize,
    pub field: FormField,
    pub classification: FieldClassification,
    pub bucket: Bucket,
}

/// Every field of a scan, each placed in exactly one bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partition {
    pub standard: Vec<RoutedField>,
    pub custom_text: Vec<RoutedField>,
    pub custom_select: Vec<RoutedField>,
    pub custom_picker: Vec<RoutedField>,
    pub skipped: Vec<RoutedField>,
}

impl Partition {
    pub fn build(fields: Vec<FormField>, classifier: &Classifier) -> Self {
        let mut partition = Self::default();
        for (position, field) in fields.into_iter().enumerate() {
            let classification = classifier.classify(&field.combined_signal);
            let bucket = assign_bucket(&field, classification);
            let routed = RoutedField {
                position,
                field,
                classification,
                bucket,
            };
            match bucket {
                Bucket::Standard => partition.standard.push(routed),
                Bucket::CustomText => partition.custom_text.push(routed),
                Bucket::CustomSelect => partition.custom_select.push(routed),
                Bucket::CustomPicker => partition.custom_picker.push(routed),
                Bucket::Skipped => partition.skipped.push(routed),
            }
        }
        partition
    }

    pub fn len(&self) -> usize {
        self.standard.len()
            + self.custom_text.len()
            + self.custom_select.len()
            + self.custom_picker.len()
            + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All routed fields, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &RoutedField> {
        self.standard
            .iter()
            .chain(&self.custom_text)
            .chain(&self.custom_select)
            .chain(&self.custom_picker)
            .chain(&self.skipped)
    }

    /// Custom-question fields of every widget kind, in scan order.
    pub fn into_custom(self) -> Vec<RoutedField> {
        let mut fields = self.custom_text;
        fields.extend(self.custom_select);
        fields.extend(self.custom_picker);
        fields.sort_by_key(|r| r.position);
        fields
    }
}
