//! Question text recovery for form controls.

use crate::surface::LabelEvidence;

/// Ancestor levels walked when no explicit label exists.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Resolve the human-readable question for a control.
///
/// Priority: bound `<label for>`, then `aria-labelledby`/`aria-label`, then
/// the nearest ancestor (up to `max_depth` levels) holding a `label` or
/// `legend`. Returns an empty string when nothing is found.
pub fn resolve_label(evidence: &LabelEvidence, max_depth: usize) -> String {
    let explicit = [
        evidence.bound_label.as_deref(),
        evidence.aria_labelled_by.as_deref(),
        evidence.aria_label.as_deref(),
    ];
    if let Some(text) = explicit.into_iter().flatten().map(clean).find(|t| !t.is_empty()) {
        return text;
    }

    evidence
        .ancestors
        .iter()
        .take(max_depth)
        .flat_map(|level| level.iter())
        .map(|text| clean(text))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// Collapse whitespace and drop a trailing required-field marker.
fn clean(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches('*').trim_end().to_string()
}
