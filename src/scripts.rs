//! Page-side script bodies evaluated by [`Page`](crate::page::Page).
//!
//! Every body runs after [`PRELUDE`] inside a function receiving `args`, and
//! its return value is shipped back as JSON. Controls are addressed through
//! the `data-autoapply-key` attribute the scan stamps on them.

pub const PRELUDE: &str = r#"
const KEY_ATTR = 'data-autoapply-key';
const byKey = (key) => {
  const el = document.querySelector('[' + KEY_ATTR + '="' + CSS.escape(key) + '"]');
  if (!el) throw new Error('control ' + key + ' is no longer on the page');
  return el;
};
const squash = (s) => (s || '').replace(/\s+/g, ' ').trim();
const textOf = (el) => el ? squash(el.innerText || el.textContent) : '';
const visible = (el) => !!el && el.getClientRects().length > 0 && getComputedStyle(el).visibility !== 'hidden';
"#;

/// Stamp keys on every candidate control and report its facts plus the raw
/// label evidence. `args.depth` bounds the ancestor walk.
pub const SCAN: &str = r#"
const SKIPPED_TYPES = ['hidden', 'submit', 'button', 'reset', 'image'];
const PICKER_HOSTS = '.select2-container, .choices, [class*="select__control"]';
const isPickerRoot = (el) =>
  el.getAttribute('role') === 'combobox' ||
  el.getAttribute('aria-haspopup') === 'listbox' ||
  el.getAttribute('aria-autocomplete') === 'list';

let seq = Number(document.documentElement.getAttribute('data-autoapply-seq') || '0');
const out = [];
const seen = new Set();
for (const el of document.querySelectorAll('input, select, textarea, [role="combobox"]')) {
  if (seen.has(el)) continue;
  seen.add(el);
  const tag = el.tagName.toLowerCase();
  const type = (el.getAttribute('type') || (tag === 'input' ? 'text' : '')).toLowerCase();
  if (tag === 'input' && SKIPPED_TYPES.includes(type)) continue;
  if (type !== 'file' && !visible(el) && !el.closest(PICKER_HOSTS)) continue;

  const picker = tag !== 'select' && isPickerRoot(el);
  // Inputs living inside a rendered picker host belong to that widget.
  const host = el.parentElement && el.parentElement.closest('[role="combobox"], .select2-container');
  const pickerShadow = tag !== 'select' && (!!host || (!picker && !!el.closest(PICKER_HOSTS)));

  if (!el.getAttribute(KEY_ATTR)) el.setAttribute(KEY_ATTR, 'c' + (seq++));

  let boundLabel = null;
  if (el.id) {
    const lbl = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
    if (lbl) boundLabel = textOf(lbl);
  }
  if (!boundLabel) {
    const wrapping = el.closest('label');
    if (wrapping) {
      const copy = wrapping.cloneNode(true);
      copy.querySelectorAll('input, select, textarea').forEach((c) => c.remove());
      boundLabel = squash(copy.textContent) || null;
    }
  }
  const labelledBy = (el.getAttribute('aria-labelledby') || '')
    .split(/\s+/).filter(Boolean)
    .map((id) => textOf(document.getElementById(id)))
    .filter(Boolean).join(' ');

  const ancestors = [];
  let node = el.parentElement;
  for (let depth = 0; node && depth < args.depth; depth++, node = node.parentElement) {
    ancestors.push(Array.from(node.querySelectorAll('label, legend'))
      .filter((l) => !l.contains(el) && !(l.htmlFor && l.htmlFor !== el.id))
      .slice(0, 3)
      .map(textOf)
      .filter(Boolean));
  }

  let value = null;
  if (type === 'checkbox' || type === 'radio') value = el.value;
  else if (picker) {
    const shell = el.closest(PICKER_HOSTS) || el.parentElement;
    const chosen = shell && shell.querySelector('[class*="single-value"], [class*="singleValue"], .select2-selection__rendered, .choices__item--selectable');
    value = chosen ? textOf(chosen) : (el.value || null);
  } else if ('value' in el) value = el.value;

  out.push({
    key: el.getAttribute(KEY_ATTR),
    tag, type,
    name: el.getAttribute('name') || '',
    id: el.id || '',
    placeholder: el.getAttribute('placeholder') || '',
    value,
    checked: !!el.checked,
    picker,
    pickerShadow,
    evidence: {
      boundLabel,
      ariaLabelledBy: labelledBy || null,
      ariaLabel: el.getAttribute('aria-label'),
      ancestors,
    },
  });
}
document.documentElement.setAttribute('data-autoapply-seq', String(seq));
return out;
"#;

pub const READ_VALUE: &str = r#"
const el = byKey(args.key);
if (el.type === 'checkbox' || el.type === 'radio') return el.checked ? el.value : null;
return 'value' in el ? el.value : textOf(el);
"#;

/// Write through the native value setter so framework-managed inputs see it.
pub const WRITE_TEXT: &str = r#"
const el = byKey(args.key);
const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
el.focus();
setter.call(el, args.value);
el.dispatchEvent(new Event('input', { bubbles: true }));
el.dispatchEvent(new Event('change', { bubbles: true }));
el.blur();
return null;
"#;

pub const SET_CHECKED: &str = r#"
const el = byKey(args.key);
if (!el.checked) el.click();
if (!el.checked) {
  el.checked = true;
  el.dispatchEvent(new Event('change', { bubbles: true }));
}
return null;
"#;

pub const SELECT_OPTIONS: &str = r#"
const el = byKey(args.key);
return Array.from(el.options || []).map((o) => ({ value: o.value, text: squash(o.text) }));
"#;

pub const CHOOSE_OPTION: &str = r#"
const el = byKey(args.key);
const setter = Object.getOwnPropertyDescriptor(HTMLSelectElement.prototype, 'value').set;
setter.call(el, args.value);
if (el.value !== args.value) throw new Error('option ' + args.value + ' not accepted');
el.dispatchEvent(new Event('change', { bubbles: true }));
el.dispatchEvent(new Event('input', { bubbles: true }));
return null;
"#;

const OPTION_SELECTOR: &str =
    r#"'[role="option"], .select__option, .select2-results__option, .choices__item--choice'"#;

pub fn picker_options() -> String {
    format!(
        "return Array.from(document.querySelectorAll({OPTION_SELECTOR})).filter(visible).map(textOf);"
    )
}

pub fn pick_rendered_option() -> String {
    format!(
        r#"
const opts = Array.from(document.querySelectorAll({OPTION_SELECTOR})).filter(visible);
const opt = opts[args.index];
if (!opt) throw new Error('option ' + args.index + ' not rendered');
opt.scrollIntoView({{ block: 'center' }});
opt.dispatchEvent(new MouseEvent('mousedown', {{ bubbles: true }}));
opt.click();
return null;
"#
    )
}

pub const VALIDATION_STATE: &str = r#"
const out = [];
const push = (field, message) => {
  message = squash(message);
  if (message) out.push({ field, message });
};
for (const el of document.querySelectorAll('[aria-invalid="true"]')) {
  const described = (el.getAttribute('aria-describedby') || '')
    .split(/\s+/).filter(Boolean)
    .map((id) => textOf(document.getElementById(id)))
    .join(' ');
  push(el.getAttribute('name') || el.id || '', described || el.validationMessage || 'invalid');
}
const ERROR_NODES = '.error, .field-error, .error-message, .invalid-feedback, [role="alert"], [class*="error-text"], [class*="errorMessage"]';
for (const el of document.querySelectorAll(ERROR_NODES)) {
  if (visible(el)) push('', textOf(el));
}
return out;
"#;

pub const BODY_TEXT: &str = "return document.body ? document.body.innerText : '';";

pub const HAS_ELEMENT: &str = r#"
try { return !!document.querySelector(args.selector); } catch (_) { return false; }
"#;

/// Resolve a locator to a key, stamping one on the element when needed.
pub const LOCATE: &str = r#"
let el = null;
if (args.css) {
  try { el = document.querySelector(args.css); } catch (_) { el = null; }
} else {
  const want = args.text.toLowerCase();
  const buttons = document.querySelectorAll('button, input[type="submit"], input[type="button"], [role="button"], a.btn, a.button');
  el = Array.from(buttons).find((b) => visible(b) && squash(b.innerText || b.value).toLowerCase() === want) || null;
}
if (!el || el.disabled) return null;
if (!el.getAttribute(KEY_ATTR)) {
  const seq = Number(document.documentElement.getAttribute('data-autoapply-seq') || '0');
  el.setAttribute(KEY_ATTR, 'c' + seq);
  document.documentElement.setAttribute('data-autoapply-seq', String(seq + 1));
}
return el.getAttribute(KEY_ATTR);
"#;

/// Source of an embedded application iframe, for boards that host the form
/// on another origin.
pub const EMBEDDED_FORM: &str = r#"
if (document.querySelector('form input, form textarea, form select')) return null;
const frame = document.querySelector('iframe#grnhse_iframe, iframe[src*="/embed/job_app"], iframe[src*="apply"]');
return frame && frame.src ? frame.src : null;
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_scripts_share_one_selector() {
        assert!(picker_options().contains(".select__option"));
        assert!(pick_rendered_option().contains(".select__option"));
        assert!(pick_rendered_option().contains("args.index"));
    }
}
