//! Deterministic line-based differ.

use similar::TextDiff;

/// Lines of context kept before and after each changed block.
pub const CONTEXT_LINES: usize = 3;

/// Unified diff of two manifests, headed `--- <base_label>` / `+++ <head_label>`.
///
/// Returns an empty string when the inputs are byte-equal. Never empty when they
/// differ.
pub fn unified_diff(base_label: &str, head_label: &str, base: &[u8], head: &[u8]) -> String {
    if base == head {
        return String::new();
    }

    let base_text = String::from_utf8_lossy(base);
    let head_text = String::from_utf8_lossy(head);
    let diff = TextDiff::from_lines(base_text.as_ref(), head_text.as_ref());
    let rendered = diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(base_label, head_label)
        .to_string();

    let rendered = rendered.trim_end();
    if rendered.is_empty() {
        // Bytes differ but decode to the same text (invalid UTF-8 on both sides).
        return format!("--- {base_label}\n+++ {head_label}\n@@ manifests differ in non-UTF-8 content @@");
    }
    rendered.to_string()
}
