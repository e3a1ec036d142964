//! Normalization of semantic differ output.
//!
//! Raw tool output carries scratch paths, an ASCII banner and a difference
//! count that changes wording between versions. Stripping them makes the same
//! logical diff byte-identical across runs and machines.

use std::sync::OnceLock;

use regex::Regex;

use crate::ports::SemanticOutput;

/// Fragments of the dyff ASCII-art banner.
const BANNER_FRAGMENTS: &[&str] = &[
    "_        __  __",
    "_| |_   _ / _|/ _|",
    "/ _' | | | | |_| |_",
    "| (_| | |_| |  _|  _|",
    "\\__,_|\\__, |_| |_|",
    "|___/",
];

/// Matches dyff's `returned <count> difference(s)` annotation.
fn difference_count_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"returned \S+ differences?\s*$").expect("difference count pattern is valid")
    })
}

fn is_volatile(line: &str, volatile: &[String]) -> bool {
    if volatile.iter().any(|v| !v.is_empty() && line.contains(v.as_str())) {
        return true;
    }
    if BANNER_FRAGMENTS.iter().any(|b| line.contains(b)) {
        return true;
    }
    difference_count_line().is_match(line)
}

/// Normalize raw semantic output into a labelled, stable diff.
///
/// Returns an empty string when nothing remains after stripping.
pub fn normalize(output: &SemanticOutput, base_label: &str, head_label: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for line in output.raw.lines() {
        if is_volatile(line, &output.volatile) {
            continue;
        }
        if kept.is_empty() && line.trim().is_empty() {
            continue;
        }
        kept.push(line);
    }

    let body = kept.join("\n");
    if body.trim().is_empty() {
        return String::new();
    }

    format!("--- {base_label}\n+++ {head_label}\n\n{body}")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "
     _        __  __
   _| |_   _ / _|/ _|  between /tmp/chartval-dyff-AbC123/base.yaml
 / _' | | | | |_| |_       and /tmp/chartval-dyff-AbC123/head.yaml
| (_| | |_| |  _|  _|
 \\__,_|\\__, |_| |_|   returned one difference
        |___/

spec.replicas  (apps/v1/Deployment/my-app)
  ± value change
    - 3
    + 5

";

    fn output(raw: &str, scratch: &str) -> SemanticOutput {
        SemanticOutput {
            raw: raw.to_string(),
            volatile: vec![scratch.to_string()],
        }
    }

    #[test]
    fn test_strips_banner_paths_and_leading_blank_lines() {
        let got = normalize(&output(RAW, "/tmp/chartval-dyff-AbC123"), "a (main)", "a (feat)");
        assert_eq!(
            got,
            "--- a (main)\n+++ a (feat)\n\nspec.replicas  (apps/v1/Deployment/my-app)\n  ± value change\n    - 3\n    + 5"
        );
    }

    #[test]
    fn test_output_is_independent_of_scratch_path() {
        let other = RAW.replace("AbC123", "ZzZ999");
        let a = normalize(&output(RAW, "/tmp/chartval-dyff-AbC123"), "x", "y");
        let b = normalize(&output(&other, "/tmp/chartval-dyff-ZzZ999"), "x", "y");
        assert_eq!(a, b);
    }

    #[test]
    fn test_banner_only_output_is_empty() {
        let raw = "     _        __  __\n        |___/\n returned no differences\n\n";
        assert_eq!(normalize(&output(raw, "/tmp/x"), "a", "b"), "");
    }

    #[test]
    fn test_numeric_difference_count_is_stripped() {
        let raw = "returned 12 differences\nmetadata.name\n  ± value change\n";
        let got = normalize(&output(raw, ""), "a", "b");
        assert!(!got.contains("returned"));
        assert!(got.contains("metadata.name"));
    }

    #[test]
    fn test_empty_volatile_fragment_does_not_drop_everything() {
        let raw = "data.key\n  + added\n";
        let got = normalize(&output(raw, ""), "a", "b");
        assert!(got.ends_with("data.key\n  + added"));
    }

    #[test]
    fn test_difference_count_pattern() {
        let re = difference_count_line();
        assert!(re.is_match(" \\__,_|\\__, |_| |_|   returned one difference"));
        assert!(re.is_match("returned 3 differences  "));
        assert!(!re.is_match("returned value differs"));
    }
}
