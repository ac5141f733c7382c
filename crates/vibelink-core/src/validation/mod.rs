//! Heuristic validation for generated Strudel patterns.
//!
//! This module performs structural checks on a code string without parsing
//! it: bracket balance, quote parity, and denylist scans for syntax the
//! generator is known to hallucinate. It is deliberately a pure function so
//! it can later be swapped for a grammar-based checker without touching the
//! assistant orchestrator.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Function names that LLMs hallucinate but that do not exist in Strudel.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "stutter", "supersaw", "wobble", "spread", "randcat",
    // Use lpf, hpf, bpf
    "lowpass", "highpass", "bandpass",
];

/// Built-in waveform/noise names valid as `.s()` arguments.
const VALID_SYNTHS: &[&str] = &[
    "sawtooth", "square", "triangle", "sine", "white", "pink", "brown", "crackle",
];

// TidalCycles/Haskell "d1 $" idiom, invalid in Strudel's JavaScript.
static HASKELL_DOLLAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bd[1-9]\s*\$").expect("valid regex"));

static HASH_OPERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s#\s").expect("valid regex"));

static SYNTH_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\.s\(["']([^"']+)["']\)"#).expect("valid regex"));

static SPEED_ON_WAVEFORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\.s\(["'](sawtooth|square|triangle|sine)["']\).*\.speed\("#).expect("valid regex")
});

static DENYLIST_PATTERNS: Lazy<Vec<(&'static str, Regex)>> =
    Lazy::new(|| compile_denylist(DEFAULT_DENYLIST));

fn compile_denylist(names: &[&'static str]) -> Vec<(&'static str, Regex)> {
    names
        .iter()
        .map(|name| {
            let pattern = format!(r"(?i)\.{}\s*\(", regex::escape(name));
            (*name, Regex::new(&pattern).expect("valid regex"))
        })
        .collect()
}

/// Result of validating a pattern string.
///
/// Errors and warnings are deduplicated in first-seen order. Warnings never
/// affect `valid`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a Strudel pattern with the default denylist.
pub fn validate_pattern(pattern: &str) -> ValidationResult {
    validate_pattern_with(pattern, &DENYLIST_PATTERNS)
}

/// Validate with a custom denylist of hallucinated function names.
pub fn validate_pattern_with_denylist(
    pattern: &str,
    denylist: &[&'static str],
) -> ValidationResult {
    validate_pattern_with(pattern, &compile_denylist(denylist))
}

fn validate_pattern_with(pattern: &str, denylist: &[(&str, Regex)]) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    // 1. Empty pattern short-circuits everything else
    if pattern.trim().is_empty() {
        return ValidationResult {
            valid: false,
            errors: vec!["Pattern is empty".to_string()],
            warnings: Vec::new(),
        };
    }

    // 2. Bracket balance, one running counter per family
    check_brackets(pattern, &mut errors);

    // 3. Quote parity (heuristic; blind to quotes inside comments or other
    //    quote kinds)
    check_quote_parity(pattern, '\'', "single quotes", &mut errors);
    check_quote_parity(pattern, '"', "double quotes", &mut errors);
    check_quote_parity(pattern, '`', "backticks", &mut errors);

    // 4. TidalCycles/Haskell syntax
    if HASKELL_DOLLAR.is_match(pattern) {
        errors.push(
            "Invalid Haskell syntax: \"d1 $\" is not valid in Strudel. Use note() or s() directly."
                .to_string(),
        );
    }
    if HASH_OPERATOR.is_match(pattern) && !pattern.contains("//") {
        warnings.push(
            "The \"#\" operator is Haskell syntax. In Strudel, chain effects with dots."
                .to_string(),
        );
    }

    // 5. Hallucinated function names
    for (name, regex) in denylist {
        if regex.is_match(pattern) {
            errors.push(format!(
                "Invalid function \".{name}()\" does not exist in Strudel."
            ));
        }
    }

    // 6. Unknown synth names on `.s()` - warning only, could be a sample name
    for caps in SYNTH_CALL.captures_iter(pattern) {
        let synth = &caps[1];
        if !VALID_SYNTHS.contains(&synth) && !synth.contains(':') {
            warnings.push(format!(
                "Unknown synth \"{synth}\". Ensure it's a valid sample or waveform."
            ));
        }
    }

    // 7. `.speed()` chained onto a waveform generator
    if SPEED_ON_WAVEFORM.is_match(pattern) {
        warnings.push("\".speed()\" only affects samples, not synth waveforms.".to_string());
    }

    let errors = dedupe(errors);
    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings: dedupe(warnings),
    }
}

/// Track per-family counters over the whole string. Negative at any point
/// reports an unmatched closer; nonzero at the end reports the family as
/// unbalanced. All three families are always checked.
fn check_brackets(pattern: &str, errors: &mut Vec<String>) {
    let families = [('(', ')', "parenthesis"), ('[', ']', "bracket"), ('{', '}', "brace")];
    let mut counts = [0i64; 3];
    let mut went_negative = [false; 3];

    for ch in pattern.chars() {
        for (i, (open, close, _)) in families.iter().enumerate() {
            if ch == *open {
                counts[i] += 1;
            } else if ch == *close {
                counts[i] -= 1;
                if counts[i] < 0 {
                    went_negative[i] = true;
                }
            }
        }
    }

    for (i, (_, _, name)) in families.iter().enumerate() {
        if went_negative[i] {
            errors.push(format!("Unmatched closing {name}"));
        }
        if counts[i] != 0 {
            errors.push(format!("Unmatched {name} (opening/closing count differs)"));
        }
    }
}

fn check_quote_parity(pattern: &str, quote: char, label: &str, errors: &mut Vec<String>) {
    if pattern.chars().filter(|c| *c == quote).count() % 2 != 0 {
        errors.push(format!("Unmatched {label}"));
    }
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pattern_short_circuits() {
        let result = validate_pattern("   \n  ");
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Pattern is empty".to_string()]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_valid_pattern_passes() {
        let code = r#"stack(
  s("bd sd").bank("tr909"),
  note("c2 [~ eb2]").s("sawtooth").lpf(500).gain(0.8)
)"#;
        let result = validate_pattern(code);
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_validator_is_deterministic() {
        let code = r#"s("bd").stutter(4"#;
        let first = validate_pattern(code);
        let second = validate_pattern(code);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unmatched_open_paren() {
        let result = validate_pattern(r#"note("c2 c3").s("sine""#);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("parenthesis")), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_unmatched_closing_reported_immediately() {
        let result = validate_pattern(r#"s("bd"))"#);
        assert!(result.errors.iter().any(|e| e == "Unmatched closing parenthesis"));
    }

    #[test]
    fn test_all_families_checked_independently() {
        let result = validate_pattern("([{");
        assert!(result.errors.iter().any(|e| e.contains("parenthesis")));
        assert!(result.errors.iter().any(|e| e.contains("bracket")));
        assert!(result.errors.iter().any(|e| e.contains("brace")));
    }

    #[test]
    fn test_odd_quote_count() {
        let result = validate_pattern(r#"s("bd').gain(1)"#);
        assert!(result.errors.iter().any(|e| e.contains("single quotes")));
        assert!(result.errors.iter().any(|e| e.contains("double quotes")));
    }

    #[test]
    fn test_haskell_dollar_is_an_error() {
        let result = validate_pattern(r#"d1 $ s "bd sn""#);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("Haskell syntax")));
    }

    #[test]
    fn test_hash_operator_is_warning_only() {
        let result = validate_pattern(r#"s("bd") # gain(1)"#);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains('#')));
    }

    #[test]
    fn test_denylisted_function_one_error_per_name() {
        let result = validate_pattern(r#"s("bd").stutter(4).stutter(2).wobble(1)"#);
        let stutter_errors = result
            .errors
            .iter()
            .filter(|e| e.contains("stutter"))
            .count();
        assert_eq!(stutter_errors, 1);
        assert!(result.errors.iter().any(|e| e.contains("wobble")));
        assert!(!result.valid);
    }

    #[test]
    fn test_denylist_match_is_case_insensitive() {
        let result = validate_pattern(r#"s("bd").Stutter(4)"#);
        assert!(!result.valid);
    }

    #[test]
    fn test_unknown_synth_is_warning_only() {
        let result = validate_pattern(r#"note("c3").s("supersine")"#);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("supersine")));
    }

    #[test]
    fn test_namespaced_sample_not_warned() {
        let result = validate_pattern(r#"s("breaks165:1")"#);
        assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
    }

    #[test]
    fn test_speed_on_waveform_is_warning() {
        let result = validate_pattern(r#"note("c2").s("sawtooth").speed(2)"#);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("speed")));
    }

    #[test]
    fn test_speed_warning_requires_closed_synth_call() {
        // Extra arguments after the waveform name are not the plain
        // `.s("sawtooth")` shape the heuristic targets
        let result = validate_pattern(r#"note("c2").s("sawtooth", 1).speed(2)"#);
        assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
    }

    #[test]
    fn test_speed_on_sample_not_warned() {
        let result = validate_pattern(r#"s("amen").speed(2)"#);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_custom_denylist() {
        let result = validate_pattern_with_denylist(r#"s("bd").shimmer(3)"#, &["shimmer"]);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("shimmer")));
        // The default list does not know about shimmer
        assert!(validate_pattern(r#"s("bd").shimmer(3)"#).valid);
    }

    #[test]
    fn test_errors_do_not_mask_each_other() {
        // Unbalanced parens and a denylisted call in the same input
        let result = validate_pattern(r#"s("bd".supersaw(2"#);
        assert!(result.errors.len() >= 2);
    }
}
