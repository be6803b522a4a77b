//! Mechanical repair of model output before YAML decoding.
//!
//! The model does not reliably emit valid YAML. Instead of rejecting such
//! output, a [`Sanitizer`] applies an ordered table of pure text rules, each
//! targeting one observed failure mode. New failure modes are handled by
//! appending a rule; sanitizing never fails.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Fence openers stripped from the start of a response, longest first
const FENCE_OPENERS: &[&str] = &["```yaml", "```yml", "```"];
const FENCE_CLOSE: &str = "```";

/// Lines the model emits for fields it should have omitted
const DEGENERATE_LINES: &[&str] = &[
    "structs: []",
    "structs: ''",
    "constants: ''",
    "constants: []",
    "interfaces: ''",
    "interfaces: []",
    "params: ''",
    "return_values: ''",
    "- []",
];

/// `- key: *value` parses as a YAML alias; rewrite it to a quoted scalar.
/// Matched per line, so a rewritten value can never match again.
static ALIAS_LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)- (\w+): \*(.*)$").expect("alias list item pattern is valid")
});

/// One text-to-text repair step
#[derive(Debug, Clone)]
pub enum SanitizeRule {
    /// Trim surrounding whitespace
    Trim,
    /// Strip fence openers and closes until neither end carries one
    StripFence,
    /// Remove lines whose trimmed content equals one of the patterns
    DropLines(Vec<String>),
    /// Rewrite `- key: *value` into `key: '*value'`, keeping the dash when
    /// the line belongs to a larger sequence
    QuoteAliasListItems,
}

impl SanitizeRule {
    pub fn apply(&self, text: &str) -> String {
        match self {
            SanitizeRule::Trim => text.trim().to_string(),
            SanitizeRule::StripFence => strip_fence(text),
            SanitizeRule::DropLines(patterns) => drop_lines(text, patterns),
            SanitizeRule::QuoteAliasListItems => quote_alias_list_items(text),
        }
    }
}

fn strip_fence(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let before = current;
        if let Some(rest) = FENCE_OPENERS
            .iter()
            .find_map(|opener| current.strip_prefix(opener))
        {
            current = rest.trim();
        }
        if let Some(rest) = current.strip_suffix(FENCE_CLOSE) {
            current = rest.trim();
        }
        if current == before {
            return current.to_string();
        }
    }
}

fn drop_lines(text: &str, patterns: &[String]) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| {
            let content = line.trim();
            !patterns.iter().any(|p| p == content)
        })
        .collect();

    let mut out = kept.join("\n");
    if text.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

fn quote_alias_list_items(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let repaired: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(index, line)| match ALIAS_LIST_ITEM.captures(line) {
            Some(caps) => {
                let indent = &caps[1];
                let dash = if in_sequence(&lines, index, indent.len()) {
                    "- "
                } else {
                    ""
                };
                format!(
                    "{}{}{}: '*{}'",
                    indent,
                    dash,
                    &caps[2],
                    caps[3].replace('\'', "''")
                )
            }
            None => line.to_string(),
        })
        .collect();

    let mut out = repaired.join("\n");
    if text.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// A list item belongs to a sequence when a sibling item shares its indent or
/// the next line continues its mapping
fn in_sequence(lines: &[&str], index: usize, indent: usize) -> bool {
    let continued = lines
        .get(index + 1)
        .is_some_and(|next| !next.trim().is_empty() && indent_of(next) > indent);
    let has_sibling = lines.iter().enumerate().any(|(other, line)| {
        other != index && indent_of(line) == indent && line.trim_start().starts_with("- ")
    });
    continued || has_sibling
}

/// Ordered rule table applied to raw model output
#[derive(Debug, Clone)]
pub struct Sanitizer {
    rules: Vec<SanitizeRule>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            rules: vec![
                SanitizeRule::Trim,
                SanitizeRule::StripFence,
                SanitizeRule::DropLines(DEGENERATE_LINES.iter().map(|s| s.to_string()).collect()),
                SanitizeRule::QuoteAliasListItems,
            ],
        }
    }
}

impl Sanitizer {
    /// A sanitizer with no rules (identity)
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones
    pub fn with_rule(mut self, rule: SanitizeRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[SanitizeRule] {
        &self.rules
    }

    pub fn sanitize(&self, raw: &str) -> String {
        self.rules
            .iter()
            .fold(raw.to_string(), |text, rule| rule.apply(&text))
    }
}

/// Sanitize with the default rule table
pub fn sanitize(raw: &str) -> String {
    Sanitizer::default().sanitize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_yaml_fence() {
        let raw = "```yaml\nfile_description: \"parses CLI args\"\n```";
        assert_eq!(sanitize(raw), "file_description: \"parses CLI args\"");
    }

    #[test]
    fn strips_bare_fence_and_surrounding_whitespace() {
        let raw = "\n\n```\n- file: main.go\n  why: entry point\n```\n  ";
        assert_eq!(sanitize(raw), "- file: main.go\n  why: entry point");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(sanitize("  key: value \n"), "key: value");
    }

    #[test]
    fn drops_degenerate_empty_fields() {
        let raw = "file_description: x\nstructs: []\nconstants: ''\nfile_info:\n  imports:\n    - []\n    - fmt\n";
        let cleaned = sanitize(raw);
        assert!(!cleaned.contains("structs"));
        assert!(!cleaned.contains("constants"));
        assert!(!cleaned.contains("- []"));
        assert!(cleaned.contains("    - fmt"));
    }

    #[test]
    fn keeps_lines_that_only_resemble_patterns() {
        let raw = "structs: [Config]\nparams: ''  # none";
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn rewrites_alias_list_item() {
        let cleaned = sanitize("- foo: *bar\n");
        assert_eq!(cleaned, "foo: '*bar'");
        assert!(!cleaned.contains(": *"));
    }

    #[test]
    fn alias_rewrite_only_touches_line_starts() {
        let cleaned = sanitize("- params: *gin.Context - out: *http.Request");
        assert_eq!(cleaned, "params: '*gin.Context - out: *http.Request'");
    }

    #[test]
    fn alias_rewrite_keeps_sequence_items() {
        let raw = "- file: *b.go\n  why: pointer receiver\n- file: a.go\n  why: caller";
        let cleaned = sanitize(raw);
        assert!(cleaned.starts_with("- file: '*b.go'\n"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&cleaned).unwrap();
        let items = parsed.as_sequence().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["file"].as_str(), Some("*b.go"));
    }

    #[test]
    fn repeated_closing_fences_are_all_stripped() {
        assert_eq!(sanitize("a: 1\n```\n```"), "a: 1");
        assert_eq!(sanitize("```yaml\n```\nkey: v\n```"), "key: v");
    }

    #[test]
    fn alias_rewrite_escapes_single_quotes() {
        let cleaned = sanitize("  - receiver: *it's");
        assert_eq!(cleaned, "receiver: '*it''s'");
        let parsed: serde_yaml::Value = serde_yaml::from_str(&cleaned).unwrap();
        assert_eq!(parsed["receiver"].as_str(), Some("*it's"));
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let inputs = [
            "```yaml\na: 1\nb:\n  - x\n```",
            "- file: a.go\n  why: because\n- file: b.go\n  why: also",
            "  plain text answer with no structure  ",
            "- foo: *bar",
            "- params: *gin.Context - out: *http.Request",
            "a: 1\n```\n```",
            "```yaml\n```yaml\nkey: v\n```\n\n```",
            "- file: *b.go\n  why: pointer receiver\n- file: a.go\n  why: caller",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn custom_rules_are_appended_in_order() {
        let sanitizer = Sanitizer::empty()
            .with_rule(SanitizeRule::StripFence)
            .with_rule(SanitizeRule::DropLines(vec!["tags: []".to_string()]));

        assert_eq!(sanitizer.rules().len(), 2);
        assert_eq!(sanitizer.sanitize("```\nname: x\ntags: []\n```"), "name: x");
    }

    #[test]
    fn empty_sanitizer_is_identity() {
        let raw = "```yaml\n- foo: *bar\n```";
        assert_eq!(Sanitizer::empty().sanitize(raw), raw);
    }
}
