//! Isolate Python source from a raw LLM completion.
//!
//! Preference order:
//! 1. the interior of the first fenced code block (language tag dropped)
//! 2. everything from the first top-level `import`/`from` line onwards
//! 3. the completion unchanged
//!
//! Extraction never fails and never turns non-empty input into an empty
//! string.

use std::sync::OnceLock;

use regex::Regex;

const FENCE: &str = "```";

fn module_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(?:import|from)\s+\S").unwrap())
}

/// Interior of the first complete fenced block, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find(FENCE)?;
    let after_open = &text[open + FENCE.len()..];
    // The rest of the opening line is the language tag.
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find(FENCE)?;
    Some(&body[..close])
}

/// Best-effort source extraction.
pub fn extract_code(raw: &str) -> String {
    if let Some(body) = fenced_block(raw) {
        let body = body.trim_matches(|c| c == '\n' || c == '\r');
        if !body.trim().is_empty() {
            return format!("{}\n", body.trim_end());
        }
    }

    if let Some(m) = module_start().find(raw) {
        return raw[m.start()..].to_string();
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_loses_fence_and_language_tag() {
        let raw = "```python\nimport random\n\ndef generate(level=1):\n    pass\n```";
        let code = extract_code(raw);
        assert!(code.starts_with("import random\n"));
        assert!(!code.contains("```"));
        assert!(!code.contains("python\n"));
    }

    #[test]
    fn prose_around_fence_is_dropped() {
        let raw = "Here is the module:\n```py\nx = 1\n```\nHope this helps!";
        assert_eq!(extract_code(raw), "x = 1\n");
    }

    #[test]
    fn untagged_fence_works() {
        assert_eq!(extract_code("```\nx = 1\n```"), "x = 1\n");
    }

    #[test]
    fn import_marker_slices_leading_prose() {
        let raw = "Sure! The generator follows.\nimport random\nx = random.randint(1, 3)\n";
        assert_eq!(extract_code(raw), "import random\nx = random.randint(1, 3)\n");
    }

    #[test]
    fn from_import_counts_as_marker() {
        let raw = "note\nfrom fractions import Fraction\n";
        assert_eq!(extract_code(raw), "from fractions import Fraction\n");
    }

    #[test]
    fn unterminated_fence_falls_through_to_marker() {
        let raw = "```python\nimport math\nprint(math.pi)\n";
        assert_eq!(extract_code(raw), "import math\nprint(math.pi)\n");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(extract_code("def f():\n    pass\n"), "def f():\n    pass\n");
    }

    #[test]
    fn empty_fence_never_yields_empty_output() {
        let raw = "```python\n```";
        assert_eq!(extract_code(raw), raw);
        assert_eq!(extract_code(""), "");
    }
}
