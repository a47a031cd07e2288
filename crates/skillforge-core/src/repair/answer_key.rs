//! Required-key repair for generator results.
//!
//! A dictionary literal that carries a synonym (`correct_answer`,
//! `question`) but not the required key (`answer`, `question_text`) gets the
//! required key added next to the synonym, with the same value expression.
//! Values that are not side-effect free cannot be duplicated; for those, and
//! for results built without literals, a shim around `generate` copies the
//! value at return time.

use super::{PassOutcome, StructuralPass};
use crate::contract::{ENTRY_POINT, KEY_SYNONYMS};
use crate::python::{apply_edits, dict_literals, top_level_bindings, Edit};

pub const SHIM_MARKER: &str = "# --- skillforge required keys ---";

/// Value expressions that evaluate the same way twice.
const DUPLICABLE_KINDS: &[&str] = &[
    "identifier",
    "attribute",
    "string",
    "concatenated_string",
    "integer",
    "float",
    "true",
    "false",
    "none",
    "subscript",
];

fn quoted_in(text: &str, key: &str) -> bool {
    text.contains(&format!("\"{key}\"")) || text.contains(&format!("'{key}'"))
}

fn shim() -> String {
    let copies: String = KEY_SYNONYMS
        .iter()
        .map(|(required, synonym)| {
            format!(
                "        if \"{required}\" not in result and \"{synonym}\" in result:\n            \
                 result[\"{required}\"] = result[\"{synonym}\"]\n"
            )
        })
        .collect();
    format!(
        "{SHIM_MARKER}\n\
         def _skillforge_require_keys(fn):\n    \
             def wrapper(*args, **kwargs):\n        \
                 result = fn(*args, **kwargs)\n        \
                 if not isinstance(result, dict):\n            \
                     return result\n\
         {copies}        \
                 return result\n    \
             return wrapper\n\n\n\
         {ENTRY_POINT} = _skillforge_require_keys({ENTRY_POINT})\n"
    )
}

pub struct RequiredKeyPass;

impl StructuralPass for RequiredKeyPass {
    fn name(&self) -> &'static str {
        "ensure_required_keys"
    }

    fn apply(&self, text: &str) -> PassOutcome {
        let mut edits = Vec::new();
        let mut needs_runtime_copy = false;

        for dict in dict_literals(text).iter().filter(|d| d.well_formed) {
            for (required, synonym) in KEY_SYNONYMS {
                let Some(entry) = dict.get(synonym) else {
                    continue;
                };
                if dict.has_key(required) {
                    continue;
                }
                if DUPLICABLE_KINDS.contains(&entry.value_kind.as_str()) {
                    let value = &text[entry.value_start..entry.value_end];
                    edits.push(Edit::insert(
                        entry.pair_end,
                        format!(", \"{required}\": {value}"),
                    ));
                } else {
                    needs_runtime_copy = true;
                }
            }
        }

        let (mut out, applied) = apply_edits(text, edits);
        let mut fixes = applied as u32;

        // Synonym used outside any literal (e.g. `result["correct_answer"] = x`).
        needs_runtime_copy |= KEY_SYNONYMS
            .iter()
            .any(|(required, synonym)| quoted_in(&out, synonym) && !quoted_in(&out, required));

        if needs_runtime_copy && !out.contains(SHIM_MARKER) {
            if !top_level_bindings(&out).contains(ENTRY_POINT) {
                return if fixes > 0 {
                    PassOutcome::applied(out, fixes)
                } else {
                    PassOutcome::skipped(text, format!("no `{ENTRY_POINT}` to wrap"))
                };
            }
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("\n\n");
            out.push_str(&shim());
            fixes += 1;
        }

        PassOutcome::applied(out, fixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::is_valid;

    #[test]
    fn literal_gets_required_key_with_same_value() {
        let src = "def generate(level=1):\n    ans = '3'\n    return {\"question_text\": 'q', \"correct_answer\": ans}\n";
        let out = RequiredKeyPass.apply(src);
        assert_eq!(out.fixes, 1);
        assert!(out
            .text
            .contains("\"correct_answer\": ans, \"answer\": ans}"));
        assert!(!out.text.contains(SHIM_MARKER));
        assert!(is_valid(&out.text));
    }

    #[test]
    fn question_synonym_is_copied() {
        let src = "def generate(level=1):\n    return {'question': 'q', 'answer': '1'}\n";
        let out = RequiredKeyPass.apply(src);
        assert!(out.text.contains("'question': 'q', \"question_text\": 'q'"));
    }

    #[test]
    fn call_values_fall_back_to_shim() {
        let src = "import random\n\ndef generate(level=1):\n    return {\"question_text\": 'q', \"correct_answer\": str(random.randint(1, 9))}\n";
        let out = RequiredKeyPass.apply(src);
        assert_eq!(out.fixes, 1);
        assert!(out.text.contains(SHIM_MARKER));
        assert!(out.text.contains("generate = _skillforge_require_keys(generate)"));
        assert!(is_valid(&out.text));
    }

    #[test]
    fn shim_without_entry_point_is_skipped() {
        let src = "def make():\n    r = {}\n    r[\"correct_answer\"] = 1\n    return r\n";
        let out = RequiredKeyPass.apply(src);
        assert_eq!(out.fixes, 0);
        assert_eq!(out.text, src);
        assert!(matches!(out.status, super::super::PassStatus::Skipped { .. }));
    }

    #[test]
    fn complete_results_are_untouched_and_rerun_is_clean() {
        let src = "def generate(level=1):\n    return {\"question_text\": 'q', \"correct_answer\": f(), }\n";
        let first = RequiredKeyPass.apply(src);
        let second = RequiredKeyPass.apply(&first.text);
        assert_eq!(second.fixes, 0);
        assert_eq!(second.text, first.text);

        let done = "def generate(level=1):\n    return {\"question_text\": 'q', \"answer\": '1'}\n";
        assert_eq!(RequiredKeyPass.apply(done).text, done);
    }
}
