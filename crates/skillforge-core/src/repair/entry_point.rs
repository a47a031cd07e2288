//! Entry-point normalisation.
//!
//! When `generate` (or `check`) is not bound at module level but a function
//! following the naming convention is, an alias assignment is appended to
//! the source. The module is never loaded or mutated at runtime.

use super::{PassOutcome, StructuralPass};
use crate::contract::{CHECKER, CHECKER_PREFIX, ENTRY_POINT, ENTRY_PREFERENCE, ENTRY_PREFIX};
use crate::python::{top_level_bindings, top_level_functions, FunctionDef};

/// Best candidate for an alias: preferred names first, then source order.
fn pick_candidate<'a>(
    functions: &'a [FunctionDef],
    prefix: &str,
    preference: &[&str],
) -> Option<&'a str> {
    preference
        .iter()
        .find_map(|name| functions.iter().find(|f| f.name == *name))
        .or_else(|| functions.iter().find(|f| f.name.starts_with(prefix)))
        .map(|f| f.name.as_str())
}

pub struct EntryPointPass;

impl StructuralPass for EntryPointPass {
    fn name(&self) -> &'static str {
        "normalize_entry_point"
    }

    fn apply(&self, text: &str) -> PassOutcome {
        let bindings = top_level_bindings(text);
        let functions = top_level_functions(text);

        let mut aliases = Vec::new();
        let mut missing_entry = false;
        if !bindings.contains(ENTRY_POINT) {
            match pick_candidate(&functions, ENTRY_PREFIX, ENTRY_PREFERENCE) {
                Some(target) => aliases.push((ENTRY_POINT, target)),
                None => missing_entry = true,
            }
        }
        if !bindings.contains(CHECKER) {
            if let Some(target) = pick_candidate(&functions, CHECKER_PREFIX, &[]) {
                aliases.push((CHECKER, target));
            }
        }

        if aliases.is_empty() {
            return if missing_entry {
                PassOutcome::skipped(text, format!("no `{ENTRY_PREFIX}*` function to alias"))
            } else {
                PassOutcome::clean(text)
            };
        }

        let mut out = text.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        for (alias, target) in &aliases {
            out.push_str(&format!("{alias} = {target}\n"));
        }
        PassOutcome::applied(out, aliases.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::PassStatus;

    #[test]
    fn aliases_generate_basic() {
        let src = "def generate_basic(level=1):\n    return {}\n";
        let out = EntryPointPass.apply(src);
        assert_eq!(out.fixes, 1);
        assert!(out.text.ends_with("\ngenerate = generate_basic\n"));
        assert!(top_level_bindings(&out.text).contains("generate"));
    }

    #[test]
    fn preference_beats_source_order() {
        let src = "def generate_hard(level=1):\n    pass\n\ndef generate_problem(level=1):\n    pass\n";
        let out = EntryPointPass.apply(src);
        assert!(out.text.contains("generate = generate_problem"));
    }

    #[test]
    fn falls_back_to_first_in_source_order() {
        let src = "def generate_hard(level=1):\n    pass\n\ndef generate_easy(level=1):\n    pass\n";
        assert!(EntryPointPass.apply(src).text.contains("generate = generate_hard"));
    }

    #[test]
    fn aliases_checker_too() {
        let src = "def generate(level=1):\n    pass\n\ndef check_answer(user_answer, correct_answer):\n    pass\n";
        let out = EntryPointPass.apply(src);
        assert_eq!(out.fixes, 1);
        assert!(out.text.contains("check = check_answer"));
    }

    #[test]
    fn no_candidate_is_reported() {
        let out = EntryPointPass.apply("def make(level=1):\n    pass\n");
        assert!(matches!(out.status, PassStatus::Skipped { .. }));
        assert_eq!(out.fixes, 0);
    }

    #[test]
    fn bound_names_are_left_alone() {
        let src = "def generate(level=1):\n    pass\n\ncheck = lambda a, b: a == b\n";
        let out = EntryPointPass.apply(src);
        assert_eq!(out.status, PassStatus::Clean);
        assert_eq!(out.text, src);
    }
}
