//! Hardening against recurring defects in generated modules.
//!
//! Sub-steps, in order:
//! 1. `return question, answer` in a generator becomes a mapping return
//! 2. stray top-level prints, demo calls and `__main__` blocks are removed
//! 3. plotting font and minus-sign configuration is normalised
//! 4. double-escaped newlines (`\\n` not starting a LaTeX command) are fixed
//! 5. an answer hint repeated back to back is collapsed
//!
//! Steps 1 and 2 rewrite well-formed syntax nodes; steps 3 to 5 are text
//! rewrites on fragments that need not parse.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::{PassOutcome, StructuralPass};
use crate::contract::{
    ANSWER_KEY, CJK_FONT_FAMILY, ENTRY_POINT, ENTRY_PREFIX, HINT_CLOSE, HINT_OPEN, QUESTION_KEY,
};
use crate::python::{
    apply_edits, line_span, top_level_functions, top_level_items, tuple_returns, Edit, ItemKind,
};

fn rc_params_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^(?P<lhs>[ \t]*[\w.]*rcParams\[\s*['"](?P<key>font\.sans-serif|font\.family|axes\.unicode_minus)['"]\s*\]\s*=[ \t]*)(?P<rhs>[^\n#]*?)[ \t]*$"#,
        )
        .unwrap()
    })
}

fn hint_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            "{}[^{}\n]*{}",
            regex::escape(HINT_OPEN),
            regex::escape(HINT_CLOSE),
            regex::escape(HINT_CLOSE)
        ))
        .unwrap()
    })
}

fn is_generator(name: &str) -> bool {
    name == ENTRY_POINT || name.starts_with(ENTRY_PREFIX)
}

/// Step 1.
fn tuple_returns_to_mapping(text: &str) -> (String, u32) {
    let edits: Vec<Edit> = tuple_returns(text)
        .into_iter()
        .filter(|r| is_generator(&r.function))
        .map(|r| {
            let (q_start, q_end) = r.elements[0];
            let (a_start, a_end) = r.elements[1];
            Edit::replace(
                r.value_start,
                r.value_end,
                format!(
                    "{{\"{QUESTION_KEY}\": {}, \"{ANSWER_KEY}\": {}}}",
                    &text[q_start..q_end],
                    &text[a_start..a_end]
                ),
            )
        })
        .collect();
    let (out, applied) = apply_edits(text, edits);
    (out, applied as u32)
}

/// Step 2.
fn remove_stray_statements(text: &str) -> (String, u32) {
    let module_functions: BTreeSet<String> = top_level_functions(text)
        .into_iter()
        .map(|f| f.name)
        .collect();

    let edits: Vec<Edit> = top_level_items(text)
        .into_iter()
        .filter(|item| item.well_formed)
        .filter(|item| match &item.kind {
            ItemKind::Call { callee } => callee == "print" || module_functions.contains(callee),
            ItemKind::MainGuard => true,
            _ => false,
        })
        .map(|item| {
            let (start, end) = line_span(text, item.start, item.end);
            Edit::delete(start, end)
        })
        .collect();
    let (out, applied) = apply_edits(text, edits);
    (out, applied as u32)
}

/// Step 3.
fn normalize_plot_config(text: &str) -> (String, u32) {
    let mut fixes = 0;
    let out = rc_params_line().replace_all(text, |caps: &Captures<'_>| {
        let canonical = match &caps["key"] {
            "font.sans-serif" => format!("['{CJK_FONT_FAMILY}']"),
            "font.family" => "'sans-serif'".to_string(),
            _ => "False".to_string(),
        };
        if caps["rhs"].trim() != canonical {
            fixes += 1;
        }
        format!("{}{}", &caps["lhs"], canonical)
    });
    (out.into_owned(), fixes)
}

/// Step 4.
fn fix_escaped_newlines(text: &str) -> (String, u32) {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut fixes = 0;
    let mut i = 0;
    while i < chars.len() {
        let is_double_escape = chars[i] == '\\'
            && chars.get(i + 1) == Some(&'\\')
            && chars.get(i + 2) == Some(&'n')
            && !chars.get(i + 3).is_some_and(|c| c.is_ascii_alphabetic())
            && (i == 0 || chars[i - 1] != '\\');
        if is_double_escape {
            out.push_str("\\n");
            fixes += 1;
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    (out, fixes)
}

/// Whether the text between two hints is only whitespace or a
/// same-quote string concatenation (`" + "`).
fn joins_adjacent(gap: &str) -> bool {
    let compact: String = gap.chars().filter(|c| !c.is_whitespace()).collect();
    compact.is_empty() || compact == "\"+\"" || compact == "'+'"
}

/// Step 5.
fn collapse_repeated_hints(text: &str) -> (String, u32) {
    let mut edits = Vec::new();
    let mut previous: Option<(usize, &str)> = None;
    for m in hint_pattern().find_iter(text) {
        match previous {
            Some((prev_end, prev_text))
                if prev_text == m.as_str() && joins_adjacent(&text[prev_end..m.start()]) =>
            {
                edits.push(Edit::delete(prev_end, m.end()));
                // The kept hint's end stays the anchor for a third copy.
                previous = Some((m.end(), prev_text));
            }
            _ => previous = Some((m.end(), m.as_str())),
        }
    }
    let (out, applied) = apply_edits(text, edits);
    (out, applied as u32)
}

pub struct HardeningPass;

impl StructuralPass for HardeningPass {
    fn name(&self) -> &'static str {
        "harden_structure"
    }

    fn apply(&self, text: &str) -> PassOutcome {
        let steps: [fn(&str) -> (String, u32); 5] = [
            tuple_returns_to_mapping,
            remove_stray_statements,
            normalize_plot_config,
            fix_escaped_newlines,
            collapse_repeated_hints,
        ];
        let mut current = text.to_string();
        let mut fixes = 0;
        for step in steps {
            let (next, n) = step(&current);
            current = next;
            fixes += n;
        }
        PassOutcome::applied(current, fixes)
    }
}
