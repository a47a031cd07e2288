//! Static logic validation and rule-based repair.
//!
//! The checker reports contract violations a parse cannot catch; the paired
//! repair receives the checker's diagnostic verbatim and fixes the subset it
//! has a rule for.

use serde::{Deserialize, Serialize};

use super::helpers::helper_block_range;
use super::PassOutcome;
use crate::contract::{ANSWER_KEY, CHECKER, ENTRY_POINT, HINT_OPEN, MATH_DELIMITER, RESERVED_HELPERS};
use crate::python::{apply_edits, dict_literals, top_level_bindings, top_level_items, Edit, ItemKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicIssue {
    MissingEntryPoint,
    MissingChecker,
    RedefinedHelper(String),
    /// Math markup inside a literal answer value.
    MarkupInAnswer,
    MissingAnswerHint,
}

impl std::fmt::Display for LogicIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicIssue::MissingEntryPoint => write!(f, "missing `{ENTRY_POINT}`"),
            LogicIssue::MissingChecker => write!(f, "missing `{CHECKER}`"),
            LogicIssue::RedefinedHelper(name) => write!(f, "redefines helper `{name}`"),
            LogicIssue::MarkupInAnswer => write!(f, "math markup in answer"),
            LogicIssue::MissingAnswerHint => write!(f, "no answer-format hint"),
        }
    }
}

/// Opaque-to-the-pipeline diagnostic handed from checker to repair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicDiagnostic {
    pub issues: Vec<LogicIssue>,
}

impl LogicDiagnostic {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn contains(&self, issue: &LogicIssue) -> bool {
        self.issues.contains(issue)
    }
}

impl std::fmt::Display for LogicDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicVerdict {
    pub is_valid: bool,
    pub diagnostic: LogicDiagnostic,
}

pub trait LogicChecker: Send + Sync {
    fn check(&self, text: &str) -> LogicVerdict;
}

pub trait LogicRepair: Send + Sync {
    fn name(&self) -> &'static str {
        "logic_repair"
    }

    fn repair(&self, text: &str, diagnostic: &LogicDiagnostic) -> PassOutcome;
}

/// Literal answer values (`"answer": "..."`) containing math markup, as
/// `(start, end)` byte ranges.
fn marked_up_answers(text: &str) -> Vec<(usize, usize)> {
    dict_literals(text)
        .iter()
        .filter(|d| d.well_formed)
        .filter_map(|d| d.get(ANSWER_KEY))
        .filter(|e| matches!(e.value_kind.as_str(), "string" | "concatenated_string"))
        .filter(|e| text[e.value_start..e.value_end].contains(MATH_DELIMITER))
        .map(|e| (e.value_start, e.value_end))
        .collect()
}

/// Contract linter over the module text.
pub struct StaticLogicLinter;

impl LogicChecker for StaticLogicLinter {
    fn check(&self, text: &str) -> LogicVerdict {
        let mut issues = Vec::new();
        let bindings = top_level_bindings(text);
        if !bindings.contains(ENTRY_POINT) {
            issues.push(LogicIssue::MissingEntryPoint);
        }
        if !bindings.contains(CHECKER) {
            issues.push(LogicIssue::MissingChecker);
        }

        let block = helper_block_range(text);
        for item in top_level_items(text) {
            if let ItemKind::Function { name } = item.kind {
                let in_block = block.is_some_and(|(b, e)| item.start >= b && item.end <= e);
                if RESERVED_HELPERS.contains(&name.as_str()) && !in_block {
                    issues.push(LogicIssue::RedefinedHelper(name));
                }
            }
        }

        if !marked_up_answers(text).is_empty() {
            issues.push(LogicIssue::MarkupInAnswer);
        }
        if !text.contains(HINT_OPEN) {
            issues.push(LogicIssue::MissingAnswerHint);
        }

        LogicVerdict {
            is_valid: issues.is_empty(),
            diagnostic: LogicDiagnostic { issues },
        }
    }
}

const CANONICAL_CHECK: &str = r#"def check(user_answer, correct_answer):
    def _normalize(value):
        return str(value).replace("$", "").replace(" ", "").strip()

    is_correct = _normalize(user_answer) == _normalize(correct_answer)
    return {"correct": is_correct, "result": "正確！" if is_correct else "答案錯誤"}
"#;

/// Repairs `MissingChecker` and `MarkupInAnswer`; other issues are
/// reported back through the pass status.
pub struct RuleBasedLogicRepair;

impl LogicRepair for RuleBasedLogicRepair {
    fn repair(&self, text: &str, diagnostic: &LogicDiagnostic) -> PassOutcome {
        let mut out = text.to_string();
        let mut fixes = 0;

        if diagnostic.contains(&LogicIssue::MarkupInAnswer) {
            let edits = marked_up_answers(&out)
                .into_iter()
                .map(|(start, end)| {
                    Edit::replace(start, end, out[start..end].replace(MATH_DELIMITER, ""))
                })
                .collect();
            let (stripped, applied) = apply_edits(&out, edits);
            out = stripped;
            fixes += applied as u32;
        }

        if diagnostic.contains(&LogicIssue::MissingChecker)
            && !top_level_bindings(&out).contains(CHECKER)
        {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("\n\n");
            out.push_str(CANONICAL_CHECK);
            fixes += 1;
        }

        let unrepaired: Vec<String> = diagnostic
            .issues
            .iter()
            .filter(|i| !matches!(i, LogicIssue::MarkupInAnswer | LogicIssue::MissingChecker))
            .map(ToString::to_string)
            .collect();

        if fixes == 0 && !unrepaired.is_empty() {
            return PassOutcome::skipped(text, format!("no rule for {}", unrepaired.join("; ")));
        }
        PassOutcome::applied(out, fixes)
    }
}
