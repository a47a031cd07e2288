//! Repair pipeline properties across ablation tiers.
//!
//! Covers tier gating (bare is identity, structural never touches the
//! syntax or logic counters), corrective-only syntax repair, idempotence
//! of the full pipeline on its own output, and the entry-point and
//! required-key scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use skillforge_core::python::{
    dict_literals, top_level_bindings, top_level_functions, top_level_items, ItemKind,
};
use skillforge_core::{
    extract_code, is_valid, AblationTier, PassOutcome, RepairPipeline, SyntaxIssue, SyntaxRepair,
};

const LLM_REPLY: &str = r#"Here is the generator you asked for.

```python
import random

def generate_basic(level=1):
    a = random.randint(1, 9)
    b = random.randint(1, 9)
    question = f"${a} + {b}$ = ?（答案格式：整數）"
    return question, str(a + b)

def check_answer(user_answer, correct_answer):
    return user_answer.strip() == correct_answer

print(generate_basic())
```

Let me know if you need more variants."#;

const BROKEN: &str = "def generate(level=1)\n    return {}\n";

/// Unparseable module whose generator also needs structural work.
const BROKEN_GENERATOR: &str = "import random\n\ndef generate_basic(level=1)\n    a = random.randint(1, 9)\n    return f\"${a}$（答案格式：整數）\", str(a)\n";

/// Right-hand side of the last top-level `generate = <name>` alias.
fn entry_alias_target(text: &str) -> Option<String> {
    text.lines()
        .filter(|l| !l.starts_with(' '))
        .filter_map(|l| l.strip_prefix("generate = "))
        .last()
        .map(|rhs| rhs.trim().to_string())
}

/// Syntax repair that only counts its invocations.
struct CountingRepair(Arc<AtomicUsize>);

impl SyntaxRepair for CountingRepair {
    fn repair(&self, text: &str, _issue: &SyntaxIssue) -> PassOutcome {
        self.0.fetch_add(1, Ordering::SeqCst);
        PassOutcome::clean(text)
    }
}

fn counting_pipeline() -> (RepairPipeline, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = RepairPipeline::new().with_syntax_repair(CountingRepair(calls.clone()));
    (pipeline, calls)
}

#[test]
fn test_bare_tier_returns_extracted_text_verbatim() {
    let pipeline = RepairPipeline::new();
    for input in [extract_code(LLM_REPLY), BROKEN.to_string(), String::new()] {
        let report = pipeline.run(&input, AblationTier::Bare);
        assert_eq!(report.text, input);
        assert_eq!(report.counters.ast_repairs, 0);
        assert_eq!(report.counters.logic_fixes, 0);
        assert!(!report.syntax_repair_invoked);
    }
}

#[test]
fn test_structural_tier_only_counts_regex_fixes() {
    let (pipeline, calls) = counting_pipeline();
    for input in [extract_code(LLM_REPLY), BROKEN.to_string()] {
        let report = pipeline.run(&input, AblationTier::Structural);
        assert_eq!(report.counters.ast_repairs, 0);
        assert_eq!(report.counters.logic_fixes, 0);
        assert!(report.counters.regex_fixes > 0);
        assert!(!report.logic_repair_invoked);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_syntax_repair_is_never_invoked_on_parseable_text() {
    let (pipeline, calls) = counting_pipeline();
    let report = pipeline.run(&extract_code(LLM_REPLY), AblationTier::Full);

    assert!(is_valid(&report.text));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!report.syntax_repair_invoked);
    assert_eq!(report.counters.ast_repairs, 0);
}

#[test]
fn test_syntax_repair_runs_once_on_unparseable_text() {
    let (pipeline, calls) = counting_pipeline();
    let report = pipeline.run(BROKEN, AblationTier::Full);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(report.syntax_repair_invoked);
    assert!(report.residual_syntax_issue.is_some());
}

#[test]
fn test_heuristic_syntax_repair_fixes_missing_colon() {
    let report = RepairPipeline::new().run(BROKEN, AblationTier::Full);

    assert!(report.syntax_repair_invoked);
    assert!(report.counters.ast_repairs >= 1);
    assert!(report.residual_syntax_issue.is_none());
    assert!(is_valid(&report.text));
}

#[test]
fn test_full_pipeline_is_idempotent_on_its_output() {
    let pipeline = RepairPipeline::new();
    let first = pipeline.run(&extract_code(LLM_REPLY), AblationTier::Full);
    assert!(first.counters.any());

    let second = pipeline.run(&first.text, AblationTier::Full);
    assert_eq!(second.text, first.text);
    assert_eq!(second.counters.regex_fixes, 0);
    assert_eq!(second.counters.ast_repairs, 0);
    assert_eq!(second.counters.logic_fixes, 0);
}

#[test]
fn test_generate_basic_is_reachable_as_generate() {
    let src = "def generate_basic(level=1):\n    return {\"question_text\": 'q', \"answer\": '1'}\n";
    for tier in [AblationTier::Structural, AblationTier::Full] {
        let report = RepairPipeline::new().run(src, tier);
        assert!(is_valid(&report.text));

        // `generate` is bound exactly once, by an alias to a function
        // the module itself defines, so calling it calls generate_basic.
        let generate_bindings = top_level_items(&report.text)
            .into_iter()
            .filter(|item| match &item.kind {
                ItemKind::Function { name } => name == "generate",
                ItemKind::Assignment { targets } => targets.iter().any(|t| t == "generate"),
                _ => false,
            })
            .count();
        assert_eq!(generate_bindings, 1);

        let target = entry_alias_target(&report.text).expect("generate alias");
        assert_eq!(target, "generate_basic");
        let defined: Vec<String> = top_level_functions(&report.text)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert!(defined.contains(&target));
    }
}

#[test]
fn test_syntax_repaired_module_gets_structural_repair() {
    let pipeline = RepairPipeline::new();
    let first = pipeline.run(BROKEN_GENERATOR, AblationTier::Full);

    assert!(first.syntax_repair_invoked);
    assert!(first.residual_syntax_issue.is_none());
    assert!(is_valid(&first.text));
    assert_eq!(entry_alias_target(&first.text).as_deref(), Some("generate_basic"));
    assert!(first.text.contains("\"answer\": str(a)}"));
    assert!(first.text.starts_with("import random\n"));

    let second = pipeline.run(&first.text, AblationTier::Full);
    assert_eq!(second.text, first.text);
    assert_eq!(second.counters.regex_fixes, 0);
    assert_eq!(second.counters.ast_repairs, 0);
    assert_eq!(second.counters.logic_fixes, 0);
}

#[test]
fn test_correct_answer_gains_answer_with_equal_value() {
    let src = "def generate(level=1):\n    value = '42'\n    return {\"question_text\": 'q', \"correct_answer\": value}\n";
    let report = RepairPipeline::new().run(src, AblationTier::Structural);

    let dicts = dict_literals(&report.text);
    let result = dicts
        .iter()
        .find(|d| d.has_key("correct_answer"))
        .expect("result literal survives repair");
    let answer = result.get("answer").expect("answer key added");
    let synonym = result.get("correct_answer").unwrap();
    assert_eq!(
        &report.text[answer.value_start..answer.value_end],
        &report.text[synonym.value_start..synonym.value_end]
    );
}

#[test]
fn test_structural_repair_converts_tuple_and_drops_print() {
    let report = RepairPipeline::new().run(&extract_code(LLM_REPLY), AblationTier::Structural);

    assert!(report
        .text
        .contains("return {\"question_text\": question, \"answer\": str(a + b)}"));
    assert!(!report.text.contains("print(generate_basic())"));
    assert!(report.text.contains("check = check_answer"));
    assert_eq!(report.notes().len(), 4);
}
