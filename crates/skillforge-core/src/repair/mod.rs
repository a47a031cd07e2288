//! Ablation-gated repair pipeline.
//!
//! The pipeline runs a fixed sequence of passes over extracted source text,
//! gated by [`AblationTier`]:
//!
//! - `Bare`: nothing runs; the text is returned unchanged.
//! - `Structural`: helper injection, hardening, entry-point normalisation
//!   and required-key repair. Fixes count towards `regex_fixes`.
//! - `Full`: additionally a corrective syntax repair (only when the text
//!   does not parse) and a logic check with paired repair. When the
//!   syntax repair makes the module parse, the structural passes run a
//!   second time over the repaired text.
//!
//! Every pass is a total function returning a [`PassOutcome`]. Outcomes
//! are kept in the [`RepairReport`] so skipped passes stay visible in the
//! experiment log.

pub mod answer_key;
pub mod entry_point;
pub mod hardening;
pub mod helpers;
pub mod logic;
pub mod syntax;

use serde::{Deserialize, Serialize};

use crate::domain::{AblationTier, FixCounters};
use crate::python::{first_syntax_error, SyntaxIssue};

pub use answer_key::RequiredKeyPass;
pub use entry_point::EntryPointPass;
pub use hardening::HardeningPass;
pub use helpers::HelperInjection;
pub use logic::{
    LogicChecker, LogicDiagnostic, LogicIssue, LogicRepair, LogicVerdict, RuleBasedLogicRepair,
    StaticLogicLinter,
};
pub use syntax::{HeuristicSyntaxRepair, SyntaxRepair};

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PassStatus {
    /// The pass changed the text.
    Applied,
    /// Nothing to do.
    Clean,
    /// The pass could not act; the text is unchanged.
    Skipped { reason: String },
}

impl std::fmt::Display for PassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassStatus::Applied => f.write_str("applied"),
            PassStatus::Clean => f.write_str("clean"),
            PassStatus::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Result of one repair pass: the new text and how many fixes it made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub text: String,
    pub fixes: u32,
    pub status: PassStatus,
}

impl PassOutcome {
    /// `Applied` when `fixes > 0`, `Clean` otherwise.
    pub fn applied(text: String, fixes: u32) -> Self {
        let status = if fixes > 0 {
            PassStatus::Applied
        } else {
            PassStatus::Clean
        };
        Self {
            text,
            fixes,
            status,
        }
    }

    pub fn clean(text: &str) -> Self {
        Self::applied(text.to_string(), 0)
    }

    pub fn skipped(text: &str, reason: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            fixes: 0,
            status: PassStatus::Skipped {
                reason: reason.into(),
            },
        }
    }
}

/// A tier-2 text rewrite.
pub trait StructuralPass: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, text: &str) -> PassOutcome;
}

/// Which counter a pass contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    Regex,
    Ast,
    Logic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRecord {
    pub pass: String,
    pub kind: FixKind,
    pub fixes: u32,
    pub status: PassStatus,
}

impl PassRecord {
    /// `<pass>: <status> (+<fixes>)`
    pub fn note(&self) -> String {
        format!("{}: {} (+{})", self.pass, self.status, self.fixes)
    }
}

/// Output of [`RepairPipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub text: String,
    pub counters: FixCounters,
    pub passes: Vec<PassRecord>,
    pub syntax_repair_invoked: bool,
    pub logic_repair_invoked: bool,
    /// Syntax problem still present after the single syntax-repair attempt.
    pub residual_syntax_issue: Option<SyntaxIssue>,
}

impl RepairReport {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            counters: FixCounters::default(),
            passes: Vec::new(),
            syntax_repair_invoked: false,
            logic_repair_invoked: false,
            residual_syntax_issue: None,
        }
    }

    fn record(&mut self, pass: &str, kind: FixKind, outcome: PassOutcome) {
        match kind {
            FixKind::Regex => self.counters.regex_fixes += outcome.fixes,
            FixKind::Ast => self.counters.ast_repairs += outcome.fixes,
            FixKind::Logic => self.counters.logic_fixes += outcome.fixes,
        }
        self.passes.push(PassRecord {
            pass: pass.to_string(),
            kind,
            fixes: outcome.fixes,
            status: outcome.status,
        });
        self.text = outcome.text;
    }

    /// One line per pass, as stored in the experiment log.
    pub fn notes(&self) -> Vec<String> {
        self.passes.iter().map(PassRecord::note).collect()
    }
}

/// The fixed tier-2 pass order.
pub fn structural_passes() -> Vec<Box<dyn StructuralPass>> {
    vec![
        Box::new(HelperInjection),
        Box::new(HardeningPass),
        Box::new(EntryPointPass),
        Box::new(RequiredKeyPass),
    ]
}

/// Tier-gated repair over extracted source text.
pub struct RepairPipeline {
    structural: Vec<Box<dyn StructuralPass>>,
    syntax: Box<dyn SyntaxRepair>,
    checker: Box<dyn LogicChecker>,
    logic: Box<dyn LogicRepair>,
}

impl Default for RepairPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RepairPipeline {
    pub fn new() -> Self {
        Self {
            structural: structural_passes(),
            syntax: Box::new(HeuristicSyntaxRepair),
            checker: Box::new(StaticLogicLinter),
            logic: Box::new(RuleBasedLogicRepair),
        }
    }

    pub fn with_syntax_repair(mut self, repair: impl SyntaxRepair + 'static) -> Self {
        self.syntax = Box::new(repair);
        self
    }

    pub fn with_logic(
        mut self,
        checker: impl LogicChecker + 'static,
        repair: impl LogicRepair + 'static,
    ) -> Self {
        self.checker = Box::new(checker);
        self.logic = Box::new(repair);
        self
    }

    /// The logic validator, also used to score the final text.
    pub fn checker(&self) -> &dyn LogicChecker {
        self.checker.as_ref()
    }

    fn run_structural(&self, report: &mut RepairReport) {
        for pass in &self.structural {
            let outcome = pass.apply(&report.text);
            report.record(pass.name(), FixKind::Regex, outcome);
        }
    }

    pub fn run(&self, text: &str, tier: AblationTier) -> RepairReport {
        let mut report = RepairReport::unchanged(text);
        if !tier.runs_structural() {
            return report;
        }

        self.run_structural(&mut report);

        if !tier.runs_semantic() {
            return report;
        }

        // Corrective only: a parseable text never reaches the repair routine.
        if let Some(issue) = first_syntax_error(&report.text) {
            report.syntax_repair_invoked = true;
            let outcome = self.syntax.repair(&report.text, &issue);
            let changed = outcome.fixes > 0;
            report.record(self.syntax.name(), FixKind::Ast, outcome);
            report.residual_syntax_issue = first_syntax_error(&report.text);

            // Structural passes skip broken subtrees; rerun them on the
            // repaired module.
            if changed && report.residual_syntax_issue.is_none() {
                self.run_structural(&mut report);
            }
        }

        let verdict = self.checker.check(&report.text);
        if !verdict.is_valid {
            report.logic_repair_invoked = true;
            let outcome = self.logic.repair(&report.text, &verdict.diagnostic);
            report.record(self.logic.name(), FixKind::Logic, outcome);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_status_follows_fix_count() {
        assert_eq!(PassOutcome::applied("x".into(), 2).status, PassStatus::Applied);
        assert_eq!(PassOutcome::applied("x".into(), 0).status, PassStatus::Clean);
        let skipped = PassOutcome::skipped("x", "nothing to wrap");
        assert_eq!(skipped.fixes, 0);
        assert_eq!(skipped.status.to_string(), "skipped: nothing to wrap");
    }

    #[test]
    fn bare_tier_is_identity() {
        let src = "def generate_basic(level=1):\n    return 1, 2\n";
        let report = RepairPipeline::new().run(src, AblationTier::Bare);
        assert_eq!(report.text, src);
        assert_eq!(report.counters, FixCounters::default());
        assert!(report.passes.is_empty());
    }

    #[test]
    fn structural_tier_records_every_pass_in_order() {
        let report = RepairPipeline::new().run("x = 1\n", AblationTier::Structural);
        let names: Vec<_> = report.passes.iter().map(|p| p.pass.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "inject_helpers",
                "harden_structure",
                "normalize_entry_point",
                "ensure_required_keys"
            ]
        );
        assert!(report.passes.iter().all(|p| p.kind == FixKind::Regex));
        assert_eq!(report.counters.ast_repairs, 0);
        assert_eq!(report.counters.logic_fixes, 0);
        assert_eq!(report.notes().len(), 4);
        assert!(report.notes()[0].starts_with("inject_helpers: applied (+"));
    }
}
