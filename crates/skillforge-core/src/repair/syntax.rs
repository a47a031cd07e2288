//! Syntax repair, invoked only when the structurally repaired text does not
//! parse.

use std::sync::OnceLock;

use regex::Regex;

use super::PassOutcome;
use crate::python::SyntaxIssue;

/// A routine that patches a source which failed to parse.
///
/// Called at most once per attempt with the first syntax problem found.
/// Must be total: it returns the input unchanged when it cannot help.
pub trait SyntaxRepair: Send + Sync {
    fn name(&self) -> &'static str {
        "syntax_repair"
    }

    fn repair(&self, text: &str, issue: &SyntaxIssue) -> PassOutcome;
}

fn block_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:async\s+)?(?:def|class|if|elif|else|for|while|try|except|finally|with)\b")
            .unwrap()
    })
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Whether `line` has a `:` outside brackets and string literals, and
/// whether its brackets balance.
fn scan_line(line: &str) -> (bool, bool) {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut colon = false;
    for c in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ':' if depth == 0 => colon = true,
            '#' => break,
            _ => {}
        }
    }
    (colon, depth == 0 && quote.is_none())
}

/// Heuristic repairs for the defects LLM output most often has.
///
/// Each edit counts as one fix:
/// - markdown fence lines are dropped
/// - tab indentation is expanded to four spaces
/// - a block header followed by an indented body gets its missing `:`
/// - an unterminated triple-quoted string is closed at the end
pub struct HeuristicSyntaxRepair;

impl HeuristicSyntaxRepair {
    fn strip_fences(lines: &mut Vec<String>) -> u32 {
        let before = lines.len();
        lines.retain(|l| !l.trim_start().starts_with("```"));
        (before - lines.len()) as u32
    }

    fn expand_tabs(lines: &mut [String]) -> u32 {
        let mut fixes = 0;
        for line in lines.iter_mut() {
            let width = indent_width(line);
            if line[..width].contains('\t') {
                let indent = line[..width].replace('\t', "    ");
                *line = format!("{indent}{}", &line[width..]);
                fixes += 1;
            }
        }
        fixes
    }

    fn add_missing_colons(lines: &mut [String]) -> u32 {
        let mut fixes = 0;
        for i in 0..lines.len() {
            if !block_header().is_match(&lines[i]) {
                continue;
            }
            let trimmed = lines[i].trim_end();
            if trimmed.ends_with(':') || trimmed.ends_with('\\') || trimmed.contains('#') {
                continue;
            }
            let (has_colon, balanced) = scan_line(trimmed);
            if has_colon || !balanced {
                continue;
            }
            let next_indent = lines[i + 1..]
                .iter()
                .find(|l| !l.trim().is_empty())
                .map(|l| indent_width(l));
            if next_indent.is_some_and(|n| n > indent_width(&lines[i])) {
                let fixed = format!("{trimmed}:");
                lines[i] = fixed;
                fixes += 1;
            }
        }
        fixes
    }

    fn close_triple_quotes(text: &mut String) -> u32 {
        let mut fixes = 0;
        for quote in ["\"\"\"", "'''"] {
            if text.matches(quote).count() % 2 == 1 {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(quote);
                text.push('\n');
                fixes += 1;
            }
        }
        fixes
    }
}

impl SyntaxRepair for HeuristicSyntaxRepair {
    fn repair(&self, text: &str, issue: &SyntaxIssue) -> PassOutcome {
        tracing::debug!(issue = %issue, "attempting heuristic syntax repair");

        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        let mut fixes = Self::strip_fences(&mut lines);
        fixes += Self::expand_tabs(&mut lines);
        fixes += Self::add_missing_colons(&mut lines);

        let mut out = lines.join("\n");
        if text.ends_with('\n') && !out.is_empty() {
            out.push('\n');
        }
        fixes += Self::close_triple_quotes(&mut out);

        if fixes == 0 {
            return PassOutcome::skipped(text, format!("no heuristic applies to {issue}"));
        }
        PassOutcome::applied(out, fixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::{first_syntax_error, is_valid};

    fn repair(src: &str) -> PassOutcome {
        let issue = first_syntax_error(src).expect("fixture must be invalid");
        HeuristicSyntaxRepair.repair(src, &issue)
    }

    #[test]
    fn adds_missing_colons() {
        let src = "def generate(level=1)\n    if level > 1\n        return {}\n    else\n        return {}\n";
        let out = repair(src);
        assert_eq!(out.fixes, 3);
        assert!(is_valid(&out.text));
    }

    #[test]
    fn annotated_signature_is_not_touched() {
        let (colon, balanced) = scan_line("def f(x: int) -> str");
        assert!(!colon);
        assert!(balanced);
        let (colon, _) = scan_line("if x: return 1");
        assert!(colon);
    }

    #[test]
    fn strips_fences_and_tabs() {
        let src = "```python\ndef generate(level=1):\n\treturn {}\n```\n";
        let out = repair(src);
        assert_eq!(out.fixes, 3);
        assert_eq!(out.text, "def generate(level=1):\n    return {}\n");
    }

    #[test]
    fn closes_unterminated_docstring() {
        let src = "def generate(level=1):\n    \"\"\"Make a question.\n    return {}\n";
        let out = repair(src);
        assert_eq!(out.fixes, 1);
        assert!(is_valid(&out.text));
    }

    #[test]
    fn unfixable_input_is_returned_unchanged() {
        let src = "x = (1 +\n";
        let out = repair(src);
        assert_eq!(out.fixes, 0);
        assert_eq!(out.text, src);
    }
}
