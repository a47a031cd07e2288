//! Tree-sitter based model of generated Python modules.
//!
//! Provides:
//! - syntax validation (`validate_syntax`, `first_syntax_error`)
//! - top-level structure (`top_level_items`, `top_level_functions`,
//!   `top_level_bindings`)
//! - expression-level views used by the repair passes (`dict_literals`,
//!   `tuple_returns`)
//! - byte-range splicing (`Edit`, `apply_edits`)
//!
//! Every view is computed from the error-tolerant tree-sitter parse, so it
//! works on partially broken sources too. Items carry a `well_formed` flag;
//! rewrites only touch subtrees without parse errors.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser, Tree};

/// Node kinds tree-sitter accepts but CPython 3 rejects.
const LEGACY_STATEMENT_KINDS: &[&str] = &["print_statement", "exec_statement"];

/// Parse `src` with the Python grammar.
pub fn parse(src: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    if parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .is_err()
    {
        return None;
    }
    parser.parse(src, None)
}

fn node_text<'a>(node: Node<'_>, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Syntax validation
// ---------------------------------------------------------------------------

/// Location and description of the first syntax problem in a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxIssue {
    /// 1-based line.
    pub line: usize,
    /// 1-based byte column.
    pub column: usize,
    pub message: String,
}

impl fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.line, self.column, self.message)
    }
}

/// Result of the syntax validator: a binary verdict and score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxVerdict {
    pub is_valid: bool,
    /// 100 when valid, 0 otherwise. Never partial.
    pub score: u8,
    pub issue: Option<SyntaxIssue>,
}

/// Find the first syntax problem, in document order.
pub fn first_syntax_error(src: &str) -> Option<SyntaxIssue> {
    let Some(tree) = parse(src) else {
        return Some(SyntaxIssue {
            line: 1,
            column: 1,
            message: "python parser unavailable".to_string(),
        });
    };

    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        let message = if node.is_missing() {
            Some(format!("missing {}", node.kind()))
        } else if node.is_error() {
            let snippet: String = node_text(node, src).chars().take(24).collect();
            Some(format!("invalid syntax near {:?}", snippet.trim()))
        } else if LEGACY_STATEMENT_KINDS.contains(&node.kind()) {
            Some(format!("unsupported {}", node.kind().replace('_', " ")))
        } else {
            None
        };

        if let Some(message) = message {
            let pos = node.start_position();
            return Some(SyntaxIssue {
                line: pos.row + 1,
                column: pos.column + 1,
                message,
            });
        }

        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    None
}

pub fn is_valid(src: &str) -> bool {
    first_syntax_error(src).is_none()
}

/// The syntax validator.
pub fn validate_syntax(src: &str) -> SyntaxVerdict {
    let issue = first_syntax_error(src);
    let is_valid = issue.is_none();
    SyntaxVerdict {
        is_valid,
        score: if is_valid { 100 } else { 0 },
        issue,
    }
}

// ---------------------------------------------------------------------------
// Top-level structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Import,
    Function { name: String },
    Class { name: String },
    Assignment { targets: Vec<String> },
    /// A bare call statement, e.g. `print(x)` or `generate()`.
    Call { callee: String },
    /// `if __name__ == "__main__":`
    MainGuard,
    Comment,
    Docstring,
    Other,
}

/// One top-level statement with its byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelItem {
    pub kind: ItemKind,
    pub start: usize,
    pub end: usize,
    pub well_formed: bool,
}

/// A top-level function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

fn collect_identifiers(node: Node<'_>, src: &str, out: &mut Vec<String>) {
    if node.kind() == "identifier" {
        out.push(node_text(node, src).to_string());
        return;
    }
    // Subscript/attribute targets bind nothing at module level.
    if matches!(node.kind(), "subscript" | "attribute") {
        return;
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            collect_identifiers(child, src, out);
        }
    }
}

fn assignment_targets(node: Node<'_>, src: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut current = Some(node);
    while let Some(assign) = current.filter(|n| n.kind() == "assignment") {
        if let Some(left) = assign.child_by_field_name("left") {
            collect_identifiers(left, src, &mut targets);
        }
        current = assign.child_by_field_name("right");
    }
    targets
}

fn classify(node: Node<'_>, src: &str) -> ItemKind {
    match node.kind() {
        "import_statement" | "import_from_statement" | "future_import_statement" => {
            ItemKind::Import
        }
        "comment" => ItemKind::Comment,
        "function_definition" | "class_definition" => named_definition(node, src),
        "decorated_definition" => node
            .child_by_field_name("definition")
            .map(|def| named_definition(def, src))
            .unwrap_or(ItemKind::Other),
        "if_statement" => {
            let condition = node
                .child_by_field_name("condition")
                .map(|c| node_text(c, src))
                .unwrap_or("");
            if condition.contains("__name__") && condition.contains("__main__") {
                ItemKind::MainGuard
            } else {
                ItemKind::Other
            }
        }
        "expression_statement" => match node.named_child(0) {
            Some(inner) if inner.kind() == "assignment" => ItemKind::Assignment {
                targets: assignment_targets(inner, src),
            },
            Some(inner) if inner.kind() == "call" => ItemKind::Call {
                callee: inner
                    .child_by_field_name("function")
                    .map(|f| node_text(f, src).to_string())
                    .unwrap_or_default(),
            },
            Some(inner) if inner.kind() == "string" && node.named_child_count() == 1 => {
                ItemKind::Docstring
            }
            _ => ItemKind::Other,
        },
        _ => ItemKind::Other,
    }
}

fn named_definition(def: Node<'_>, src: &str) -> ItemKind {
    let name = def
        .child_by_field_name("name")
        .map(|n| node_text(n, src).to_string())
        .unwrap_or_default();
    if def.kind() == "class_definition" {
        ItemKind::Class { name }
    } else {
        ItemKind::Function { name }
    }
}

/// Top-level statements in source order.
pub fn top_level_items(src: &str) -> Vec<TopLevelItem> {
    let Some(tree) = parse(src) else {
        return Vec::new();
    };
    let root = tree.root_node();
    (0..root.named_child_count())
        .filter_map(|i| root.named_child(i))
        .map(|node| TopLevelItem {
            kind: classify(node, src),
            start: node.start_byte(),
            end: node.end_byte(),
            well_formed: !node.has_error(),
        })
        .collect()
}

/// Well-formed top-level function definitions, in source order.
pub fn top_level_functions(src: &str) -> Vec<FunctionDef> {
    top_level_items(src)
        .into_iter()
        .filter(|item| item.well_formed)
        .filter_map(|item| match item.kind {
            ItemKind::Function { name } => Some(FunctionDef {
                name,
                start: item.start,
                end: item.end,
            }),
            _ => None,
        })
        .collect()
}

/// Names bound at module level by `def`, `class` or assignment.
pub fn top_level_bindings(src: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for item in top_level_items(src) {
        match item.kind {
            ItemKind::Function { name } | ItemKind::Class { name } => {
                names.insert(name);
            }
            ItemKind::Assignment { targets } => names.extend(targets),
            _ => {}
        }
    }
    names
}

// ---------------------------------------------------------------------------
// Expression views
// ---------------------------------------------------------------------------

/// One `"key": value` pair of a dictionary literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    /// Key text without quotes; only plain string keys are listed.
    pub key: String,
    pub pair_end: usize,
    pub value_start: usize,
    pub value_end: usize,
    pub value_kind: String,
}

/// A dictionary literal with its string-keyed entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictLiteral {
    pub start: usize,
    pub end: usize,
    pub entries: Vec<DictEntry>,
    pub well_formed: bool,
}

impl DictLiteral {
    pub fn get(&self, key: &str) -> Option<&DictEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Value of a plain string literal, or `None` for f-strings, byte strings
/// and anything that is not a single string.
pub fn string_literal_value(text: &str) -> Option<&str> {
    let prefix_len = text
        .find(|c: char| c == '"' || c == '\'')
        .filter(|&i| i <= 2)?;
    let prefix = text[..prefix_len].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }
    let body = &text[prefix_len..];
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return Some(&body[quote.len()..body.len() - quote.len()]);
        }
    }
    None
}

/// Every dictionary literal in the module, outermost first.
pub fn dict_literals(src: &str) -> Vec<DictLiteral> {
    let Some(tree) = parse(src) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.kind() == "dictionary" {
            out.push(dict_literal(node, src));
        }
        for i in (0..node.named_child_count()).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push(child);
            }
        }
    }
    out
}

fn dict_literal(node: Node<'_>, src: &str) -> DictLiteral {
    let mut entries = Vec::new();
    for i in 0..node.named_child_count() {
        let Some(pair) = node.named_child(i).filter(|n| n.kind() == "pair") else {
            continue;
        };
        let (Some(key), Some(value)) = (
            pair.child_by_field_name("key"),
            pair.child_by_field_name("value"),
        ) else {
            continue;
        };
        if key.kind() != "string" {
            continue;
        }
        if let Some(key) = string_literal_value(node_text(key, src)) {
            entries.push(DictEntry {
                key: key.to_string(),
                pair_end: pair.end_byte(),
                value_start: value.start_byte(),
                value_end: value.end_byte(),
                value_kind: value.kind().to_string(),
            });
        }
    }
    DictLiteral {
        start: node.start_byte(),
        end: node.end_byte(),
        entries,
        well_formed: !node.has_error(),
    }
}

/// A `return a, b` (or `return (a, b)`) inside a top-level function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleReturn {
    pub function: String,
    /// Range of the returned expression, excluding the `return` keyword.
    pub value_start: usize,
    pub value_end: usize,
    pub elements: Vec<(usize, usize)>,
}

/// Two-element tuple returns in well-formed top-level functions.
pub fn tuple_returns(src: &str) -> Vec<TupleReturn> {
    let Some(tree) = parse(src) else {
        return Vec::new();
    };
    let root = tree.root_node();
    let mut out = Vec::new();
    for i in 0..root.named_child_count() {
        let Some(mut def) = root.named_child(i) else {
            continue;
        };
        if def.kind() == "decorated_definition" {
            match def.child_by_field_name("definition") {
                Some(inner) => def = inner,
                None => continue,
            }
        }
        if def.kind() != "function_definition" || def.has_error() {
            continue;
        }
        let name = def
            .child_by_field_name("name")
            .map(|n| node_text(n, src).to_string())
            .unwrap_or_default();
        if let Some(body) = def.child_by_field_name("body") {
            collect_tuple_returns(body, src, &name, &mut out);
        }
    }
    out
}

fn collect_tuple_returns(node: Node<'_>, src: &str, function: &str, out: &mut Vec<TupleReturn>) {
    if matches!(
        node.kind(),
        "function_definition" | "class_definition" | "lambda"
    ) {
        return;
    }
    if node.kind() == "return_statement" {
        if let Some(value) = node.named_child(0) {
            if matches!(value.kind(), "expression_list" | "tuple") && value.named_child_count() == 2
            {
                let elements = (0..2)
                    .filter_map(|i| value.named_child(i))
                    .map(|e| (e.start_byte(), e.end_byte()))
                    .collect();
                out.push(TupleReturn {
                    function: function.to_string(),
                    value_start: value.start_byte(),
                    value_end: value.end_byte(),
                    elements,
                });
            }
        }
        return;
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            collect_tuple_returns(child, src, function, out);
        }
    }
}

// ---------------------------------------------------------------------------
// Splicing
// ---------------------------------------------------------------------------

/// Replace `start..end` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Edit {
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::replace(start, end, String::new())
    }
}

/// Apply non-overlapping edits. Returns the new text and how many edits
/// were applied; an edit overlapping an earlier one is dropped.
pub fn apply_edits(src: &str, mut edits: Vec<Edit>) -> (String, usize) {
    edits.sort_by_key(|e| (e.start, e.end));
    let mut out = String::with_capacity(src.len());
    let mut cursor = 0;
    let mut applied = 0;
    for edit in edits {
        if edit.start < cursor || edit.end > src.len() || edit.start > edit.end {
            continue;
        }
        out.push_str(&src[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
        applied += 1;
    }
    out.push_str(&src[cursor..]);
    (out, applied)
}

/// Widen `start..end` to whole lines, including the trailing newline.
pub fn line_span(src: &str, start: usize, end: usize) -> (usize, usize) {
    let line_start = src[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = src[end..]
        .find('\n')
        .map(|i| end + i + 1)
        .unwrap_or(src.len());
    (line_start, line_end)
}
