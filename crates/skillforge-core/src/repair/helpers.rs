//! Reserved helper injection.
//!
//! Generated modules call the reserved helpers but must not define them.
//! This pass deletes any top-level redefinition and inserts the canonical
//! block once, right after the leading import header.

use super::{PassOutcome, StructuralPass};
use crate::contract::RESERVED_HELPERS;
use crate::python::{
    apply_edits, is_valid, line_span, top_level_functions, top_level_items, Edit, ItemKind,
};

pub const HELPERS_BEGIN: &str = "# --- skillforge helpers (begin) ---";
pub const HELPERS_END: &str = "# --- skillforge helpers (end) ---";

const HELPER_BODY: &str = r#"import math as _sf_math
import random as _sf_random
from fractions import Fraction as _SfFraction


def to_latex(value):
    if isinstance(value, _SfFraction):
        if value.denominator == 1:
            return str(value.numerator)
        sign = "-" if value < 0 else ""
        return sign + "\\frac{" + str(abs(value.numerator)) + "}{" + str(value.denominator) + "}"
    return fmt_num(value)


def fmt_num(value, digits=2):
    if isinstance(value, _SfFraction):
        return to_latex(value)
    if isinstance(value, float):
        if value.is_integer():
            return str(int(value))
        return ("{:." + str(digits) + "f}").format(value).rstrip("0").rstrip(".")
    return str(value)


def clean_latex_output(text):
    text = str(text).replace("$$", "$")
    while "  " in text:
        text = text.replace("  ", " ")
    return text.strip()


def get_random_fraction(max_denominator=10, proper=True):
    denominator = _sf_random.randint(2, max_denominator)
    upper = denominator - 1 if proper else denominator * 3
    return _SfFraction(_sf_random.randint(1, upper), denominator)


def is_prime(n):
    if n < 2:
        return False
    for divisor in range(2, _sf_math.isqrt(n) + 1):
        if n % divisor == 0:
            return False
    return True


def get_random_int(low, high, exclude=()):
    candidates = [n for n in range(low, high + 1) if n not in exclude]
    return _sf_random.choice(candidates)"#;

/// The full marker-bracketed helper block.
pub fn helper_block() -> String {
    format!("{HELPERS_BEGIN}\n{HELPER_BODY}\n{HELPERS_END}\n")
}

/// Byte range of an injected helper block, if present.
pub fn helper_block_range(text: &str) -> Option<(usize, usize)> {
    let begin = text.find(HELPERS_BEGIN)?;
    let end = text[begin..].find(HELPERS_END)? + begin + HELPERS_END.len();
    Some((begin, end))
}

/// End of the leading run of unindented `import`/`from` and comment
/// lines. Used when the module does not parse and the tree cannot be
/// trusted to expose the header.
fn import_lines_end(text: &str) -> usize {
    let mut end = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let next = offset + line.len();
        offset = next;
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with("import ") || line.starts_with("from ") || line.starts_with('#') {
            end = next;
        } else {
            break;
        }
    }
    end
}

/// End of the leading run of imports, comments and module docstring.
fn header_end(text: &str) -> usize {
    let mut end = 0;
    for item in top_level_items(text) {
        match item.kind {
            ItemKind::Import | ItemKind::Comment | ItemKind::Docstring => {
                end = line_span(text, item.start, item.end).1;
            }
            _ => break,
        }
    }
    if is_valid(text) {
        end
    } else {
        end.max(import_lines_end(text))
    }
}

pub struct HelperInjection;

impl StructuralPass for HelperInjection {
    fn name(&self) -> &'static str {
        "inject_helpers"
    }

    fn apply(&self, text: &str) -> PassOutcome {
        if helper_block_range(text).is_some() {
            return PassOutcome::clean(text);
        }

        let removals = top_level_functions(text)
            .into_iter()
            .filter(|f| RESERVED_HELPERS.contains(&f.name.as_str()))
            .map(|f| {
                let (start, end) = line_span(text, f.start, f.end);
                Edit::delete(start, end)
            })
            .collect();
        let (stripped, removed) = apply_edits(text, removals);

        let at = header_end(&stripped);
        let mut block = helper_block();
        if at > 0 {
            if !stripped[..at].ends_with('\n') {
                block.insert(0, '\n');
            }
            block.insert(0, '\n');
        }
        block.push('\n');
        let (injected, _) = apply_edits(&stripped, vec![Edit::insert(at, block)]);

        PassOutcome::applied(injected, removed as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::top_level_functions;

    #[test]
    fn helper_block_is_valid_python() {
        assert!(is_valid(&helper_block()));
        let names: Vec<_> = top_level_functions(&helper_block())
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, RESERVED_HELPERS);
    }

    #[test]
    fn block_lands_after_import_header() {
        let src = "import random\nfrom fractions import Fraction\n\ndef generate(level=1):\n    return {}\n";
        let out = HelperInjection.apply(src);
        assert_eq!(out.fixes, 1);
        let begin = out.text.find(HELPERS_BEGIN).unwrap();
        assert!(begin > out.text.find("from fractions").unwrap());
        assert!(begin < out.text.find("def generate").unwrap());
        assert!(is_valid(&out.text));
    }

    #[test]
    fn redefinitions_are_removed_and_counted() {
        let src = "import math\n\ndef is_prime(n):\n    return n > 1\n\ndef generate(level=1):\n    return {\"q\": is_prime(3)}\n";
        let out = HelperInjection.apply(src);
        assert_eq!(out.fixes, 2);
        assert_eq!(out.text.matches("def is_prime").count(), 1);
        let (begin, end) = helper_block_range(&out.text).unwrap();
        let at = out.text.find("def is_prime").unwrap();
        assert!(begin < at && at < end);
    }

    #[test]
    fn unparseable_module_keeps_imports_above_block() {
        let src = "import random\n\ndef generate_basic(level=1)\n    return random.randint(1, 9)\n";
        let out = HelperInjection.apply(src);
        assert!(out.text.starts_with("import random\n"));
        let begin = out.text.find(HELPERS_BEGIN).unwrap();
        assert!(begin < out.text.find("def generate_basic").unwrap());
    }

    #[test]
    fn module_without_imports_gets_block_first() {
        let out = HelperInjection.apply("x = 1\n");
        assert!(out.text.starts_with(HELPERS_BEGIN));
        assert!(out.text.ends_with("x = 1\n"));
    }

    #[test]
    fn present_block_is_a_no_op() {
        let once = HelperInjection.apply("import random\n").text;
        let twice = HelperInjection.apply(&once);
        assert_eq!(twice.fixes, 0);
        assert_eq!(twice.text, once);
    }
}
