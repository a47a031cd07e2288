//! The authoring contract every generated skill module must satisfy.
//!
//! These names are shared by the prompt composer (which states the rules)
//! and the repair passes (which enforce the structural part of them).

/// Canonical entry point: `generate(level=1) -> dict`.
pub const ENTRY_POINT: &str = "generate";

/// Canonical answer checker: `check(user_answer, correct_answer)`.
pub const CHECKER: &str = "check";

/// Prefix of functions that may stand in for [`ENTRY_POINT`].
pub const ENTRY_PREFIX: &str = "generate_";

/// Prefix of functions that may stand in for [`CHECKER`].
pub const CHECKER_PREFIX: &str = "check_";

/// Preferred entry-point candidates, best first. Other `generate_*`
/// functions follow in source order.
pub const ENTRY_PREFERENCE: &[&str] = &["generate_basic", "generate_problem", "generate_question"];

pub const QUESTION_KEY: &str = "question_text";
pub const ANSWER_KEY: &str = "answer";

/// `(required key, synonym)` pairs; a synonym's value is copied into the
/// missing required key.
pub const KEY_SYNONYMS: &[(&str, &str)] = &[(ANSWER_KEY, "correct_answer"), (QUESTION_KEY, "question")];

/// Math markup delimiter for user-facing notation.
pub const MATH_DELIMITER: char = '$';

/// Opening of the answer-format hint that ends every question.
pub const HINT_OPEN: &str = "（答案格式：";
pub const HINT_CLOSE: &str = "）";

/// Target locale of all user-facing text.
pub const LOCALE: &str = "zh-TW";

/// Canonical CJK font for plotting configuration.
pub const CJK_FONT_FAMILY: &str = "Noto Sans CJK TC";

/// Helpers injected into every module. Generated code must call them and
/// never define them.
pub const RESERVED_HELPERS: &[&str] = &[
    "to_latex",
    "fmt_num",
    "clean_latex_output",
    "get_random_fraction",
    "is_prime",
    "get_random_int",
];

/// Format a complete answer hint.
pub fn answer_hint(description: &str) -> String {
    format!("{HINT_OPEN}{description}{HINT_CLOSE}")
}

/// The fixed authoring rules embedded in every composed prompt.
pub fn authoring_rules() -> String {
    let helpers = RESERVED_HELPERS.join(", ");
    format!(
        "[NON-NEGOTIABLE AUTHORING RULES]\n\
         1. Define exactly one entry point `def {ENTRY_POINT}(level=1):` returning a dict with \
         keys \"{QUESTION_KEY}\" and \"{ANSWER_KEY}\".\n\
         2. Define exactly one checker `def {CHECKER}(user_answer, correct_answer):`.\n\
         3. Wrap all mathematical notation shown to students in {d}...{d}. The value stored \
         under \"{ANSWER_KEY}\" must be plain text with no {d} markup.\n\
         4. End every question with the answer-format hint {hint}.\n\
         5. Write all student-facing text in Traditional Chinese ({LOCALE}). If you plot, set \
         the font family to '{CJK_FONT_FAMILY}' and disable axes.unicode_minus.\n\
         6. The helpers {helpers} are already available. Call them; never define, import or \
         redefine them.\n\
         7. Output one Python module only. No top-level prints, no demo calls, no \
         `if __name__ == \"__main__\":` block.\n",
        d = MATH_DELIMITER,
        hint = answer_hint("<format description>"),
    )
}
