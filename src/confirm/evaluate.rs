//! Reply evaluators for confirmation prompts.

use crate::confirm::Evaluation;
use crate::models::checkpoint::VerifyMethod;

const AFFIRMATIONS: [&str; 4] = ["done", "approved", "ok", "yes"];

/// Extract a security code from a reply.
///
/// Collects every ASCII digit in the message and accepts when 4–8
/// digits were present, so replies like "The code is 048213 thanks"
/// qualify.
#[must_use]
pub fn security_code(text: &str) -> Evaluation {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if (4..=8).contains(&digits.len()) {
        Evaluation::Accept(digits)
    } else {
        Evaluation::Reject
    }
}

/// Accept a short affirmative reply ("done", "approved", "ok", "yes"),
/// case-insensitively.
#[must_use]
pub fn affirmation(text: &str) -> Evaluation {
    if AFFIRMATIONS.iter().any(|word| text.eq_ignore_ascii_case(word)) {
        Evaluation::AcceptText
    } else {
        Evaluation::Reject
    }
}

/// Evaluator for verification method selection.
///
/// Accepts a 1-based index into the choice list, or a case-insensitive
/// match against a choice's value or label; resolves to the choice's
/// value.
pub fn verify_method_choice(
    methods: &[VerifyMethod],
) -> impl Fn(&str) -> Evaluation + Send + Sync + '_ {
    move |text| {
        let normalized = text.trim();

        if let Ok(index) = normalized.parse::<usize>() {
            if (1..=methods.len()).contains(&index) {
                return Evaluation::Accept(methods[index - 1].value.clone());
            }
        }

        methods
            .iter()
            .find(|method| {
                method.value.eq_ignore_ascii_case(normalized)
                    || method.label.eq_ignore_ascii_case(normalized)
            })
            .map_or(Evaluation::Reject, |method| {
                Evaluation::Accept(method.value.clone())
            })
    }
}
