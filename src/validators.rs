use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::controller::ErrorMessage;

/// Pure check mapping a field's text to an optional error message. Every
/// validator except `required` treats empty input as valid, so presence is
/// enforced in exactly one place.
pub type Rule = Arc<dyn Fn(&str) -> Option<ErrorMessage> + Send + Sync>;

pub fn required() -> Rule {
    Arc::new(|value| {
        if value.is_empty() {
            Some(Cow::Borrowed("This field is required"))
        } else {
            None
        }
    })
}

pub fn email() -> Rule {
    Arc::new(|value| {
        if value.is_empty() || is_email(value) {
            None
        } else {
            Some(Cow::Borrowed("Please enter a valid email address"))
        }
    })
}

pub fn min_length(min: usize) -> Rule {
    Arc::new(move |value| {
        if value.is_empty() || value.chars().count() >= min {
            None
        } else {
            Some(Cow::Owned(format!(
                "Must be at least {min} characters long"
            )))
        }
    })
}

pub fn max_length(max: usize) -> Rule {
    Arc::new(move |value| {
        if value.is_empty() || value.chars().count() <= max {
            None
        } else {
            Some(Cow::Owned(format!(
                "Must be no more than {max} characters long"
            )))
        }
    })
}

pub fn number() -> Rule {
    Arc::new(|value| {
        if value.is_empty() || parse_decimal(value).is_some() {
            None
        } else {
            Some(Cow::Borrowed("Must be a valid number"))
        }
    })
}

pub fn positive_number() -> Rule {
    Arc::new(|value| {
        if value.is_empty() {
            return None;
        }
        match parse_decimal(value) {
            Some(parsed) if parsed > Decimal::ZERO => None,
            _ => Some(Cow::Borrowed("Must be a positive number")),
        }
    })
}

pub fn phone() -> Rule {
    Arc::new(|value| {
        if value.is_empty() || is_phone(value) {
            None
        } else {
            Some(Cow::Borrowed("Please enter a valid phone number"))
        }
    })
}

/// Runs each rule left to right and stops at the first error, so composition
/// order determines which message the user sees.
pub fn combine(rules: impl IntoIterator<Item = Rule>) -> Rule {
    let rules: Vec<Rule> = rules.into_iter().collect();
    Arc::new(move |value| rules.iter().find_map(|rule| rule(value)))
}

// Mirrors lenient numeric coercion: surrounding whitespace is ignored, a
// blank string counts as zero, and exponent notation is accepted.
fn parse_decimal(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

// `local@domain.tld`: exactly one `@`, no whitespace, non-empty local part,
// and a dot strictly inside the domain part.
fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let domain = domain.as_bytes();
    domain.len() >= 3 && domain[1..domain.len() - 1].contains(&b'.')
}

// Optional leading `+`, then at least one of digit, whitespace, `-`, `(`, `)`.
fn is_phone(value: &str) -> bool {
    let rest = value.strip_prefix('+').unwrap_or(value);
    !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '(' | ')'))
}
