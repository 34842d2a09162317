//! Field validation that reports every violation at once.
//!
//! A [Validator] collects one message per field and never short-circuits, so
//! a client can fix all of its mistakes after a single round trip. The free
//! functions are the predicates used with [Validator::check].

use std::{collections::BTreeMap, fmt::Display, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::Error;

static HEX_COLOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^#([a-fA-F0-9]{6}|[a-fA-F0-9]{3})$").expect("hex colour regex should be valid")
});

/// A map of field names to the message describing why the field is invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Errors holding a single `message` for `field`.
    pub fn for_field(field: &str, message: &str) -> Self {
        Self(BTreeMap::from([(field.to_owned(), message.to_owned())]))
    }

    /// The message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of fields with errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();

        write!(f, "{}", messages.join("; "))
    }
}

/// Accumulates field errors.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    /// Create a validator with no errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no errors have been recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record `message` for `field`.
    ///
    /// Only the first message for a field is kept.
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .0
            .entry(field.to_owned())
            .or_insert_with(|| message.to_owned());
    }

    /// Record `message` for `field` if `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    /// Finish validating.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] holding every recorded error if any check failed.
    pub fn finish(self) -> Result<(), Error> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

/// Whether `value` differs from its type's zero value (0, "", false, ...).
pub fn non_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value != T::default()
}

/// Whether `value` is at least `size` bytes long.
pub fn min_length(value: &str, size: usize) -> bool {
    value.len() >= size
}

/// Whether `value` is at most `size` bytes long.
pub fn max_length(value: &str, size: usize) -> bool {
    value.len() <= size
}

/// Whether `value` is one of `permitted_values`.
pub fn permitted_value<T: PartialEq>(value: &T, permitted_values: &[T]) -> bool {
    permitted_values.contains(value)
}

/// Whether `value` matches `regex`.
pub fn matches(value: &str, regex: &Regex) -> bool {
    regex.is_match(value)
}

/// Whether `color` is a `#RGB` or `#RRGGBB` hex colour.
pub fn hex_color(color: &str) -> bool {
    matches(color, &HEX_COLOR_REGEX)
}

/// Whether `left` and `right` are equal.
pub fn equal<T: PartialEq>(left: &T, right: &T) -> bool {
    left == right
}

#[cfg(test)]
mod predicate_tests {
    use regex::Regex;

    use super::{equal, hex_color, matches, max_length, min_length, non_zero, permitted_value};

    #[test]
    fn non_zero_rejects_default_values() {
        assert!(!non_zero(&0i64));
        assert!(!non_zero(&String::new()));
        assert!(non_zero(&-1i64));
        assert!(non_zero(&"a".to_owned()));
    }

    #[test]
    fn lengths_count_bytes() {
        // "é" is two bytes long.
        assert!(max_length("éé", 4));
        assert!(!max_length("ééé", 4));
        assert!(min_length("é", 2));
        assert!(!min_length("a", 2));
    }

    #[test]
    fn permitted_value_checks_membership() {
        assert!(permitted_value(&"cash", &["debit", "cash", "credit"]));
        assert!(!permitted_value(&"savings", &["debit", "cash", "credit"]));
    }

    #[test]
    fn hex_color_accepts_short_and_long_forms() {
        for color in ["#123", "#abcdef", "#ABCDEF", "#a1B2c3"] {
            assert!(hex_color(color), "{color} should be valid");
        }
    }

    #[test]
    fn hex_color_rejects_invalid_colors() {
        for color in ["", "123", "#12", "#1234", "#12345g", "#1234567", " #123", "#123 "] {
            assert!(!hex_color(color), "{color} should be invalid");
        }
    }

    #[test]
    fn matches_uses_regex() {
        let regex = Regex::new("^[a-z]+$").unwrap();

        assert!(matches("abc", &regex));
        assert!(!matches("abc1", &regex));
    }

    #[test]
    fn equal_compares_values() {
        assert!(equal(&1, &1));
        assert!(!equal(&"a", &"b"));
    }
}
