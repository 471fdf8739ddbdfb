//! Form-field validation
//!
//! A [`FormField`] holds the current text of an input and an optional regex.
//! Matching is a search, not a full match: anchor the pattern with `^...$`
//! when the whole value must conform.

use crate::Result;
use regex::Regex;

/// A named input field with optional pattern validation.
#[derive(Debug, Clone)]
pub struct FormField {
    name: String,
    value: String,
    pattern: Option<Regex>,
}

impl FormField {
    /// Field that accepts any value.
    pub fn new(name: impl Into<String>) -> Self {
        FormField {
            name: name.into(),
            value: String::new(),
            pattern: None,
        }
    }

    /// Field validated against `pattern`.
    ///
    /// # Errors
    ///
    /// [`SoundError::InvalidPattern`](crate::SoundError::InvalidPattern) if the
    /// pattern does not compile.
    pub fn with_pattern(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let mut field = Self::new(name);
        field.pattern = Some(Regex::new(pattern)?);
        Ok(field)
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the current value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Pattern source, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    /// Whether `candidate` satisfies the field's pattern (always true without one).
    pub fn is_valid(&self, candidate: &str) -> bool {
        self.pattern
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(candidate))
    }

    /// Whether the current value is valid.
    pub fn is_current_valid(&self) -> bool {
        self.is_valid(&self.value)
    }
}

impl Default for FormField {
    fn default() -> Self {
        Self::new("text")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoundError;

    #[test]
    fn test_without_pattern_everything_is_valid() {
        let field = FormField::default();
        assert_eq!(field.name(), "text");
        assert!(field.is_valid(""));
        assert!(field.is_valid("anything at all"));
        assert!(field.pattern().is_none());
    }

    #[test]
    fn test_pattern_is_searched_not_anchored() {
        let field = FormField::with_pattern("username", "[a-z]{3}").unwrap();
        assert!(field.is_valid("__abc__"));
        assert!(!field.is_valid("AB"));
    }

    #[test]
    fn test_anchored_pattern() {
        let mut field = FormField::with_pattern("email", r"^[^@\s]+@[^@\s]+\.[a-z]+$").unwrap();
        field.set_value("player@chessy.io");
        assert!(field.is_current_valid());

        field.set_value("player@@chessy");
        assert!(!field.is_current_valid());
        assert_eq!(field.value(), "player@@chessy");
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = FormField::with_pattern("password", "(unclosed").unwrap_err();
        assert!(matches!(err, SoundError::InvalidPattern(_)));
    }
}
