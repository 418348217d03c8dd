//! Attribute validators run by `ValidateResourceConfig` and
//! `ValidateDataResourceConfig`
//!
//! Validators only look at known values of the type they understand. Null,
//! unknown and mistyped values pass through untouched; type errors are
//! reported by the schema check instead.

use crate::types::{Diagnostics, Dynamic};

pub trait Validator: Send + Sync {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics);
}

/// Reports `size` against optional inclusive bounds; `below` and `above`
/// phrase the violated bound for the summary
fn check_bounds<T: PartialOrd + std::fmt::Display + Copy>(
    attribute_path: &str,
    size: T,
    min: Option<T>,
    max: Option<T>,
    below: impl Fn(T) -> String,
    above: impl Fn(T) -> String,
    diagnostics: &mut Diagnostics,
) {
    if let Some(min) = min.filter(|min| size < *min) {
        diagnostics.add_error(
            format!("{} {}", attribute_path, below(min)),
            Some(format!("Got {}", size)),
        );
    }
    if let Some(max) = max.filter(|max| size > *max) {
        diagnostics.add_error(
            format!("{} {}", attribute_path, above(max)),
            Some(format!("Got {}", size)),
        );
    }
}

/// Bounds on the character count of a string
pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            check_bounds(
                attribute_path,
                s.chars().count(),
                self.min,
                self.max,
                |min| format!("must have minimum length of {}", min),
                |max| format!("must have maximum length of {}", max),
                diagnostics,
            );
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    /// Human readable form of the pattern, used in the error summary
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: &str, description: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: regex::Regex::new(pattern)?,
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        match value.as_string() {
            Some(s) if !self.pattern.is_match(s) => diagnostics.add_error(
                format!("{} must match {}", attribute_path, self.description),
                Some(format!("Value '{}' does not match {}", s, self.pattern.as_str())),
            ),
            _ => {}
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_number() {
            check_bounds(
                attribute_path,
                n,
                self.min,
                self.max,
                |min| format!("must be at least {}", min),
                |max| format!("must be at most {}", max),
                diagnostics,
            );
        }
    }
}

/// Bounds on the element count of a list attribute
pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Dynamic::List(items) = value {
            check_bounds(
                attribute_path,
                items.len(),
                self.min,
                self.max,
                |min| format!("must have at least {} items", min),
                |max| format!("must have at most {} items", max),
                diagnostics,
            );
        }
    }
}

/// Accepts only one of a fixed set of strings
pub struct OneOfValidator {
    pub allowed: Vec<String>,
}

impl OneOfValidator {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for OneOfValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        match value.as_string() {
            Some(s) if !self.allowed.iter().any(|allowed| allowed == s) => diagnostics.add_error(
                format!("{} must be one of: {}", attribute_path, self.allowed.join(", ")),
                Some(format!("Got '{}'", s)),
            ),
            _ => {}
        }
    }
}
