//! Error types for group validation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors that abort a validation call.
///
/// Failing rules are not errors: they are recorded as [`RuleError`]s and
/// evaluation continues.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("Validation group not found: {group} (entity: {entity})")]
    GroupNotFound { group: String, entity: &'static str },

    #[error("Invalid option '{key}' on field '{field}': {reason}")]
    InvalidOption {
        field: String,
        key: String,
        reason: String,
    },

    #[error("Unknown rule kind '{kind}' on field '{field}'")]
    UnknownRuleKind { field: String, kind: String },

    #[error("Attribute serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GroupError {
    pub(crate) fn invalid_option(
        field: impl Into<String>,
        key: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        GroupError::InvalidOption {
            field: field.into(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GroupError>;

/// Failure reported by a single rule evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleError {
    /// The rule kind that failed (e.g. "presence", "length")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional parameters for message interpolation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, serde_json::Value>,
}

impl RuleError {
    /// Create a new rule error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter to the error.
    pub fn param(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.params.insert(key.into(), v);
        }
        self
    }

    /// Interpolate parameters into the message.
    ///
    /// Replaces `{param_name}` placeholders with actual values.
    pub fn interpolate_message(&self) -> String {
        let mut result = self.message.clone();
        for (key, value) in &self.params {
            let placeholder = format!("{{{}}}", key);
            let replacement = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            result = result.replace(&placeholder, &replacement);
        }
        result
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.interpolate_message())
    }
}

impl std::error::Error for RuleError {}

/// Rule failures keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrors {
    /// Map of field name to list of errors for that field
    #[serde(flatten)]
    pub fields: HashMap<String, Vec<RuleError>>,
}

impl ValidationErrors {
    /// Create an empty validation errors collection.
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Add an error for a field.
    pub fn add(&mut self, field: impl Into<String>, error: RuleError) {
        self.fields.entry(field.into()).or_default().push(error);
    }

    /// Merge another ValidationErrors into this one.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, errors) in other.fields {
            self.fields.entry(field).or_default().extend(errors);
        }
    }

    /// Check if there are any errors.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get the total number of errors.
    pub fn len(&self) -> usize {
        self.fields.values().map(|v| v.len()).sum()
    }

    /// Get errors for a specific field.
    pub fn get(&self, field: &str) -> Option<&Vec<RuleError>> {
        self.fields.get(field)
    }

    /// Interpolated messages for a field, in evaluation order.
    pub fn messages(&self, field: &str) -> Vec<String> {
        self.fields
            .get(field)
            .map(|errors| errors.iter().map(RuleError::interpolate_message).collect())
            .unwrap_or_default()
    }

    /// Get all field names with errors, sorted.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: {} error(s)", self.len())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_error_with_params() {
        let error = RuleError::new("length", "is too short (minimum is {min} characters)")
            .param("min", 3);

        assert_eq!(
            error.interpolate_message(),
            "is too short (minimum is 3 characters)"
        );
        assert_eq!(
            error.to_string(),
            "[length] is too short (minimum is 3 characters)"
        );
    }

    #[test]
    fn validation_errors_add_and_get() {
        let mut errors = ValidationErrors::new();
        errors.add("email", RuleError::new("format", "is invalid"));
        errors.add("email", RuleError::new("presence", "can't be blank"));
        errors.add("age", RuleError::new("presence", "can't be blank"));

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("email").unwrap().len(), 2);
        assert_eq!(errors.messages("email"), vec!["is invalid", "can't be blank"]);
        assert!(errors.messages("name").is_empty());
        assert_eq!(errors.field_names(), vec!["age", "email"]);
    }

    #[test]
    fn validation_errors_merge() {
        let mut first = ValidationErrors::new();
        first.add("email", RuleError::new("format", "is invalid"));

        let mut second = ValidationErrors::new();
        second.add("email", RuleError::new("presence", "can't be blank"));
        second.add("age", RuleError::new("presence", "can't be blank"));

        first.merge(second);
        assert_eq!(first.len(), 3);
        assert_eq!(first.get("email").unwrap().len(), 2);
    }

    #[test]
    fn validation_errors_serialize_flat() {
        let mut errors = ValidationErrors::new();
        errors.add("sex", RuleError::new("presence", "can't be blank"));

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["sex"][0]["code"], "presence");
        assert_eq!(json["sex"][0]["message"], "can't be blank");
    }

    #[test]
    fn group_not_found_display() {
        let error = GroupError::GroupNotFound {
            group: "dummy".to_string(),
            entity: "Person",
        };
        assert_eq!(
            error.to_string(),
            "Validation group not found: dummy (entity: Person)"
        );
    }
}
