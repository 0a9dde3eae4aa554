//! Built-in rule evaluator.
//!
//! Reads entity attributes through `serde`, so any `Serialize` entity can be
//! checked by field name.

use crate::error::{GroupError, Result, RuleError};
use crate::options::RuleOptions;
use crate::traits::{RuleEvaluator, Verdict};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

/// Field must not be blank.
pub const PRESENCE: &str = "presence";
/// Field must be blank.
pub const ABSENCE: &str = "absence";
/// Field length must lie within `min` / `max`.
pub const LENGTH: &str = "length";
/// Field must match the `with` pattern.
pub const FORMAT: &str = "format";
/// Field must be an email address.
pub const EMAIL: &str = "email";

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        // RFC 5322 simplified email regex
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
        ).unwrap()
    })
}

/// Read a single attribute of a `Serialize` entity as JSON.
///
/// Unknown fields read as `null`.
pub fn attribute<E: Serialize>(entity: &E, field: &str) -> Result<Value> {
    let value = serde_json::to_value(entity)?;
    Ok(value.get(field).cloned().unwrap_or(Value::Null))
}

/// Blank: null, whitespace-only strings, empty arrays and empty objects.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn length_of(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Null => 0,
        other => other.to_string().chars().count(),
    }
}

/// Evaluator for the built-in rule kinds.
///
/// Every kind accepts a `message` parameter replacing its default message.
///
/// | kind       | parameters         | default message |
/// |------------|--------------------|-----------------|
/// | `presence` |                    | can't be blank |
/// | `absence`  |                    | must be blank |
/// | `length`   | `min`, `max`       | is too short / is too long |
/// | `format`   | `with` (regex)     | is invalid |
/// | `email`    |                    | is not a valid email |
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRules;

impl BuiltinRules {
    /// Create the built-in evaluator.
    pub fn new() -> Self {
        Self
    }
}

impl<E: Serialize> RuleEvaluator<E> for BuiltinRules {
    fn evaluate(
        &self,
        entity: &E,
        field: &str,
        kind: &str,
        options: &RuleOptions<E>,
    ) -> Result<Verdict> {
        let value = attribute(entity, field)?;
        let message = |default: String| {
            options
                .param("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(default)
        };

        let verdict = match kind {
            PRESENCE => {
                if is_blank(&value) {
                    Verdict::Fail(RuleError::new(PRESENCE, message("can't be blank".into())))
                } else {
                    Verdict::Pass
                }
            }
            ABSENCE => {
                if is_blank(&value) {
                    Verdict::Pass
                } else {
                    Verdict::Fail(RuleError::new(ABSENCE, message("must be blank".into())))
                }
            }
            LENGTH => {
                let min = usize_param(options, field, "min")?;
                let max = usize_param(options, field, "max")?;
                let len = length_of(&value);

                match (min, max) {
                    (Some(min), _) if len < min => Verdict::Fail(
                        RuleError::new(
                            LENGTH,
                            message(format!("is too short (minimum is {min} characters)")),
                        )
                        .param("min", min)
                        .param("actual", len),
                    ),
                    (_, Some(max)) if len > max => Verdict::Fail(
                        RuleError::new(
                            LENGTH,
                            message(format!("is too long (maximum is {max} characters)")),
                        )
                        .param("max", max)
                        .param("actual", len),
                    ),
                    _ => Verdict::Pass,
                }
            }
            FORMAT => {
                let pattern = options
                    .param("with")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        GroupError::invalid_option(field, "with", "format requires a pattern")
                    })?;
                let regex = Regex::new(pattern)
                    .map_err(|e| GroupError::invalid_option(field, "with", e.to_string()))?;

                match value.as_str() {
                    Some(s) if regex.is_match(s) => Verdict::Pass,
                    _ => Verdict::Fail(
                        RuleError::new(FORMAT, message("is invalid".into()))
                            .param("pattern", pattern),
                    ),
                }
            }
            EMAIL => match value.as_str() {
                Some(s) if email_regex().is_match(s) => Verdict::Pass,
                _ => Verdict::Fail(RuleError::new(
                    EMAIL,
                    message("is not a valid email".into()),
                )),
            },
            other => {
                return Err(GroupError::UnknownRuleKind {
                    field: field.to_string(),
                    kind: other.to_string(),
                })
            }
        };

        Ok(verdict)
    }
}

fn usize_param<E>(options: &RuleOptions<E>, field: &str, name: &str) -> Result<Option<usize>> {
    match options.param(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| GroupError::invalid_option(field, name, "expected a non-negative integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Default)]
    struct Signup {
        name: Option<String>,
        email: String,
        tags: Vec<String>,
    }

    fn check(signup: &Signup, field: &str, kind: &str, options: &RuleOptions<Signup>) -> Verdict {
        BuiltinRules.evaluate(signup, field, kind, options).unwrap()
    }

    #[test]
    fn presence_rejects_blank_values() {
        let options = RuleOptions::new();
        let mut signup = Signup {
            email: "   ".to_string(),
            ..Signup::default()
        };

        assert_eq!(
            check(&signup, "name", PRESENCE, &options),
            Verdict::fail("presence", "can't be blank")
        );
        assert!(!check(&signup, "email", PRESENCE, &options).is_pass());
        assert!(!check(&signup, "tags", PRESENCE, &options).is_pass());

        signup.name = Some("Dave".to_string());
        assert!(check(&signup, "name", PRESENCE, &options).is_pass());
    }

    #[test]
    fn absence_requires_blank_value() {
        let options = RuleOptions::new();
        let signup = Signup {
            name: Some("Dave".to_string()),
            ..Signup::default()
        };

        assert!(!check(&signup, "name", ABSENCE, &options).is_pass());
        assert!(check(&signup, "email", ABSENCE, &options).is_pass());
    }

    #[test]
    fn custom_message_replaces_default() {
        let options = RuleOptions::new().with_param("message", "is required");
        let signup = Signup::default();

        assert_eq!(
            check(&signup, "name", PRESENCE, &options),
            Verdict::fail("presence", "is required")
        );
    }

    #[test]
    fn length_bounds() {
        let options = RuleOptions::new().with_param("min", 3).with_param("max", 5);
        let mut signup = Signup {
            name: Some("Al".to_string()),
            ..Signup::default()
        };

        match check(&signup, "name", LENGTH, &options) {
            Verdict::Fail(error) => {
                assert_eq!(error.message, "is too short (minimum is 3 characters)");
                assert_eq!(error.params["actual"], 2);
            }
            Verdict::Pass => panic!("expected a length failure"),
        }

        signup.name = Some("Alice".to_string());
        assert!(check(&signup, "name", LENGTH, &options).is_pass());

        signup.name = Some("Alexandra".to_string());
        assert!(!check(&signup, "name", LENGTH, &options).is_pass());
    }

    #[test]
    fn length_rejects_malformed_bounds() {
        let options = RuleOptions::new().with_param("min", "three");
        let result = BuiltinRules.evaluate(&Signup::default(), "name", LENGTH, &options);
        assert!(matches!(result, Err(GroupError::InvalidOption { .. })));
    }

    #[test]
    fn format_matches_pattern() {
        let options = RuleOptions::new().with_param("with", r"^[A-Z][a-z]+$");
        let mut signup = Signup {
            name: Some("dave".to_string()),
            ..Signup::default()
        };

        assert!(!check(&signup, "name", FORMAT, &options).is_pass());
        signup.name = Some("Dave".to_string());
        assert!(check(&signup, "name", FORMAT, &options).is_pass());
    }

    #[test]
    fn format_requires_valid_pattern() {
        let missing = RuleOptions::new();
        let broken = RuleOptions::new().with_param("with", "([");
        let signup = Signup::default();

        assert!(BuiltinRules.evaluate(&signup, "name", FORMAT, &missing).is_err());
        assert!(BuiltinRules.evaluate(&signup, "name", FORMAT, &broken).is_err());
    }

    #[test]
    fn email_format() {
        let options = RuleOptions::new();
        let mut signup = Signup {
            email: "not-an-email".to_string(),
            ..Signup::default()
        };

        assert!(!check(&signup, "email", EMAIL, &options).is_pass());
        signup.email = "dave@example.com".to_string();
        assert!(check(&signup, "email", EMAIL, &options).is_pass());
    }

    #[test]
    fn unknown_kind_fails_fast() {
        let result =
            BuiltinRules.evaluate(&Signup::default(), "name", "uniqueness", &RuleOptions::new());
        assert!(matches!(result, Err(GroupError::UnknownRuleKind { ref kind, .. }) if kind == "uniqueness"));
    }

    #[test]
    fn attribute_reads_missing_field_as_null() {
        assert_eq!(attribute(&Signup::default(), "age").unwrap(), Value::Null);
    }
}
