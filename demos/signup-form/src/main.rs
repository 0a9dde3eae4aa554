//! Signup form validated in stages
//!
//! A multi-step signup wizard validates each step with its own group and
//! runs everything before the account is saved:
//! - `account` step: email and password
//! - `profile` step: display name, only for people who opted into a public profile
//! - ungrouped: terms must be accepted (a custom `acceptance` rule kind)
//!
//! Run with: cargo run -p signup-form
//! Set `RUST_LOG=valgroup=debug` to see group declarations and runs.

use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;
use valgroup::prelude::*;
use valgroup::{rules, EngineConfig};

// ============================================
// Data Model
// ============================================

#[derive(Debug, Clone, Default, Serialize)]
struct Signup {
    email: Option<String>,
    password: Option<String>,
    display_name: Option<String>,
    public_profile: bool,
    accepted_terms: Option<bool>,
    #[serde(skip)]
    saved: bool,
}

impl Lifecycle for Signup {
    fn persistence(&self) -> Persistence {
        Persistence::from_persisted(self.saved)
    }
}

// ============================================
// Rule Evaluation
// ============================================

/// Built-in rules plus `acceptance`, which requires the field to be `true`.
fn signup_rules(
    signup: &Signup,
    field: &str,
    kind: &str,
    options: &RuleOptions<Signup>,
) -> valgroup::Result<Verdict> {
    match kind {
        "acceptance" => Ok(match rules::attribute(signup, field)? {
            Value::Bool(true) => Verdict::Pass,
            _ => Verdict::fail("acceptance", "must be accepted"),
        }),
        _ => BuiltinRules.evaluate(signup, field, kind, options),
    }
}

// ============================================
// Validation Groups
// ============================================

fn signup_validations(config: EngineConfig) -> Validations<Signup> {
    let validations = Validations::with_config(evaluator_fn(signup_rules), config);

    validations
        .declare_group("account", RuleOptions::new(), |g| {
            g.validates(RuleSpec::new("email", "presence"));
            g.validates(
                RuleSpec::new("email", "email").unless(Guard::predicate(|s: &Signup| s.email.is_none())),
            );
            g.validates(
                RuleSpec::new("password", "length")
                    .with_param("min", 8)
                    .with_param("max", 72)
                    .on(ValidationContext::Create),
            );
        })
        .declare_group(
            "profile",
            RuleOptions::new().when(Guard::predicate(|s: &Signup| s.public_profile)),
            |g| {
                let mut profile = g.handle();
                profile.validates(RuleSpec::new("display_name", "presence"));
                profile.validates(
                    RuleSpec::new("display_name", "format")
                        .with_param("with", r"^[A-Za-z0-9_]+$")
                        .with_param("message", "may only contain letters, digits and underscores"),
                );
            },
        )
        .validates(RuleSpec::new("accepted_terms", "acceptance"));

    validations
}

fn report(label: &str, errors: &ValidationErrors) -> Result<(), serde_json::Error> {
    println!("{label}: {}", serde_json::to_string_pretty(errors)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EngineConfig::from_env()?;
    info!(?config, "Loaded engine configuration");

    let validations = signup_validations(config);
    info!(groups = ?validations.group_names(), "Declared validation groups");

    let mut signup = Signup {
        email: Some("dave@example".to_string()),
        password: Some("hunter2".to_string()),
        public_profile: true,
        display_name: Some("dave smith".to_string()),
        ..Signup::default()
    };

    // Step one of the wizard
    let mut validation = validations.validate(&signup);
    if !validation.run_group("account", RunOptions::new())? {
        report("account step", &validation.flat_errors())?;
    }

    // Only the account group ran, so it is the only group reported
    let grouped = validation.grouped_errors()?;
    for (group, errors) in grouped.iter() {
        report(group.unwrap_or("ungrouped"), errors)?;
    }

    signup.email = Some("dave@example.com".to_string());
    signup.password = Some("correct horse battery".to_string());
    signup.display_name = Some("dave_smith".to_string());
    signup.accepted_terms = Some(true);

    let mut validation = validations.validate(&signup);
    let valid = validation.run_all(RunOptions::new())?;
    info!(valid, errors = validation.errors_count(), "Full signup check");

    // Saved accounts skip create-only rules
    signup.saved = true;
    signup.password = None;
    let mut validation = validations.validate(&signup);
    let valid = validation.run_groups(&["account", "profile"], RunOptions::new())?;
    info!(
        valid,
        context = %validation.effective_context(&RunOptions::new()),
        "Update check"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_must_be_accepted() {
        let validations = signup_validations(EngineConfig::default());
        let mut signup = Signup::default();

        for (accepted, expected) in [(None, false), (Some(false), false), (Some(true), true)] {
            signup.accepted_terms = accepted;
            let mut validation = validations.validate(&signup);
            validation.run_all(RunOptions::new()).unwrap();
            assert_eq!(
                validation.flat_errors().get("accepted_terms").is_none(),
                expected,
                "accepted_terms = {accepted:?}"
            );
        }
    }

    #[test]
    fn grouped_errors_after_one_step_report_that_step() {
        let validations = signup_validations(EngineConfig::default());
        let signup = Signup::default();
        let mut validation = validations.validate(&signup);
        validation.run_group("account", RunOptions::new()).unwrap();

        let grouped = validation.grouped_errors().unwrap();
        assert!(grouped.group("account").is_some());
        assert!(grouped.group("profile").is_none());
        assert!(grouped.ungrouped().is_none());
    }
}
