//! Collaborator contracts and the entity-level validation hooks.

use crate::aggregate::GroupedErrors;
use crate::context::Persistence;
use crate::error::{Result, RuleError};
use crate::options::RuleOptions;
use crate::runner::{RunOptions, Validation};
use crate::Validations;
use std::fmt;
use std::marker::PhantomData;

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The rule passed
    Pass,
    /// The rule failed with an error
    Fail(RuleError),
}

impl Verdict {
    /// Create a failing verdict.
    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Verdict::Fail(RuleError::new(code, message))
    }

    /// Check if the verdict is a pass.
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Evaluates a single rule against an entity.
///
/// The engine decides *whether* a rule runs (guards, context); the evaluator
/// decides whether it passes. An `Err` aborts the run.
///
/// ## Example
///
/// ```rust,ignore
/// use valgroup::prelude::*;
///
/// #[derive(Debug)]
/// struct PositiveBalance;
///
/// impl RuleEvaluator<Account> for PositiveBalance {
///     fn evaluate(
///         &self,
///         account: &Account,
///         field: &str,
///         _kind: &str,
///         _options: &RuleOptions<Account>,
///     ) -> Result<Verdict> {
///         if account.balance >= 0 {
///             Ok(Verdict::Pass)
///         } else {
///             Ok(Verdict::fail("positive", format!("{field} must be positive")))
///         }
///     }
/// }
/// ```
pub trait RuleEvaluator<E>: Send + Sync {
    /// Evaluate the rule `kind` on `field` with its effective options.
    fn evaluate(
        &self,
        entity: &E,
        field: &str,
        kind: &str,
        options: &RuleOptions<E>,
    ) -> Result<Verdict>;
}

/// Evaluator backed by a closure. Built with [`evaluator_fn`].
pub struct FnEvaluator<E, F> {
    f: F,
    _entity: PhantomData<fn(&E)>,
}

/// Wrap a closure as a [`RuleEvaluator`].
pub fn evaluator_fn<E, F>(f: F) -> FnEvaluator<E, F>
where
    F: Fn(&E, &str, &str, &RuleOptions<E>) -> Result<Verdict> + Send + Sync,
{
    FnEvaluator {
        f,
        _entity: PhantomData,
    }
}

impl<E, F> RuleEvaluator<E> for FnEvaluator<E, F>
where
    F: Fn(&E, &str, &str, &RuleOptions<E>) -> Result<Verdict> + Send + Sync,
{
    fn evaluate(
        &self,
        entity: &E,
        field: &str,
        kind: &str,
        options: &RuleOptions<E>,
    ) -> Result<Verdict> {
        (self.f)(entity, field, kind, options)
    }
}

impl<E, F> fmt::Debug for FnEvaluator<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvaluator").finish_non_exhaustive()
    }
}

/// Lifecycle query used to infer the validation context.
pub trait Lifecycle {
    /// Current lifecycle state. Entities without a lifecycle keep the default.
    fn persistence(&self) -> Persistence {
        Persistence::Untracked
    }
}

/// An entity type with a process-wide validation configuration.
///
/// ## Example
///
/// ```rust,ignore
/// use std::sync::OnceLock;
/// use valgroup::prelude::*;
///
/// impl Validatable for Person {
///     fn validations() -> &'static Validations<Self> {
///         static VALIDATIONS: OnceLock<Validations<Person>> = OnceLock::new();
///         VALIDATIONS.get_or_init(|| {
///             let v = Validations::new(BuiltinRules);
///             v.validates(RuleSpec::new("sex", "presence"));
///             v
///         })
///     }
/// }
///
/// assert!(!person.is_valid()?);
/// ```
pub trait Validatable: Lifecycle + Sized + 'static {
    /// The validation configuration of this type.
    fn validations() -> &'static Validations<Self>;
}

/// Validation entry points on entity instances.
pub trait ValidateExt: Validatable {
    /// Start a validation session on this instance.
    fn validation(&self) -> Validation<'_, Self> {
        Self::validations().validate(self)
    }

    /// Ordinary validity check: every ungrouped rule and every group.
    fn is_valid(&self) -> Result<bool> {
        self.validation().run_all(RunOptions::default())
    }

    /// Run a single group.
    fn group_valid(&self, name: &str) -> Result<bool> {
        self.validation().run_group(name, RunOptions::default())
    }

    /// Run several groups in order.
    fn groups_valid(&self, names: &[&str]) -> Result<bool> {
        self.validation().run_groups(names, RunOptions::default())
    }

    /// Failures of a full run, partitioned by group.
    fn grouped_errors(&self) -> Result<GroupedErrors> {
        self.validation().grouped_errors()
    }
}

impl<T: Validatable> ValidateExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: i64,
    }

    fn positive(
        counter: &Counter,
        field: &str,
        _kind: &str,
        _options: &RuleOptions<Counter>,
    ) -> Result<Verdict> {
        if counter.value > 0 {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::fail("positive", format!("{field} must be positive")))
        }
    }

    #[test]
    fn fn_evaluator_delegates() {
        let evaluator = evaluator_fn(positive);

        let options = RuleOptions::new();
        let pass = evaluator
            .evaluate(&Counter { value: 1 }, "value", "positive", &options)
            .unwrap();
        let fail = evaluator
            .evaluate(&Counter { value: 0 }, "value", "positive", &options)
            .unwrap();

        assert!(pass.is_pass());
        assert_eq!(fail, Verdict::fail("positive", "value must be positive"));
    }

    #[test]
    fn lifecycle_defaults_to_untracked() {
        struct Plain;
        impl Lifecycle for Plain {}

        assert_eq!(Plain.persistence(), Persistence::Untracked);
    }
}
