//! Running groups and rules against one entity instance.

use crate::aggregate::{ErrorAggregator, ErrorRecord, GroupedErrors};
use crate::config::UngroupedOrder;
use crate::context::{ContextResolver, EffectiveContext, ValidationContext};
use crate::error::{GroupError, Result, ValidationErrors};
use crate::group::ValidationGroup;
use crate::options::{OptionKey, RuleOptions};
use crate::rule::RuleSpec;
use crate::traits::{Lifecycle, Verdict};
use crate::Validations;
use std::sync::Arc;
use tracing::{debug, debug_span, trace, warn};

/// Options of a single run call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Explicit context; inferred from the entity's lifecycle when `None`
    pub context: Option<ValidationContext>,
}

impl RunOptions {
    /// Options with no explicit context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with an explicit context.
    pub fn with_context(context: impl Into<ValidationContext>) -> Self {
        Self {
            context: Some(context.into()),
        }
    }
}

/// A validation session on one entity instance.
///
/// The session owns the error snapshot of the instance. With the default
/// configuration every top-level run call starts a fresh snapshot; groups
/// evaluated within one call accumulate into it.
///
/// ## Example
///
/// ```rust,ignore
/// let mut validation = validations.validate(&person);
///
/// validation.run_group("name", RunOptions::with_context(ValidationContext::Update))?;
/// for (field, errors) in &validation.flat_errors().fields {
///     println!("{field}: {errors:?}");
/// }
/// ```
pub struct Validation<'a, E> {
    validations: &'a Validations<E>,
    entity: &'a E,
    errors: ErrorAggregator,
}

impl<'a, E: Lifecycle> Validation<'a, E> {
    /// Start a session on `entity`.
    pub fn new(validations: &'a Validations<E>, entity: &'a E) -> Self {
        Self {
            validations,
            entity,
            errors: ErrorAggregator::new(),
        }
    }

    /// The entity under validation.
    pub fn entity(&self) -> &'a E {
        self.entity
    }

    /// Run one group.
    ///
    /// Returns `true` if no rule of the group failed during this call.
    pub fn run_group(&mut self, name: &str, options: RunOptions) -> Result<bool> {
        let group = self.resolve(name)?;
        let context = self.effective_context(&options);
        let _span = debug_span!("run_group", group = name, context = %context).entered();

        self.transact(|this| this.evaluate_group(&group, &context))
    }

    /// Run several groups in the listed order.
    ///
    /// Every name is resolved before any rule runs, so an undeclared name
    /// leaves the error snapshot untouched.
    pub fn run_groups(&mut self, names: &[&str], options: RunOptions) -> Result<bool> {
        let groups = names
            .iter()
            .map(|name| self.resolve(name))
            .collect::<Result<Vec<_>>>()?;
        let context = self.effective_context(&options);
        let _span = debug_span!("run_groups", groups = ?names, context = %context).entered();

        self.transact(|this| {
            groups
                .iter()
                .try_for_each(|group| this.evaluate_group(group, &context))
        })
    }

    /// Run every ungrouped rule and every group.
    ///
    /// Groups run in registration order; ungrouped rules run first or last
    /// as configured.
    pub fn run_all(&mut self, options: RunOptions) -> Result<bool> {
        let snapshot = self.validations.registry().snapshot();
        let context = self.effective_context(&options);
        let _span = debug_span!("run_all", groups = snapshot.groups.len(), context = %context)
            .entered();

        let order = self.validations.config().ungrouped_order;

        self.transact(|this| {
            if order == UngroupedOrder::First {
                this.evaluate_ungrouped(&snapshot.ungrouped, &context)?;
            }
            for group in &snapshot.groups {
                this.evaluate_group(group, &context)?;
            }
            if order == UngroupedOrder::Last {
                this.evaluate_ungrouped(&snapshot.ungrouped, &context)?;
            }
            Ok(())
        })
    }

    /// All failures of the current snapshot keyed by field.
    pub fn flat_errors(&self) -> ValidationErrors {
        self.errors.flat()
    }

    /// Failures of the current snapshot partitioned by group.
    ///
    /// Runs every rule first when nothing has run yet.
    pub fn grouped_errors(&mut self) -> Result<GroupedErrors> {
        if !self.errors.has_run() {
            self.run_all(RunOptions::default())?;
        }
        Ok(self.errors.grouped())
    }

    /// The current error snapshot.
    pub fn errors(&self) -> &ErrorAggregator {
        &self.errors
    }

    /// Number of failures in the current snapshot.
    pub fn errors_count(&self) -> usize {
        self.errors.len()
    }

    /// Clear the error snapshot.
    pub fn reset(&mut self) {
        self.errors.reset();
    }

    /// Context a run with `options` applies to this entity.
    pub fn effective_context(&self, options: &RunOptions) -> EffectiveContext {
        ContextResolver::resolve(options.context.as_ref(), self.entity.persistence())
    }

    fn resolve(&self, name: &str) -> Result<ValidationGroup<E>> {
        self.validations.registry().resolve_group(name).ok_or_else(|| {
            warn!(group = name, "Validation group not declared");
            GroupError::GroupNotFound {
                group: name.to_string(),
                entity: std::any::type_name::<E>(),
            }
        })
    }

    /// Evaluate one run call. The snapshot is only updated when the whole
    /// call succeeds; a failed call leaves it as it was before.
    fn transact<F>(&mut self, evaluate: F) -> Result<bool>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let previous = self.errors.clone();
        if self.validations.config().reset_on_run {
            self.errors.reset();
        }
        self.errors.begin_run();
        let before = self.errors.len();

        if let Err(error) = evaluate(self) {
            debug!(error = %error, "Validation run aborted");
            self.errors = previous;
            return Err(error);
        }

        let failures = self.errors.len() - before;
        debug!(passed = failures == 0, failures, "Validation run finished");
        Ok(failures == 0)
    }

    fn evaluate_group(
        &mut self,
        group: &ValidationGroup<E>,
        context: &EffectiveContext,
    ) -> Result<()> {
        self.errors.mark_evaluated(Some(group.name()));
        for (rule, options) in group.effective_rules() {
            self.evaluate_rule(Some(group.name()), rule, &options, context)?;
        }
        Ok(())
    }

    fn evaluate_ungrouped(
        &mut self,
        rules: &[Arc<RuleSpec<E>>],
        context: &EffectiveContext,
    ) -> Result<()> {
        self.errors.mark_evaluated(None);
        for rule in rules {
            self.evaluate_rule(None, rule, rule.options(), context)?;
        }
        Ok(())
    }

    fn evaluate_rule(
        &mut self,
        group: Option<&str>,
        rule: &RuleSpec<E>,
        options: &RuleOptions<E>,
        context: &EffectiveContext,
    ) -> Result<()> {
        let field = rule.field();
        let kind = rule.kind();
        if let Some((key, reason)) = options.malformed() {
            return Err(GroupError::invalid_option(field, key, reason));
        }
        let unless = options
            .guard(&OptionKey::Unless)
            .map_err(malformed(field, OptionKey::Unless))?;
        let when = options
            .guard(&OptionKey::If)
            .map_err(malformed(field, OptionKey::If))?;
        let on = options
            .context()
            .map_err(malformed(field, OptionKey::On))?;

        if unless.is_some_and(|guard| guard.check(self.entity)) {
            trace!(field, kind, "Rule retired by unless guard");
            return Ok(());
        }
        if !when.map_or(true, |guard| guard.check(self.entity)) {
            trace!(field, kind, "Rule skipped by if guard");
            return Ok(());
        }
        if !context.admits(on.as_ref()) {
            trace!(field, kind, on = ?on, "Rule skipped for context");
            return Ok(());
        }

        match self
            .validations
            .evaluator()
            .evaluate(self.entity, field, kind, options)?
        {
            Verdict::Pass => trace!(field, kind, "Rule passed"),
            Verdict::Fail(error) => {
                trace!(field, kind, error = %error, "Rule failed");
                self.errors.record(ErrorRecord {
                    field: field.to_string(),
                    group: group.map(str::to_string),
                    error,
                });
            }
        }
        Ok(())
    }
}

fn malformed(field: &str, key: OptionKey) -> impl FnOnce(String) -> GroupError + '_ {
    move |reason| GroupError::invalid_option(field, key, reason)
}
