//! Validation configuration of one entity type.

use crate::config::EngineConfig;
use crate::group::GroupBuilder;
use crate::options::RuleOptions;
use crate::registry::GroupRegistry;
use crate::rule::RuleSpec;
use crate::runner::Validation;
use crate::traits::{Lifecycle, RuleEvaluator};
use std::fmt;
use std::sync::Arc;

/// Registry, evaluator and configuration of one entity type.
///
/// Usually created once per type, at type-definition time, and shared by
/// every instance of the type (see [`Validatable`](crate::Validatable)).
///
/// ## Example
///
/// ```rust,ignore
/// use valgroup::prelude::*;
///
/// let validations = Validations::<Person>::new(BuiltinRules);
/// validations
///     .declare_group("first_name_group", RuleOptions::new(), |g| {
///         g.validates(RuleSpec::new("first_name", "presence"));
///     })
///     .validates(RuleSpec::new("sex", "presence"));
///
/// let mut validation = validations.validate(&person);
/// assert!(!validation.run_all(RunOptions::new())?);
/// ```
pub struct Validations<E> {
    registry: GroupRegistry<E>,
    evaluator: Arc<dyn RuleEvaluator<E>>,
    config: EngineConfig,
}

impl<E> Validations<E> {
    /// Create a configuration with the default engine settings.
    pub fn new(evaluator: impl RuleEvaluator<E> + 'static) -> Self {
        Self::with_config(evaluator, EngineConfig::default())
    }

    /// Create a configuration with explicit engine settings.
    pub fn with_config(evaluator: impl RuleEvaluator<E> + 'static, config: EngineConfig) -> Self {
        Self {
            registry: GroupRegistry::new(),
            evaluator: Arc::new(evaluator),
            config,
        }
    }

    /// The group registry of the type.
    pub fn registry(&self) -> &GroupRegistry<E> {
        &self.registry
    }

    /// The rule evaluator.
    pub fn evaluator(&self) -> &dyn RuleEvaluator<E> {
        self.evaluator.as_ref()
    }

    /// The engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Declare a group, or append to an existing one.
    pub fn declare_group<F>(
        &self,
        name: impl Into<String>,
        defaults: RuleOptions<E>,
        populate: F,
    ) -> &Self
    where
        F: FnOnce(&mut GroupBuilder<E>),
    {
        self.registry.declare_group(name, defaults, populate);
        self
    }

    /// Register a rule outside any group.
    pub fn validates(&self, rule: RuleSpec<E>) -> &Self {
        self.registry.validates(rule);
        self
    }

    /// Declared group names in registration order.
    pub fn group_names(&self) -> Vec<String> {
        self.registry.group_names()
    }

    /// Start a validation session on `entity`.
    pub fn validate<'a>(&'a self, entity: &'a E) -> Validation<'a, E>
    where
        E: Lifecycle,
    {
        Validation::new(self, entity)
    }
}

impl<E> fmt::Debug for Validations<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validations")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
