//! Rule options, guard predicates and the group-default merge.

use crate::context::ValidationContext;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Key of an entry in a rule's option bag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKey {
    /// Guard that must pass for the rule to run (`if`)
    If,
    /// Guard that retires the rule when it passes (`unless`)
    Unless,
    /// Context the rule applies to (`on`)
    On,
    /// Validator-specific parameter
    Param(String),
}

impl OptionKey {
    /// Create a parameter key.
    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }

    /// Get the key name as a string.
    pub fn name(&self) -> &str {
        match self {
            OptionKey::If => "if",
            OptionKey::Unless => "unless",
            OptionKey::On => "on",
            OptionKey::Param(name) => name,
        }
    }
}

impl From<&str> for OptionKey {
    fn from(s: &str) -> Self {
        match s {
            "if" => OptionKey::If,
            "unless" => OptionKey::Unless,
            "on" => OptionKey::On,
            other => OptionKey::Param(other.to_string()),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// A condition evaluated against the entity on every run.
///
/// Predicates are invoked on each evaluation and never memoized.
pub enum Guard<E> {
    /// Always passes
    Always,
    /// Never passes
    Never,
    /// Passes when the predicate returns true for the entity
    Predicate(Predicate<E>),
}

impl<E> Guard<E> {
    /// Create a guard from a predicate over the entity.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Evaluate the guard against an entity.
    pub fn check(&self, entity: &E) -> bool {
        match self {
            Guard::Always => true,
            Guard::Never => false,
            Guard::Predicate(f) => f(entity),
        }
    }
}

impl<E> From<bool> for Guard<E> {
    fn from(value: bool) -> Self {
        if value {
            Guard::Always
        } else {
            Guard::Never
        }
    }
}

impl<E> Clone for Guard<E> {
    fn clone(&self) -> Self {
        match self {
            Guard::Always => Guard::Always,
            Guard::Never => Guard::Never,
            Guard::Predicate(f) => Guard::Predicate(Arc::clone(f)),
        }
    }
}

impl<E> PartialEq for Guard<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Guard::Always, Guard::Always) | (Guard::Never, Guard::Never) => true,
            (Guard::Predicate(a), Guard::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<E> fmt::Debug for Guard<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Always => write!(f, "Guard::Always"),
            Guard::Never => write!(f, "Guard::Never"),
            Guard::Predicate(_) => write!(f, "Guard::Predicate(..)"),
        }
    }
}

/// Value stored in a rule's option bag.
pub enum OptionValue<E> {
    /// Guard predicate (`if`, `unless`)
    Guard(Guard<E>),
    /// Applicability context (`on`)
    Context(ValidationContext),
    /// Validator parameter
    Value(serde_json::Value),
    /// Parameter that failed to serialize; fails any run that evaluates it
    Malformed(String),
}

impl<E> OptionValue<E> {
    /// Serialize a validator parameter, keeping the failure if it does not serialize.
    pub fn param(value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => OptionValue::Value(value),
            Err(e) => OptionValue::Malformed(e.to_string()),
        }
    }
}

impl<E> Clone for OptionValue<E> {
    fn clone(&self) -> Self {
        match self {
            OptionValue::Guard(guard) => OptionValue::Guard(guard.clone()),
            OptionValue::Context(context) => OptionValue::Context(context.clone()),
            OptionValue::Value(value) => OptionValue::Value(value.clone()),
            OptionValue::Malformed(reason) => OptionValue::Malformed(reason.clone()),
        }
    }
}

impl<E> PartialEq for OptionValue<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OptionValue::Guard(a), OptionValue::Guard(b)) => a == b,
            (OptionValue::Context(a), OptionValue::Context(b)) => a == b,
            (OptionValue::Value(a), OptionValue::Value(b)) => a == b,
            (OptionValue::Malformed(a), OptionValue::Malformed(b)) => a == b,
            _ => false,
        }
    }
}

impl<E> fmt::Debug for OptionValue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Guard(guard) => guard.fmt(f),
            OptionValue::Context(context) => write!(f, "Context({})", context),
            OptionValue::Value(value) => write!(f, "Value({})", value),
            OptionValue::Malformed(reason) => write!(f, "Malformed({})", reason),
        }
    }
}

impl<E> From<Guard<E>> for OptionValue<E> {
    fn from(guard: Guard<E>) -> Self {
        OptionValue::Guard(guard)
    }
}

impl<E> From<ValidationContext> for OptionValue<E> {
    fn from(context: ValidationContext) -> Self {
        OptionValue::Context(context)
    }
}

impl<E> From<serde_json::Value> for OptionValue<E> {
    fn from(value: serde_json::Value) -> Self {
        OptionValue::Value(value)
    }
}

/// Option bag of a rule or of a group's defaults.
///
/// ## Example
///
/// ```rust,ignore
/// use valgroup::prelude::*;
///
/// let defaults = RuleOptions::<Person>::new()
///     .when(Guard::predicate(|p: &Person| p.last_name.is_none()))
///     .on(ValidationContext::Update);
/// ```
pub struct RuleOptions<E> {
    entries: BTreeMap<OptionKey, OptionValue<E>>,
}

impl<E> RuleOptions<E> {
    /// Create an empty option bag.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Set the `if` guard.
    pub fn when(self, guard: impl Into<Guard<E>>) -> Self {
        self.with(OptionKey::If, OptionValue::Guard(guard.into()))
    }

    /// Set the `unless` guard.
    pub fn unless(self, guard: impl Into<Guard<E>>) -> Self {
        self.with(OptionKey::Unless, OptionValue::Guard(guard.into()))
    }

    /// Set the `on` context.
    pub fn on(self, context: impl Into<ValidationContext>) -> Self {
        self.with(OptionKey::On, OptionValue::Context(context.into()))
    }

    /// Set a validator parameter.
    ///
    /// A value that fails to serialize is kept as [`OptionValue::Malformed`]
    /// and reported when the rule is evaluated.
    pub fn with_param(self, name: impl Into<String>, value: impl Serialize) -> Self {
        self.with(OptionKey::Param(name.into()), OptionValue::param(value))
    }

    /// Set an arbitrary entry.
    pub fn with(mut self, key: impl Into<OptionKey>, value: impl Into<OptionValue<E>>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an entry, returning the previous value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<OptionKey>,
        value: impl Into<OptionValue<E>>,
    ) -> Option<OptionValue<E>> {
        self.entries.insert(key.into(), value.into())
    }

    /// Get an entry.
    pub fn get(&self, key: &OptionKey) -> Option<&OptionValue<E>> {
        self.entries.get(key)
    }

    /// Get a validator parameter.
    pub fn param(&self, name: &str) -> Option<&serde_json::Value> {
        match self.entries.get(&OptionKey::param(name)) {
            Some(OptionValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Check whether the bag has an entry for the key.
    pub fn contains(&self, key: &OptionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over the keys in the bag.
    pub fn keys(&self) -> impl Iterator<Item = &OptionKey> {
        self.entries.keys()
    }

    /// Iterate over the entries in the bag.
    pub fn iter(&self) -> impl Iterator<Item = (&OptionKey, &OptionValue<E>)> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add entries from `other` whose keys are not present yet.
    ///
    /// Existing entries are kept, so the first value declared for a key wins.
    pub fn fill_missing(&mut self, other: RuleOptions<E>) {
        for (key, value) in other.entries {
            self.entries.entry(key).or_insert(value);
        }
    }

    /// Guard stored under `key`, or the reason it is malformed.
    pub(crate) fn guard(&self, key: &OptionKey) -> Result<Option<&Guard<E>>, String> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(OptionValue::Guard(guard)) => Ok(Some(guard)),
            Some(other) => Err(format!("expected a guard, found {:?}", other)),
        }
    }

    /// First entry holding a parameter that failed to serialize.
    pub(crate) fn malformed(&self) -> Option<(&OptionKey, &str)> {
        self.entries.iter().find_map(|(key, value)| match value {
            OptionValue::Malformed(reason) => Some((key, reason.as_str())),
            _ => None,
        })
    }

    /// Context stored under `on`, or the reason it is malformed.
    pub(crate) fn context(&self) -> Result<Option<ValidationContext>, String> {
        match self.entries.get(&OptionKey::On) {
            None => Ok(None),
            Some(OptionValue::Context(context)) => Ok(Some(context.clone())),
            Some(OptionValue::Value(serde_json::Value::String(name))) => {
                Ok(Some(ValidationContext::from(name.as_str())))
            }
            Some(other) => Err(format!("expected a context, found {:?}", other)),
        }
    }
}

impl<E> Default for RuleOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for RuleOptions<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<E> PartialEq for RuleOptions<E> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<E> fmt::Debug for RuleOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// Merge group defaults into a rule's options.
///
/// Keys the rule set explicitly keep the rule's value and the group value is
/// discarded. Every other key takes the group's value. The merge is pure and
/// idempotent.
pub fn merge_options<E>(
    defaults: &RuleOptions<E>,
    options: &RuleOptions<E>,
    explicit: &BTreeSet<OptionKey>,
) -> RuleOptions<E> {
    let mut merged = options.clone();
    for (key, value) in &defaults.entries {
        if explicit.contains(key) {
            continue;
        }
        merged.entries.insert(key.clone(), value.clone());
    }
    merged
}
