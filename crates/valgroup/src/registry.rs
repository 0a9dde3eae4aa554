//! Per-entity-type store of validation groups and ungrouped rules.

use crate::group::{GroupBuilder, ValidationGroup};
use crate::options::RuleOptions;
use crate::rule::RuleSpec;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Entity-level rule registrar.
///
/// Every rule carries the group it belongs to, if any, so capture into a
/// group is decided by the caller and never by ambient state.
pub struct Registrar<E> {
    entries: Vec<(Option<String>, RuleSpec<E>)>,
}

impl<E> Registrar<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register an ungrouped rule.
    pub fn validates(&mut self, rule: RuleSpec<E>) -> &mut Self {
        self.validates_in(None, rule)
    }

    /// Register a rule into `group`, or as ungrouped when `group` is `None`.
    pub fn validates_in(&mut self, group: Option<&str>, rule: RuleSpec<E>) -> &mut Self {
        self.entries.push((group.map(str::to_string), rule));
        self
    }

    /// Number of rules registered so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(Option<String>, RuleSpec<E>)> {
        self.entries
    }
}

struct RegistryState<E> {
    groups: Vec<ValidationGroup<E>>,
    index: HashMap<String, usize>,
    ungrouped: Vec<Arc<RuleSpec<E>>>,
}

impl<E> RegistryState<E> {
    fn new() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
            ungrouped: Vec::new(),
        }
    }

    fn group_mut(&mut self, name: &str) -> &mut ValidationGroup<E> {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                self.groups.push(ValidationGroup::new(name));
                let position = self.groups.len() - 1;
                self.index.insert(name.to_string(), position);
                position
            }
        };
        &mut self.groups[position]
    }

    fn commit(&mut self, entries: Vec<(Option<String>, RuleSpec<E>)>) {
        for (group, rule) in entries {
            match group {
                Some(name) => self.group_mut(&name).push(rule),
                None => self.ungrouped.push(Arc::new(rule)),
            }
        }
    }
}

/// Point-in-time copy of a registry's groups and ungrouped rules.
pub struct RegistrySnapshot<E> {
    /// Groups in registration order
    pub groups: Vec<ValidationGroup<E>>,
    /// Rules declared outside any group
    pub ungrouped: Vec<Arc<RuleSpec<E>>>,
}

/// Store of validation groups and ungrouped rules for one entity type.
///
/// Declarations are serialized behind a lock: the rules of one declaration
/// are appended together, in order, once its callback has returned. Reads
/// hand out snapshots, so validation never holds the lock while rules run.
///
/// ## Example
///
/// ```rust,ignore
/// use valgroup::prelude::*;
///
/// let registry = GroupRegistry::<Person>::new();
/// registry.declare_group("name", RuleOptions::new(), |g| {
///     g.validates(RuleSpec::new("first_name", "presence"));
/// });
/// registry.validates(RuleSpec::new("sex", "presence"));
///
/// assert_eq!(registry.group_names(), vec!["name"]);
/// ```
pub struct GroupRegistry<E> {
    state: RwLock<RegistryState<E>>,
}

impl<E> GroupRegistry<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
        }
    }

    /// Declare a group, or append to it when the name is already declared.
    ///
    /// `defaults` are merged into the group's existing defaults: new keys are
    /// added and existing keys keep their first-declared value.
    pub fn declare_group<F>(&self, name: impl Into<String>, defaults: RuleOptions<E>, populate: F)
    where
        F: FnOnce(&mut GroupBuilder<E>),
    {
        let name = name.into();
        let mut builder = GroupBuilder::new(name.clone());
        populate(&mut builder);
        let entries = builder.into_registrar().into_entries();
        let declared = entries.len();

        let total = {
            let mut state = self.write();
            state.group_mut(&name).absorb_defaults(defaults);
            state.commit(entries);
            state.group_mut(&name).len()
        };

        debug!(group = %name, declared, total, "Validation group declared");
    }

    /// Register a rule outside any group.
    pub fn validates(&self, rule: RuleSpec<E>) {
        self.validates_in(None, rule);
    }

    /// Register a rule into `group`, or as ungrouped when `group` is `None`.
    pub fn validates_in(&self, group: Option<&str>, rule: RuleSpec<E>) {
        let mut registrar = Registrar::new();
        registrar.validates_in(group, rule);
        self.write().commit(registrar.into_entries());
    }

    /// Declared group names in registration order.
    pub fn group_names(&self) -> Vec<String> {
        self.read()
            .groups
            .iter()
            .map(|group| group.name().to_string())
            .collect()
    }

    /// Look up a group by name.
    pub fn resolve_group(&self, name: &str) -> Option<ValidationGroup<E>> {
        let state = self.read();
        state
            .index
            .get(name)
            .map(|&position| state.groups[position].clone())
    }

    /// Rules declared outside any group.
    pub fn ungrouped(&self) -> Vec<Arc<RuleSpec<E>>> {
        self.read().ungrouped.clone()
    }

    /// Copy of all groups and ungrouped rules.
    pub fn snapshot(&self) -> RegistrySnapshot<E> {
        let state = self.read();
        RegistrySnapshot {
            groups: state.groups.clone(),
            ungrouped: state.ungrouped.clone(),
        }
    }

    /// Total number of rules, grouped and ungrouped.
    pub fn rule_count(&self) -> usize {
        let state = self.read();
        state.ungrouped.len() + state.groups.iter().map(ValidationGroup::len).sum::<usize>()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState<E>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState<E>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for GroupRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for GroupRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("GroupRegistry")
            .field("groups", &state.groups)
            .field("ungrouped", &state.ungrouped.len())
            .finish()
    }
}
