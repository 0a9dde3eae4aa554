//! Named validation groups and the builder used to populate them.

use crate::options::RuleOptions;
use crate::registry::Registrar;
use crate::rule::RuleSpec;
use std::fmt;
use std::sync::Arc;

/// A named, append-only, ordered set of rules with shared default options.
pub struct ValidationGroup<E> {
    name: String,
    defaults: RuleOptions<E>,
    rules: Vec<Arc<RuleSpec<E>>>,
}

impl<E> ValidationGroup<E> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: RuleOptions::new(),
            rules: Vec::new(),
        }
    }

    /// The group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default options applied to every rule of the group.
    pub fn defaults(&self) -> &RuleOptions<E> {
        &self.defaults
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[Arc<RuleSpec<E>>] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the group has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules paired with their options after merging the group defaults.
    pub fn effective_rules(&self) -> impl Iterator<Item = (&RuleSpec<E>, RuleOptions<E>)> + '_ {
        self.rules
            .iter()
            .map(move |rule| (rule.as_ref(), rule.effective_options(&self.defaults)))
    }

    /// New keys are added; keys already present keep their first-declared value.
    pub(crate) fn absorb_defaults(&mut self, defaults: RuleOptions<E>) {
        self.defaults.fill_missing(defaults);
    }

    pub(crate) fn push(&mut self, rule: RuleSpec<E>) {
        self.rules.push(Arc::new(rule));
    }
}

impl<E> Clone for ValidationGroup<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            defaults: self.defaults.clone(),
            rules: self.rules.clone(),
        }
    }
}

impl<E> fmt::Debug for ValidationGroup<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationGroup")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Builder handed to a group declaration callback.
///
/// Rules added with [`GroupBuilder::validates`] or through [`GroupBuilder::handle`]
/// are captured into the group. Rules added through [`GroupBuilder::entity`] go
/// to the entity-level registrar and stay ungrouped.
///
/// ## Example
///
/// ```rust,ignore
/// validations.declare_group("name", RuleOptions::new().when(false), |g| {
///     g.validates(RuleSpec::new("first_name", "presence"));
///     g.handle().validates(RuleSpec::new("middle_name", "presence"));
///     g.entity().validates(RuleSpec::new("last_name", "presence"));
/// });
/// ```
pub struct GroupBuilder<E> {
    name: String,
    registrar: Registrar<E>,
}

impl<E> GroupBuilder<E> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registrar: Registrar::new(),
        }
    }

    /// Name of the group being declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a rule to the group.
    pub fn validates(&mut self, rule: RuleSpec<E>) -> &mut Self {
        self.registrar.validates_in(Some(&self.name), rule);
        self
    }

    /// Explicit handle on the group.
    pub fn handle(&mut self) -> GroupHandle<'_, E> {
        GroupHandle {
            group: &self.name,
            registrar: &mut self.registrar,
        }
    }

    /// The entity-level registrar. Rules added here are not captured.
    pub fn entity(&mut self) -> &mut Registrar<E> {
        &mut self.registrar
    }

    pub(crate) fn into_registrar(self) -> Registrar<E> {
        self.registrar
    }
}

/// Explicit handle on a group under declaration.
pub struct GroupHandle<'a, E> {
    group: &'a str,
    registrar: &'a mut Registrar<E>,
}

impl<E> GroupHandle<'_, E> {
    /// Name of the group.
    pub fn group(&self) -> &str {
        self.group
    }

    /// Add a rule to the group.
    pub fn validates(&mut self, rule: RuleSpec<E>) -> &mut Self {
        self.registrar.validates_in(Some(self.group), rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Guard, OptionKey};

    struct Person;

    fn captured(builder: GroupBuilder<Person>) -> Vec<(Option<String>, String)> {
        builder
            .into_registrar()
            .into_entries()
            .into_iter()
            .map(|(group, rule)| (group, rule.field().to_string()))
            .collect()
    }

    #[test]
    fn ambient_and_handle_capture_into_group() {
        let mut builder = GroupBuilder::new("name");
        builder.validates(RuleSpec::new("first_name", "presence"));
        builder
            .handle()
            .validates(RuleSpec::new("middle_name", "presence"));

        assert_eq!(
            captured(builder),
            vec![
                (Some("name".to_string()), "first_name".to_string()),
                (Some("name".to_string()), "middle_name".to_string()),
            ]
        );
    }

    #[test]
    fn entity_registrar_escapes_group() {
        let mut builder = GroupBuilder::new("name");
        builder.entity().validates(RuleSpec::new("last_name", "presence"));
        builder.validates(RuleSpec::new("first_name", "presence"));

        assert_eq!(
            captured(builder),
            vec![
                (None, "last_name".to_string()),
                (Some("name".to_string()), "first_name".to_string()),
            ]
        );
    }

    #[test]
    fn effective_rules_merge_defaults() {
        let mut group = ValidationGroup::<Person>::new("name");
        group.absorb_defaults(RuleOptions::new().when(false));
        group.push(RuleSpec::new("first_name", "presence"));
        group.push(RuleSpec::new("last_name", "presence").when(true));

        let guards: Vec<_> = group
            .effective_rules()
            .map(|(_, options)| options.guard(&OptionKey::If).unwrap().cloned())
            .collect();
        assert_eq!(guards, vec![Some(Guard::Never), Some(Guard::Always)]);
    }

    #[test]
    fn first_declared_default_wins() {
        let mut group = ValidationGroup::<Person>::new("name");
        group.absorb_defaults(RuleOptions::new().with_param("message", "first"));
        group.absorb_defaults(
            RuleOptions::new()
                .with_param("message", "second")
                .on("update"),
        );

        assert_eq!(
            group.defaults().param("message"),
            Some(&serde_json::json!("first"))
        );
        assert!(group.defaults().contains(&OptionKey::On));
    }
}
