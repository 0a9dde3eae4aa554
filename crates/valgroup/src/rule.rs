//! Declared field rules.

use crate::context::ValidationContext;
use crate::options::{merge_options, Guard, OptionKey, OptionValue, RuleOptions};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// One field validation: the field, the validator kind and its options.
///
/// Options set through the builder methods are explicit and survive group
/// defaults. [`RuleSpec::with_default`] stores an inheritable value that a
/// group default replaces.
///
/// ## Example
///
/// ```rust,ignore
/// use valgroup::prelude::*;
///
/// let rule = RuleSpec::<User>::new("email", "format")
///     .with_param("with", r"^\S+@\S+$")
///     .unless(Guard::predicate(|u: &User| u.invited));
/// ```
pub struct RuleSpec<E> {
    field: String,
    kind: String,
    options: RuleOptions<E>,
    explicit: BTreeSet<OptionKey>,
}

impl<E> RuleSpec<E> {
    /// Create a rule with no options.
    pub fn new(field: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: kind.into(),
            options: RuleOptions::new(),
            explicit: BTreeSet::new(),
        }
    }

    /// Set the `if` guard explicitly.
    pub fn when(self, guard: impl Into<Guard<E>>) -> Self {
        self.with_option(OptionKey::If, OptionValue::Guard(guard.into()))
    }

    /// Set the `unless` guard explicitly.
    pub fn unless(self, guard: impl Into<Guard<E>>) -> Self {
        self.with_option(OptionKey::Unless, OptionValue::Guard(guard.into()))
    }

    /// Set the `on` context explicitly.
    pub fn on(self, context: impl Into<ValidationContext>) -> Self {
        self.with_option(OptionKey::On, OptionValue::Context(context.into()))
    }

    /// Set a validator parameter explicitly.
    pub fn with_param(self, name: impl Into<String>, value: impl Serialize) -> Self {
        self.with_option(OptionKey::Param(name.into()), OptionValue::param(value))
    }

    /// Set an option explicitly.
    pub fn with_option(
        mut self,
        key: impl Into<OptionKey>,
        value: impl Into<OptionValue<E>>,
    ) -> Self {
        let key = key.into();
        self.options.insert(key.clone(), value);
        self.explicit.insert(key);
        self
    }

    /// Set every option of `options` explicitly.
    pub fn with_options(mut self, options: RuleOptions<E>) -> Self {
        for key in options.keys() {
            self.explicit.insert(key.clone());
        }
        let mut merged = options;
        merged.fill_missing(self.options);
        self.options = merged;
        self
    }

    /// Set an inheritable option that group defaults may replace.
    pub fn with_default(
        mut self,
        key: impl Into<OptionKey>,
        value: impl Into<OptionValue<E>>,
    ) -> Self {
        let key = key.into();
        self.explicit.remove(&key);
        self.options.insert(key, value);
        self
    }

    /// The field being checked.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The validator kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The options as declared on the rule.
    pub fn options(&self) -> &RuleOptions<E> {
        &self.options
    }

    /// Keys set explicitly on the rule.
    pub fn explicit_keys(&self) -> &BTreeSet<OptionKey> {
        &self.explicit
    }

    /// Check whether `key` was set explicitly.
    pub fn is_explicit(&self, key: &OptionKey) -> bool {
        self.explicit.contains(key)
    }

    /// Options after merging the given group defaults.
    pub fn effective_options(&self, defaults: &RuleOptions<E>) -> RuleOptions<E> {
        merge_options(defaults, &self.options, &self.explicit)
    }
}

impl<E> Clone for RuleSpec<E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            kind: self.kind.clone(),
            options: self.options.clone(),
            explicit: self.explicit.clone(),
        }
    }
}

impl<E> fmt::Debug for RuleSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSpec")
            .field("field", &self.field)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("explicit", &self.explicit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Form;

    #[test]
    fn builder_marks_options_explicit() {
        let rule = RuleSpec::<Form>::new("name", "presence")
            .when(false)
            .with_param("message", "required");

        assert_eq!(rule.field(), "name");
        assert_eq!(rule.kind(), "presence");
        assert!(rule.is_explicit(&OptionKey::If));
        assert!(rule.is_explicit(&OptionKey::param("message")));
        assert!(!rule.is_explicit(&OptionKey::On));
    }

    #[test]
    fn with_options_marks_all_explicit() {
        let rule = RuleSpec::<Form>::new("name", "presence")
            .with_default("message", serde_json::json!("fallback"))
            .with_options(RuleOptions::new().unless(true).on("update"));

        assert!(rule.is_explicit(&OptionKey::Unless));
        assert!(rule.is_explicit(&OptionKey::On));
        assert!(!rule.is_explicit(&OptionKey::param("message")));
        assert_eq!(rule.options().len(), 3);
        assert_eq!(rule.explicit_keys().len(), 2);
    }

    #[test]
    fn defaults_do_not_override_explicit_guard() {
        let rule = RuleSpec::<Form>::new("name", "presence").when(false);
        let defaults = RuleOptions::new().when(true).on(ValidationContext::Create);

        let effective = rule.effective_options(&defaults);
        assert_eq!(effective.guard(&OptionKey::If).unwrap(), Some(&Guard::Never));
        assert_eq!(effective.context().unwrap(), Some(ValidationContext::Create));
    }

    #[test]
    fn defaults_replace_inherited_values() {
        let rule = RuleSpec::<Form>::new("name", "presence")
            .with_default("message", serde_json::json!("kind default"));
        let defaults = RuleOptions::new().with_param("message", "group message");

        let effective = rule.effective_options(&defaults);
        assert_eq!(
            effective.param("message"),
            Some(&serde_json::json!("group message"))
        );
    }
}
