//! Validation contexts and how a run picks one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validation context applied to a run, e.g. `create` or `update`.
///
/// Rules tagged with an `on` option only run when the effective context of
/// the run equals their tag.
///
/// ## Example
///
/// ```rust,ignore
/// use valgroup::prelude::*;
///
/// let rule = RuleSpec::new("password", "presence").on(ValidationContext::Create);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationContext {
    /// Entity is being created
    Create,
    /// Entity already exists and is being updated
    Update,
    /// Custom context with a name
    Custom(String),
}

impl ValidationContext {
    /// Create a custom validation context.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the context name as a string.
    pub fn name(&self) -> &str {
        match self {
            ValidationContext::Create => "create",
            ValidationContext::Update => "update",
            ValidationContext::Custom(name) => name,
        }
    }
}

/// `create` and `update` map to their variants; any other name is kept as
/// given in [`ValidationContext::Custom`].
impl From<&str> for ValidationContext {
    fn from(s: &str) -> Self {
        match s {
            "create" => ValidationContext::Create,
            "update" => ValidationContext::Update,
            other => ValidationContext::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lifecycle state of an entity as seen by the context resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persistence {
    /// Not yet persisted
    New,
    /// Already persisted
    Persisted,
    /// The entity has no lifecycle concept
    #[default]
    Untracked,
}

impl Persistence {
    /// Lifecycle state from a plain persisted flag.
    pub fn from_persisted(persisted: bool) -> Self {
        if persisted {
            Self::Persisted
        } else {
            Self::New
        }
    }
}

/// The context a run actually applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveContext {
    /// No context: every rule runs regardless of its `on` tag
    Any,
    /// Only untagged rules and rules tagged with this context run
    Only(ValidationContext),
}

impl EffectiveContext {
    /// Check whether a rule tagged with `on` runs under this context.
    pub fn admits(&self, on: Option<&ValidationContext>) -> bool {
        match (self, on) {
            (_, None) => true,
            (EffectiveContext::Any, Some(_)) => true,
            (EffectiveContext::Only(current), Some(required)) => current == required,
        }
    }

    /// The resolved context, if any.
    pub fn context(&self) -> Option<&ValidationContext> {
        match self {
            EffectiveContext::Any => None,
            EffectiveContext::Only(context) => Some(context),
        }
    }
}

impl fmt::Display for EffectiveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveContext::Any => write!(f, "any"),
            EffectiveContext::Only(context) => write!(f, "{}", context),
        }
    }
}

/// Resolves the effective context of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextResolver;

impl ContextResolver {
    /// An explicit context is used verbatim; otherwise it is inferred from
    /// the entity's lifecycle state.
    pub fn resolve(
        explicit: Option<&ValidationContext>,
        persistence: Persistence,
    ) -> EffectiveContext {
        if let Some(context) = explicit {
            return EffectiveContext::Only(context.clone());
        }

        match persistence {
            Persistence::New => EffectiveContext::Only(ValidationContext::Create),
            Persistence::Persisted => EffectiveContext::Only(ValidationContext::Update),
            Persistence::Untracked => EffectiveContext::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_from_str() {
        assert_eq!(ValidationContext::from("create"), ValidationContext::Create);
        assert_eq!(ValidationContext::from("update"), ValidationContext::Update);
        assert_eq!(
            ValidationContext::from("import"),
            ValidationContext::Custom("import".to_string())
        );
    }

    #[test]
    fn custom_context_names_keep_their_case() {
        assert_eq!(
            ValidationContext::from("Import"),
            ValidationContext::custom("Import")
        );
        assert_eq!(
            ValidationContext::from("Update"),
            ValidationContext::custom("Update")
        );

        let resolved =
            ContextResolver::resolve(Some(&ValidationContext::from("Import")), Persistence::New);
        assert!(resolved.admits(Some(&ValidationContext::custom("Import"))));
        assert!(!resolved.admits(Some(&ValidationContext::custom("import"))));
    }

    #[test]
    fn context_name() {
        assert_eq!(ValidationContext::Create.name(), "create");
        assert_eq!(ValidationContext::Update.name(), "update");
        assert_eq!(ValidationContext::custom("review").name(), "review");
    }

    #[test]
    fn context_serialization() {
        let json = serde_json::to_string(&ValidationContext::Update).unwrap();
        assert_eq!(json, "\"update\"");

        let parsed: ValidationContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ValidationContext::Update);
    }

    #[test]
    fn explicit_context_wins() {
        let resolved =
            ContextResolver::resolve(Some(&ValidationContext::Create), Persistence::Persisted);
        assert_eq!(resolved, EffectiveContext::Only(ValidationContext::Create));
    }

    #[test]
    fn context_inferred_from_lifecycle() {
        assert_eq!(
            ContextResolver::resolve(None, Persistence::New),
            EffectiveContext::Only(ValidationContext::Create)
        );
        assert_eq!(
            ContextResolver::resolve(None, Persistence::Persisted),
            EffectiveContext::Only(ValidationContext::Update)
        );
        assert_eq!(
            ContextResolver::resolve(None, Persistence::Untracked),
            EffectiveContext::Any
        );
    }

    #[test]
    fn effective_context_admits() {
        let create = EffectiveContext::Only(ValidationContext::Create);
        assert!(create.admits(None));
        assert!(create.admits(Some(&ValidationContext::Create)));
        assert!(!create.admits(Some(&ValidationContext::Update)));

        assert!(EffectiveContext::Any.admits(Some(&ValidationContext::Update)));
        assert!(EffectiveContext::Any.admits(None));
    }
}
