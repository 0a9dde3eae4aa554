//! # valgroup
//!
//! Named validation groups for Rust entities. An entity type declares any
//! number of groups, each an ordered set of field rules with shared default
//! options, and callers validate one group, several groups, or everything.
//!
//! ## Example
//!
//! ```rust,ignore
//! use valgroup::prelude::*;
//!
//! #[derive(Serialize, Default)]
//! struct Person {
//!     first_name: Option<String>,
//!     last_name: Option<String>,
//! }
//!
//! impl Lifecycle for Person {}
//!
//! let validations = Validations::<Person>::new(BuiltinRules);
//! validations.declare_group(
//!     "name",
//!     RuleOptions::new().when(Guard::predicate(|p: &Person| p.last_name.is_none())),
//!     |g| {
//!         g.validates(RuleSpec::new("first_name", "presence"));
//!     },
//! );
//!
//! let person = Person::default();
//! let mut validation = validations.validate(&person);
//! assert!(!validation.run_group("name", RunOptions::new())?);
//! assert_eq!(validation.flat_errors().messages("first_name"), vec!["can't be blank"]);
//! ```
//!
//! ## Options
//!
//! - `if` / `unless` - guards evaluated against the entity on every run
//! - `on` - context the rule applies to (`create`, `update`, custom)
//! - anything else - parameters passed to the rule evaluator
//!
//! Group defaults apply to a rule unless the rule set the same option
//! explicitly; an explicit option always wins outright.

mod aggregate;
pub mod config;
mod context;
mod error;
mod group;
mod options;
mod registry;
mod rule;
pub mod rules;
mod runner;
mod traits;
mod validations;


pub use aggregate::{ErrorAggregator, ErrorRecord, GroupedErrors};
pub use config::{ConfigError, EngineConfig, UngroupedOrder};
pub use context::{ContextResolver, EffectiveContext, Persistence, ValidationContext};
pub use error::{GroupError, Result, RuleError, ValidationErrors};
pub use group::{GroupBuilder, GroupHandle, ValidationGroup};
pub use options::{merge_options, Guard, OptionKey, OptionValue, RuleOptions};
pub use registry::{GroupRegistry, Registrar, RegistrySnapshot};
pub use rule::RuleSpec;
pub use rules::BuiltinRules;
pub use runner::{RunOptions, Validation};
pub use traits::{
    evaluator_fn, FnEvaluator, Lifecycle, RuleEvaluator, Validatable, ValidateExt, Verdict,
};
pub use validations::Validations;

/// Prelude module for group validation
pub mod prelude {
    pub use crate::aggregate::GroupedErrors;
    pub use crate::context::{Persistence, ValidationContext};
    pub use crate::error::{GroupError, RuleError, ValidationErrors};
    pub use crate::options::{Guard, RuleOptions};
    pub use crate::rule::RuleSpec;
    pub use crate::rules::BuiltinRules;
    pub use crate::runner::{RunOptions, Validation};
    pub use crate::traits::{
        evaluator_fn, Lifecycle, RuleEvaluator, Validatable, ValidateExt, Verdict,
    };
    pub use crate::validations::Validations;
}
