mod affinity;
mod catalog;
mod context;
mod null_like;

pub use affinity::{Affinity, AffinityMismatchRule};
pub use catalog::{Rule, RuleCatalog, RuleDescriptor, ScopeKind, Violation};
pub use context::{RuleContext, SchemaSnapshot, TableSchema};
pub use null_like::{NotNullLikeStringRule, NullLikeStringRule, NullTokens, DEFAULT_LIKE_NULLS};

impl RuleCatalog {
    /// Catalog holding the built-in rules with default settings
    pub fn with_default_rules() -> Self {
        Self::builtin(&NullTokens::default())
    }

    /// Catalog holding the built-in rules, using `tokens` as null sentinels
    pub fn builtin(tokens: &NullTokens) -> Self {
        let mut catalog = Self::new();
        let rules: [Box<dyn Rule>; 3] = [
            Box::new(AffinityMismatchRule::new(tokens.clone())),
            Box::new(NullLikeStringRule::new(tokens.clone())),
            Box::new(NotNullLikeStringRule::new(tokens.clone())),
        ];
        for rule in rules {
            let registered = catalog.register(rule);
            debug_assert!(registered.is_ok(), "built-in rule ids are distinct");
        }
        catalog
    }
}
