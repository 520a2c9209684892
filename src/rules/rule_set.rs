use serenity::model::id::RoleId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, info};

use super::condition::RuleSpec;
use super::error::RuleError;
use super::filterable_message::FilterableMessage;
use super::group::PredicateGroup;

/// Outcome of registering a rule definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    /// `enabled` was false or absent; nothing was registered
    Disabled,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    description: Option<String>,
    root: PredicateGroup,
}

/// Named, compiled deletion rules
///
/// Only enabled rules are registered. Read-only once loaded, so a single
/// instance can be shared across pipeline runs.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: BTreeMap<String, CompiledRule>,
    max_depth: usize,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet {
    /// Default maximum group nesting level
    pub const DEFAULT_MAX_DEPTH: usize = 16;

    pub fn new() -> Self {
        Self::with_max_depth(Self::DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            rules: BTreeMap::new(),
            max_depth,
        }
    }

    /// Compile every definition, logging and skipping the ones that fail
    pub fn from_specs(specs: &BTreeMap<String, RuleSpec>, max_depth: usize) -> Self {
        let mut rule_set = Self::with_max_depth(max_depth);
        rule_set.load_all(specs);
        rule_set
    }

    /// Compile and register every definition
    ///
    /// Returns the number of registered rules.
    pub fn load_all(&mut self, specs: &BTreeMap<String, RuleSpec>) -> usize {
        for (name, spec) in specs {
            if let Err(err) = self.compile(name, spec) {
                error!(rule = %name, error = %err, "Failed to load rule");
            }
        }
        info!(count = self.rules.len(), "Loaded rules");
        self.rules.len()
    }

    /// Compile a rule definition and register it under `name`
    ///
    /// Disabled rules are skipped. A rule registered under the same name is replaced.
    pub fn compile(&mut self, name: &str, spec: &RuleSpec) -> Result<Registration, RuleError> {
        if !spec.enabled {
            info!(rule = %name, "Skipping disabled rule");
            return Ok(Registration::Disabled);
        }

        let root = PredicateGroup::compile(
            spec.conditions.operator.as_deref(),
            &spec.conditions.filters,
            1,
            self.max_depth,
        )?;

        self.rules.insert(
            name.to_string(),
            CompiledRule {
                description: spec.description.clone(),
                root,
            },
        );
        info!(rule = %name, "Loaded rule");

        Ok(Registration::Registered)
    }

    /// Check a message against one rule; unknown names never match
    pub fn matches<M: FilterableMessage>(
        &self,
        name: &str,
        message: &M,
        roles: Option<&[RoleId]>,
    ) -> bool {
        self.rules
            .get(name)
            .is_some_and(|rule| rule.root.matches(message, roles))
    }

    /// Names of every registered rule that matches the message
    pub fn matching_rule_names<M: FilterableMessage>(
        &self,
        message: &M,
        roles: Option<&[RoleId]>,
    ) -> BTreeSet<&str> {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.root.matches(message, roles))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.rules.get(name).and_then(|r| r.description.as_deref())
    }

    /// Whether the rule contains role predicates (and so needs member roles)
    pub fn needs_role_context(&self, name: &str) -> bool {
        self.rules.get(name).is_some_and(|r| r.root.uses_roles())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
