//! Declarative cascade rules applied when a record is removed.
//!
//! Each rule names a parent collection, a child collection and the child's
//! foreign-key field. `remove` consults the table for the parent being
//! removed and applies every matching rule uniformly.

use crate::record::CollectionName;

/// What happens to child records referencing a removed parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeAction {
    /// Remove the child record.
    Delete,
    /// Clear the reference (set to none, or drop the id from a list).
    Nullify,
    /// Refuse to remove the parent while any child references it.
    Reject,
}

/// One `(parent, child, field) -> action` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeRule {
    pub parent: CollectionName,
    pub child: CollectionName,
    pub field: &'static str,
    pub action: CascadeAction,
}

impl CascadeRule {
    pub const fn new(
        parent: CollectionName,
        child: CollectionName,
        field: &'static str,
        action: CascadeAction,
    ) -> Self {
        Self {
            parent,
            child,
            field,
            action,
        }
    }
}

/// The set of cascade rules a store enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeTable {
    rules: Vec<CascadeRule>,
}

impl CascadeTable {
    /// A table with no rules: removals never touch other records.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule, replacing any rule for the same parent, child and field.
    pub fn with_rule(mut self, rule: CascadeRule) -> Self {
        self.rules.retain(|r| {
            !(r.parent == rule.parent && r.child == rule.child && r.field == rule.field)
        });
        self.rules.push(rule);
        self
    }

    /// Rules triggered by removing a record from `parent`.
    pub fn rules_for(&self, parent: CollectionName) -> impl Iterator<Item = &CascadeRule> {
        self.rules.iter().filter(move |r| r.parent == parent)
    }

    /// Every rule, in declaration order.
    pub fn rules(&self) -> &[CascadeRule] {
        &self.rules
    }
}

impl Default for CascadeTable {
    /// The campaign companion's rules.
    fn default() -> Self {
        use CascadeAction::{Delete, Nullify};
        use CollectionName::*;

        let mut table = CascadeTable::empty();

        // Removing a campaign removes everything scoped to it.
        for child in [Characters, Locations, Items, Notes, Relationships] {
            table = table.with_rule(CascadeRule::new(Campaigns, child, "campaign_id", Delete));
        }

        // Relationships die with either endpoint.
        for parent in [Characters, Locations, Items] {
            table = table
                .with_rule(CascadeRule::new(parent, Relationships, "from", Delete))
                .with_rule(CascadeRule::new(parent, Relationships, "to", Delete))
                .with_rule(CascadeRule::new(parent, Notes, "linked_entities", Nullify));
        }

        table
            .with_rule(CascadeRule::new(Characters, Items, "owner", Nullify))
            .with_rule(CascadeRule::new(Locations, Characters, "location", Nullify))
            .with_rule(CascadeRule::new(Locations, Items, "location", Nullify))
            .with_rule(CascadeRule::new(Locations, Locations, "parent", Nullify))
    }
}
