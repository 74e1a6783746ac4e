//! Action registry
//!
//! Append-only during the build phase. Every action is indexed by its bare
//! canonical name (for short-name lookups), by effective target and by
//! canonical target; built-in assertions are also indexed by their parent.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::models::{Action, DependencyReference, Target};

/// SQL of an action before placeholder rendering
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SqlTemplates {
    #[default]
    None,
    Table {
        query: String,
        /// Falls back to `query` when absent
        incremental_query: Option<String>,
        pre_ops: Vec<String>,
        post_ops: Vec<String>,
    },
    Operation {
        queries: Vec<String>,
    },
    Assertion {
        query: String,
    },
}

/// What the linker needs to finish an action
#[derive(Debug, Clone, Default)]
pub struct LinkSpec {
    /// Declared dependencies, in config order
    pub dependencies: Vec<DependencyReference>,
    pub depend_on_dependency_assertions: bool,
    pub templates: SqlTemplates,
    /// Render `${...}` placeholders; plain SQL files are copied as written
    pub interpolate: bool,
    /// The file's `js { }` blocks
    pub script: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisteredAction {
    pub action: Action,
    pub link: LinkSpec,
}

/// Outcome of a by-name lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(usize),
    Missing,
    /// Distinct effective targets of every candidate, in registration order
    Ambiguous(Vec<Target>),
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RegisteredAction>,
    by_name: HashMap<String, Vec<usize>>,
    by_target: IndexMap<Target, Vec<usize>>,
    by_canonical: IndexMap<Target, Vec<usize>>,
    assertions_by_parent: HashMap<Target, Vec<usize>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: Action, link: LinkSpec) -> usize {
        let index = self.entries.len();
        self.by_name
            .entry(action.canonical_target().name.clone())
            .or_default()
            .push(index);
        self.by_target
            .entry(action.target().clone())
            .or_default()
            .push(index);
        self.by_canonical
            .entry(action.canonical_target().clone())
            .or_default()
            .push(index);
        if let Some(parent) = action.parent_action() {
            self.assertions_by_parent
                .entry(parent.clone())
                .or_default()
                .push(index);
        }
        tracing::trace!(action = %action.target(), index, "registered action");
        self.entries.push(RegisteredAction { action, link });
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> &RegisteredAction {
        &self.entries[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut RegisteredAction {
        &mut self.entries[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredAction> {
        self.entries.iter()
    }

    /// Resolve a possibly partial reference
    ///
    /// Schema and database, when given, may match either the effective or the
    /// canonical target of a candidate.
    pub fn find(&self, reference: &DependencyReference) -> Lookup {
        let Some(candidates) = self.by_name.get(&reference.name) else {
            return Lookup::Missing;
        };

        let mut distinct: IndexMap<&Target, usize> = IndexMap::new();
        for &index in candidates {
            let action = &self.entries[index].action;
            let (target, canonical) = (action.target(), action.canonical_target());
            if part_matches(&reference.schema, &target.schema, &canonical.schema)
                && part_matches(&reference.database, &target.database, &canonical.database)
            {
                distinct.entry(target).or_insert(index);
            }
        }

        match distinct.len() {
            0 => Lookup::Missing,
            1 => Lookup::Found(distinct[0]),
            _ => Lookup::Ambiguous(distinct.into_keys().cloned().collect()),
        }
    }

    /// Built-in assertions whose parent has this effective target
    pub fn assertions_of(&self, parent: &Target) -> &[usize] {
        self.assertions_by_parent
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Effective targets shared by more than one action
    pub fn duplicate_targets(&self) -> impl Iterator<Item = (&Target, &[usize])> {
        duplicates(&self.by_target)
    }

    /// Canonical targets shared by more than one action
    pub fn duplicate_canonical_targets(&self) -> impl Iterator<Item = (&Target, &[usize])> {
        duplicates(&self.by_canonical)
    }

    /// First action registered under an effective target
    pub fn index_of(&self, target: &Target) -> Option<usize> {
        self.by_target.get(target).and_then(|i| i.first().copied())
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.entries.into_iter().map(|entry| entry.action).collect()
    }
}

fn part_matches(wanted: &Option<String>, effective: &Option<String>, canonical: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(_) => wanted == effective || wanted == canonical,
    }
}

fn duplicates(index: &IndexMap<Target, Vec<usize>>) -> impl Iterator<Item = (&Target, &[usize])> {
    index
        .iter()
        .filter(|(_, indices)| indices.len() > 1)
        .map(|(target, indices)| (target, indices.as_slice()))
}
