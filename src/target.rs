//! Canonical and effective target resolution
//!
//! The canonical target uses the settings-file defaults without any
//! environment transform. The effective target applies the active suffixes
//! and name prefix to whatever the action did not set explicitly:
//!
//! | part     | explicit on action | otherwise                         |
//! |----------|--------------------|-----------------------------------|
//! | database | used verbatim      | `defaultDatabase` + `_suffix`     |
//! | schema   | used verbatim      | `defaultSchema` + `_suffix`       |
//! | name     | `prefix_` + name   | (name is always set)              |
//!
//! Declarations never receive the name prefix.

use crate::config::{ProjectConfig, ProjectSettings};
use crate::models::Target;

/// Which schema default an action falls back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRole {
    Table,
    Assertion,
    Declaration,
}

/// Per-action overrides as written in its config
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitTarget<'a> {
    pub database: Option<&'a str>,
    pub schema: Option<&'a str>,
    pub name: &'a str,
}

/// Effective and canonical target of one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub target: Target,
    pub canonical: Target,
}

#[derive(Debug, Clone, Copy)]
pub struct TargetResolver<'a> {
    active: &'a ProjectConfig,
    canonical: &'a ProjectConfig,
}

impl<'a> TargetResolver<'a> {
    pub fn new(settings: &'a ProjectSettings) -> Self {
        Self {
            active: &settings.active,
            canonical: &settings.canonical,
        }
    }

    pub fn resolve(&self, explicit: ExplicitTarget<'_>, role: TargetRole) -> ResolvedTargets {
        ResolvedTargets {
            target: resolve_with(self.active, explicit, role),
            canonical: resolve_with(self.canonical, explicit, role),
        }
    }

    /// Targets of a built-in assertion attached to `parent`
    ///
    /// The name is derived from the parent's canonical schema and name, so it
    /// is identical in every environment.
    pub fn builtin_assertion(
        &self,
        parent_canonical: &Target,
        parent_database: Option<&str>,
        discriminator: &str,
    ) -> ResolvedTargets {
        let name = builtin_assertion_name(parent_canonical, discriminator);
        self.resolve(
            ExplicitTarget {
                database: parent_database,
                schema: None,
                name: &name,
            },
            TargetRole::Assertion,
        )
    }
}

fn resolve_with(config: &ProjectConfig, explicit: ExplicitTarget<'_>, role: TargetRole) -> Target {
    let database = match explicit.database {
        Some(database) => Some(database.to_string()),
        None => config
            .default_database
            .as_deref()
            .map(|d| with_suffix(d, config.database_suffix.as_deref())),
    };

    let schema = match explicit.schema {
        Some(schema) => Some(schema.to_string()),
        None => {
            let default = match role {
                TargetRole::Assertion => Some(config.assertion_schema()),
                TargetRole::Table | TargetRole::Declaration => config.default_schema.as_deref(),
            };
            default.map(|s| with_suffix(s, config.schema_suffix.as_deref()))
        }
    };

    let name = match (role, config.table_prefix.as_deref()) {
        (TargetRole::Declaration, _) | (_, None) | (_, Some("")) => explicit.name.to_string(),
        (_, Some(prefix)) => format!("{}_{}", prefix, explicit.name),
    };

    Target {
        database,
        schema,
        name,
    }
}

fn with_suffix(value: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("{}_{}", value, suffix),
        _ => value.to_string(),
    }
}

/// `{schema}_{name}_assertions_{discriminator}`
pub fn builtin_assertion_name(parent: &Target, discriminator: &str) -> String {
    match &parent.schema {
        Some(schema) => format!("{}_{}_assertions_{}", schema, parent.name, discriminator),
        None => format!("{}_assertions_{}", parent.name, discriminator),
    }
}
