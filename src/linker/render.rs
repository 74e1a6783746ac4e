//! `${...}` placeholder rendering
//!
//! Reference helpers (`ref`, `resolve`, `self` and friends), `when`,
//! `incremental` and project-config lookups are evaluated here. Any other
//! expression goes to the script evaluator with the file's `js` blocks as
//! preamble.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::compiler::script::{ScriptContext, ScriptEvaluator, ScriptPurpose};
use crate::config::ProjectConfig;
use crate::models::{DependencyReference, Target};
use crate::parser::literal::{self, Expr};
use crate::parser::template::{self, Segment};
use crate::registry::{Lookup, Registry};

use super::ambiguous_message;

/// Side results of rendering one action
#[derive(Debug, Default)]
pub(crate) struct RenderOutput {
    /// Targets referenced through `ref(...)`, with their per-site flag
    pub refs: Vec<(Target, Option<bool>)>,
    pub errors: Vec<String>,
}

pub(crate) struct Renderer<'a> {
    pub registry: &'a Registry,
    pub config: &'a ProjectConfig,
    pub evaluator: &'a dyn ScriptEvaluator,
    pub includes: &'a BTreeMap<String, String>,
    pub file_name: &'a str,
    pub self_target: &'a Target,
    pub script: Option<&'a str>,
    pub incremental: bool,
}

impl Renderer<'_> {
    /// Render a template, recording references and errors in `out`
    pub fn render(&self, template: &str, out: &mut RenderOutput) -> String {
        self.expand(template, false, out)
    }

    /// Expand placeholders; text of a template literal also has its escapes resolved
    fn expand(&self, template: &str, literal_text: bool, out: &mut RenderOutput) -> String {
        let segments = match template::segments(template) {
            Ok(segments) => segments,
            Err(err) => {
                out.errors.push(err.to_string());
                return template.to_string();
            }
        };

        let mut sql = String::with_capacity(template.len());
        for segment in segments {
            match segment {
                Segment::Text(text) if literal_text => sql.push_str(&literal::unescape(&text)),
                Segment::Text(text) => sql.push_str(&text),
                Segment::Placeholder(source) => {
                    let value = self.placeholder(&source, out);
                    push_value(&mut sql, &value);
                }
            }
        }
        sql
    }

    fn placeholder(&self, source: &str, out: &mut RenderOutput) -> Value {
        if let Ok(expr) = literal::parse_expression(source) {
            if self.is_native(&expr) {
                return self.eval(&expr, out);
            }
        }

        let context = ScriptContext {
            file_name: self.file_name,
            purpose: ScriptPurpose::Interpolation,
            project_config: self.config,
            includes: self.includes,
            self_target: Some(self.self_target),
            incremental: self.incremental,
            preamble: self.script,
        };
        match self.evaluator.evaluate(source, &context) {
            Ok(value) => value,
            Err(err) => {
                out.errors
                    .push(format!("Error evaluating \"${{{}}}\": {}", source.trim(), err));
                Value::Null
            }
        }
    }

    fn is_native(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) | Expr::Template(_) => true,
            Expr::Array(items) => items.iter().all(|e| self.is_native(e)),
            Expr::Object(entries) => entries.iter().all(|(_, e)| self.is_native(e)),
            Expr::Call(callee, args) => match callee.path().as_deref() {
                Some(["ref"]) | Some(["resolve"]) => reference_from_args(args).is_some(),
                Some(["self"]) | Some(["name"]) | Some(["schema"]) | Some(["database"])
                | Some(["incremental"]) => args.is_empty(),
                Some(["when"]) => {
                    (2..=3).contains(&args.len()) && args.iter().all(|e| self.is_native(e))
                }
                _ => false,
            },
            Expr::Ident(_) | Expr::Member(..) => config_lookup(expr).is_some(),
        }
    }

    fn eval(&self, expr: &Expr, out: &mut RenderOutput) -> Value {
        match expr {
            Expr::Template(raw) => Value::String(self.expand(raw, true, out)),
            Expr::Array(items) => Value::Array(items.iter().map(|e| self.eval(e, out)).collect()),
            Expr::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, e)| (key.clone(), self.eval(e, out)))
                    .collect(),
            ),
            Expr::Call(callee, args) => self.call(callee, args, out),
            Expr::Ident(_) | Expr::Member(..) => match config_lookup(expr) {
                Some(ConfigLookup::Var(name)) => self
                    .config
                    .vars
                    .get(name)
                    .map_or(Value::Null, |v| Value::String(v.clone())),
                Some(ConfigLookup::Default(field)) => {
                    let value = match field {
                        "defaultDatabase" => &self.config.default_database,
                        "defaultSchema" => &self.config.default_schema,
                        _ => &self.config.default_location,
                    };
                    value.clone().map_or(Value::Null, Value::String)
                }
                None => Value::Null,
            },
            literal => literal.to_json().unwrap_or(Value::Null),
        }
    }

    fn call(&self, callee: &Expr, args: &[Expr], out: &mut RenderOutput) -> Value {
        let optional = |part: &Option<String>| Value::String(part.clone().unwrap_or_default());
        match callee.path().as_deref() {
            Some(["ref"]) | Some(["resolve"]) => {
                let add_dependency = callee.path().as_deref() == Some(&["ref"][..]);
                match reference_from_args(args) {
                    Some(reference) => self.resolve(&reference, add_dependency, out),
                    None => Value::Null,
                }
            }
            Some(["self"]) => Value::String(self.config.warehouse.quote_target(self.self_target)),
            Some(["name"]) => Value::String(self.self_target.name.clone()),
            Some(["schema"]) => optional(&self.self_target.schema),
            Some(["database"]) => optional(&self.self_target.database),
            Some(["incremental"]) => Value::Bool(self.incremental),
            Some(["when"]) => {
                let condition = self.eval(&args[0], out);
                if truthy(&condition) {
                    self.eval(&args[1], out)
                } else {
                    args.get(2)
                        .map_or(Value::String(String::new()), |e| self.eval(e, out))
                }
            }
            _ => Value::Null,
        }
    }

    fn resolve(
        &self,
        reference: &DependencyReference,
        add_dependency: bool,
        out: &mut RenderOutput,
    ) -> Value {
        match self.registry.find(reference) {
            Lookup::Found(index) => {
                let target = self.registry.get(index).action.target();
                if add_dependency {
                    out.refs
                        .push((target.clone(), reference.include_dependent_assertions));
                }
                Value::String(self.config.warehouse.quote_target(target))
            }
            Lookup::Missing => {
                out.errors
                    .push(format!("Could not resolve \"{}\"", reference));
                Value::String(String::new())
            }
            Lookup::Ambiguous(candidates) => {
                out.errors.push(ambiguous_message(reference, &candidates));
                Value::String(String::new())
            }
        }
    }
}

enum ConfigLookup<'e> {
    Var(&'e str),
    Default(&'e str),
}

/// `dataform.projectConfig.vars.<name>` and the three location defaults
fn config_lookup(expr: &Expr) -> Option<ConfigLookup<'_>> {
    match expr.path()?.as_slice() {
        ["dataform", "projectConfig", "vars", name] => Some(ConfigLookup::Var(*name)),
        ["dataform", "projectConfig", field @ ("defaultDatabase" | "defaultSchema" | "defaultLocation")] => {
            Some(ConfigLookup::Default(*field))
        }
        _ => None,
    }
}

/// Arguments of `ref`/`resolve`: one to three strings, or a target object
pub(crate) fn reference_from_args(args: &[Expr]) -> Option<DependencyReference> {
    let values = args
        .iter()
        .map(Expr::to_json)
        .collect::<Option<Vec<_>>>()?;
    let reference = match values.as_slice() {
        [Value::String(name)] => DependencyReference::named(name.as_str()),
        [Value::String(schema), Value::String(name)] => DependencyReference {
            schema: Some(schema.clone()),
            ..DependencyReference::named(name.as_str())
        },
        [Value::String(database), Value::String(schema), Value::String(name)] => {
            DependencyReference {
                database: Some(database.clone()),
                schema: Some(schema.clone()),
                ..DependencyReference::named(name.as_str())
            }
        }
        [Value::Object(object)] => {
            let text = |keys: &[&str]| {
                keys.iter()
                    .find_map(|k| object.get(*k).and_then(Value::as_str))
                    .map(str::to_string)
            };
            DependencyReference {
                database: text(&["database", "project"]),
                schema: text(&["schema", "dataset"]),
                name: text(&["name"])?,
                include_dependent_assertions: object
                    .get("includeDependentAssertions")
                    .and_then(Value::as_bool),
            }
        }
        _ => return None,
    };
    Some(reference)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn push_value(sql: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => sql.push_str(s),
        other => sql.push_str(&other.to_string()),
    }
}
