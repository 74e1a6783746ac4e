use std::path::Path;

use anyhow::{Context, Result};

use dataform_compiler::{
    compile, CompileOptions, CompiledGraph, NoScriptRuntime, ProjectConfigOverride, ProjectFiles,
};

pub fn cmd_compile(dir: &Path, overrides: ProjectConfigOverride, json: bool) -> Result<()> {
    let files = ProjectFiles::load(dir)
        .with_context(|| format!("failed to load project at {}", dir.display()))?;

    let options = CompileOptions {
        project_config_override: Some(overrides),
        ..CompileOptions::default()
    };
    let graph = compile(&files, &NoScriptRuntime, &options)
        .with_context(|| format!("compilation of {} failed", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        print_summary(&graph);
    }

    if graph.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(graph: &CompiledGraph) {
    println!("Compiled {} action(s)", graph.action_count());
    for (label, count) in [
        ("tables", graph.tables.len()),
        ("operations", graph.operations.len()),
        ("assertions", graph.assertions.len()),
        ("declarations", graph.declarations.len()),
        ("notebooks", graph.notebooks.len()),
        ("data preparations", graph.data_preparations.len()),
    ] {
        if count > 0 {
            println!("  {:<18} {}", label, count);
        }
    }

    if graph.has_errors() {
        println!();
        println!("{} compilation error(s):", graph.errors().len());
        for error in graph.errors() {
            println!("  ✗ {}", error);
        }
    }
}
