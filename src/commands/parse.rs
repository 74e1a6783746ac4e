use std::path::Path;

use anyhow::{Context, Result};

use dataform_compiler::parser::{extract_blocks, SqlxBlocks};

pub fn cmd_parse(file: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let blocks = extract_blocks(&text).with_context(|| format!("failed to parse {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
    } else {
        print_blocks(&blocks);
    }
    Ok(())
}

fn print_blocks(blocks: &SqlxBlocks) {
    if let Some(config) = &blocks.config {
        println!("config:\n{}\n", config.trim());
    }
    if let Some(script) = &blocks.script {
        println!("js:\n{}\n", script.trim());
    }
    for (index, sql) in blocks.pre_operations.iter().enumerate() {
        println!("pre_operations[{}]:\n{}\n", index, sql.trim());
    }
    for (index, sql) in blocks.post_operations.iter().enumerate() {
        println!("post_operations[{}]:\n{}\n", index, sql.trim());
    }
    println!("body:\n{}", blocks.body.trim());
}
