// ABOUTME: Command implementations for the automator CLI
// ABOUTME: Handles execution of validate, tree, and init commands

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use super::config::Config;
use crate::parser::{DescriptorParser, ShapeReport};

/// Validate a descriptor file
pub async fn validate_descriptor(
    descriptor_path: PathBuf,
    known: Vec<String>,
    config: &Config,
) -> Result<()> {
    info!("Validating descriptor: {}", descriptor_path.display());

    let parser = DescriptorParser::new();
    let descriptor = parser
        .parse_file(&descriptor_path)
        .await
        .with_context(|| format!("Failed to load {}", descriptor_path.display()))?;

    let report = parser
        .validate_shape(&descriptor)
        .map_err(|e| anyhow::anyhow!("Descriptor validation failed: {}", e))?;

    let mut effective = config.clone();
    effective.merge_known_tasks(known);

    if !effective.known_tasks.is_empty() {
        let unknown = report.unknown_types(&effective.known_tasks);
        if !unknown.is_empty() {
            warn!("Unknown task types: {:?}", unknown);
            return Err(anyhow::anyhow!(
                "Descriptor references unknown task types: {}",
                unknown.join(", ")
            ));
        }
    }

    println!("✓ Descriptor '{}' is valid", descriptor_path.display());
    println!("  Root task: {}", report.root);
    println!("  Tasks: {}", report.total_tasks());
    println!("  Depth: {}", report.depth);

    info!("Descriptor validation completed successfully");

    Ok(())
}

/// Print the task tree of a descriptor file
pub async fn print_tree(descriptor_path: PathBuf, json: bool, _config: &Config) -> Result<()> {
    let parser = DescriptorParser::new();
    let descriptor = parser
        .parse_file(&descriptor_path)
        .await
        .with_context(|| format!("Failed to load {}", descriptor_path.display()))?;
    let report = parser.validate_shape(&descriptor)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_tree(&report));
    }

    Ok(())
}

/// Write a provisioning descriptor skeleton
pub async fn init_descriptor(title: String, output: PathBuf, _config: &Config) -> Result<()> {
    info!("Initializing descriptor '{}' in {}", title, output.display());

    if output.exists() {
        return Err(anyhow::anyhow!(
            "Descriptor file already exists: {}",
            output.display()
        ));
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    tokio::fs::write(&output, generate_descriptor_template(&title)).await?;
    info!("Created descriptor file: {}", output.display());

    Ok(())
}

/// Indented outline of the tasks in a shape report, one task per line.
pub fn render_tree(report: &ShapeReport) -> String {
    let mut out = String::new();
    for task in &report.tasks {
        let indent = "  ".repeat(task.depth.saturating_sub(1));
        if task.parameters.is_empty() {
            out.push_str(&format!("{}{}\n", indent, task.task_type));
        } else {
            out.push_str(&format!(
                "{}{} ({})\n",
                indent,
                task.task_type,
                task.parameters.join(", ")
            ));
        }
    }
    out
}

/// Generate the provisioning descriptor skeleton
fn generate_descriptor_template(title: &str) -> String {
    format!(
        r#"collab:
  title: "{}"
  content: ""
  private: false
  after:
    - nav:
        name: Overview
        app: overview
        after:
          - overview:
              entity: ""
    - storage:
        entities: {{}}
"#,
        title.replace('"', "\\\"")
    )
}
