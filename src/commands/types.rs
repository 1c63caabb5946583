//! `types`, `describe` and `schema` - introspection of registered types

use anyhow::{Context as _, Result};
use colored::Colorize;
use resource_api::{Registry, ResourceType};
use std::fmt::Write as _;

use crate::Context;
use crate::ui;

pub fn list(ctx: &Context) -> Result<()> {
    let registry = super::load_registry()?;
    if !ctx.quiet {
        ui::header("Resource types");
    }
    print!("{}", render_list(&registry));
    Ok(())
}

pub fn describe(_ctx: &Context, type_name: &str) -> Result<()> {
    let registry = super::load_registry()?;
    let rtype = registry.get(type_name)?.resource_type();
    print!("{}", render_description(rtype));
    Ok(())
}

pub fn schema(_ctx: &Context, type_name: &str) -> Result<()> {
    let registry = super::load_registry()?;
    let schema = registry.get(type_name)?.resource_type().json_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    println!("{json}");
    Ok(())
}

fn render_list(registry: &Registry) -> String {
    let width = registry.entries().map(|e| e.name().len()).max().unwrap_or(0);
    let mut out = String::new();
    for entry in registry.entries() {
        let summary = entry
            .resource_type()
            .definition()
            .summary()
            .unwrap_or_default();
        let marker = if entry.is_implemented() {
            "●".green()
        } else {
            "○".dimmed()
        };
        let _ = writeln!(
            out,
            "  {} {:<width$}  {}",
            marker,
            entry.name(),
            summary.dimmed()
        );
    }
    out
}

fn render_description(rtype: &ResourceType) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rtype.name().bold());
    if let Some(docs) = &rtype.definition().docs {
        let _ = writeln!(out, "{}", docs.trim());
    }

    let _ = writeln!(out, "\n{}", "Attributes".cyan().bold());
    let width = rtype.attributes().map(|(a, _)| a.name.len()).max().unwrap_or(0);
    for (attribute, spec) in rtype.attributes() {
        let mut flags = Vec::new();
        if attribute.namevar {
            flags.push("namevar".to_string());
        }
        if attribute.read_only {
            flags.push("read-only".to_string());
        }
        if let Some(default) = &attribute.default {
            flags.push(format!("default: {default}"));
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };

        let _ = writeln!(out, "  {:<width$}  {}{}", attribute.name, spec, flags.dimmed());
        if let Some(docs) = &attribute.docs {
            let _ = writeln!(out, "  {:<width$}  {}", "", docs.dimmed());
        }
    }

    let autorequires = &rtype.definition().autorequires;
    if !autorequires.is_empty() {
        let _ = writeln!(out, "\n{}", "Autorequires".cyan().bold());
        for (target_type, expr) in autorequires {
            let _ = writeln!(out, "  {target_type} => {expr}");
        }
    }
    out
}
