//! `diff` - preview what `set` would change

use anyhow::Result;
use colored::Colorize;
use resource_api::{
    Change, ChangeKind, DiffSummary, Instance, ProviderContext, ResourceType, reconcile,
};
use similar::{ChangeTag, TextDiff};

use crate::Context;
use crate::cli::ManifestArgs;
use crate::commands::manifest;
use crate::ui;

pub fn run(ctx: &Context, args: ManifestArgs) -> Result<()> {
    let registry = super::load_registry()?;
    let entry = registry.get(&args.type_name)?;
    let targets = manifest::load(&args.manifest)?;

    let mut pctx = ProviderContext::new(entry.name(), true);
    let changes = reconcile::plan(entry, &mut pctx, &targets)?;

    for change in changes.iter().filter(|c| c.is_change()) {
        ui::section(&format!("{}[{}] ({})", entry.name(), change.name, kind_label(change.kind)));
        if let Some(line) = requires_line(entry.resource_type(), change) {
            ui::dim(&line);
        }
        print_diff(&render_current(entry.name(), change), &render_target(entry.name(), change));
    }

    let summary = DiffSummary::from_changes(&changes);
    if !ctx.quiet {
        print_summary(&summary);
    }
    Ok(())
}

fn kind_label(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Create => "create",
        ChangeKind::Update => "update",
        ChangeKind::Delete => "delete",
        ChangeKind::NoChange => "unchanged",
    }
}

/// Resources a create or update must wait for, e.g. `requires Package['apt']`
fn requires_line(rtype: &ResourceType, change: &Change) -> Option<String> {
    if !matches!(change.kind, ChangeKind::Create | ChangeKind::Update) {
        return None;
    }
    let refs: Vec<String> = rtype
        .autorequires(&change.target)
        .iter()
        .map(ToString::to_string)
        .collect();
    (!refs.is_empty()).then(|| format!("requires {}", refs.join(", ")))
}

fn render_current(type_name: &str, change: &Change) -> String {
    match &change.current {
        Some(current) => manifest_text(type_name, &change.name, current.clone()),
        None => String::new(),
    }
}

/// Target state as it would look after `set`
///
/// Updates only touch the changed properties, so the current hash is shown
/// with those replaced.
fn render_target(type_name: &str, change: &Change) -> String {
    match (change.kind, &change.current) {
        (ChangeKind::Delete, _) => String::new(),
        (ChangeKind::Update, Some(current)) => {
            let mut projected = current.clone();
            for key in &change.changed {
                if let Some(value) = change.target.get(key) {
                    projected.insert(key.clone(), value.clone());
                }
            }
            manifest_text(type_name, &change.name, projected)
        }
        _ => manifest_text(type_name, &change.name, change.target.clone()),
    }
}

fn manifest_text(type_name: &str, title: &str, hash: resource_api::ResourceHash) -> String {
    let mut text = Instance::new(type_name, title, hash).to_manifest();
    text.push('\n');
    text
}

/// Unified lines of a text diff, `- ` and `+ ` prefixed, unchanged lines dropped
fn diff_lines(old: &str, new: &str) -> Vec<(ChangeTag, String)> {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .filter(|c| c.tag() != ChangeTag::Equal)
        .map(|c| {
            let sign = if c.tag() == ChangeTag::Delete { "-" } else { "+" };
            (c.tag(), format!("{sign} {}", c.value().trim_end_matches('\n')))
        })
        .collect()
}

fn print_diff(old: &str, new: &str) {
    for (tag, line) in diff_lines(old, new) {
        match tag {
            ChangeTag::Delete => println!("    {}", line.red()),
            _ => println!("    {}", line.green()),
        }
    }
}

fn print_summary(summary: &DiffSummary) {
    println!();
    if !summary.has_changes() {
        println!("  {} Everything is in sync", "✓".green().bold());
        return;
    }
    println!("  {} {} change(s) pending", "→".cyan().bold(), summary.total());
    if summary.additions > 0 {
        println!("    • {} to create", summary.additions);
    }
    if summary.modifications > 0 {
        println!("    • {} to update", summary.modifications);
    }
    if summary.removals > 0 {
        println!("    • {} to delete", summary.removals);
    }
    if summary.unchanged > 0 {
        println!("    • {} unchanged", summary.unchanged.to_string().dimmed());
    }
}
