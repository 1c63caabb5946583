//! `set` - enforce the resources declared in a manifest

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use dialoguer::Confirm;
use resource_api::{
    AutoConfirm, ConfirmCallback, ExecuteSummary, ReconcileOptions, Status, StatusEvent,
    reconcile,
};

use crate::Context;
use crate::cli::SetArgs;
use crate::commands::manifest;
use crate::ui;

/// Asks on the terminal before changing anything
struct Prompt;

impl ConfirmCallback for Prompt {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .context("Failed to read confirmation")
    }
}

pub fn run(ctx: &Context, args: SetArgs) -> Result<()> {
    let registry = super::load_registry()?;
    let entry = registry.get(&args.manifest.type_name)?;
    let targets = manifest::load(&args.manifest.manifest)?;

    if !ctx.quiet {
        let mode = if args.noop { " (noop)" } else { "" };
        ui::header(&format!(
            "Enforcing {} {} resource(s){}",
            targets.len(),
            entry.name(),
            mode
        ));
    }

    let options = ReconcileOptions { noop: args.noop };
    let result = if args.yes {
        reconcile(entry, &targets, options, &mut AutoConfirm)?
    } else {
        reconcile(entry, &targets, options, &mut Prompt)?
    };

    for event in &result.events {
        if let Some(line) = render_event(event, ctx.verbose) {
            println!("{line}");
        }
    }

    print_summary(&result.summary, args.noop);

    if !result.summary.is_success() {
        bail!("{} resource(s) failed", result.summary.failed);
    }
    Ok(())
}

/// One event line, or `None` for progress events hidden at this verbosity
fn render_event(event: &StatusEvent, verbose: u8) -> Option<String> {
    let symbol = match event.status {
        Status::Created | Status::Updated | Status::Deleted => "✓".green(),
        Status::Failed => "✗".red(),
        Status::Warning => "⚠".yellow(),
        Status::Notice | Status::Info => "•".cyan(),
        Status::Creating | Status::Updating | Status::Deleting | Status::Debug => {
            if verbose == 0 {
                return None;
            }
            "…".dimmed()
        }
    };

    let subject = event.resource.as_deref().unwrap_or("*");
    let mut line = format!("  {symbol} {subject}: {}", event.status);
    if !event.message.is_empty() {
        line.push_str(&format!(" - {}", event.message));
    }
    Some(line)
}

fn print_summary(summary: &ExecuteSummary, noop: bool) {
    println!();
    if summary.total_changes() == 0 && summary.failed == 0 && summary.skipped == 0 {
        println!("  {} Everything is in sync", "✓".green().bold());
        return;
    }
    if !summary.is_success() {
        println!("  {} Applied with errors", "⚠".yellow().bold());
    } else if noop {
        println!("  {} Noop run, nothing was changed", "○".cyan().bold());
    } else {
        println!("  {} Applied successfully!", "✓".green().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
