//! Reconciliation - drives a provider from target hashes to enforced state

use anyhow::{Context, Result};
use serde_json::json;
use std::collections::BTreeSet;

use crate::context::{ConfirmCallback, ProviderContext, Status, StatusEvent};
use crate::definition::ResourceHash;
use crate::diff::{Change, ChangeKind, compute_changes};
use crate::error::Error;
use crate::instance::Instance;
use crate::registry::Entry;

/// Options for a reconciliation run
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Report what would change without changing anything
    pub noop: bool,
}

/// Summary of a reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
    }
}

/// Outcome of [`reconcile`]
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub changes: Vec<Change>,
    pub events: Vec<StatusEvent>,
    pub summary: ExecuteSummary,
}

/// All current instances of a type
pub fn instances(entry: &Entry, ctx: &mut ProviderContext) -> Result<Vec<Instance>> {
    let provider = entry.provider()?;
    let rtype = entry.resource_type();
    let hashes = provider
        .get(ctx)
        .with_context(|| format!("Failed to list {} instances", rtype.name()))?;

    hashes
        .into_iter()
        .map(|hash| -> Result<Instance> {
            let title = rtype
                .title_of(&hash)
                .with_context(|| {
                    format!("{} provider returned a resource without a title", rtype.name())
                })?
                .to_string();
            Ok(Instance::new(rtype.name(), &title, hash))
        })
        .collect()
}

/// Current state of one resource, or `{namevar: title, ensure: absent}`
pub fn retrieve(entry: &Entry, ctx: &mut ProviderContext, title: &str) -> Result<ResourceHash> {
    let provider = entry.provider()?;
    let rtype = entry.resource_type();
    let current = provider.get(ctx)?;

    let found = current.into_iter().find(|hash| {
        rtype
            .title_of(hash)
            .is_some_and(|t| provider.same_resource(t, title))
    });

    Ok(found.unwrap_or_else(|| {
        let mut absent = ResourceHash::new();
        absent.insert(rtype.namevar().to_string(), json!(title));
        if rtype.has_ensure() {
            absent.insert("ensure".to_string(), json!("absent"));
        }
        absent
    }))
}

/// Validate targets against the schema, then let the provider normalize them
pub fn canonicalize_targets(
    entry: &Entry,
    ctx: &mut ProviderContext,
    targets: &[ResourceHash],
) -> Result<Vec<ResourceHash>> {
    let provider = entry.provider()?;
    let rtype = entry.resource_type();
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(targets.len());

    for target in targets {
        let mut hash = rtype.canonicalize_target(target)?;
        provider.canonicalize(ctx, &mut hash)?;

        let title = rtype.title_of(&hash).unwrap_or_default().to_string();
        if !seen.insert(title.clone()) {
            return Err(Error::validation(
                format!("{}[{}]", rtype.name(), title),
                "declared more than once",
            )
            .into());
        }
        out.push(hash);
    }
    Ok(out)
}

/// Canonicalize targets, read current state and diff them
pub fn plan(entry: &Entry, ctx: &mut ProviderContext, targets: &[ResourceHash]) -> Result<Vec<Change>> {
    let targets = canonicalize_targets(entry, ctx, targets)?;
    let provider = entry.provider()?;
    let current = provider
        .get(ctx)
        .with_context(|| format!("Failed to list {} instances", entry.name()))?;
    Ok(compute_changes(
        entry.resource_type(),
        provider,
        &current,
        &targets,
    ))
}

/// Reconcile a type against a set of target hashes
///
/// `set` is called at most once, with only the entries that need work.
/// Per-resource failures end up in the summary; only errors that prevent
/// planning are returned.
pub fn reconcile<C: ConfirmCallback>(
    entry: &Entry,
    targets: &[ResourceHash],
    options: ReconcileOptions,
    confirm: &mut C,
) -> Result<Reconciliation> {
    let mut ctx = ProviderContext::new(entry.name(), options.noop);
    let changes = plan(entry, &mut ctx, targets)?;
    let pending: Vec<Change> = changes.iter().filter(|c| c.is_change()).cloned().collect();

    let mut summary = ExecuteSummary {
        no_change: changes.len() - pending.len(),
        ..Default::default()
    };

    if pending.is_empty() {
        return Ok(Reconciliation {
            changes,
            events: ctx.logger.into_events(),
            summary,
        });
    }

    if !options.noop {
        let prompt = format!("Apply {} change(s) to {}?", pending.len(), entry.name());
        if !confirm.confirm(&prompt)? {
            summary.skipped = pending.len();
            return Ok(Reconciliation {
                changes,
                events: ctx.logger.into_events(),
                summary,
            });
        }
    }

    if let Err(e) = entry.provider()?.set(&mut ctx, &pending) {
        log::error!("{} set failed: {:#}", entry.name(), e);
        for change in &pending {
            if !finished(ctx.logger.events(), &change.name) {
                ctx.logger.fail(&change.name, &format!("{e:#}"));
            }
        }
    }

    let events = ctx.logger.into_events();
    for change in &pending {
        count_outcome(&mut summary, &events, change, options.noop);
    }

    Ok(Reconciliation {
        changes,
        events,
        summary,
    })
}

/// Reconcile without asking for confirmation
pub fn reconcile_simple(
    entry: &Entry,
    targets: &[ResourceHash],
    options: ReconcileOptions,
) -> Result<Reconciliation> {
    use crate::context::AutoConfirm;

    reconcile(entry, targets, options, &mut AutoConfirm)
}

fn events_for<'a>(events: &'a [StatusEvent], name: &'a str) -> impl Iterator<Item = &'a StatusEvent> {
    events
        .iter()
        .filter(move |e| e.resource.as_deref() == Some(name))
}

fn finished(events: &[StatusEvent], name: &str) -> bool {
    events_for(events, name).any(|e| e.status.is_terminal())
}

fn count_outcome(summary: &mut ExecuteSummary, events: &[StatusEvent], change: &Change, noop: bool) {
    if events_for(events, &change.name).any(|e| e.status == Status::Failed) {
        summary.failed += 1;
        return;
    }
    if noop {
        summary.skipped += 1;
        return;
    }

    let last = events_for(events, &change.name)
        .filter(|e| e.status.is_terminal())
        .last()
        .map(|e| e.status);
    match (last, change.kind) {
        (Some(Status::Created), _) => summary.created += 1,
        (Some(Status::Updated), _) => summary.modified += 1,
        (Some(Status::Deleted), _) => summary.removed += 1,
        (_, ChangeKind::NoChange) => summary.no_change += 1,
        _ => summary.skipped += 1,
    }
}
