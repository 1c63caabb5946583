//! In-memory provider
//!
//! Keeps instances in a map instead of a real system. Create inserts, update
//! merges the target over the current hash, delete removes.

use anyhow::{Result, bail};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::context::ProviderContext;
use crate::definition::ResourceHash;
use crate::diff::{Change, ChangeKind};
use crate::provider::Provider;
use crate::types::merge_hashes;

/// A provider over an in-memory map of resource hashes
#[derive(Debug)]
pub struct MemoryProvider {
    namevar: String,
    state: Mutex<BTreeMap<String, ResourceHash>>,
}

impl MemoryProvider {
    pub fn new(namevar: &str) -> Self {
        Self {
            namevar: namevar.to_string(),
            state: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed the provider with existing instances
    pub fn with_resources(namevar: &str, resources: impl IntoIterator<Item = ResourceHash>) -> Result<Self> {
        let provider = Self::new(namevar);
        {
            let mut state = provider.lock();
            for resource in resources {
                let title = provider.title(&resource)?;
                state.insert(title, resource);
            }
        }
        Ok(provider)
    }

    /// Current contents, ordered by title
    pub fn snapshot(&self) -> Vec<ResourceHash> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ResourceHash>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn title(&self, resource: &ResourceHash) -> Result<String> {
        match resource.get(&self.namevar).and_then(Value::as_str) {
            Some(title) => Ok(title.to_string()),
            None => bail!("resource is missing namevar `{}`", self.namevar),
        }
    }
}

impl Provider for MemoryProvider {
    fn get(&self, _ctx: &mut ProviderContext) -> Result<Vec<ResourceHash>> {
        Ok(self.snapshot())
    }

    fn set(&self, ctx: &mut ProviderContext, changes: &[Change]) -> Result<()> {
        for change in changes {
            if ctx.noop {
                ctx.logger
                    .notice(&change.name, &format!("would {:?}", change.kind).to_lowercase());
                continue;
            }

            match change.kind {
                ChangeKind::Create => {
                    ctx.logger.creating(&change.name, |_| {
                        self.lock().insert(change.name.clone(), change.target.clone());
                        Ok(())
                    });
                }
                ChangeKind::Update => {
                    ctx.logger.updating(&change.name, |_| {
                        let mut state = self.lock();
                        let Some(key) = change
                            .current
                            .as_ref()
                            .and_then(|c| c.get(&self.namevar))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                        else {
                            bail!("no current state to update");
                        };
                        let merged = match state.get(&key) {
                            Some(existing) => merge_hashes(existing, &change.target),
                            None => change.target.clone(),
                        };
                        state.insert(key, merged);
                        Ok(())
                    });
                }
                ChangeKind::Delete => {
                    ctx.logger.deleting(&change.name, |_| {
                        let key = change
                            .current
                            .as_ref()
                            .and_then(|c| c.get(&self.namevar))
                            .and_then(Value::as_str)
                            .unwrap_or(&change.name);
                        if self.lock().remove(key).is_none() {
                            bail!("{} does not exist", key);
                        }
                        Ok(())
                    });
                }
                ChangeKind::NoChange => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hash(value: Value) -> ResourceHash {
        value.as_object().cloned().unwrap()
    }

    fn change(kind: ChangeKind, current: Option<Value>, target: Value) -> Change {
        let target = hash(target);
        Change {
            name: target["name"].as_str().unwrap().to_string(),
            kind,
            current: current.map(hash),
            target,
            changed: Vec::new(),
        }
    }

    #[test]
    fn test_create_update_delete() {
        let provider = MemoryProvider::with_resources(
            "name",
            [
                hash(json!({ "name": "a", "ensure": "present", "size": 1 })),
                hash(json!({ "name": "b", "ensure": "present" })),
            ],
        )
        .unwrap();

        let changes = [
            change(
                ChangeKind::Update,
                Some(json!({ "name": "a", "ensure": "present", "size": 1 })),
                json!({ "name": "a", "ensure": "present", "mode": "x" }),
            ),
            change(
                ChangeKind::Delete,
                Some(json!({ "name": "b", "ensure": "present" })),
                json!({ "name": "b", "ensure": "absent" }),
            ),
            change(ChangeKind::Create, None, json!({ "name": "c", "ensure": "present" })),
        ];

        let mut ctx = ProviderContext::new("test", false);
        provider.set(&mut ctx, &changes).unwrap();
        assert!(!ctx.logger.has_failures());

        let state = provider.snapshot();
        assert_eq!(
            state,
            [
                hash(json!({ "name": "a", "ensure": "present", "size": 1, "mode": "x" })),
                hash(json!({ "name": "c", "ensure": "present" })),
            ]
        );
    }

    #[test]
    fn test_noop_changes_nothing() {
        let provider =
            MemoryProvider::with_resources("name", [hash(json!({ "name": "a" }))]).unwrap();
        let changes = [change(
            ChangeKind::Delete,
            Some(json!({ "name": "a" })),
            json!({ "name": "a", "ensure": "absent" }),
        )];

        let mut ctx = ProviderContext::new("test", true);
        provider.set(&mut ctx, &changes).unwrap();

        assert_eq!(provider.snapshot().len(), 1);
        assert_eq!(ctx.logger.events()[0].message, "would delete");
    }

    #[test]
    fn test_delete_missing_is_recorded_failure() {
        let provider = MemoryProvider::new("name");
        let changes = [change(
            ChangeKind::Delete,
            Some(json!({ "name": "ghost" })),
            json!({ "name": "ghost", "ensure": "absent" }),
        )];

        let mut ctx = ProviderContext::new("test", false);
        provider.set(&mut ctx, &changes).unwrap();
        assert!(ctx.logger.failed("ghost"));
    }

    #[test]
    fn test_seed_requires_namevar() {
        let err = MemoryProvider::with_resources("id", [hash(json!({ "name": "a" }))]).unwrap_err();
        assert_eq!(err.to_string(), "resource is missing namevar `id`");
    }
}
