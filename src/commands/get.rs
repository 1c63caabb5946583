//! `get` - show current instances as manifests or JSON

use anyhow::{Context as _, Result};
use rayon::prelude::*;
use resource_api::{
    Entry, Instance, ProviderContext, Registry, ResourceHash, parse_target, reconcile,
};
use std::collections::BTreeMap;

use crate::Context;
use crate::cli::GetArgs;
use crate::ui;

/// Instances fetched from one or more types
#[derive(Debug, Default)]
struct Fetched {
    instances: Vec<Instance>,
    /// Types whose `get` failed, with the error
    failures: Vec<(String, String)>,
}

pub fn run(ctx: &Context, args: GetArgs) -> Result<()> {
    let registry = super::load_registry()?;

    let fetched = match args.target.as_deref() {
        Some(target) => Fetched {
            instances: fetch_target(&registry, target)?,
            failures: Vec::new(),
        },
        None => fetch_all(&registry),
    };

    for (type_name, error) in &fetched.failures {
        ui::warn(&format!("{type_name}: {error}"));
    }

    if args.json {
        let json = render_json(&fetched.instances, args.target.is_none())?;
        println!("{json}");
    } else if fetched.instances.is_empty() {
        if !ctx.quiet {
            ui::dim("no instances");
        }
    } else {
        println!("{}", render_manifests(&fetched.instances));
    }

    if fetched.failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} resource type(s) could not be read", fetched.failures.len())
    }
}

/// Instances of `type` or the single resource named by `type.name`
fn fetch_target(registry: &Registry, target: &str) -> Result<Vec<Instance>> {
    let (type_name, title) = parse_target(target);
    let entry = registry.get(type_name)?;
    let mut pctx = ProviderContext::new(type_name, false);

    match title {
        Some(title) => {
            let hash = reconcile::retrieve(entry, &mut pctx, title)
                .with_context(|| format!("Failed to read {target}"))?;
            let title = entry
                .resource_type()
                .title_of(&hash)
                .unwrap_or(title)
                .to_string();
            Ok(vec![Instance::new(type_name, &title, hash)])
        }
        None => reconcile::instances(entry, &mut pctx),
    }
}

/// Every implemented type, fetched in parallel
fn fetch_all(registry: &Registry) -> Fetched {
    let entries: Vec<&Entry> = registry.implemented().collect();
    log::debug!("fetching {} resource types", entries.len());

    let results: Vec<(String, Result<Vec<Instance>>)> = entries
        .par_iter()
        .map(|entry| {
            let mut pctx = ProviderContext::new(entry.name(), false);
            (
                entry.name().to_string(),
                reconcile::instances(entry, &mut pctx),
            )
        })
        .collect();

    let mut fetched = Fetched::default();
    for (type_name, result) in results {
        match result {
            Ok(instances) => fetched.instances.extend(instances),
            Err(e) => fetched.failures.push((type_name, format!("{e:#}"))),
        }
    }
    fetched
}

fn render_manifests(instances: &[Instance]) -> String {
    instances
        .iter()
        .map(Instance::to_manifest)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A JSON array of hashes, or an object of arrays keyed by type
fn render_json(instances: &[Instance], by_type: bool) -> Result<String> {
    let json = if by_type {
        let mut grouped: BTreeMap<&str, Vec<&ResourceHash>> = BTreeMap::new();
        for instance in instances {
            grouped
                .entry(instance.type_name())
                .or_default()
                .push(instance.values());
        }
        serde_json::to_string_pretty(&grouped)
    } else {
        let hashes: Vec<&ResourceHash> = instances.iter().map(Instance::values).collect();
        serde_json::to_string_pretty(&hashes)
    };
    json.context("Failed to serialize instances")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use resource_api::{Attribute, Change, MemoryProvider, Provider, ResourceDefinition};
    use serde_json::{Value, json};

    struct Unreachable;

    impl Provider for Unreachable {
        fn get(&self, _ctx: &mut ProviderContext) -> Result<Vec<ResourceHash>> {
            bail!("powershell.exe: not found")
        }

        fn set(&self, _ctx: &mut ProviderContext, _changes: &[Change]) -> Result<()> {
            Ok(())
        }
    }

    fn definition(name: &str) -> ResourceDefinition {
        ResourceDefinition::new(name)
            .docs("Test type")
            .attribute(Attribute::new("ensure", "Enum[present, absent]").docs("Presence"))
            .attribute(Attribute::new("name", "String").namevar().docs("Name"))
    }

    fn hash(value: Value) -> ResourceHash {
        value.as_object().cloned().unwrap()
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.define(definition("pool")).unwrap();
        registry.define(definition("site")).unwrap();
        registry.define(definition("unused")).unwrap();
        registry
            .implement(
                "pool",
                MemoryProvider::with_resources(
                    "name",
                    [
                        hash(json!({ "name": "web", "ensure": "present" })),
                        hash(json!({ "name": "api", "ensure": "present" })),
                    ],
                )
                .unwrap(),
            )
            .unwrap();
        registry.implement("site", Unreachable).unwrap();
        registry
    }

    #[test]
    fn test_fetch_all_collects_failures() {
        let fetched = fetch_all(&registry());

        let titles: Vec<&str> = fetched.instances.iter().map(Instance::title).collect();
        assert_eq!(titles, ["api", "web"]);
        assert_eq!(fetched.failures.len(), 1);
        assert_eq!(fetched.failures[0].0, "site");
        assert!(fetched.failures[0].1.ends_with("powershell.exe: not found"));
    }

    #[test]
    fn test_fetch_single_resource() {
        let registry = registry();

        let found = fetch_target(&registry, "pool.web").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("ensure"), Some(&json!("present")));

        let missing = fetch_target(&registry, "pool.db").unwrap();
        assert_eq!(
            Value::Object(missing[0].values().clone()),
            json!({ "name": "db", "ensure": "absent" })
        );

        assert!(fetch_target(&registry, "unused").is_err());
        assert!(fetch_target(&registry, "nope.web").is_err());
    }

    #[test]
    fn test_render() {
        let instances = fetch_target(&registry(), "pool").unwrap();

        assert_eq!(
            render_manifests(&instances),
            "pool { 'api':\n  ensure => 'present',\n}\n\npool { 'web':\n  ensure => 'present',\n}"
        );

        let grouped: Value = serde_json::from_str(&render_json(&instances, true).unwrap()).unwrap();
        assert_eq!(grouped["pool"].as_array().unwrap().len(), 2);
        let flat: Value = serde_json::from_str(&render_json(&instances, false).unwrap()).unwrap();
        assert_eq!(flat[1]["name"], json!("web"));
    }
}
