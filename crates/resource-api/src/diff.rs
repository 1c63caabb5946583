//! Diff computation between current and target state

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::{ResourceHash, ResourceType};
use crate::provider::Provider;

/// What has to happen to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
    NoChange,
}

/// A target resource paired with its current state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    /// Title of the target resource
    pub name: String,
    pub kind: ChangeKind,
    /// Current state, `None` when the resource does not exist
    pub current: Option<ResourceHash>,
    /// Canonicalized target state
    pub target: ResourceHash,
    /// Properties whose values differ (updates only)
    pub changed: Vec<String>,
}

impl Change {
    pub fn is_change(&self) -> bool {
        self.kind != ChangeKind::NoChange
    }

    /// A target attribute as a string
    pub fn target_str(&self, attribute: &str) -> Option<&str> {
        self.target.get(attribute).and_then(Value::as_str)
    }

    /// A current attribute as a string
    pub fn current_str(&self, attribute: &str) -> Option<&str> {
        self.current.as_ref()?.get(attribute).and_then(Value::as_str)
    }
}

fn ensure_of(hash: &ResourceHash) -> &str {
    hash.get("ensure")
        .and_then(Value::as_str)
        .unwrap_or("present")
}

/// Pair every target with its current state and classify the change.
///
/// Updates only compare properties reported by both sides, so attributes the
/// provider cannot observe never cause a change.
pub fn compute_changes(
    rtype: &ResourceType,
    provider: &dyn Provider,
    current: &[ResourceHash],
    targets: &[ResourceHash],
) -> Vec<Change> {
    targets
        .iter()
        .map(|target| {
            let name = rtype.title_of(target).unwrap_or_default().to_string();
            let existing = current.iter().find(|c| {
                rtype
                    .title_of(c)
                    .is_some_and(|title| provider.same_resource(title, &name))
                    && ensure_of(c) != "absent"
            });

            let mut changed = Vec::new();
            let kind = match (existing, ensure_of(target)) {
                (None, "absent") => ChangeKind::NoChange,
                (None, _) => ChangeKind::Create,
                (Some(_), "absent") => ChangeKind::Delete,
                (Some(current), _) => {
                    changed = rtype
                        .attributes()
                        .filter(|(a, _)| a.is_property() && a.name != "ensure")
                        .filter(|(a, _)| match (current.get(&a.name), target.get(&a.name)) {
                            (Some(was), Some(want)) => was != want,
                            _ => false,
                        })
                        .map(|(a, _)| a.name.clone())
                        .collect();
                    if changed.is_empty() {
                        ChangeKind::NoChange
                    } else {
                        ChangeKind::Update
                    }
                }
            };

            Change {
                name,
                kind,
                current: existing.cloned(),
                target: target.clone(),
                changed,
            }
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub removals: usize,
    pub modifications: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.kind {
                ChangeKind::Create => summary.additions += 1,
                ChangeKind::Delete => summary.removals += 1,
                ChangeKind::Update => summary.modifications += 1,
                ChangeKind::NoChange => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProviderContext;
    use crate::definition::{Attribute, ResourceDefinition};
    use serde_json::json;

    struct Exact;

    impl Provider for Exact {
        fn get(&self, _ctx: &mut ProviderContext) -> anyhow::Result<Vec<ResourceHash>> {
            Ok(Vec::new())
        }

        fn set(&self, _ctx: &mut ProviderContext, _changes: &[Change]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Suffix;

    impl Provider for Suffix {
        fn get(&self, _ctx: &mut ProviderContext) -> anyhow::Result<Vec<ResourceHash>> {
            Ok(Vec::new())
        }

        fn set(&self, _ctx: &mut ProviderContext, _changes: &[Change]) -> anyhow::Result<()> {
            Ok(())
        }

        fn same_resource(&self, current: &str, target: &str) -> bool {
            current.ends_with(target)
        }
    }

    fn pool_type() -> ResourceType {
        ResourceType::compile(
            ResourceDefinition::new("pool")
                .attribute(Attribute::new("ensure", "Enum[present, absent]").docs("e"))
                .attribute(Attribute::new("name", "String").namevar().docs("n"))
                .attribute(Attribute::new("state", "Enum[running, stopped]").docs("s"))
                .attribute(Attribute::new("mode", "String").docs("m"))
                .attribute(Attribute::new("pid", "Integer").read_only().docs("p")),
        )
        .unwrap()
    }

    fn hashes(value: serde_json::Value) -> Vec<ResourceHash> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_classifies_changes() {
        let rtype = pool_type();
        let current = hashes(json!([
            { "name": "a", "ensure": "present", "state": "running", "pid": 10 },
            { "name": "b", "ensure": "present", "state": "running" },
            { "name": "c", "ensure": "present", "state": "stopped" },
        ]));
        let targets = hashes(json!([
            { "name": "a", "ensure": "present", "state": "running", "mode": "Integrated" },
            { "name": "b", "ensure": "absent" },
            { "name": "c", "ensure": "present", "state": "running" },
            { "name": "d", "ensure": "present" },
            { "name": "e", "ensure": "absent" },
        ]));

        let changes = compute_changes(&rtype, &Exact, &current, &targets);
        let kinds: Vec<(&str, ChangeKind)> =
            changes.iter().map(|c| (c.name.as_str(), c.kind)).collect();
        assert_eq!(
            kinds,
            [
                ("a", ChangeKind::NoChange),
                ("b", ChangeKind::Delete),
                ("c", ChangeKind::Update),
                ("d", ChangeKind::Create),
                ("e", ChangeKind::NoChange),
            ]
        );
        assert_eq!(changes[2].changed, ["state"]);
        assert_eq!(changes[2].current_str("state"), Some("stopped"));
        assert_eq!(changes[2].target_str("state"), Some("running"));

        let summary = DiffSummary::from_changes(&changes);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.unchanged, 2);
        assert!(summary.has_changes());
    }

    #[test]
    fn test_provider_identity_match() {
        let rtype = pool_type();
        let current = hashes(json!([{ "name": "prefix-a", "ensure": "present" }]));
        let targets = hashes(json!([{ "name": "a", "ensure": "absent" }]));

        let exact = compute_changes(&rtype, &Exact, &current, &targets);
        assert_eq!(exact[0].kind, ChangeKind::NoChange);

        let suffix = compute_changes(&rtype, &Suffix, &current, &targets);
        assert_eq!(suffix[0].kind, ChangeKind::Delete);
        assert_eq!(suffix[0].current_str("name"), Some("prefix-a"));
    }
}
