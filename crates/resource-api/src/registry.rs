//! Registry of resource types and their providers

use std::collections::BTreeMap;

use crate::definition::{ResourceDefinition, ResourceType};
use crate::error::{Error, Result};
use crate::provider::{BoxedProvider, Provider};

/// A registered type with its optional provider
pub struct Entry {
    rtype: ResourceType,
    provider: Option<BoxedProvider>,
}

impl Entry {
    pub fn resource_type(&self) -> &ResourceType {
        &self.rtype
    }

    pub fn name(&self) -> &str {
        self.rtype.name()
    }

    pub fn is_implemented(&self) -> bool {
        self.provider.is_some()
    }

    /// The attached provider, or [`Error::NotImplemented`]
    pub fn provider(&self) -> Result<&dyn Provider> {
        self.provider
            .as_deref()
            .ok_or_else(|| Error::NotImplemented(self.name().to_string()))
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("type", &self.name())
            .field("implemented", &self.is_implemented())
            .finish()
    }
}

/// All known resource types, ordered by name
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a definition
    pub fn define(&mut self, definition: ResourceDefinition) -> Result<&ResourceType> {
        if self.entries.contains_key(&definition.name) {
            return Err(Error::AlreadyDefined(definition.name));
        }
        let rtype = ResourceType::compile(definition)?;
        let name = rtype.name().to_string();
        let entry = self.entries.entry(name).or_insert(Entry {
            rtype,
            provider: None,
        });
        Ok(&entry.rtype)
    }

    /// Attach a provider to a defined type
    pub fn implement(&mut self, name: &str, provider: impl Provider + 'static) -> Result<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| Error::UnknownType(name.to_string()))?;
        if entry.provider.is_some() {
            return Err(Error::AlreadyImplemented(name.to_string()));
        }
        log::debug!("registered provider for {}", name);
        entry.provider = Some(Box::new(provider));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Entry> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn implemented(&self) -> impl Iterator<Item = &Entry> {
        self.entries().filter(|e| e.is_implemented())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a target like `apt_key.5FF054BD` into type and title
pub fn parse_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('.') {
        Some((type_name, title)) if !title.is_empty() => (type_name, Some(title)),
        Some((type_name, _)) => (type_name, None),
        None => (target, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Attribute;
    use crate::memory::MemoryProvider;

    fn definition(name: &str) -> ResourceDefinition {
        ResourceDefinition::new(name)
            .docs("A test type")
            .attribute(Attribute::new("name", "String").namevar().docs("Name"))
    }

    #[test]
    fn test_define_and_implement() {
        let mut registry = Registry::new();
        registry.define(definition("b_type")).unwrap();
        registry.define(definition("a_type")).unwrap();
        registry
            .implement("a_type", MemoryProvider::new("name"))
            .unwrap();

        let names: Vec<&str> = registry.entries().map(Entry::name).collect();
        assert_eq!(names, ["a_type", "b_type"]);
        assert_eq!(registry.implemented().count(), 1);
        assert!(registry.get("a_type").unwrap().provider().is_ok());
        assert!(matches!(
            registry.get("b_type").unwrap().provider(),
            Err(Error::NotImplemented(name)) if name == "b_type"
        ));
    }

    #[test]
    fn test_registration_errors() {
        let mut registry = Registry::new();
        registry.define(definition("t")).unwrap();

        assert!(matches!(
            registry.define(definition("t")),
            Err(Error::AlreadyDefined(_))
        ));
        assert!(matches!(
            registry.implement("missing", MemoryProvider::new("name")),
            Err(Error::UnknownType(_))
        ));
        registry.implement("t", MemoryProvider::new("name")).unwrap();
        assert!(matches!(
            registry.implement("t", MemoryProvider::new("name")),
            Err(Error::AlreadyImplemented(_))
        ));
        assert!(registry.get("nope").is_err());
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("apt_key"), ("apt_key", None));
        assert_eq!(
            parse_target("apt_key.5FF054BD"),
            ("apt_key", Some("5FF054BD"))
        );
        assert_eq!(
            parse_target("iis_application_pool.api.v2"),
            ("iis_application_pool", Some("api.v2"))
        );
        assert_eq!(parse_target("apt_key."), ("apt_key", None));
    }
}
