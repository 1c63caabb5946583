//! Resource type definitions
//!
//! A [`ResourceDefinition`] is the declarative schema of a resource type: its
//! attributes with their types, defaults and roles, plus the autorequires it
//! infers from attribute values. [`ResourceType::compile`] validates a
//! definition and turns it into something the registry and providers use.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{TypeSpec, is_absolute_path};

/// A resource as a plain attribute hash
pub type ResourceHash = Map<String, Value>;

/// One attribute of a resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,

    /// Type expression, e.g. `Enum[present, absent]`
    #[serde(rename = "type")]
    pub type_expr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Uniquely identifies an instance
    #[serde(default)]
    pub namevar: bool,

    /// Reported by the provider, never set by the user
    #[serde(default)]
    pub read_only: bool,
}

impl Attribute {
    pub fn new(name: &str, type_expr: &str) -> Self {
        Self {
            name: name.to_string(),
            type_expr: type_expr.to_string(),
            docs: None,
            default: None,
            namevar: false,
            read_only: false,
        }
    }

    pub fn docs(mut self, docs: &str) -> Self {
        self.docs = Some(docs.to_string());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn namevar(mut self) -> Self {
        self.namevar = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Properties are change-tracked; namevars and read-only values are parameters
    pub fn is_property(&self) -> bool {
        !self.namevar && !self.read_only
    }
}

/// Declarative schema of a resource type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,

    #[serde(default)]
    pub attributes: Vec<Attribute>,

    /// Target type -> title expression (`$attr` or a literal title)
    #[serde(default)]
    pub autorequires: BTreeMap<String, String>,
}

impl ResourceDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn docs(mut self, docs: &str) -> Self {
        self.docs = Some(docs.to_string());
        self
    }

    /// Add or replace an attribute, keeping declaration order
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }

    /// Merge a block of shared attributes
    pub fn with_attributes(self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        attributes.into_iter().fold(self, Self::attribute)
    }

    pub fn autorequire(mut self, target_type: &str, expr: &str) -> Self {
        self.autorequires
            .insert(target_type.to_string(), expr.to_string());
        self
    }

    /// First non-empty line of the docs
    pub fn summary(&self) -> Option<&str> {
        self.docs
            .as_deref()?
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
    }
}

/// A reference to another resource, e.g. `File['/etc/apt/key.gpg']`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub type_name: String,
    pub title: String,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.type_name.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        write!(f, "{}['{}']", capitalized, self.title)
    }
}

/// A validated resource type
#[derive(Debug, Clone)]
pub struct ResourceType {
    definition: ResourceDefinition,
    specs: Vec<TypeSpec>,
    namevar: usize,
}

impl ResourceType {
    /// Validate a definition: every type must parse and exactly one
    /// attribute must be the namevar. Missing docs are only warned about.
    pub fn compile(mut definition: ResourceDefinition) -> Result<Self> {
        let mut specs = Vec::with_capacity(definition.attributes.len());
        let mut namevar: Option<usize> = None;

        for (index, attribute) in definition.attributes.iter().enumerate() {
            let spec =
                TypeSpec::parse(&attribute.type_expr).map_err(|e| Error::AttributeType {
                    type_name: definition.name.clone(),
                    attribute: attribute.name.clone(),
                    source: Box::new(e),
                })?;
            specs.push(spec);

            if attribute.docs.is_none() {
                log::warn!("{}.{} has no docs", definition.name, attribute.name);
            }

            if attribute.namevar {
                if let Some(first) = namevar {
                    return Err(Error::MultipleNamevars {
                        type_name: definition.name.clone(),
                        first: definition.attributes[first].name.clone(),
                        second: attribute.name.clone(),
                    });
                }
                namevar = Some(index);
            }
        }

        let namevar = namevar.ok_or_else(|| Error::NoNamevar(definition.name.clone()))?;

        for (attribute, spec) in definition.attributes.iter_mut().zip(&specs) {
            let Some(default) = &attribute.default else {
                continue;
            };
            let munged = spec.munge(default).map_err(|m| Error::InvalidDefault {
                type_name: definition.name.clone(),
                attribute: attribute.name.clone(),
                message: m.to_string(),
            })?;
            attribute.default = Some(munged);
        }

        log::debug!(
            "compiled resource type {} ({} attributes, namevar {})",
            definition.name,
            definition.attributes.len(),
            definition.attributes[namevar].name
        );

        Ok(Self {
            definition,
            specs,
            namevar,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    /// Attributes with their parsed types, in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = (&Attribute, &TypeSpec)> {
        self.definition.attributes.iter().zip(&self.specs)
    }

    pub fn attribute(&self, name: &str) -> Option<(&Attribute, &TypeSpec)> {
        self.attributes().find(|(a, _)| a.name == name)
    }

    /// Name of the namevar attribute
    pub fn namevar(&self) -> &str {
        &self.definition.attributes[self.namevar].name
    }

    pub fn has_ensure(&self) -> bool {
        self.attribute("ensure").is_some()
    }

    /// Title of a resource hash: its namevar value, or its `name` key
    pub fn title_of<'a>(&self, hash: &'a ResourceHash) -> Option<&'a str> {
        hash.get(self.namevar())
            .or_else(|| hash.get("name"))
            .and_then(Value::as_str)
    }

    fn label(&self, hash: &ResourceHash) -> String {
        format!("{}[{}]", self.name(), self.title_of(hash).unwrap_or("?"))
    }

    /// Validate and munge a desired-state hash.
    ///
    /// Unknown and read-only attributes are rejected, `null` values count as
    /// unset, defaults are filled in and `ensure` defaults to `present`.
    pub fn canonicalize_target(&self, hash: &ResourceHash) -> Result<ResourceHash> {
        let label = self.label(hash);
        let namevar = self.namevar();
        let mut out = ResourceHash::new();

        for (key, value) in hash {
            // `name` stands in for the namevar unless the namevar is given
            let key = if key == "name" && namevar != "name" {
                if hash.contains_key(namevar) {
                    continue;
                }
                namevar
            } else {
                key.as_str()
            };
            if value.is_null() {
                continue;
            }

            let Some((attribute, spec)) = self.attribute(key) else {
                return Err(Error::validation(&label, format!("unknown attribute `{key}`")));
            };
            if attribute.read_only {
                return Err(Error::validation(
                    &label,
                    format!("`{key}` is read-only and cannot be set"),
                ));
            }
            let munged = spec
                .munge(value)
                .map_err(|m| Error::validation(&label, format!("`{key}` {m}")))?;
            out.insert(key.to_string(), munged);
        }

        if !out.contains_key(namevar) {
            return Err(Error::validation(
                &label,
                format!("missing namevar `{namevar}`"),
            ));
        }

        for (attribute, _) in self.attributes() {
            if attribute.read_only || out.contains_key(&attribute.name) {
                continue;
            }
            if let Some(default) = &attribute.default {
                out.insert(attribute.name.clone(), default.clone());
            }
        }

        if self.has_ensure() && !out.contains_key("ensure") {
            out.insert("ensure".to_string(), json!("present"));
        }

        Ok(out)
    }

    /// Resources this one must be applied after
    pub fn autorequires(&self, hash: &ResourceHash) -> Vec<ResourceRef> {
        let mut refs = Vec::new();
        for (target_type, expr) in &self.definition.autorequires {
            let titles: Vec<String> = match expr.strip_prefix('$') {
                Some(attr) => match hash.get(attr) {
                    Some(Value::String(s)) => vec![s.clone()],
                    Some(Value::Array(items)) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                    _ => Vec::new(),
                },
                None => vec![expr.clone()],
            };

            refs.extend(
                titles
                    .into_iter()
                    .filter(|t| target_type != "file" || is_absolute_path(t))
                    .map(|title| ResourceRef {
                        type_name: target_type.clone(),
                        title,
                    }),
            );
        }
        refs
    }

    /// Draft-04 JSON Schema describing one resource hash of this type
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for (attribute, spec) in self.attributes() {
            let mut schema = spec.json_schema();
            if let Value::Object(fields) = &mut schema {
                if let Some(docs) = &attribute.docs {
                    fields.insert("description".to_string(), json!(docs));
                }
                if let Some(default) = &attribute.default {
                    fields.insert("default".to_string(), default.clone());
                }
                if attribute.read_only {
                    fields.insert("readOnly".to_string(), json!(true));
                }
            }
            properties.insert(attribute.name.clone(), schema);
        }

        let mut schema = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "title": self.name(),
            "type": "object",
            "properties": properties,
            "required": [self.namevar()],
            "additionalProperties": false,
        });
        if let (Some(docs), Value::Object(fields)) = (&self.definition.docs, &mut schema) {
            fields.insert("description".to_string(), json!(docs.trim()));
        }
        schema
    }
}
