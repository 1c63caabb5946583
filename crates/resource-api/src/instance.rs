//! Resource instances as handed to a host

use serde_json::{Value, json};

use crate::definition::ResourceHash;

/// A single resource: type, title and its attribute values.
///
/// `name` is a privileged key that always holds the title. Values cannot be
/// changed after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_name: String,
    values: ResourceHash,
}

impl Instance {
    pub fn new(type_name: &str, title: &str, hash: ResourceHash) -> Self {
        let mut values = hash;
        values.insert("name".to_string(), json!(title));
        Self {
            type_name: type_name.to_string(),
            values,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn title(&self) -> &str {
        self.values
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub fn values(&self) -> &ResourceHash {
        &self.values
    }

    /// Render as a resource declaration, `ensure` first and keys aligned
    pub fn to_manifest(&self) -> String {
        let mut keys: Vec<&String> = self.values.keys().filter(|k| *k != "name").collect();
        keys.sort_by(|a, b| (*a != "ensure", a).cmp(&(*b != "ensure", b)));
        let width = keys.iter().map(|k| k.len()).max().unwrap_or(0);

        let mut lines = vec![format!(
            "{} {{ {}:",
            self.type_name,
            quote(self.title())
        )];
        for key in keys {
            lines.push(format!(
                "  {:<width$} => {},",
                key,
                render_value(&self.values[key.as_str()])
            ));
        }
        lines.push("}".to_string());
        lines.join("\n")
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "undef".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(fields) => {
            let parts: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{} => {}", quote(k), render_value(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}
