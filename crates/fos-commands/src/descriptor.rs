//! Command descriptors
//!
//! What `find_commands` reports for a registration: the command name, a
//! display name, and whatever metadata the listener carried.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::listener::CommandMetadata;

/// Keys the descriptor owns; listener extras never override them
const RESERVED_KEYS: &[&str] = &[
    "name",
    "displayName",
    "description",
    "hiddenInCommandPalette",
    "tags",
    "didDispatch",
];

/// Query result describing one command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDescriptor {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_in_command_palette: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandDescriptor {
    /// Descriptor with only a name and its humanized display name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: humanize_command_name(name),
            description: None,
            hidden_in_command_palette: None,
            tags: None,
            extra: Map::new(),
        }
    }

    pub(crate) fn extract(name: &str, metadata: Option<&CommandMetadata>) -> Self {
        let mut descriptor = Self::new(name);
        let Some(metadata) = metadata else {
            return descriptor;
        };

        if let Some(display_name) = &metadata.display_name {
            descriptor.display_name = display_name.clone();
        }
        descriptor.description = metadata.description.clone();
        descriptor.hidden_in_command_palette = metadata.hidden_in_command_palette;
        descriptor.tags = metadata.tags.clone();
        descriptor.extra = metadata
            .extra
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        descriptor
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// `namespace:some-action` becomes `Namespace: Some Action`
pub fn humanize_command_name(name: &str) -> String {
    let mut parts = name.split(':');
    let namespace = undasherize(parts.next().unwrap_or(""));
    match parts.next() {
        Some(action) => format!("{}: {}", namespace, undasherize(action)),
        None => namespace,
    }
}

fn undasherize(s: &str) -> String {
    s.split('-').map(capitalize).collect::<Vec<_>>().join(" ")
}

fn capitalize(word: &str) -> String {
    if word.eq_ignore_ascii_case("github") {
        return "GitHub".to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
