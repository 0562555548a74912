use schemars::schema_for;
use serde::Serialize;
use serde_json::Value;

use super::{CommandCategory, CommandRegistry};

/// A catalog entry: metadata + JSON schema for the params.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRegistryEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
    pub param_schema: Value,
}

pub(crate) fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

pub(crate) fn schema_value<T: schemars::JsonSchema>() -> Value {
    let root = schema_for!(T);
    serde_json::to_value(root).unwrap_or_else(|_| empty_object_schema())
}

/// Catalog entries for everything currently registered, in registration order.
pub fn entries(registry: &CommandRegistry) -> Vec<CommandRegistryEntry> {
    registry
        .handlers()
        .map(|h| {
            let info = h.info();
            CommandRegistryEntry {
                name: info.name,
                description: info.description,
                category: info.category,
                param_schema: h.params_schema(),
            }
        })
        .collect()
}

/// Help text for command discovery.
/// Three tiers: no topic → categories, category → command list, command → full schema.
pub fn help_text(registry: &CommandRegistry, topic: Option<&str>) -> String {
    let entries = entries(registry);

    match topic {
        None => {
            let mut lines = vec!["Available command categories:".to_string()];
            for cat in CommandCategory::all() {
                let count = entries.iter().filter(|e| e.category == *cat).count();
                if count > 0 {
                    lines.push(format!("  {} ({count}): {}", cat.slug(), cat.description()));
                }
            }
            lines.push(String::new());
            lines.push("Use `commands edit` to list commands in a category.".to_string());
            lines.push("Use `commands create_object` for full parameter details.".to_string());
            lines.join("\n")
        }
        Some(topic) => {
            if let Some(entry) = entries.iter().find(|e| e.name == topic) {
                let schema_str = serde_json::to_string_pretty(&entry.param_schema)
                    .unwrap_or_else(|_| "{}".to_string());
                return format!(
                    "{}: {}\nCategory: {}\n\nParameters:\n{}",
                    entry.name,
                    entry.description,
                    entry.category.slug(),
                    schema_str,
                );
            }

            let cat_lower = topic.to_lowercase();
            let matching: Vec<&CommandRegistryEntry> = entries
                .iter()
                .filter(|e| e.category.slug() == cat_lower)
                .collect();

            if matching.is_empty() {
                format!("Unknown topic: \"{topic}\". Run `commands` to see categories.")
            } else {
                let mut lines = vec![format!("{topic} commands:")];
                for entry in &matching {
                    lines.push(format!("  - {}: {}", entry.name, entry.description));
                }
                lines.join("\n")
            }
        }
    }
}

/// JSON Schema formatted tool list.
pub fn to_json_schema(registry: &CommandRegistry) -> Value {
    Value::Array(
        entries(registry)
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "description": e.description,
                    "category": e.category,
                    "inputSchema": e.param_schema,
                })
            })
            .collect(),
    )
}
