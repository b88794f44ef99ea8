//! Garden catalog tool definitions for the chat assistant.
//!
//! Tool names double as the `action` tag of the JSON reply format, so a
//! model that answers with a function call and one that answers with a JSON
//! object land on the same `AssistantAction`.

use super::types::Tool;

pub const ADD_PLANTS: &str = "add_plants";
pub const REMOVE_PLANTS: &str = "remove_plants";
pub const REMOVE_BED: &str = "remove_bed";

/// Build the set of catalog-mutating tools offered to the model.
///
/// Plain conversation needs no tool: a text reply is treated as chat.
#[must_use]
pub fn garden_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: ADD_PLANTS.into(),
            description: "Add one or more plants to a named garden bed. The bed is created if the user \
                          does not have one with that name yet."
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "bedName": { "type": "string", "description": "Name of the garden bed, e.g. \"herb garden\"" },
                    "plants": {
                        "type": "array",
                        "description": "Plants to add",
                        "items": {
                            "type": "object",
                            "properties": {
                                "commonName": { "type": "string", "description": "Common name, e.g. \"basil\"" },
                                "scientificName": { "type": "string", "description": "Botanical name if known" },
                                "quantity": { "type": "integer", "description": "How many were planted (default 1)" },
                                "notes": { "type": "string", "description": "Anything else the user mentioned" }
                            },
                            "required": ["commonName"]
                        }
                    },
                    "response": { "type": "string", "description": "Friendly confirmation shown to the user" }
                },
                "required": ["bedName", "plants", "response"]
            }),
        },
        Tool {
            name: REMOVE_PLANTS.into(),
            description: "Remove plants, by common name, from a named garden bed.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "bedName": { "type": "string", "description": "Name of the garden bed" },
                    "plantNames": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Common names of the plants to remove, e.g. [\"tomato\", \"basil\"]"
                    },
                    "response": { "type": "string", "description": "Friendly confirmation shown to the user" }
                },
                "required": ["bedName", "plantNames", "response"]
            }),
        },
        Tool {
            name: REMOVE_BED.into(),
            description: "Delete an entire garden bed together with every plant in it.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "bedName": { "type": "string", "description": "Name of the garden bed to remove" },
                    "response": { "type": "string", "description": "Friendly confirmation shown to the user" }
                },
                "required": ["bedName", "response"]
            }),
        },
    ]
}

#[cfg(test)]
#[path = "tools_test.rs"]
mod tests;
