//! JSON Schemas describing the response shape of every model request.

use serde_json::{Value, json};

fn string() -> Value {
    json!({ "type": "string" })
}

fn string_array() -> Value {
    json!({ "type": "array", "items": string() })
}

fn lore_entry() -> Value {
    json!({
        "type": "object",
        "properties": {
            "keys": string_array(),
            "content": string(),
            "comment": string()
        },
        "required": ["keys", "content"]
    })
}

pub fn preview_list(count: u32) -> Value {
    json!({
        "type": "object",
        "properties": {
            "uiPreviews": {
                "type": "array",
                "description": format!("An array of exactly {count} UI objects."),
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "A creative name for the template." },
                        "code": { "type": "string", "description": "Complete HTML, CSS and JS for the UI." }
                    },
                    "required": ["name", "code"]
                }
            }
        },
        "required": ["uiPreviews"]
    })
}

pub fn edited_code() -> Value {
    json!({
        "type": "object",
        "properties": {
            "updatedCode": { "type": "string", "description": "The modified HTML, CSS and JS." }
        },
        "required": ["updatedCode"]
    })
}

pub fn character_card() -> Value {
    let text_fields = json!({
        "name": string(),
        "description": string(),
        "personality": string(),
        "scenario": string(),
        "first_mes": string()
    });
    let mut data_properties = text_fields.clone();
    if let Value::Object(props) = &mut data_properties {
        props.insert("alternate_greetings".into(), string_array());
        props.insert(
            "character_book".into(),
            json!({
                "type": "object",
                "properties": {
                    "name": string(),
                    "entries": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "keys": string_array(),
                                "content": string(),
                                "comment": string(),
                                "enabled": { "type": "boolean" },
                                "insertion_order": { "type": "integer" }
                            }
                        }
                    }
                }
            }),
        );
        props.insert(
            "extensions".into(),
            json!({
                "type": "object",
                "properties": {
                    "world": string(),
                    "regex_scripts": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": string(),
                                "scriptName": string(),
                                "findRegex": string(),
                                "replaceString": string()
                            }
                        }
                    },
                    "TavernHelper_scripts": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": string(),
                                "value": {
                                    "type": "object",
                                    "properties": {
                                        "id": string(),
                                        "name": string(),
                                        "content": string(),
                                        "enabled": { "type": "boolean" }
                                    }
                                }
                            }
                        }
                    }
                }
            }),
        );
    }

    let mut properties = text_fields;
    if let Value::Object(props) = &mut properties {
        props.insert(
            "spec".into(),
            json!({ "type": "string", "description": "Must be 'chara_card_v3'." }),
        );
        props.insert("spec_version".into(), string());
        props.insert(
            "data".into(),
            json!({ "type": "object", "properties": data_properties }),
        );
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": ["spec", "spec_version", "name", "first_mes", "data"]
    })
}

pub fn new_lore_entries() -> Value {
    json!({
        "type": "object",
        "properties": {
            "new_entries": { "type": "array", "items": lore_entry() }
        },
        "required": ["new_entries"]
    })
}

pub fn regex_addition() -> Value {
    json!({
        "type": "object",
        "properties": {
            "regex_script": {
                "type": "object",
                "properties": {
                    "scriptName": string(),
                    "findRegex": string()
                },
                "required": ["scriptName", "findRegex"]
            },
            "lorebook_entry": lore_entry()
        },
        "required": ["regex_script", "lorebook_entry"]
    })
}

pub fn lore_suggestions() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": "Suggested character/card name." },
            "theme": { "type": "string", "description": "Suggested themes and keywords, comma separated." },
            "firstMessageIdea": { "type": "string", "description": "A first message idea that fits the lore." }
        },
        "required": ["name", "theme", "firstMessageIdea"]
    })
}
