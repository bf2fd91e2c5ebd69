use crate::assembler::{fence_html, parse_card};
use crate::error::{ForgeError, ForgeResult};
use crate::invoker::ResilientInvoker;
use crate::library::{KnowledgeContext, knowledge_section};
use crate::llm::{GenerationRequest, parse_model_json};
use crate::lorebook::find_lorebook_entries;
use crate::schema;
use serde::Deserialize;
use serde_json::Value;
use shared::models::{
    CharacterCard, KnowledgeFile, LoreSuggestions, LorebookEntry, LorebookImport, RegexScript,
};
use tracing::info;
use uuid::Uuid;

pub const CUSTOM_SCRIPT_PREFIX: &str = "[CUSTOM] ";

#[derive(Deserialize)]
struct NewEntries {
    new_entries: Vec<LorebookEntry>,
}

#[derive(Deserialize)]
struct RegexAddition {
    regex_script: ScriptDraft,
    lorebook_entry: LorebookEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptDraft {
    script_name: String,
    find_regex: String,
}

/// One line per existing entry so the model can avoid duplicates.
fn summarize_entries(entries: &[LorebookEntry]) -> String {
    if entries.is_empty() {
        return "(none yet)".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            let preview: String = entry.content.chars().take(100).collect();
            format!("- {}: {}...", entry.comment, preview)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn add_lore_prompt(card: &CharacterCard, count: u32) -> String {
    format!(
        "You are a world builder for SillyTavern character cards. Expand the world book of the card below.

**Card:** \"{name}\"
**Description:** {description}
**Scenario:** {scenario}

**Existing world book entries:**
{existing}

**Task:**
- Write exactly {count} NEW world book entries that deepen this setting.
- Do not repeat or contradict the existing entries.
- Every entry needs trigger keys, content and a short comment naming it.
- Return the result as JSON following the schema.",
        name = card.name,
        description = card.description,
        scenario = card.scenario,
        existing = summarize_entries(card.lorebook_entries()),
    )
}

fn regex_prompt(card: &CharacterCard, description: &str, ui_code: &str) -> String {
    format!(
        "You are a SillyTavern scripting expert. The user wants to add a custom UI to the card \"{name}\".

**What the UI should do:** {description}

**UI code (HTML):**
```html
{ui_code}
```

**Task:**
1. Write a regex script: give it a short `scriptName` and a `findRegex` that matches a tag or block the AI will output during chat. Capture groups can be referenced in the UI code as `$1`, `$2` and so on.
2. Write ONE world book entry that instructs the AI exactly when and how to output the text matched by `findRegex`, including the data it must put inside.
- Return the result as JSON following the schema.",
        name = card.name,
    )
}

fn fix_prompt(broken_card: &str, error_description: &str, knowledge: &str) -> String {
    format!(
        "You are an expert at debugging SillyTavern character cards. The card below is broken.

**Problem reported by the user:** {error_description}
{knowledge}
**Broken card:**
```json
{broken_card}
```

**Task:**
- Find and repair everything that causes the problem: invalid HTML, broken regex scripts, lorebook entries that give wrong instructions, missing fields.
- Keep everything that already works unchanged.
- Return the COMPLETE repaired card as a single JSON object following the schema. Do not add any explanation."
    )
}

fn analyze_prompt(entries: &[LorebookEntry]) -> ForgeResult<String> {
    let entries_json = serde_json::to_string_pretty(entries)
        .map_err(|e| ForgeError::validation(format!("Lorebook is not serializable: {e}")))?;
    Ok(format!(
        "You are a creative assistant for SillyTavern cards. Below is a world book imported by the user.

**World book entries:**
```json
{entries_json}
```

**Task:**
- Suggest a fitting character or card name.
- Suggest themes and keywords, separated by commas.
- Suggest an engaging first message idea that fits this world.
- Return the result as JSON following the schema."
    ))
}

/// Model-assisted edits on an existing card.
#[derive(Clone)]
pub struct CardEnhancer {
    invoker: ResilientInvoker,
}

impl CardEnhancer {
    pub fn new(invoker: ResilientInvoker) -> Self {
        Self { invoker }
    }

    /// Appends `count` new lorebook entries, ordered after the existing ones.
    pub async fn add_lore_entries(
        &self,
        raw_keys: &str,
        mut card: CharacterCard,
        count: u32,
    ) -> ForgeResult<CharacterCard> {
        if count == 0 {
            return Err(ForgeError::validation("Ask for at least one entry."));
        }
        let request = GenerationRequest::new(
            add_lore_prompt(&card, count),
            "new_lore_entries",
            schema::new_lore_entries(),
        );
        let raw = self.invoker.invoke(raw_keys, &request, 0).await?;
        let NewEntries { new_entries } = parse_model_json(&raw, "new lorebook entries")?;

        let mut next = card.max_insertion_order();
        let added = new_entries.len();
        let book = card.lorebook_mut();
        for mut entry in new_entries {
            next += 1;
            entry.insertion_order = next;
            entry.enabled = true;
            book.entries.push(entry);
        }
        info!(card = %card.name, added, "Added lorebook entries");
        Ok(card)
    }

    /// Wires a custom UI snippet into the card with its own trigger and a lorebook
    /// entry that teaches the model to emit that trigger.
    pub async fn generate_and_add_regex(
        &self,
        raw_keys: &str,
        mut card: CharacterCard,
        description: &str,
        ui_code: &str,
    ) -> ForgeResult<CharacterCard> {
        if description.trim().is_empty() || ui_code.trim().is_empty() {
            return Err(ForgeError::validation(
                "Both a description and the UI code are required.",
            ));
        }
        let request = GenerationRequest::new(
            regex_prompt(&card, description, ui_code),
            "regex_addition",
            schema::regex_addition(),
        );
        let raw = self.invoker.invoke(raw_keys, &request, 0).await?;
        let RegexAddition {
            regex_script,
            mut lorebook_entry,
        } = parse_model_json(&raw, "regex script")?;

        let script = RegexScript {
            id: format!("CUSTOM_REGEX_{}", Uuid::now_v7().simple()),
            script_name: format!("{CUSTOM_SCRIPT_PREFIX}{}", regex_script.script_name),
            find_regex: regex_script.find_regex,
            replace_string: fence_html(ui_code),
            placement: vec![2],
            disabled: false,
            markdown_only: false,
            prompt_only: false,
            run_on_edit: true,
            max_depth: None,
            extra: Default::default(),
        };
        info!(card = %card.name, id = %script.id, "Adding custom regex script");
        card.data.extensions.regex_scripts.push(script);

        lorebook_entry.insertion_order = card.max_insertion_order() + 1;
        lorebook_entry.enabled = true;
        card.lorebook_mut().entries.push(lorebook_entry);
        Ok(card)
    }

    /// Asks the model for a full replacement of a broken card.
    pub async fn fix_card(
        &self,
        raw_keys: &str,
        broken_card: &Value,
        error_description: &str,
        library: &[KnowledgeFile],
        reference_id: Option<&str>,
    ) -> ForgeResult<CharacterCard> {
        if error_description.trim().is_empty() {
            return Err(ForgeError::validation("Describe what is wrong with the card."));
        }
        let pretty = serde_json::to_string_pretty(broken_card)
            .map_err(|e| ForgeError::validation(format!("Card is not serializable: {e}")))?;
        let knowledge = knowledge_section(library, reference_id, KnowledgeContext::Fix);
        let request = GenerationRequest::new(
            fix_prompt(&pretty, error_description, &knowledge),
            "character_card",
            schema::character_card(),
        );
        let raw = self.invoker.invoke(raw_keys, &request, 0).await?;
        parse_card(&raw, "repaired card")
    }

    /// Extracts the entries of an uploaded lorebook and suggests card options for it.
    pub async fn analyze_lorebook(&self, raw_keys: &str, document: &Value) -> ForgeResult<LorebookImport> {
        let entries = find_lorebook_entries(document)?
            .ok_or_else(|| ForgeError::validation("No lorebook entries found in the uploaded file."))?;
        let request = GenerationRequest::new(
            analyze_prompt(&entries)?,
            "lore_suggestions",
            schema::lore_suggestions(),
        );
        let raw = self.invoker.invoke(raw_keys, &request, 0).await?;
        let suggestions: LoreSuggestions = parse_model_json(&raw, "lorebook suggestions")?;
        Ok(LorebookImport { suggestions, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;
    use serde_json::json;
    use shared::models::CharacterBook;
    use std::sync::Arc;

    fn enhancer(backend: &Arc<ScriptedBackend>) -> CardEnhancer {
        CardEnhancer::new(ResilientInvoker::new(backend.clone()))
    }

    fn card_with_orders(orders: &[i64]) -> CharacterCard {
        let mut card = CharacterCard::new("Aster");
        let mut book = CharacterBook::named("Aster Lorebook");
        for order in orders {
            let mut entry = LorebookEntry::new(vec!["k".into()], format!("entry {order}"), format!("e{order}"));
            entry.insertion_order = *order;
            book.entries.push(entry);
        }
        card.data.character_book = Some(book);
        card
    }

    fn two_new_entries() -> String {
        json!({
            "new_entries": [
                { "keys": ["tower"], "content": "A tall tower.", "comment": "Tower" },
                { "keys": ["river"], "content": "A dark river.", "comment": "River" }
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn new_entries_follow_the_highest_order() {
        let backend = Arc::new(ScriptedBackend::always(two_new_entries()));
        let card = enhancer(&backend)
            .add_lore_entries("k0", card_with_orders(&[1, 3, 5]), 2)
            .await
            .unwrap();

        let orders: Vec<i64> = card.lorebook_entries().iter().map(|e| e.insertion_order).collect();
        assert_eq!(orders, [1, 3, 5, 6, 7]);
        assert_eq!(card.lorebook_entries()[3].content, "A tall tower.");
        assert!(backend.last_prompt().contains("- e3: entry 3..."));
    }

    #[tokio::test]
    async fn missing_lorebook_is_created() {
        let backend = Arc::new(ScriptedBackend::always(two_new_entries()));
        let card = enhancer(&backend)
            .add_lore_entries("k0", CharacterCard::new("Aster"), 2)
            .await
            .unwrap();

        let book = card.data.character_book.as_ref().unwrap();
        assert_eq!(book.name, "Aster Lorebook");
        let orders: Vec<i64> = book.entries.iter().map(|e| e.insertion_order).collect();
        assert_eq!(orders, [1, 2]);
    }

    #[tokio::test]
    async fn missing_new_entries_is_malformed() {
        let backend = Arc::new(ScriptedBackend::always(r#"{"entries": []}"#));
        let err = enhancer(&backend)
            .add_lore_entries("k0", CharacterCard::new("Aster"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn zero_entries_is_rejected_before_calling_the_model() {
        let backend = Arc::new(ScriptedBackend::always(two_new_entries()));
        let err = enhancer(&backend)
            .add_lore_entries("k0", CharacterCard::new("Aster"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::Validation(_)));
        assert!(backend.attempts().is_empty());
    }

    #[tokio::test]
    async fn custom_regex_adds_script_and_entry() {
        let answer = json!({
            "regex_script": { "scriptName": "Inventory", "findRegex": "<inv>(.*?)</inv>" },
            "lorebook_entry": { "keys": ["inventory"], "content": "Wrap items in <inv>.", "comment": "Inventory rule" }
        })
        .to_string();
        let backend = Arc::new(ScriptedBackend::always(answer));
        let card = enhancer(&backend)
            .generate_and_add_regex("k0", card_with_orders(&[4]), "an inventory", "<ul>$1</ul>")
            .await
            .unwrap();

        let script = card.regex_scripts().last().unwrap();
        assert!(script.id.starts_with("CUSTOM_REGEX_"));
        assert_eq!(script.script_name, "[CUSTOM] Inventory");
        assert_eq!(script.find_regex, "<inv>(.*?)</inv>");
        assert_eq!(script.replace_string, "```html\n<ul>$1</ul>\n```");

        let entry = card.lorebook_entries().last().unwrap();
        assert_eq!(entry.comment, "Inventory rule");
        assert_eq!(entry.insertion_order, 5);
    }

    #[tokio::test]
    async fn custom_script_ids_are_unique() {
        let answer = json!({
            "regex_script": { "scriptName": "A", "findRegex": "<a>" },
            "lorebook_entry": { "keys": ["a"], "content": "a" }
        })
        .to_string();
        let backend = Arc::new(ScriptedBackend::always(answer));
        let enhancer = enhancer(&backend);
        let card = enhancer
            .generate_and_add_regex("k0", CharacterCard::new("Aster"), "a", "<b>")
            .await
            .unwrap();
        let card = enhancer.generate_and_add_regex("k0", card, "a", "<b>").await.unwrap();

        let scripts = card.regex_scripts();
        assert_eq!(scripts.len(), 2);
        assert_ne!(scripts[0].id, scripts[1].id);
    }

    #[tokio::test]
    async fn fix_returns_the_model_card_as_is() {
        let repaired = json!({
            "spec": "chara_card_v3",
            "spec_version": "3.0",
            "name": "Repaired",
            "first_mes": "Hello again.",
            "data": { "name": "Repaired", "first_mes": "Hello again." }
        })
        .to_string();
        let backend = Arc::new(ScriptedBackend::always(repaired));
        let broken = json!({ "name": "Broken", "data": { "extensions": { "regex_scripts": "oops" } } });
        let card = enhancer(&backend)
            .fix_card("k0", &broken, "status panel is blank", &[], None)
            .await
            .unwrap();

        assert_eq!(card.name, "Repaired");
        let value: Value = serde_json::from_str(&serde_json::to_string(&card).unwrap()).unwrap();
        assert!(value["data"]["extensions"]["regex_scripts"].as_array().unwrap().is_empty());
        let prompt = backend.last_prompt();
        assert!(prompt.contains("status panel is blank"));
        assert!(prompt.contains("\"regex_scripts\": \"oops\""));
    }

    #[tokio::test]
    async fn fix_uses_the_reference_as_a_repair_example() {
        let backend = Arc::new(ScriptedBackend::always(r#"{"name": "Fixed"}"#));
        let library = vec![KnowledgeFile {
            id: "good.json".into(),
            name: "good.json".into(),
            content: "{}".into(),
        }];
        enhancer(&backend)
            .fix_card("k0", &json!({}), "broken", &library, Some("good.json"))
            .await
            .unwrap();
        assert!(backend.last_prompt().contains("Reference file for the repair: \"good.json\""));
    }

    #[tokio::test]
    async fn analyze_suggests_options_for_the_found_entries() {
        let answer = json!({ "name": "Vale", "theme": "fog, ruins", "firstMessageIdea": "Waking in fog." }).to_string();
        let backend = Arc::new(ScriptedBackend::always(answer));
        let document = json!({ "entries": [{ "keys": ["fog"], "content": "Fog everywhere.", "comment": "Fog" }] });
        let import = enhancer(&backend).analyze_lorebook("k0", &document).await.unwrap();

        assert_eq!(import.suggestions.name, "Vale");
        assert_eq!(import.suggestions.first_message_idea, "Waking in fog.");
        assert_eq!(import.entries.len(), 1);
        let prompt = backend.last_prompt();
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("\"content\": \"Fog everywhere.\""));
        assert!(prompt.contains("\"comment\": \"Fog\""));
    }

    #[tokio::test]
    async fn analyze_without_entries_is_rejected() {
        let backend = Arc::new(ScriptedBackend::always("{}"));
        let err = enhancer(&backend)
            .analyze_lorebook("k0", &json!({ "name": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::Validation(_)));
        assert!(backend.attempts().is_empty());
    }
}
