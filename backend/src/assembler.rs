use crate::error::{ForgeError, ForgeResult};
use crate::invoker::ResilientInvoker;
use crate::library::{KnowledgeContext, knowledge_section};
use crate::llm::{GenerationRequest, parse_model_json};
use crate::schema;
use shared::models::{
    CardOptions, CharacterCard, Feature, HelperScript, HelperScriptValue, KnowledgeFile, RegexScript,
};
use tracing::info;

pub const STATUS_PANEL_SCRIPT_ID: &str = "STATUS_PANEL_V1";
pub const WELCOME_SCREEN_SCRIPT_ID: &str = "WELCOME_SCREEN_V1";
pub const CHAR_CREATOR_SCRIPT_ID: &str = "CHAR_CREATOR_V1";

/// Matches the `<DATA_BLOCK>` the model emits every turn; `$1` is its body.
pub const STATUS_PANEL_TRIGGER: &str = r"/<DATA_BLOCK>([\s\S]*?)<\/DATA_BLOCK>/s";
pub const WELCOME_TRIGGER: &str = "【Opening】";
pub const CREATOR_TRIGGER: &str = "【Character Creation】";

pub const PROGRESSION_HELPER_ID: &str = "mvu-beta-script";
const PROGRESSION_HELPER_NAME: &str = "MVU beta";
const PROGRESSION_HELPER_IMPORT: &str =
    "import 'https://testingcf.jsdelivr.net/gh/MagicalAstrogy/MagVarUpdate@beta/artifact/bundle.js'";

/// SillyTavern renders ```html blocks in chat as live markup.
pub fn fence_html(code: &str) -> String {
    format!("```html\n{}\n```", code)
}

fn snippet_script(id: &str, name: &str, trigger: &str, code: &str, max_depth: Option<u32>) -> RegexScript {
    RegexScript {
        id: id.to_string(),
        script_name: name.to_string(),
        find_regex: trigger.to_string(),
        replace_string: fence_html(code),
        placement: vec![2],
        disabled: false,
        markdown_only: true,
        prompt_only: false,
        run_on_edit: true,
        max_depth,
        extra: Default::default(),
    }
}

/// Replaces a script with the same id in place, or appends it.
pub fn upsert_regex_script(card: &mut CharacterCard, script: RegexScript) {
    let scripts = &mut card.data.extensions.regex_scripts;
    match scripts.iter_mut().find(|s| s.id == script.id) {
        Some(existing) => *existing = script,
        None => scripts.push(script),
    }
}

pub fn progression_helper() -> HelperScript {
    HelperScript {
        kind: "script".to_string(),
        value: HelperScriptValue {
            id: PROGRESSION_HELPER_ID.to_string(),
            name: PROGRESSION_HELPER_NAME.to_string(),
            content: PROGRESSION_HELPER_IMPORT.to_string(),
            enabled: true,
            extra: Default::default(),
        },
        extra: Default::default(),
    }
}

/// Adds the progression helper unless a script with its id is already there.
pub fn inject_progression_helper(mut card: CharacterCard) -> CharacterCard {
    let scripts = &mut card.data.extensions.tavern_helper_scripts;
    if !scripts.iter().any(|s| s.value.id == PROGRESSION_HELPER_ID) {
        scripts.push(progression_helper());
    }
    card
}

/// Turns the selected UI snippets into regex scripts and points the greetings
/// at their triggers.
pub fn apply_ui_snippets(mut card: CharacterCard, options: &CardOptions) -> CharacterCard {
    let welcome = options.welcome_screen_code.as_deref().filter(|c| !c.trim().is_empty());
    let creator = options.creator_code.as_deref().filter(|c| !c.trim().is_empty());
    let status = options.status_panel_code.as_deref().filter(|c| !c.trim().is_empty());

    if let Some(code) = status {
        upsert_regex_script(
            &mut card,
            snippet_script(STATUS_PANEL_SCRIPT_ID, "[UI] Status Panel", STATUS_PANEL_TRIGGER, code, None),
        );
    }
    // Greeting triggers only fire once, on the opening message.
    if let Some(code) = welcome {
        upsert_regex_script(
            &mut card,
            snippet_script(WELCOME_SCREEN_SCRIPT_ID, "[UI] Welcome Screen", WELCOME_TRIGGER, code, Some(1)),
        );
    }
    if let Some(code) = creator {
        upsert_regex_script(
            &mut card,
            snippet_script(CHAR_CREATOR_SCRIPT_ID, "[UI] Character Creator", CREATOR_TRIGGER, code, Some(1)),
        );
    }

    match (welcome.is_some(), creator.is_some()) {
        (true, true) => {
            card.set_first_mes(WELCOME_TRIGGER);
            card.add_alternate_greeting(CREATOR_TRIGGER);
        }
        (true, false) => card.set_first_mes(WELCOME_TRIGGER),
        (false, true) => card.set_first_mes(CREATOR_TRIGGER),
        (false, false) => {}
    }
    card
}

/// Parses a full card produced by the model and reconciles its mirrored fields.
pub fn parse_card(raw: &str, context: &'static str) -> ForgeResult<CharacterCard> {
    let mut card: CharacterCard = parse_model_json(raw, context)?;
    card.sync_mirrors();
    if card.name.trim().is_empty() {
        tracing::error!(context = %context, raw = %raw, "Model card has no name");
        return Err(ForgeError::malformed(context, raw));
    }
    Ok(card)
}

/// Post-generation merge over the raw model output.
pub fn merge_generated_card(raw: &str, options: &CardOptions, features: &[Feature]) -> ForgeResult<CharacterCard> {
    let card = parse_card(raw, "generated card")?;
    let mut card = apply_ui_snippets(card, options);
    if features.contains(&Feature::ProgressionSystem) {
        card = inject_progression_helper(card);
    }
    Ok(card)
}

fn lore_section(options: &CardOptions) -> String {
    if let Some(entries) = options.imported_lorebook() {
        let entries_json =
            serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string());
        return format!(
            "
**MANDATORY WORLD BOOK (IMPORTANT):**
- The user supplied a complete world book.
- **YOUR TASK:** You MUST use exactly the 'entries' array below as 'data.character_book.entries' in the final JSON object. Do NOT change, add or remove any entry.
- Build the rest of the card (name, description, scenario, and so on) to fit the content of this world book perfectly.
- **World book content to include:**
```json
{entries_json}
```
"
        );
    }

    let custom: Vec<String> = options
        .custom_lore_requests()
        .enumerate()
        .map(|(i, req)| format!("  - Request {}: \"{}\"", i + 1, req))
        .collect();
    let custom_section = if custom.is_empty() {
        String::new()
    } else {
        format!(
            "
**Custom world book requests:**
- In addition to the requested number of entries, you MUST create extra lorebook entries for these specific requests:
{}",
            custom.join("\n")
        )
    };

    format!(
        "
- Number of world book entries (automatic): {count}
**WORLD BOOK RULES (IMPORTANT):**
1.  **Core instructions first:** The first entries of character_book MUST be the technical instructions that make the card work (how to use the MVU variables, how to fill the UI data tags, and so on).
2.  **Then the rest:** Once the core instructions are written, use the remaining entries to build the world.
{custom_section}
",
        count = options.lore_entry_count,
    )
}

/// The full-card generation prompt.
pub fn build_card_prompt(options: &CardOptions, library: &[KnowledgeFile]) -> String {
    let knowledge = knowledge_section(
        library,
        options.reference_card_id.as_deref(),
        KnowledgeContext::Create,
    );
    format!(
        "You are an expert at building advanced SillyTavern cards. Your task is to produce a complete JSON object for a SillyTavern v3 character card.

**Basics:**
- Card name: \"{name}\"
- Theme/keywords: \"{theme}\"
- First message idea: \"{idea}\"
{lore}
{knowledge}

**General requirements:**
- The final output must be a single valid JSON object that follows the provided schema. Do not add any explanation.

Create the card now.",
        name = options.name,
        theme = options.theme,
        idea = options.first_message_idea,
        lore = lore_section(options),
    )
}

/// Generates a whole card and splices the selected snippets into it.
#[derive(Clone)]
pub struct CardAssembler {
    invoker: ResilientInvoker,
}

impl CardAssembler {
    pub fn new(invoker: ResilientInvoker) -> Self {
        Self { invoker }
    }

    pub async fn assemble(
        &self,
        raw_keys: &str,
        options: &CardOptions,
        features: &[Feature],
        library: &[KnowledgeFile],
    ) -> ForgeResult<CharacterCard> {
        if options.name.trim().is_empty() || options.theme.trim().is_empty() {
            return Err(ForgeError::validation("A card needs a name and a theme."));
        }
        info!(name = %options.name, ?features, "Assembling card");
        let request = GenerationRequest::new(
            build_card_prompt(options, library),
            "character_card",
            schema::character_card(),
        );
        let raw = self.invoker.invoke(raw_keys, &request, 0).await?;
        merge_generated_card(&raw, options, features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;
    use serde_json::json;
    use shared::models::LorebookEntry;
    use std::sync::Arc;

    fn raw_card() -> String {
        json!({
            "spec": "chara_card_v3",
            "spec_version": "3.0",
            "name": "Aster",
            "first_mes": "The gates creak open.",
            "data": {
                "name": "Aster",
                "first_mes": "The gates creak open.",
                "alternate_greetings": ["Another day."]
            }
        })
        .to_string()
    }

    fn all_snippets() -> CardOptions {
        CardOptions {
            name: "Aster".into(),
            theme: "gothic".into(),
            welcome_screen_code: Some("<div>welcome</div>".into()),
            creator_code: Some("<form></form>".into()),
            status_panel_code: Some("<div>$1</div>".into()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_containers_are_created() {
        let card = merge_generated_card(r#"{"name": "Bare"}"#, &CardOptions::default(), &[]).unwrap();
        let value = serde_json::to_value(&card).unwrap();
        assert!(value["data"]["extensions"]["regex_scripts"].is_array());
        assert!(value["data"]["extensions"]["TavernHelper_scripts"].is_array());
        assert!(value["data"]["alternate_greetings"].is_array());
        assert_eq!(value["data"]["name"], "Bare");
    }

    #[test]
    fn snippets_become_regex_scripts() {
        let card = merge_generated_card(&raw_card(), &all_snippets(), &[]).unwrap();
        let scripts = card.regex_scripts();
        let ids: Vec<&str> = scripts.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, [STATUS_PANEL_SCRIPT_ID, WELCOME_SCREEN_SCRIPT_ID, CHAR_CREATOR_SCRIPT_ID]);

        assert_eq!(scripts[0].find_regex, STATUS_PANEL_TRIGGER);
        assert_eq!(scripts[0].max_depth, None);
        assert_eq!(scripts[0].replace_string, "```html\n<div>$1</div>\n```");
        assert_eq!(scripts[1].find_regex, WELCOME_TRIGGER);
        assert_eq!(scripts[1].max_depth, Some(1));
        assert_eq!(scripts[2].find_regex, CREATOR_TRIGGER);
        assert_eq!(scripts[2].max_depth, Some(1));
        assert!(scripts.iter().all(|s| s.placement == [2] && !s.disabled && s.run_on_edit));
    }

    #[test]
    fn welcome_and_creator_wire_both_greetings() {
        let options = all_snippets();
        let card = merge_generated_card(&raw_card(), &options, &[]).unwrap();
        let card = apply_ui_snippets(card, &options);

        assert_eq!(card.first_mes, WELCOME_TRIGGER);
        assert_eq!(card.data.first_mes, WELCOME_TRIGGER);
        let creators = card
            .data
            .alternate_greetings
            .iter()
            .filter(|g| *g == CREATOR_TRIGGER)
            .count();
        assert_eq!(creators, 1);
        assert_eq!(card.data.alternate_greetings[0], "Another day.");
        assert_eq!(card.regex_scripts().len(), 3);
    }

    #[test]
    fn single_snippet_sets_its_trigger() {
        let options = CardOptions {
            creator_code: Some("<form></form>".into()),
            ..Default::default()
        };
        let card = merge_generated_card(&raw_card(), &options, &[]).unwrap();
        assert_eq!(card.first_mes, CREATOR_TRIGGER);
        assert_eq!(card.data.first_mes, CREATOR_TRIGGER);
        assert_eq!(card.data.alternate_greetings, ["Another day."]);
    }

    #[test]
    fn no_greeting_snippets_keeps_model_greeting() {
        let options = CardOptions {
            status_panel_code: Some("<div>$1</div>".into()),
            ..Default::default()
        };
        let card = merge_generated_card(&raw_card(), &options, &[]).unwrap();
        assert_eq!(card.first_mes, "The gates creak open.");
        assert_eq!(card.data.first_mes, "The gates creak open.");
    }

    #[test]
    fn progression_helper_is_injected_once() {
        let card = merge_generated_card(&raw_card(), &CardOptions::default(), &[Feature::ProgressionSystem]).unwrap();
        let card = inject_progression_helper(card);
        let helpers: Vec<_> = card
            .helper_scripts()
            .iter()
            .filter(|s| s.value.id == PROGRESSION_HELPER_ID)
            .collect();
        assert_eq!(helpers.len(), 1);
        assert!(helpers[0].value.enabled);
        assert_eq!(helpers[0].kind, "script");
    }

    #[test]
    fn helper_needs_the_feature() {
        let card = merge_generated_card(&raw_card(), &CardOptions::default(), &[Feature::Lorebook]).unwrap();
        assert!(card.helper_scripts().is_empty());
    }

    #[test]
    fn null_containers_are_treated_as_missing() {
        let raw = json!({
            "name": "Aster",
            "first_mes": null,
            "data": {
                "name": "Aster",
                "alternate_greetings": null,
                "extensions": { "regex_scripts": null, "TavernHelper_scripts": null }
            }
        })
        .to_string();
        let card = merge_generated_card(&raw, &all_snippets(), &[Feature::ProgressionSystem]).unwrap();
        assert_eq!(card.regex_scripts().len(), 3);
        assert_eq!(card.helper_scripts().len(), 1);
        assert_eq!(card.data.alternate_greetings, [CREATOR_TRIGGER]);
        assert_eq!(card.first_mes, WELCOME_TRIGGER);
    }

    #[test]
    fn non_json_output_is_malformed() {
        let err = merge_generated_card("The card is ready!", &CardOptions::default(), &[]).unwrap_err();
        assert!(matches!(err, ForgeError::MalformedResponse { .. }));
    }

    #[test]
    fn nameless_card_is_malformed() {
        let err = merge_generated_card(r#"{"data": {}}"#, &CardOptions::default(), &[]).unwrap_err();
        assert!(matches!(err, ForgeError::MalformedResponse { .. }));
    }

    #[test]
    fn assembled_card_round_trips_with_required_fields() {
        let card = merge_generated_card(r#"{"name": "Bare"}"#, &all_snippets(), &[Feature::ProgressionSystem]).unwrap();
        let text = serde_json::to_string(&card).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        for key in ["spec", "spec_version", "name", "first_mes", "data"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["data"]["extensions"]["regex_scripts"].is_array());
    }

    #[test]
    fn prompt_counts_entries_and_lists_custom_requests() {
        let options = CardOptions {
            name: "Aster".into(),
            theme: "gothic".into(),
            first_message_idea: "a storm".into(),
            lore_entry_count: 7,
            custom_lore_requests: vec!["the old church".into(), " ".into()],
            ..Default::default()
        };
        let prompt = build_card_prompt(&options, &[]);
        assert!(prompt.contains("(automatic): 7"));
        assert!(prompt.contains("Core instructions first"));
        assert!(prompt.contains("Request 1: \"the old church\""));
        assert!(!prompt.contains("Request 2"));
        assert!(!prompt.contains("KNOWLEDGE LIBRARY"));
    }

    #[test]
    fn imported_lorebook_overrides_entry_count() {
        let options = CardOptions {
            name: "Aster".into(),
            theme: "gothic".into(),
            lore_entry_count: 7,
            imported_lorebook: Some(vec![LorebookEntry::new(
                vec!["crypt".into()],
                "The crypt lies beneath.",
                "Crypt",
            )]),
            ..Default::default()
        };
        let prompt = build_card_prompt(&options, &[]);
        assert!(prompt.contains("MANDATORY WORLD BOOK"));
        assert!(prompt.contains("The crypt lies beneath."));
        assert!(!prompt.contains("(automatic)"));
    }

    #[test]
    fn prompt_includes_pinned_reference() {
        let library = vec![KnowledgeFile {
            id: "ref.json".into(),
            name: "ref.json".into(),
            content: "{\"spec\":\"chara_card_v3\"}".into(),
        }];
        let options = CardOptions {
            name: "Aster".into(),
            theme: "gothic".into(),
            reference_card_id: Some("ref.json".into()),
            ..Default::default()
        };
        let prompt = build_card_prompt(&options, &library);
        assert!(prompt.contains("Selected reference file: \"ref.json\""));
        assert!(prompt.contains("{\"spec\":\"chara_card_v3\"}"));
    }

    #[tokio::test]
    async fn assemble_runs_the_whole_pipeline() {
        let backend = Arc::new(ScriptedBackend::always(raw_card()));
        let assembler = CardAssembler::new(ResilientInvoker::new(backend.clone()));
        let card = assembler
            .assemble("k0", &all_snippets(), &[Feature::ProgressionSystem], &[])
            .await
            .unwrap();
        assert_eq!(card.first_mes, WELCOME_TRIGGER);
        assert_eq!(card.helper_scripts().len(), 1);
        assert!(backend.last_prompt().contains("Card name: \"Aster\""));
    }

    #[tokio::test]
    async fn assemble_requires_name_and_theme() {
        let backend = Arc::new(ScriptedBackend::always(raw_card()));
        let assembler = CardAssembler::new(ResilientInvoker::new(backend.clone()));
        let err = assembler
            .assemble("k0", &CardOptions::default(), &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::Validation(_)));
        assert!(backend.attempts().is_empty());
    }
}
