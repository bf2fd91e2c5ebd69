use super::lenient::{null_as_default, null_as_true};
use super::lorebook::{CharacterBook, LorebookEntry};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const CARD_SPEC: &str = "chara_card_v3";
pub const CARD_SPEC_VERSION: &str = "3.0";

fn default_spec() -> String {
    CARD_SPEC.to_string()
}

fn default_spec_version() -> String {
    CARD_SPEC_VERSION.to_string()
}

fn spec_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|spec| !spec.is_empty())
        .unwrap_or_else(default_spec))
}

fn spec_version_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|version| !version.is_empty())
        .unwrap_or_else(default_spec_version))
}

/// A character card in the v3 layout consumed by SillyTavern.
///
/// The top-level text fields mirror `data.*`; every mutation goes through
/// the setters below so both copies stay equal. Model output often writes
/// `null` for an empty field, so every field reads `null` as its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterCard {
    #[serde(default = "default_spec", deserialize_with = "spec_or_default")]
    pub spec: String,
    #[serde(default = "default_spec_version", deserialize_with = "spec_version_or_default")]
    pub spec_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub personality: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scenario: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_mes: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: CardData,
    /// Fields we do not model, kept so a round trip loses nothing.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub personality: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scenario: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_mes: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alternate_greetings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_book: Option<CharacterBook>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extensions: CardExtensions,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardExtensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub regex_scripts: Vec<RegexScript>,
    #[serde(
        default,
        rename = "TavernHelper_scripts",
        deserialize_with = "null_as_default"
    )]
    pub tavern_helper_scripts: Vec<HelperScript>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexScript {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub script_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub find_regex: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub replace_string: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub placement: Vec<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub markdown_only: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt_only: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub run_on_edit: bool,
    /// `None` means the script fires at any depth.
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A TavernHelper script entry. Only the fields we write are modelled;
/// the rest (`button`, `data`, `info`, ...) ride along in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HelperScript {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: HelperScriptValue,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HelperScriptValue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default = "default_enabled", deserialize_with = "null_as_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl Default for HelperScriptValue {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            content: String::new(),
            enabled: true,
            extra: Map::new(),
        }
    }
}

impl CharacterCard {
    pub fn new(name: impl Into<String>) -> Self {
        let mut card = Self {
            spec: default_spec(),
            spec_version: default_spec_version(),
            name: String::new(),
            description: String::new(),
            personality: String::new(),
            scenario: String::new(),
            first_mes: String::new(),
            data: CardData::default(),
            extra: Map::new(),
        };
        card.set_name(name);
        card
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.data.name = self.name.clone();
    }

    pub fn set_first_mes(&mut self, greeting: impl Into<String>) {
        self.first_mes = greeting.into();
        self.data.first_mes = self.first_mes.clone();
    }

    /// Reconcile top-level fields with their `data` copies after the card
    /// came from somewhere we do not control. A non-empty `data` value wins.
    pub fn sync_mirrors(&mut self) {
        fn sync(top: &mut String, nested: &mut String) {
            if nested.is_empty() {
                nested.clone_from(top);
            } else {
                top.clone_from(nested);
            }
        }
        sync(&mut self.name, &mut self.data.name);
        sync(&mut self.description, &mut self.data.description);
        sync(&mut self.personality, &mut self.data.personality);
        sync(&mut self.scenario, &mut self.data.scenario);
        sync(&mut self.first_mes, &mut self.data.first_mes);
    }

    /// Returns false when the greeting was already present.
    pub fn add_alternate_greeting(&mut self, greeting: &str) -> bool {
        if self.data.alternate_greetings.iter().any(|g| g == greeting) {
            return false;
        }
        self.data.alternate_greetings.push(greeting.to_string());
        true
    }

    pub fn lorebook_entries(&self) -> &[LorebookEntry] {
        self.data
            .character_book
            .as_ref()
            .map(|book| book.entries.as_slice())
            .unwrap_or_default()
    }

    /// The card's lorebook, created empty as "<name> Lorebook" if missing.
    pub fn lorebook_mut(&mut self) -> &mut CharacterBook {
        let name = &self.name;
        self.data
            .character_book
            .get_or_insert_with(|| CharacterBook::named(format!("{} Lorebook", name)))
    }

    pub fn max_insertion_order(&self) -> i64 {
        self.lorebook_entries()
            .iter()
            .map(|entry| entry.insertion_order)
            .fold(0, i64::max)
    }

    pub fn regex_scripts(&self) -> &[RegexScript] {
        &self.data.extensions.regex_scripts
    }

    pub fn helper_scripts(&self) -> &[HelperScript] {
        &self.data.extensions.tavern_helper_scripts
    }
}
