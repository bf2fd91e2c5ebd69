use super::lorebook::LorebookEntry;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    WelcomeScreen,
    CharacterCreator,
    #[serde(rename = "dynamicStatusUI")]
    DynamicStatusUi,
    ProgressionSystem,
    RelationshipSystem,
    WorldMap,
    Lorebook,
}

/// Everything the card assembler needs from the options form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardOptions {
    pub name: String,
    pub theme: String,
    #[serde(default)]
    pub first_message_idea: String,
    #[serde(default = "default_lore_entry_count")]
    pub lore_entry_count: u32,
    #[serde(default)]
    pub custom_lore_requests: Vec<String>,
    #[serde(default)]
    pub reference_card_id: Option<String>,
    /// A complete lorebook the model must reuse verbatim.
    #[serde(default)]
    pub imported_lorebook: Option<Vec<LorebookEntry>>,
    #[serde(default)]
    pub welcome_screen_code: Option<String>,
    #[serde(default)]
    pub creator_code: Option<String>,
    #[serde(default)]
    pub status_panel_code: Option<String>,
}

fn default_lore_entry_count() -> u32 {
    5
}

impl CardOptions {
    /// Custom lore requests with blank lines dropped.
    pub fn custom_lore_requests(&self) -> impl Iterator<Item = &str> {
        self.custom_lore_requests
            .iter()
            .map(|req| req.trim())
            .filter(|req| !req.is_empty())
    }

    pub fn imported_lorebook(&self) -> Option<&[LorebookEntry]> {
        self.imported_lorebook
            .as_deref()
            .filter(|entries| !entries.is_empty())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Epic,
    Mysterious,
    Friendly,
    Minimalist,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentLength {
    Short,
    #[default]
    Medium,
    Long,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeOptions {
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub length: ContentLength,
    #[serde(default = "default_effects")]
    pub effects: bool,
}

fn default_effects() -> bool {
    true
}

impl Default for WelcomeOptions {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            length: ContentLength::default(),
            effects: default_effects(),
        }
    }
}

/// Per-workshop options, tagged by the kind of snippet being generated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorkshopOptions {
    WelcomeScreen(WelcomeOptions),
    CharacterCreator { description: String },
    StatusPanel { description: String },
    RegexWidget { description: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreviewKind {
    WelcomeScreen,
    CharacterCreator,
    StatusPanel,
    RegexWidget,
}

impl WorkshopOptions {
    pub fn kind(&self) -> PreviewKind {
        match self {
            WorkshopOptions::WelcomeScreen(_) => PreviewKind::WelcomeScreen,
            WorkshopOptions::CharacterCreator { .. } => PreviewKind::CharacterCreator,
            WorkshopOptions::StatusPanel { .. } => PreviewKind::StatusPanel,
            WorkshopOptions::RegexWidget { .. } => PreviewKind::RegexWidget,
        }
    }
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Epic => "epic",
            Tone::Mysterious => "mysterious",
            Tone::Friendly => "friendly",
            Tone::Minimalist => "minimalist",
        }
    }
}

impl ContentLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentLength::Short => "short",
            ContentLength::Medium => "medium",
            ContentLength::Long => "long",
        }
    }
}
