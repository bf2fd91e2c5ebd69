use super::card::CharacterCard;
use super::knowledge::NewKnowledgeFile;
use super::lorebook::LorebookEntry;
use super::options::{CardOptions, Feature, WorkshopOptions};
use serde::{Deserialize, Serialize};

// Every request carries the caller's raw key list (comma or newline separated).

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PreviewRequest {
    pub api_keys: String,
    pub theme: String,
    pub options: WorkshopOptions,
    /// 1 to 8.
    pub count: u32,
    /// Fan out one single-item request per preview across the key rotation.
    #[serde(default)]
    pub accelerated: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EditPreviewRequest {
    pub api_keys: String,
    pub current_code: String,
    pub instruction: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EditPreviewResponse {
    pub updated_code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssembleRequest {
    pub api_keys: String,
    pub options: CardOptions,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AddLoreRequest {
    pub api_keys: String,
    pub card: CharacterCard,
    pub count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AddRegexRequest {
    pub api_keys: String,
    pub card: CharacterCard,
    pub description: String,
    pub ui_code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FixCardRequest {
    pub api_keys: String,
    /// The broken card may not match the card schema at all.
    pub card: serde_json::Value,
    pub error_description: String,
    #[serde(default)]
    pub reference_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnalyzeLorebookRequest {
    pub api_keys: String,
    pub document: serde_json::Value,
}

/// Card option suggestions derived from an imported lorebook.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoreSuggestions {
    pub name: String,
    pub theme: String,
    pub first_message_idea: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LorebookImport {
    pub suggestions: LoreSuggestions,
    pub entries: Vec<LorebookEntry>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AddKnowledgeFilesRequest {
    pub files: Vec<NewKnowledgeFile>,
}
