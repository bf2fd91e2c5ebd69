use serde::{Deserialize, Serialize};

/// A reference card kept in the knowledge library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeFile {
    /// The uploaded file name doubles as the id.
    pub id: String,
    pub name: String,
    /// Full serialized card JSON, quoted verbatim into prompts.
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKnowledgeFile {
    pub name: String,
    pub content: String,
}
