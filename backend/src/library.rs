use shared::models::{KnowledgeFile, NewKnowledgeFile};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub type LibraryResult<T> = Result<T, LibraryError>;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Library storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Library serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Knowledge file not found: {0}")]
    NotFound(String),
}

/// Reference cards the user uploaded, persisted as one JSON file.
#[derive(Clone, Debug)]
pub struct KnowledgeLibrary {
    path: PathBuf,
    files: Vec<KnowledgeFile>,
}

impl KnowledgeLibrary {
    /// A missing file is an empty library; a corrupt one is logged and dropped.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let files = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Discarding corrupt knowledge library {:?}: {}", path, e);
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        info!("Loaded {} knowledge files from {:?}", files.len(), path);
        Self { path, files }
    }

    pub fn in_memory(path: impl Into<PathBuf>, files: Vec<KnowledgeFile>) -> Self {
        Self {
            path: path.into(),
            files,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn files(&self) -> &[KnowledgeFile] {
        &self.files
    }

    pub fn find(&self, id: &str) -> Option<&KnowledgeFile> {
        self.files.iter().find(|f| f.id == id)
    }

    /// Upserts by file name. Replaced files keep their position.
    pub fn add_files(&mut self, files: Vec<NewKnowledgeFile>) {
        for NewKnowledgeFile { name, content } in files {
            let file = KnowledgeFile {
                id: name.clone(),
                name,
                content,
            };
            match self.files.iter_mut().find(|f| f.id == file.id) {
                Some(existing) => *existing = file,
                None => self.files.push(file),
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> LibraryResult<KnowledgeFile> {
        let index = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        Ok(self.files.remove(index))
    }

    pub async fn save(&self) -> LibraryResult<()> {
        let content = serde_json::to_string_pretty(&self.files)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Upserts and persists. The in-memory library only changes once the
    /// file was written.
    pub async fn commit_add(&mut self, files: Vec<NewKnowledgeFile>) -> LibraryResult<()> {
        let mut next = self.clone();
        next.add_files(files);
        next.save().await?;
        *self = next;
        Ok(())
    }

    /// Removes and persists, with the same guarantee as [`Self::commit_add`].
    pub async fn commit_remove(&mut self, id: &str) -> LibraryResult<KnowledgeFile> {
        let mut next = self.clone();
        let removed = next.remove(id)?;
        next.save().await?;
        *self = next;
        info!(id = %removed.id, "Removed knowledge file");
        Ok(removed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnowledgeContext {
    Create,
    Fix,
}

/// Prompt section describing how the model should use the library.
pub fn knowledge_section(
    files: &[KnowledgeFile],
    reference_id: Option<&str>,
    context: KnowledgeContext,
) -> String {
    if files.is_empty() {
        return String::new();
    }
    let mut section = String::from("\n**KNOWLEDGE LIBRARY (reference material):**\n");
    let reference = reference_id
        .filter(|id| !id.is_empty())
        .and_then(|id| files.iter().find(|f| f.id == id));

    match (reference, context) {
        (Some(file), KnowledgeContext::Create) => section.push_str(&format!(
            "**Selected reference file: \"{}\"**
- **PRIORITY REQUIREMENT:** The new card must closely follow the **style, structure and logic** of this reference file.
- **YOUR TASK:** Study the reference file in depth. Reproduce its **VISUAL STYLE** (HTML/CSS), its **DATA STRUCTURE** (how regex scripts and lorebook are organised) and its **RUNTIME LOGIC** (how scripts process data). However, **ADAPT THE CONTENT AND FEATURES** to the theme of the new card.
- **Reference file content:** ```json\n{}\n```\n",
            file.name, file.content
        )),
        (Some(file), KnowledgeContext::Fix) => section.push_str(&format!(
            "**Reference file for the repair: \"{}\"**
- **PRIORITY REQUIREMENT:** The current card is broken. This reference file is a **CORRECT** example of how a card should be structured and behave.
- **YOUR TASK:** Compare the broken card with this reference. Use the structure and code of the reference to **REPAIR** the matching parts of the broken card. For example, if the status panel is broken, look at how the reference implements its status panel and apply the same logic.
- **Reference file content:** ```json\n{}\n```\n",
            file.name, file.content
        )),
        (None, _) => {
            let names: Vec<String> = files.iter().map(|f| format!("- {}", f.name)).collect();
            section.push_str(&format!(
                "**General inspiration:**
- Below are sample cards from the user's library. Use them as **INSPIRATION** for the best solutions and structures.
- **DO NOT COPY THEM VERBATIM.** Learn their techniques, structures and ideas to produce a **NEW** card (or repair the existing one) in an original, high quality way.
- **Files in the library:**\n{}\n",
                names.join("\n")
            ));
        }
    }
    section
}
