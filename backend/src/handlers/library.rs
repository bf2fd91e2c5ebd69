use crate::AppState;
use crate::error::ForgeError;
use axum::{Json, extract::Path, extract::State};
use shared::models::{AddKnowledgeFilesRequest, KnowledgeFile};

pub async fn list_knowledge_files(State(state): State<AppState>) -> Json<Vec<KnowledgeFile>> {
    Json(state.library.read().await.files().to_vec())
}

/// Files with an id already in the library replace the stored copy.
pub async fn add_knowledge_files(
    State(state): State<AppState>,
    Json(payload): Json<AddKnowledgeFilesRequest>,
) -> Result<Json<Vec<KnowledgeFile>>, ForgeError> {
    let mut library = state.library.write().await;
    library.commit_add(payload.files).await?;
    Ok(Json(library.files().to_vec()))
}

pub async fn delete_knowledge_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<KnowledgeFile>, ForgeError> {
    let removed = state.library.write().await.commit_remove(&file_id).await?;
    Ok(Json(removed))
}
