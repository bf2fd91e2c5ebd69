use crate::AppState;
use crate::error::ForgeError;
use axum::{Json, extract::State};
use shared::models::{
    AddLoreRequest, AddRegexRequest, AnalyzeLorebookRequest, AssembleRequest, CharacterCard,
    FixCardRequest, LorebookImport,
};

pub async fn assemble_card(
    State(state): State<AppState>,
    Json(payload): Json<AssembleRequest>,
) -> Result<Json<CharacterCard>, ForgeError> {
    let library = state.library.read().await.files().to_vec();
    let card = state
        .assembler
        .assemble(&payload.api_keys, &payload.options, &payload.features, &library)
        .await?;
    Ok(Json(card))
}

pub async fn add_lore_entries(
    State(state): State<AppState>,
    Json(payload): Json<AddLoreRequest>,
) -> Result<Json<CharacterCard>, ForgeError> {
    let card = state
        .enhancer
        .add_lore_entries(&payload.api_keys, payload.card, payload.count)
        .await?;
    Ok(Json(card))
}

pub async fn add_regex_script(
    State(state): State<AppState>,
    Json(payload): Json<AddRegexRequest>,
) -> Result<Json<CharacterCard>, ForgeError> {
    let card = state
        .enhancer
        .generate_and_add_regex(&payload.api_keys, payload.card, &payload.description, &payload.ui_code)
        .await?;
    Ok(Json(card))
}

pub async fn fix_card(
    State(state): State<AppState>,
    Json(payload): Json<FixCardRequest>,
) -> Result<Json<CharacterCard>, ForgeError> {
    let library = state.library.read().await.files().to_vec();
    let card = state
        .enhancer
        .fix_card(
            &payload.api_keys,
            &payload.card,
            &payload.error_description,
            &library,
            payload.reference_id.as_deref(),
        )
        .await?;
    Ok(Json(card))
}

pub async fn analyze_lorebook(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeLorebookRequest>,
) -> Result<Json<LorebookImport>, ForgeError> {
    let import = state
        .enhancer
        .analyze_lorebook(&payload.api_keys, &payload.document)
        .await?;
    Ok(Json(import))
}
