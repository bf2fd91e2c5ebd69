use crate::AppState;
use crate::error::ForgeError;
use axum::{Json, extract::State};
use shared::models::{EditPreviewRequest, EditPreviewResponse, PreviewRequest, UiPreview};

pub async fn generate_previews(
    State(state): State<AppState>,
    Json(payload): Json<PreviewRequest>,
) -> Result<Json<Vec<UiPreview>>, ForgeError> {
    let previews = state
        .previews
        .generate_batch(
            &payload.api_keys,
            &payload.theme,
            &payload.options,
            payload.count,
            payload.accelerated,
        )
        .await?;
    Ok(Json(previews))
}

pub async fn edit_preview(
    State(state): State<AppState>,
    Json(payload): Json<EditPreviewRequest>,
) -> Result<Json<EditPreviewResponse>, ForgeError> {
    let updated_code = state
        .previews
        .edit(&payload.api_keys, &payload.current_code, &payload.instruction)
        .await?;
    Ok(Json(EditPreviewResponse { updated_code }))
}
