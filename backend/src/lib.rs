pub mod assembler;
pub mod config;
pub mod credentials;
pub mod enhancer;
pub mod error;
mod handlers;
pub mod invoker;
pub mod library;
pub mod llm;
pub mod lorebook;
pub mod openai;
pub mod previews;
pub mod schema;
mod state;

#[cfg(test)]
mod test_support;

pub use crate::config::BackendConfig;
pub use crate::state::AppState;

use crate::handlers::{
    add_knowledge_files, add_lore_entries, add_regex_script, analyze_lorebook, assemble_card,
    delete_knowledge_file, edit_preview, fix_card, generate_previews, list_knowledge_files,
};
use crate::invoker::ResilientInvoker;
use crate::library::KnowledgeLibrary;
use crate::openai::OpenAiBackend;
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub async fn init(router: Router<AppState>, config: BackendConfig) -> Router<()> {
    let library = KnowledgeLibrary::load(&config.library_path).await;
    tracing::info!(
        "Knowledge library at {} holds {} files",
        library.path().display(),
        library.files().len()
    );
    let invoker = ResilientInvoker::new(Arc::new(OpenAiBackend::new(config.model)));
    let state = AppState::new(library, invoker);

    router
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/previews", post(generate_previews))
        .route("/api/previews/edit", post(edit_preview))
        .route("/api/cards", post(assemble_card))
        .route("/api/cards/lore", post(add_lore_entries))
        .route("/api/cards/regex", post(add_regex_script))
        .route("/api/cards/fix", post(fix_card))
        .route("/api/lorebooks/analyze", post(analyze_lorebook))
        .route(
            "/api/library",
            get(list_knowledge_files).post(add_knowledge_files),
        )
        .route("/api/library/{file_id}", delete(delete_knowledge_file))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
