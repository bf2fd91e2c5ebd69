use crate::assembler::CardAssembler;
use crate::credentials::KeyCursor;
use crate::enhancer::CardEnhancer;
use crate::invoker::ResilientInvoker;
use crate::library::KnowledgeLibrary;
use crate::previews::PreviewGenerator;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub library: Arc<RwLock<KnowledgeLibrary>>,
    pub previews: Arc<PreviewGenerator>,
    pub assembler: CardAssembler,
    pub enhancer: CardEnhancer,
}

impl AppState {
    pub fn new(library: KnowledgeLibrary, invoker: ResilientInvoker) -> Self {
        Self {
            library: Arc::new(RwLock::new(library)),
            previews: Arc::new(PreviewGenerator::new(invoker.clone(), KeyCursor::new())),
            assembler: CardAssembler::new(invoker.clone()),
            enhancer: CardEnhancer::new(invoker),
        }
    }
}
