use serde::{Deserialize, Serialize};

/// A candidate HTML/CSS/JS snippet produced by a UI workshop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPreview {
    pub name: String,
    pub code: String,
}
