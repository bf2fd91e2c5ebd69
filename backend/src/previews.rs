use crate::credentials::{CredentialPool, KeyCursor};
use crate::error::{ForgeError, ForgeResult};
use crate::invoker::ResilientInvoker;
use crate::llm::{GenerationRequest, parse_model_json};
use crate::schema;
use futures::future::try_join_all;
use serde::Deserialize;
use shared::models::{UiPreview, WelcomeOptions, WorkshopOptions};
use std::sync::{Mutex, PoisonError};
use tracing::info;

const CODE_VALIDITY_RULE: &str = "- **CODE QUALITY IS CRITICAL:** All HTML must be valid. Every tag must be closed properly (for example every `<option>` needs its `</option>`). A single syntax error stops the UI from rendering.";

/// Upper bound on previews per call, accelerated or not.
pub const MAX_PREVIEWS: u32 = 8;

#[derive(Deserialize)]
struct PreviewList {
    #[serde(rename = "uiPreviews")]
    ui_previews: Vec<UiPreview>,
}

#[derive(Deserialize)]
struct EditedCode {
    #[serde(rename = "updatedCode", default)]
    updated_code: Option<String>,
}

fn welcome_prompt(theme: &str, options: &WelcomeOptions, count: u32) -> String {
    let effects = if options.effects {
        "Yes, use CSS animations."
    } else {
        "No, keep it static."
    };
    format!(
        "You are a professional UI/UX designer. Create **{count}** unique HTML welcome screens for a character card.
**Theme:** \"{theme}\"
**Requirements:**
{CODE_VALIDITY_RULE}
- **Tone:** {tone}
- **Content length:** {length}
- **Animated effects:** {effects}
- Each template must be a complete HTML fragment including a `<style>` tag. Do NOT include `<html>` or `<body>`.
- Give every template a creative name.
- Return the result as JSON following the schema.",
        tone = options.tone.as_str(),
        length = options.length.as_str(),
    )
}

fn creator_prompt(theme: &str, description: &str, count: u32) -> String {
    format!(
        "You are a frontend engineer. Create **{count}** unique HTML character creation forms.
**Theme:** \"{theme}\"
**User description:** \"{description}\"
**Requirements:**
{CODE_VALIDITY_RULE}
- Each template must be a complete HTML form with input fields, including `<style>` and `<script>` tags.
- On submit the script must collect the form data and build a text command sent to the AI (for example through `triggerSlash(`/send ...`)`).
- Do NOT include `<html>` or `<body>`.
- Give every template a creative name.
- Return the result as JSON following the schema."
    )
}

fn status_panel_prompt(theme: &str, description: &str, count: u32) -> String {
    format!(
        "You are a frontend engineer. Create **{count}** unique HTML status panels.
**Theme:** \"{theme}\"
**User layout description:** \"{description}\"
**Requirements:**
{CODE_VALIDITY_RULE}
- Each template must be a complete HTML fragment including `<style>` and `<script>` tags.
- **IMPORTANT:** The script MUST read its data from an XML string injected as `$1` (for example `const dataBlockContent = `$1`;`) and fill the HTML elements from it. Include sample XML tags in your JS to illustrate.
- Do NOT include `<html>` or `<body>`.
- Give every template a creative name.
- Return the result as JSON following the schema."
    )
}

fn regex_widget_prompt(theme: &str, description: &str, count: u32) -> String {
    format!(
        "You are a frontend engineer specialised in SillyTavern. Create **{count}** unique HTML UI templates for the request below.
**Overall card theme:** \"{theme}\"
**What the new UI does:** \"{description}\"
**Requirements:**
{CODE_VALIDITY_RULE}
- Each template must be a complete HTML fragment including a `<style>` tag, and a `<script>` tag if needed.
- The UI is triggered by a regex. Design it to present information visually.
- If it needs dynamic data, assume the data is injected through `$1` in the script or through placeholders in the HTML.
- Do NOT include `<html>` or `<body>`.
- Give every template a creative, descriptive name.
- Return the result as JSON following the schema."
    )
}

/// The instruction prompt for one preview request of `count` items.
pub fn build_preview_prompt(theme: &str, options: &WorkshopOptions, count: u32) -> String {
    match options {
        WorkshopOptions::WelcomeScreen(welcome) => welcome_prompt(theme, welcome, count),
        WorkshopOptions::CharacterCreator { description } => creator_prompt(theme, description, count),
        WorkshopOptions::StatusPanel { description } => status_panel_prompt(theme, description, count),
        WorkshopOptions::RegexWidget { description } => regex_widget_prompt(theme, description, count),
    }
}

pub fn build_edit_prompt(current_code: &str, instruction: &str) -> String {
    format!(
        "You are a frontend engineer. Here is an HTML/CSS/JS snippet:
```html
{current_code}
```
Modify it according to this request: \"{instruction}\".
**IMPORTANT:** Return only the modified HTML. Do NOT add any explanation. Your whole output must be a single JSON object with the key \"updatedCode\"."
    )
}

pub fn parse_previews(raw: &str) -> ForgeResult<Vec<UiPreview>> {
    parse_model_json::<PreviewList>(raw, "UI previews").map(|list| list.ui_previews)
}

/// Generates UI snippet candidates for the four workshops.
pub struct PreviewGenerator {
    invoker: ResilientInvoker,
    cursor: Mutex<KeyCursor>,
}

impl PreviewGenerator {
    pub fn new(invoker: ResilientInvoker, cursor: KeyCursor) -> Self {
        Self {
            invoker,
            cursor: Mutex::new(cursor),
        }
    }

    /// One request asking for `count` previews, starting at key `start_index`.
    pub async fn generate(
        &self,
        raw_keys: &str,
        theme: &str,
        options: &WorkshopOptions,
        count: u32,
        start_index: usize,
    ) -> ForgeResult<Vec<UiPreview>> {
        validate(theme, count)?;
        let request = GenerationRequest::new(
            build_preview_prompt(theme, options, count),
            "ui_previews",
            schema::preview_list(count),
        );
        let raw = self.invoker.invoke(raw_keys, &request, start_index).await?;
        parse_previews(&raw)
    }

    /// `count` concurrent single-preview requests, each preferring a different
    /// key. Results keep request order; any failure fails the whole batch.
    pub async fn generate_accelerated(
        &self,
        raw_keys: &str,
        theme: &str,
        options: &WorkshopOptions,
        count: u32,
    ) -> ForgeResult<Vec<UiPreview>> {
        validate(theme, count)?;
        // Offsets are taken before the first request is sent.
        let starts = {
            let pool = CredentialPool::parse(raw_keys);
            let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            cursor.reserve(&pool, count as usize)
        };
        info!(count = count, ?starts, kind = ?options.kind(), "Fanning out preview requests");

        let batches = try_join_all(
            starts
                .into_iter()
                .map(|start| self.generate(raw_keys, theme, options, 1, start)),
        )
        .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Dispatches to the accelerated path when asked for more than one preview.
    pub async fn generate_batch(
        &self,
        raw_keys: &str,
        theme: &str,
        options: &WorkshopOptions,
        count: u32,
        accelerated: bool,
    ) -> ForgeResult<Vec<UiPreview>> {
        if accelerated && count > 1 {
            self.generate_accelerated(raw_keys, theme, options, count).await
        } else {
            self.generate(raw_keys, theme, options, count, 0).await
        }
    }

    /// Applies a natural-language change to a snippet. A response without
    /// `updatedCode` leaves the snippet as it was.
    pub async fn edit(&self, raw_keys: &str, current_code: &str, instruction: &str) -> ForgeResult<String> {
        if current_code.trim().is_empty() {
            return Err(ForgeError::validation("There is no UI code to edit."));
        }
        if instruction.trim().is_empty() {
            return Err(ForgeError::validation("Describe the change you want to make."));
        }
        let request = GenerationRequest::new(
            build_edit_prompt(current_code, instruction),
            "edited_code",
            schema::edited_code(),
        );
        let raw = self.invoker.invoke(raw_keys, &request, 0).await?;
        let edited: EditedCode = parse_model_json(&raw, "edited UI")?;
        Ok(edited
            .updated_code
            .filter(|code| !code.trim().is_empty())
            .unwrap_or_else(|| current_code.to_string()))
    }
}

fn validate(theme: &str, count: u32) -> ForgeResult<()> {
    if theme.trim().is_empty() {
        return Err(ForgeError::validation("Enter the theme and keywords first."));
    }
    if !(1..=MAX_PREVIEWS).contains(&count) {
        return Err(ForgeError::validation(format!(
            "Ask for between 1 and {MAX_PREVIEWS} previews."
        )));
    }
    Ok(())
}
