use backend::BackendConfig;
use backend::config::DEFAULT_LIBRARY_PATH;
use clap::Parser;
use shared::models::ModelSettings;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// Built web UI to serve next to the API.
    #[arg(long)]
    pub dist_dir: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_LIBRARY_PATH)]
    pub library_path: PathBuf,
    /// OpenAI-compatible endpoint the keys are sent to.
    #[arg(long)]
    pub api_base: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub temperature: Option<f32>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl Cli {
    pub fn backend_config(&self) -> BackendConfig {
        let defaults = ModelSettings::default();
        BackendConfig {
            library_path: self.library_path.clone(),
            model: ModelSettings {
                api_base: self.api_base.clone().unwrap_or(defaults.api_base),
                model: self.model.clone().unwrap_or(defaults.model),
                temperature: self.temperature.unwrap_or(defaults.temperature),
                max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_flags() {
        let cli = Cli::parse_from(["cardsmith", "--model", "gemini-2.5-pro"]);
        let config = cli.backend_config();
        assert_eq!(cli.port, 8080);
        assert_eq!(config.library_path, PathBuf::from("knowledge_library.json"));
        assert_eq!(config.model.model, "gemini-2.5-pro");
        assert_eq!(config.model.max_tokens, 8192);
    }
}
