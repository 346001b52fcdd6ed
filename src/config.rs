// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::testgen::materialize::SaveMode;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl Provider {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(Error::Config(format!("Unknown provider `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            base_url: None,
            max_tokens: 4096,
            temperature: 0.3,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_path: PathBuf,
    pub schema_path: Option<PathBuf>,
    pub tests_dir: PathBuf,
    pub log_file: PathBuf,
    pub analysis_dir: PathBuf,
    pub save_mode: SaveMode,
    pub python: String,
    pub run_timeout_secs: u64,
    pub llm: LlmSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_path: PathBuf::from("api/app.py"),
            schema_path: None,
            tests_dir: PathBuf::from("tests"),
            log_file: PathBuf::from("logs/test_results.log"),
            analysis_dir: PathBuf::from("analysis"),
            save_mode: SaveMode::Permanent,
            python: "python3".to_string(),
            run_timeout_secs: 300,
            llm: LlmSettings::default(),
        }
    }
}

impl Config {
    /// Defaults, then the config file (if present), then environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit.map(Path::to_path_buf).unwrap_or_else(config_path);

        let file = match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(Error::Config(format!("{}: {e}", path.display())));
            }
        };

        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut cfg = match file {
            Some(raw) => toml::from_str::<Config>(raw).map_err(|e| Error::Config(e.to_string()))?,
            None => Config::default(),
        };

        cfg.apply_env(env)?;
        Ok(cfg)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = ["API_KEY", "OPENAI_API_KEY", "ANTHROPIC_API_KEY"]
            .iter()
            .find_map(|k| non_empty(k))
        {
            self.llm.api_key = key.trim().to_string();
        }

        if let Some(p) = non_empty("TESTGEN_PROVIDER") {
            self.llm.provider = Provider::parse(&p)?;
        }

        if let Some(model) = non_empty("TESTGEN_MODEL") {
            self.llm.model = model;
        }

        if let Some(url) = non_empty("TESTGEN_BASE_URL") {
            self.llm.base_url = Some(url);
        }

        if let Some(raw) = non_empty("TESTGEN_MAX_TOKENS") {
            self.llm.max_tokens = raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("TESTGEN_MAX_TOKENS is not a number: {raw}")))?;
        }

        Ok(())
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fastapi-testgen/config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let cfg = Config::from_sources(None, env_of(&[])).unwrap();
        assert_eq!(cfg.app_path, PathBuf::from("api/app.py"));
        assert_eq!(cfg.log_file, PathBuf::from("logs/test_results.log"));
        assert_eq!(cfg.llm.provider, Provider::OpenAI);
        assert_eq!(cfg.llm.max_tokens, 4096);
        assert!(cfg.llm.api_key.is_empty());
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let file = r#"
            python = "python3.12"

            [llm]
            provider = "anthropic"
            model = "from-file"
            api_key = "file-key"
        "#;

        let cfg = Config::from_sources(
            Some(file),
            env_of(&[("TESTGEN_MODEL", "from-env"), ("API_KEY", "env-key")]),
        )
        .unwrap();

        assert_eq!(cfg.python, "python3.12");
        assert_eq!(cfg.llm.provider, Provider::Anthropic);
        assert_eq!(cfg.llm.model, "from-env");
        assert_eq!(cfg.llm.api_key, "env-key");
        assert_eq!(cfg.llm.temperature, 0.3);
    }

    #[test]
    fn api_key_prefers_generic_variable() {
        let cfg = Config::from_sources(
            None,
            env_of(&[("OPENAI_API_KEY", "openai"), ("API_KEY", "generic")]),
        )
        .unwrap();
        assert_eq!(cfg.llm.api_key, "generic");
    }

    #[test]
    fn blank_env_key_is_ignored() {
        let cfg = Config::from_sources(
            None,
            env_of(&[("API_KEY", "   "), ("OPENAI_API_KEY", "openai")]),
        )
        .unwrap();
        assert_eq!(cfg.llm.api_key, "openai");
    }

    #[test]
    fn bad_max_tokens_is_config_error() {
        let err = Config::from_sources(None, env_of(&[("TESTGEN_MAX_TOKENS", "lots")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = Config::from_sources(None, env_of(&[("TESTGEN_PROVIDER", "ollama")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
