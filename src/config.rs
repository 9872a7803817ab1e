use crate::language::TargetLanguage;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Language new names are written in
    pub language: TargetLanguage,
    /// Which description provider to use
    pub provider: ProviderKind,
}

/// Per-provider overrides. Anything left out falls back to the built-in
/// defaults for that provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub dashscope: EndpointConfig,
    pub openai: EndpointConfig,
    pub anthropic: EndpointConfig,
    pub ollama: EndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            dashscope: EndpointConfig::defaults_for(ProviderKind::DashScope),
            openai: EndpointConfig::defaults_for(ProviderKind::OpenAi),
            anthropic: EndpointConfig::defaults_for(ProviderKind::Anthropic),
            ollama: EndpointConfig::defaults_for(ProviderKind::Ollama),
        }
    }
}

impl ProvidersConfig {
    pub fn endpoint(&self, kind: ProviderKind) -> &EndpointConfig {
        match kind {
            ProviderKind::DashScope => &self.dashscope,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Ollama => &self.ollama,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Second-stage model, only used by two-stage providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl EndpointConfig {
    fn defaults_for(kind: ProviderKind) -> Self {
        Self {
            base_url: Some(kind.default_base_url().to_string()),
            model: Some(kind.default_model().to_string()),
            text_model: kind.default_text_model().map(str::to_string),
            api_key_env: kind.default_api_key_env().map(str::to_string),
            timeout_secs: Some(kind.default_timeout_secs()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Alibaba DashScope, OpenAI-compatible mode
    #[default]
    #[value(name = "dashscope")]
    DashScope,
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "anthropic")]
    Anthropic,
    /// Local Ollama server, two-stage
    #[value(name = "ollama")]
    Ollama,
}

impl ProviderKind {
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::DashScope => "dashscope",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::DashScope => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::DashScope => "qwen-vl-max",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
            ProviderKind::Ollama => "llava",
        }
    }

    fn default_text_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Ollama => Some("qwen2.5"),
            _ => None,
        }
    }

    fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::DashScope => Some("DASHSCOPE_API_KEY"),
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    /// Local inference is much slower than the cloud APIs
    fn default_timeout_secs(&self) -> u64 {
        match self {
            ProviderKind::Ollama => 120,
            _ => 20,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Everything a provider needs, fixed for the whole run
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub text_model: String,
    pub api_key_env: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Fills gaps in `endpoint` with the provider's defaults and reads the
    /// credential through `lookup_env`.
    pub fn resolve(
        kind: ProviderKind,
        endpoint: &EndpointConfig,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let api_key_env = match &endpoint.api_key_env {
            Some(name) if name.trim().is_empty() => None,
            Some(name) => Some(name.trim().to_string()),
            None => kind.default_api_key_env().map(str::to_string),
        };

        let api_key = api_key_env
            .as_deref()
            .and_then(|name| lookup_env(name))
            .filter(|key| !key.trim().is_empty());

        let model = endpoint
            .model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string());

        let text_model = endpoint
            .text_model
            .clone()
            .or_else(|| kind.default_text_model().map(str::to_string))
            .unwrap_or_else(|| model.clone());

        Self {
            kind,
            base_url: endpoint
                .base_url
                .as_deref()
                .unwrap_or(kind.default_base_url())
                .trim_end_matches('/')
                .to_string(),
            model,
            text_model,
            api_key_env,
            api_key,
            timeout: Duration::from_secs(
                endpoint
                    .timeout_secs
                    .unwrap_or_else(|| kind.default_timeout_secs()),
            ),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("text_model", &self.text_model)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Command-line choices that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub root: PathBuf,
    pub language: Option<TargetLanguage>,
    pub provider: Option<ProviderKind>,
    pub verbose: bool,
    pub dry_run: bool,
}

/// Resolved settings for one run. Built once at startup and only ever read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub language: TargetLanguage,
    pub provider: ProviderConfig,
    pub verbose: bool,
    pub dry_run: bool,
}

impl Settings {
    pub fn resolve(config: &Config, options: RunOptions) -> Self {
        Self::resolve_with(config, options, |name| std::env::var(name).ok())
    }

    pub fn resolve_with(
        config: &Config,
        options: RunOptions,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let language = options.language.unwrap_or(config.general.language);
        let kind = options.provider.unwrap_or(config.general.provider);
        let provider = ProviderConfig::resolve(kind, config.providers.endpoint(kind), lookup_env);

        Self {
            root: options.root,
            language,
            provider,
            verbose: options.verbose,
            dry_run: options.dry_run,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    /// If the config file doesn't exist, create it with default values
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_or_create(&config_path)
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn load_or_create(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            log::info!("Config file not found, creating default config at {:?}", config_path);
            let default_config = Config::default();
            default_config.save_to(config_path)?;
            return Ok(default_config);
        }

        Self::load_from(config_path)
    }

    /// Save configuration to the given location
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(config_path, contents)
            .context("Failed to write config file")?;

        log::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the config file
    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;
        Ok(config_dir.join("snapkeeper").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config_is_written_and_reloaded() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("config.toml");

        let created = Config::load_or_create(&path)?;
        assert!(path.exists());
        assert_eq!(created.general.provider, ProviderKind::DashScope);

        let reloaded = Config::load_from(&path)?;
        assert_eq!(reloaded.general.language, TargetLanguage::English);
        assert_eq!(
            reloaded.providers.ollama.text_model.as_deref(),
            Some("qwen2.5")
        );
        assert_eq!(
            reloaded.providers.dashscope.api_key_env.as_deref(),
            Some("DASHSCOPE_API_KEY")
        );

        Ok(())
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[general]
language = "zh-hans"
provider = "ollama"

[providers.ollama]
model = "llava:13b"
"#,
        )?;

        let config = Config::load_from(&path)?;
        let settings = Settings::resolve_with(&config, RunOptions::default(), no_env);

        assert_eq!(settings.language, TargetLanguage::SimplifiedChinese);
        assert_eq!(settings.provider.kind, ProviderKind::Ollama);
        assert_eq!(settings.provider.model, "llava:13b");
        assert_eq!(settings.provider.text_model, "qwen2.5");
        assert_eq!(settings.provider.base_url, "http://localhost:11434");
        assert_eq!(settings.provider.api_key_env, None);
        assert_eq!(settings.provider.timeout, Duration::from_secs(120));

        Ok(())
    }

    #[test]
    fn test_invalid_config_is_an_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[general]\nlanguage = \"klingon\"\n")?;

        assert!(Config::load_from(&path).is_err());
        assert!(Config::load_from(&temp_dir.path().join("missing.toml")).is_err());

        Ok(())
    }

    #[test]
    fn test_run_options_override_config() {
        let config = Config::default();
        let options = RunOptions {
            root: PathBuf::from("/shots"),
            language: Some(TargetLanguage::Japanese),
            provider: Some(ProviderKind::Anthropic),
            verbose: true,
            dry_run: false,
        };

        let settings = Settings::resolve_with(&config, options, |name| {
            (name == "ANTHROPIC_API_KEY").then(|| "sk-test".to_string())
        });

        assert_eq!(settings.language, TargetLanguage::Japanese);
        assert_eq!(settings.provider.kind, ProviderKind::Anthropic);
        assert_eq!(settings.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.provider.base_url, "https://api.anthropic.com");
        assert!(settings.verbose);
    }

    #[test]
    fn test_credential_resolution() {
        let endpoint = EndpointConfig {
            base_url: Some("http://example.test/v1/".to_string()),
            api_key_env: Some("MY_KEY".to_string()),
            ..EndpointConfig::default()
        };

        let resolved = ProviderConfig::resolve(ProviderKind::OpenAi, &endpoint, |name| {
            (name == "MY_KEY").then(|| "secret".to_string())
        });
        assert_eq!(resolved.api_key.as_deref(), Some("secret"));
        assert_eq!(resolved.base_url, "http://example.test/v1");
        assert_eq!(resolved.text_model, "gpt-4o-mini");
        assert!(!format!("{:?}", resolved).contains("secret"));

        let blank = ProviderConfig::resolve(ProviderKind::OpenAi, &endpoint, |_| {
            Some("   ".to_string())
        });
        assert_eq!(blank.api_key, None);
    }

    #[test]
    fn test_provider_kind_display_matches_config_names() {
        for kind in [
            ProviderKind::DashScope,
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Ollama,
        ] {
            let parsed: GeneralConfig =
                toml::from_str(&format!("provider = \"{}\"", kind)).unwrap();
            assert_eq!(parsed.provider, kind);
        }
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }
}
