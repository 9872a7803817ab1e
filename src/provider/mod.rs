mod anthropic;
mod chat_completions;
mod http;
mod ollama;

use crate::config::{ProviderConfig, ProviderKind};
use crate::detector::ScreenshotDetector;
use crate::error::ProviderError;
use crate::language::TargetLanguage;
use base64::Engine;

pub use anthropic::AnthropicProvider;
pub use chat_completions::ChatCompletionsProvider;
pub use ollama::OllamaProvider;

/// Stage-1 phrases shorter than this are not worth condensing
pub const MIN_PHRASE_CHARS: usize = 3;

/// Characters peeled off both ends of a model answer
const QUOTE_CHARS: &[char] = &['"', '\'', '`', '“', '”', '‘', '’', '「', '」', '『', '』'];

/// Trait for backends that turn a screenshot into a short description
pub trait DescriptionProvider: Send + Sync {
    /// Returns the name of this provider
    fn name(&self) -> &str;

    /// Number of model calls made per image
    fn stages(&self) -> u8 {
        1
    }

    /// Cheap check run once before the first image. Failing it means no
    /// image will be sent to this provider during the run.
    fn check_available(&self) -> Result<(), ProviderError>;

    /// Describe the image in the target language. Every failure, including
    /// an unusable answer, comes back as an error.
    fn describe(&self, image: &[u8]) -> Result<String, ProviderError>;
}

/// Build the provider selected in the configuration
pub fn build_provider(
    config: &ProviderConfig,
    language: TargetLanguage,
) -> Result<Box<dyn DescriptionProvider>, ProviderError> {
    let provider: Box<dyn DescriptionProvider> = match config.kind {
        ProviderKind::DashScope | ProviderKind::OpenAi => {
            Box::new(ChatCompletionsProvider::new(config, language)?)
        }
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(config, language)?),
        ProviderKind::Ollama => Box::new(OllamaProvider::new(config, language)?),
    };

    log::info!(
        "Using provider '{}' ({} stage(s), model {}, language {})",
        config.kind,
        provider.stages(),
        config.model,
        language
    );

    Ok(provider)
}

/// Media type and base64 payload for an image
pub(crate) fn encode_image(image: &[u8]) -> (&'static str, String) {
    let media_type = ScreenshotDetector::media_type(image);
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    (media_type, encoded)
}

/// Cleans up a model answer and rejects the ones that cannot name a file:
/// empty text, anything shorter than `min_chars`, and the `skip` sentinel.
pub(crate) fn accept_answer(raw: &str, min_chars: usize) -> Result<String, ProviderError> {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    let answer = line.trim_matches(QUOTE_CHARS).trim();

    if answer.is_empty() {
        return Err(ProviderError::Degenerate("empty answer".to_string()));
    }

    let bare = answer.trim_end_matches(['.', '。', '!', '！']);
    if bare.eq_ignore_ascii_case("skip") {
        return Err(ProviderError::Degenerate(
            "provider could not classify the image".to_string(),
        ));
    }

    if answer.chars().count() < min_chars {
        return Err(ProviderError::Degenerate(format!("answer too short: '{}'", answer)));
    }

    Ok(answer.to_string())
}

/// Credential check shared by the cloud providers
pub(crate) fn require_api_key(config: &ProviderConfig) -> Result<String, ProviderError> {
    config.api_key.clone().ok_or_else(|| {
        ProviderError::MissingCredential(
            config
                .api_key_env
                .clone()
                .unwrap_or_else(|| "<none configured>".to_string()),
        )
    })
}
