use super::http::JsonTransport;
use super::{accept_answer, encode_image, require_api_key, DescriptionProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::language::TargetLanguage;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A filename-sized answer never needs more than this
const MAX_TOKENS: u32 = 64;

/// Single-stage provider for the Anthropic Messages API
pub struct AnthropicProvider {
    transport: JsonTransport,
    config: ProviderConfig,
    language: TargetLanguage,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig, language: TargetLanguage) -> Result<Self, ProviderError> {
        Ok(Self {
            transport: JsonTransport::new(config.timeout)?,
            config: config.clone(),
            language,
        })
    }

    fn build_payload(&self, image: &[u8]) -> Value {
        let (media_type, encoded) = encode_image(image);

        json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": { "type": "base64", "media_type": media_type, "data": encoded }
                    },
                    { "type": "text", "text": self.language.describe_prompt() }
                ]
            }]
        })
    }

    /// First text block in `content`
    fn extract_text(response: &Value) -> Result<&str, ProviderError> {
        response
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find_map(|block| block.get("text").and_then(|t| t.as_str()))
            })
            .ok_or_else(|| ProviderError::MalformedResponse("no text block in content".to_string()))
    }
}

impl DescriptionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        require_api_key(&self.config).map(|_| ())
    }

    fn describe(&self, image: &[u8]) -> Result<String, ProviderError> {
        let api_key = require_api_key(&self.config)?;
        let url = format!("{}/v1/messages", self.config.base_url);

        let response = self.transport.post(
            &url,
            &[
                ("x-api-key", api_key.as_str()),
                ("anthropic-version", ANTHROPIC_VERSION),
            ],
            &self.build_payload(image),
        )?;

        let text = Self::extract_text(&response)?;
        log::debug!("anthropic answered: {:?}", text);

        accept_answer(text, 1)
    }
}
