use super::http::JsonTransport;
use super::{accept_answer, encode_image, DescriptionProvider, MIN_PHRASE_CHARS};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::language::{TargetLanguage, CONTENT_CATEGORY_PROMPT};
use serde_json::{json, Value};

/// Two-stage provider for a local Ollama server.
///
/// Stage 1 asks the vision model for a generic English category phrase.
/// Stage 2 asks the text model to squeeze that phrase into a 2-4 character
/// (CJK) or 2-3 word (English) label in the target language.
pub struct OllamaProvider {
    transport: JsonTransport,
    config: ProviderConfig,
    language: TargetLanguage,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig, language: TargetLanguage) -> Result<Self, ProviderError> {
        Ok(Self {
            transport: JsonTransport::new(config.timeout)?,
            config: config.clone(),
            language,
        })
    }

    /// Names reported by `/api/tags`
    fn installed_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.config.base_url);
        let response = self
            .transport
            .get(&url)
            .map_err(|e| ProviderError::Unavailable(format!("Ollama not reachable: {}", e)))?;

        let models = response
            .get("models")
            .and_then(|m| m.as_array())
            .ok_or_else(|| ProviderError::MalformedResponse("no models list".to_string()))?;

        Ok(models
            .iter()
            .filter_map(|model| model.get("name").and_then(|n| n.as_str()))
            .map(str::to_string)
            .collect())
    }

    /// An untagged name like `llava` is satisfied by `llava:latest`
    fn is_installed(installed: &[String], wanted: &str) -> bool {
        installed.iter().any(|name| {
            name == wanted || (!wanted.contains(':') && *name == format!("{}:latest", wanted))
        })
    }

    fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&str>,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let mut payload = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(encoded) = image {
            payload["images"] = json!([encoded]);
        }

        let response = self.transport.post(&url, &[], &payload)?;
        Self::extract_text(&response).map(str::to_string)
    }

    fn extract_text(response: &Value) -> Result<&str, ProviderError> {
        response
            .get("response")
            .and_then(|r| r.as_str())
            .ok_or_else(|| ProviderError::MalformedResponse("no response field".to_string()))
    }

    fn classify(&self, image: &[u8]) -> Result<String, ProviderError> {
        let (_, encoded) = encode_image(image);
        let raw = self.generate(&self.config.model, CONTENT_CATEGORY_PROMPT, Some(&encoded))?;
        log::debug!("Stage 1 ({}): {:?}", self.config.model, raw);
        accept_answer(&raw, MIN_PHRASE_CHARS)
    }

    fn condense(&self, phrase: &str) -> Result<String, ProviderError> {
        let prompt = self.language.condense_prompt(phrase);
        let raw = self.generate(&self.config.text_model, &prompt, None)?;
        log::debug!("Stage 2 ({}): {:?}", self.config.text_model, raw);
        accept_answer(&raw, 1)
    }
}

impl DescriptionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn stages(&self) -> u8 {
        2
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        let installed = self.installed_models()?;

        let missing: Vec<&str> = [self.config.model.as_str(), self.config.text_model.as_str()]
            .into_iter()
            .filter(|wanted| !Self::is_installed(&installed, wanted))
            .collect();

        if !missing.is_empty() {
            return Err(ProviderError::Unavailable(format!(
                "model(s) not installed in Ollama: {} (try `ollama pull {}`)",
                missing.join(", "),
                missing[0]
            )));
        }

        Ok(())
    }

    fn describe(&self, image: &[u8]) -> Result<String, ProviderError> {
        let phrase = self.classify(image)?;
        self.condense(&phrase)
    }
}
