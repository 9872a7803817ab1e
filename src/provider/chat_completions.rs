use super::http::JsonTransport;
use super::{accept_answer, encode_image, require_api_key, DescriptionProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::language::TargetLanguage;
use serde_json::{json, Value};

/// Single-stage provider speaking the OpenAI `chat/completions` format.
/// Used for DashScope's compatible mode and for OpenAI itself.
pub struct ChatCompletionsProvider {
    transport: JsonTransport,
    config: ProviderConfig,
    language: TargetLanguage,
}

impl ChatCompletionsProvider {
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
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": self.language.describe_prompt() },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:{};base64,{}", media_type, encoded) }
                    }
                ]
            }]
        })
    }

    /// `choices[0].message.content`
    fn extract_text(response: &Value) -> Result<&str, ProviderError> {
        response
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("no choices[0].message.content".to_string())
            })
    }
}

impl DescriptionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        self.config.kind.id()
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        require_api_key(&self.config).map(|_| ())
    }

    fn describe(&self, image: &[u8]) -> Result<String, ProviderError> {
        let api_key = require_api_key(&self.config)?;
        let auth = format!("Bearer {}", api_key);
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self.transport.post(
            &url,
            &[("Authorization", auth.as_str())],
            &self.build_payload(image),
        )?;

        let text = Self::extract_text(&response)?;
        log::debug!("{} answered: {:?}", self.name(), text);

        accept_answer(text, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, ProviderKind};
    use mockito::Matcher;
    use std::io::Write;
    use std::thread;
    use std::time::Duration;

    fn provider_for(url: &str, api_key: Option<&str>) -> ChatCompletionsProvider {
        let endpoint = EndpointConfig {
            base_url: Some(url.to_string()),
            timeout_secs: Some(5),
            ..EndpointConfig::default()
        };
        let config = ProviderConfig::resolve(ProviderKind::DashScope, &endpoint, |_| {
            api_key.map(str::to_string)
        });
        ChatCompletionsProvider::new(&config, TargetLanguage::English).unwrap()
    }

    #[test]
    fn test_describe_success() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({ "model": "qwen-vl-max" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Code editor."}}]}"#)
            .create();

        let provider = provider_for(&server.url(), Some("sk-test"));
        assert_eq!(provider.describe(b"image").unwrap(), "Code editor.");
        mock.assert();
    }

    #[test]
    fn test_prompt_and_image_are_sent() {
        let provider = provider_for("http://unused", Some("sk-test"));
        let png_header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let payload = provider.build_payload(&png_header);

        let content = &payload["messages"][0]["content"];
        assert_eq!(content[0]["text"], TargetLanguage::English.describe_prompt());
        assert_eq!(
            content[1]["image_url"]["url"],
            "data:image/png;base64,iVBORw0KGgo="
        );
    }

    #[test]
    fn test_error_status_is_a_failure() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("internal error")
            .create();

        let provider = provider_for(&server.url(), Some("sk-test"));
        let err = provider.describe(b"image").unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));
    }

    #[test]
    fn test_malformed_body_is_a_failure() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create();

        let provider = provider_for(&server.url(), Some("sk-test"));
        assert!(matches!(
            provider.describe(b"image"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_missing_credential() {
        let provider = provider_for("http://unused", None);
        assert!(matches!(
            provider.check_available(),
            Err(ProviderError::MissingCredential(ref var)) if var == "DASHSCOPE_API_KEY"
        ));
        assert!(matches!(
            provider.describe(b"image"),
            Err(ProviderError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_a_failure() {
        let endpoint = EndpointConfig {
            base_url: Some("http://127.0.0.1:9".to_string()),
            ..EndpointConfig::default()
        };
        let mut config = ProviderConfig::resolve(ProviderKind::OpenAi, &endpoint, |_| {
            Some("sk-test".to_string())
        });
        config.timeout = Duration::from_secs(2);

        let provider = ChatCompletionsProvider::new(&config, TargetLanguage::English).unwrap();
        let err = provider.describe(b"image").unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_slow_endpoint_times_out() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_chunked_body(|w| {
                thread::sleep(Duration::from_secs(3));
                w.write_all(br#"{"choices":[{"message":{"content":"too late"}}]}"#)
            })
            .create();

        let mut config = provider_for(&server.url(), Some("sk-test")).config;
        config.timeout = Duration::from_secs(1);
        let provider = ChatCompletionsProvider::new(&config, TargetLanguage::English).unwrap();

        let err = provider.describe(b"image").unwrap_err();
        assert!(matches!(err, ProviderError::Transport(ref e) if e.is_timeout()));
        assert!(!err.is_unavailable());
    }
}
