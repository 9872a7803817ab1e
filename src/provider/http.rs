use crate::error::ProviderError;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// Longest slice of an error body kept in messages
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Blocking JSON client shared by the HTTP providers. Each call waits at most
/// `timeout`; a timeout surfaces as `ProviderError::Transport`.
pub struct JsonTransport {
    client: Client,
}

impl JsonTransport {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn get(&self, url: &str) -> Result<Value, ProviderError> {
        self.send(self.client.get(url))
    }

    pub fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, ProviderError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(request)
    }

    fn send(&self, request: RequestBuilder) -> Result<Value, ProviderError> {
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!(
                "invalid JSON ({}): {}",
                e,
                body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>()
            ))
        })
    }
}
