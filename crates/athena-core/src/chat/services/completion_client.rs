use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use super::ndjson_decoder::{DecodedFragment, NdjsonDecoder};
use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Model server unreachable at {url}: {source}")]
    ServerUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response from {url}: {message}")]
    ProtocolError { url: String, message: String },

    #[error("Generation failed: {0}")]
    GenerationFailed(#[source] reqwest::Error),
}

/// Stream of text fragments, in arrival order
pub type FragmentStream = BoxStream<'static, Result<String, CompletionError>>;

/// Sampling parameters forwarded to the server untouched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for GenerationOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

/// HTTP client for an Ollama-compatible model server.
///
/// The base URL can be changed at any time; a request already in flight keeps
/// the URL it was started with.
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: RwLock<String>,
}

impl CompletionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: RwLock::new(base_url.to_string()),
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    pub fn set_base_url(&self, base_url: &str) {
        *self.base_url.write() = base_url.to_string();
        info!(base_url = %base_url, "Completion client base URL updated");
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.read().trim_end_matches('/'), path)
    }

    /// Names of the models the server has installed, in server order
    pub async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let url = self.endpoint("/api/tags");

        let response = self.http.get(&url).send().await.map_err(|source| {
            error!(url = %url, error = ?source, "Failed to reach model server");
            CompletionError::ServerUnreachable {
                url: url.clone(),
                source,
            }
        })?;

        if !response.status().is_success() {
            error!(url = %url, status = %response.status(), "Model catalog request failed");
            return Err(CompletionError::ProtocolError {
                message: format!("server returned status {}", response.status()),
                url,
            });
        }

        let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
            error!(url = %url, error = ?e, "Failed to decode model catalog");
            CompletionError::ProtocolError {
                url: url.clone(),
                message: e.to_string(),
            }
        })?;

        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        debug!(count = names.len(), "Fetched model list");
        Ok(names)
    }

    /// Stream the answer to `prompt` fragment by fragment.
    ///
    /// Malformed lines are skipped. A transport failure or non-success status
    /// yields a single `GenerationFailed` and ends the stream.
    pub fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
        options: GenerationOptions,
    ) -> FragmentStream {
        let url = self.endpoint("/api/generate");
        let http = self.http.clone();
        let request = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: true,
            options: OllamaOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
            },
        };

        Box::pin(async_stream::stream! {
            debug!(url = %url, model = %request.model, prompt_len = request.prompt.len(), "Starting generation");

            let response = match http
                .post(&url)
                .json(&request)
                .send()
                .await
                .and_then(|r| r.error_for_status())
            {
                Ok(response) => response,
                Err(e) => {
                    error!(url = %url, error = ?e, "Failed to start generation");
                    yield Err(CompletionError::GenerationFailed(e));
                    return;
                }
            };

            let mut body = response.bytes_stream();
            let mut decoder = NdjsonDecoder::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        error!(url = %url, error = ?e, "Generation stream interrupted");
                        yield Err(CompletionError::GenerationFailed(e));
                        return;
                    }
                };

                for fragment in decoder.push(&chunk) {
                    match fragment {
                        DecodedFragment::Text(text) => yield Ok(text),
                        DecodedFragment::Done => {
                            debug!(skipped = decoder.skipped(), "Generation finished");
                            return;
                        }
                    }
                }
            }

            for fragment in decoder.finish() {
                match fragment {
                    DecodedFragment::Text(text) => yield Ok(text),
                    DecodedFragment::Done => break,
                }
            }
            debug!(skipped = decoder.skipped(), "Generation stream closed");
        })
    }

    /// Generate a complete answer for `prompt`.
    ///
    /// All or nothing: on failure no partial text is returned.
    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
        options: GenerationOptions,
    ) -> Result<String, CompletionError> {
        let mut stream = self.generate_stream(prompt, model, options);
        let mut answer = String::new();

        while let Some(fragment) = stream.next().await {
            answer.push_str(&fragment?);
        }

        Ok(answer)
    }
}
