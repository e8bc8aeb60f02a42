//! Client implementation for the Gemini AI API.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::error::GoogleGenerativeAIError;
use crate::models::{ListModelsResponse, ModelInfo, Request, Response, TextStream};

/// Default API endpoint for Google's Generative AI service
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default API version
const DEFAULT_API_VERSION: &str = "v1beta";
/// Default channel buffer size for streaming responses
const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 16;
/// Default buffer capacity for JSON parsing
const DEFAULT_JSON_BUFFER_CAPACITY: usize = 4096;
/// Page size requested when listing models
const LIST_MODELS_PAGE_SIZE: u32 = 1000;

/// The operations the registry and the response generator need from the
/// hosted API.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Lists every model visible to the configured credential.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, GoogleGenerativeAIError>;

    /// Opens a streaming generation call for `prompt` on `model`.
    ///
    /// Failures are returned already classified, see
    /// [`GoogleGenerativeAIError::kind`].
    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<TextStream, GoogleGenerativeAIError>;
}

/// A client for interacting with the Gemini AI API.
#[derive(Debug, Clone)]
pub struct GenerativeModel {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GenerativeModel {
    /// Creates a new GenerativeModel with the specified API key.
    ///
    /// The endpoint can be overridden with the `GOOGLE_BASE_URL` variable.
    pub fn new(api_key: impl Into<String>) -> Self {
        let base_url =
            std::env::var("GOOGLE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            api_key: api_key.into(),
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Points the client at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Creates a new GenerativeModel from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `GOOGLE_API_KEY` - The API key for authentication
    ///
    /// # Errors
    ///
    /// Returns an error if the required environment variable is not set.
    pub fn from_env() -> Result<Self, GoogleGenerativeAIError> {
        let api_key = std::env::var("GOOGLE_API_KEY")?;
        Ok(Self::new(api_key))
    }

    /// Creates a client using the credential from the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.google_api_key.clone())
    }

    fn models_url(&self) -> String {
        format!("{}/{}/models", self.base_url, DEFAULT_API_VERSION)
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/{}/models/{}:streamGenerateContent",
            self.base_url, DEFAULT_API_VERSION, model
        )
    }

    /// Turns a non-success status into a classified error.
    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GoogleGenerativeAIError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_body = response.text().await.unwrap_or_default();
        Err(GoogleGenerativeAIError::api(status.as_u16(), error_body))
    }

    /// Fetches one page of the model list.
    async fn list_models_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<ListModelsResponse, GoogleGenerativeAIError> {
        let page_size = LIST_MODELS_PAGE_SIZE.to_string();
        let mut query = vec![("key", self.api_key.as_str()), ("pageSize", page_size.as_str())];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self.client.get(self.models_url()).query(&query).send().await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    /// Lists all available models, following pagination.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, GoogleGenerativeAIError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_models_page(page_token.as_deref()).await?;
            models.extend(page.models);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        tracing::debug!(count = models.len(), "listed models");
        Ok(models)
    }

    /// Generates streaming content using the Gemini AI API.
    ///
    /// The returned stream yields the text of each response chunk as it
    /// arrives. Parse and transport errors after the call was accepted are
    /// delivered through the stream.
    pub async fn stream_generate_response(
        &self,
        model: &str,
        request: impl Into<Request>,
    ) -> Result<TextStream, GoogleGenerativeAIError> {
        let response = self
            .client
            .post(self.stream_url(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request.into())
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER_SIZE);
        let mut body = response.bytes_stream();

        tokio::spawn(async move {
            let mut splitter = ObjectSplitter::default();
            while let Some(chunk) = body.next().await {
                let objects = match chunk {
                    Ok(bytes) => splitter.push(&bytes),
                    Err(e) => {
                        let _ = tx.send(Err(GoogleGenerativeAIError::from(e))).await;
                        return;
                    }
                };
                for object in objects {
                    let item = serde_json::from_str::<Response>(&object)
                        .map(|response| response.text())
                        .map_err(|e| {
                            GoogleGenerativeAIError::new(format!(
                                "Failed to parse response: {}",
                                e
                            ))
                        });
                    if tx.send(item).await.is_err() {
                        tracing::debug!("stream receiver dropped, stopping download");
                        return;
                    }
                }
            }
        });

        Ok(TextStream::new(rx))
    }
}

#[async_trait]
impl ContentGenerator for GenerativeModel {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, GoogleGenerativeAIError> {
        GenerativeModel::list_models(self).await
    }

    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<TextStream, GoogleGenerativeAIError> {
        self.stream_generate_response(model, prompt).await
    }
}

/// Cuts the streamed JSON array into its top-level objects.
///
/// Bytes may arrive split anywhere, including inside a UTF-8 sequence or a
/// string literal.
#[derive(Debug, Default)]
struct ObjectSplitter {
    pending: Vec<u8>,
    buffer: String,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl ObjectSplitter {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(e) => e.valid_up_to(),
        };
        let decoded: Vec<u8> = self.pending.drain(..valid).collect();
        let text = String::from_utf8_lossy(&decoded);

        let mut objects = Vec::new();
        for c in text.chars() {
            if self.depth == 0 {
                if c == '{' {
                    self.buffer.clear();
                    self.buffer.reserve(DEFAULT_JSON_BUFFER_CAPACITY);
                    self.buffer.push(c);
                    self.depth = 1;
                }
                continue;
            }

            self.buffer.push(c);
            if self.in_string {
                match c {
                    _ if self.escaped => self.escaped = false,
                    '\\' => self.escaped = true,
                    '"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '{' => self.depth += 1,
                '}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        objects.push(std::mem::take(&mut self.buffer));
                    }
                }
                _ => {}
            }
        }
        objects
    }
}
