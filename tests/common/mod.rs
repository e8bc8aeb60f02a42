#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use study_chat::{
    error::GoogleGenerativeAIError,
    generator::Sleeper,
    models::{ModelInfo, TextStream},
    ContentGenerator,
};

/// What a scripted model does when called.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Accept the call and stream these fragments
    Stream(Vec<&'static str>),
    /// Reject with an HTTP status and body
    Status(u16, &'static str),
    /// Fail without any HTTP status, e.g. a broken connection
    Transport(&'static str),
}

/// A fake API whose models follow a script.
///
/// Call `n` of a model uses reply `n` of its script; the last reply repeats.
/// Models without a script answer 404.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    listing: Option<Vec<ModelInfo>>,
    scripts: HashMap<String, Vec<Reply>>,
    calls: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    list_calls: Mutex<usize>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: &str, script: Vec<Reply>) -> Self {
        self.scripts.insert(model.to_string(), script);
        self
    }

    pub fn with_listing(mut self, names: &[&str]) -> Self {
        self.listing = Some(names.iter().map(|name| model_info(name)).collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Prompts in the order they were sent, one per call.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, GoogleGenerativeAIError> {
        *self.list_calls.lock().unwrap() += 1;
        self.listing
            .clone()
            .ok_or_else(|| GoogleGenerativeAIError::api(503, "listing unavailable"))
    }

    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<TextStream, GoogleGenerativeAIError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let nth = {
            let mut calls = self.calls.lock().unwrap();
            let nth = calls.iter().filter(|m| *m == model).count();
            calls.push(model.to_string());
            nth
        };
        let reply = match self.scripts.get(model) {
            Some(script) => script[nth.min(script.len() - 1)].clone(),
            None => Reply::Status(404, "model not found"),
        };
        match reply {
            Reply::Stream(chunks) => Ok(TextStream::from_chunks(chunks)),
            Reply::Status(status, body) => Err(GoogleGenerativeAIError::api(status, body)),
            Reply::Transport(message) => Err(GoogleGenerativeAIError::new(message)),
        }
    }
}

pub fn model_info(name: &str) -> ModelInfo {
    ModelInfo {
        name: format!("models/{name}"),
        description: String::new(),
        display_name: name.to_string(),
        input_token_limit: 1_048_576,
        output_token_limit: 8192,
        supported_generation_methods: vec!["generateContent".into(), "countTokens".into()],
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

pub async fn collect(mut stream: TextStream) -> String {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk.unwrap());
    }
    text
}

pub fn names(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}
