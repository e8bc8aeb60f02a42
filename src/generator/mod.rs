//! Streaming generation with model fallback and backoff retry.
//!
//! A call walks the ranked model list up to `max_attempts` times and
//! returns the first stream any model accepts.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::client::ContentGenerator;
use crate::config::DEFAULT_FALLBACK_MODELS;
use crate::error::{FailureKind, GoogleGenerativeAIError};
use crate::models::TextStream;
use crate::registry::ModelRegistry;

/// Maps a 1-based attempt number to the pause taken after a quota
/// rejection during that attempt.
pub trait BackoffPolicy: Send + Sync {
    /// Delay to wait before trying the next model.
    fn delay(&self, attempt: usize) -> Duration;
}

/// `step × attempt`: 5s, 10s, 15s with the default step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    step: Duration,
}

impl LinearBackoff {
    /// Creates a linear policy with the given step.
    pub fn new(step: Duration) -> Self {
        Self { step }
    }

    /// The per-attempt increment.
    pub fn step(&self) -> Duration {
        self.step
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl BackoffPolicy for LinearBackoff {
    fn delay(&self, attempt: usize) -> Duration {
        self.step
            .saturating_mul(u32::try_from(attempt).unwrap_or(u32::MAX))
    }
}

/// Waits out a backoff delay.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the current interaction for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// An accepted generation call.
#[derive(Debug)]
pub struct ModelStream {
    /// The model that accepted the request
    pub model: String,
    /// The answer fragments, consumed once
    pub stream: TextStream,
    /// Models tried before and including the accepting one
    pub tries: usize,
}

/// Returned when no model accepted the request in any attempt.
#[derive(Debug, Error)]
#[error("no model accepted the request after {tries} tries{}", describe_last(.last_error))]
pub struct GenerationFailure {
    /// Total model calls made
    pub tries: usize,
    /// Total time spent in backoff
    pub slept: Duration,
    /// The error of the final call
    pub last_error: Option<GoogleGenerativeAIError>,
}

fn describe_last(last_error: &Option<GoogleGenerativeAIError>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(" (last error: {})", e))
        .unwrap_or_default()
}

/// Drives streaming calls across the ranked model list.
#[derive(Debug, Clone)]
pub struct ResponseGenerator<B = LinearBackoff, S = TokioSleeper> {
    max_attempts: usize,
    backoff: B,
    sleeper: S,
}

impl ResponseGenerator {
    /// Creates a generator that sleeps on the tokio timer.
    pub fn new(max_attempts: usize, backoff: LinearBackoff) -> Self {
        Self {
            max_attempts,
            backoff,
            sleeper: TokioSleeper,
        }
    }
}

impl<B: BackoffPolicy, S: Sleeper> ResponseGenerator<B, S> {
    /// Replaces the backoff policy.
    pub fn with_backoff<B2: BackoffPolicy>(self, backoff: B2) -> ResponseGenerator<B2, S> {
        ResponseGenerator {
            max_attempts: self.max_attempts,
            backoff,
            sleeper: self.sleeper,
        }
    }

    /// Replaces the sleeper, e.g. with a cancellable or recording timer.
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> ResponseGenerator<B, S2> {
        ResponseGenerator {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            sleeper,
        }
    }

    /// Generates with the models ranked by `registry`.
    pub async fn generate<G>(
        &self,
        client: &G,
        registry: &ModelRegistry,
        prompt: &str,
    ) -> Result<ModelStream, GenerationFailure>
    where
        G: ContentGenerator + ?Sized,
    {
        let models = registry.models(client).await;
        self.generate_with_models(client, models, prompt).await
    }

    /// Generates with an explicit ranked model list.
    ///
    /// An empty list is replaced by the built-in fallback models.
    pub async fn generate_with_models<G>(
        &self,
        client: &G,
        models: &[String],
        prompt: &str,
    ) -> Result<ModelStream, GenerationFailure>
    where
        G: ContentGenerator + ?Sized,
    {
        let fallback: Vec<String>;
        let models = if models.is_empty() {
            fallback = DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect();
            &fallback[..]
        } else {
            models
        };

        let mut tries = 0;
        let mut slept = Duration::ZERO;
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            for model in models {
                tries += 1;
                let err = match client.stream_generate(model, prompt).await {
                    Ok(stream) => {
                        tracing::info!(%model, attempt, tries, "model accepted request");
                        return Ok(ModelStream {
                            model: model.clone(),
                            stream,
                            tries,
                        });
                    }
                    Err(err) => err,
                };

                match err.kind() {
                    FailureKind::QuotaExceeded => {
                        let delay = self.backoff.delay(attempt);
                        tracing::warn!(%model, attempt, ?delay, "quota exceeded, backing off");
                        self.sleeper.sleep(delay).await;
                        slept = slept.saturating_add(delay);
                    }
                    FailureKind::NotFound => {
                        tracing::warn!(%model, attempt, "model not found, skipping");
                    }
                    // Treated like NotFound, so a real fault only surfaces
                    // once every model and attempt is exhausted.
                    FailureKind::Other => {
                        tracing::warn!(%model, attempt, error = %err, "generation failed, skipping");
                    }
                }
                last_error = Some(err);
            }
        }

        tracing::error!(tries, ?slept, "every model rejected the request");
        Err(GenerationFailure {
            tries,
            slept,
            last_error,
        })
    }
}
