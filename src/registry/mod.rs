//! Ranked list of models to try, discovered once per registry.

use tokio::sync::OnceCell;

use crate::client::ContentGenerator;
use crate::config::{AppConfig, DEFAULT_FALLBACK_MODELS};
use crate::models::ModelInfo;

/// Discovers and caches the ranked model list.
///
/// The list is fetched on first use and kept for the lifetime of the
/// registry; it is never refreshed.
#[derive(Debug)]
pub struct ModelRegistry {
    fallback: Vec<String>,
    ranked: OnceCell<Vec<String>>,
}

impl ModelRegistry {
    /// Creates a registry with the given fallback models.
    ///
    /// An empty fallback list is replaced by the built-in defaults.
    pub fn new(fallback: Vec<String>) -> Self {
        let fallback = if fallback.is_empty() {
            DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            fallback
        };
        Self {
            fallback,
            ranked: OnceCell::new(),
        }
    }

    /// Creates a registry using the configured fallback models.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.fallback_models.clone())
    }

    /// The models used when discovery fails.
    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }

    /// Returns the ranked list, fetching it on the first call.
    pub async fn models<G>(&self, client: &G) -> &[String]
    where
        G: ContentGenerator + ?Sized,
    {
        self.ranked
            .get_or_init(|| async {
                match client.list_models().await {
                    Ok(models) => {
                        let ranked = rank_models(&models, &self.fallback);
                        tracing::info!(models = ?ranked, "ranked available models");
                        ranked
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "could not list models, using fallback list");
                        self.fallback.clone()
                    }
                }
            })
            .await
    }

    /// Returns the cached list if discovery already ran.
    pub fn cached(&self) -> Option<&[String]> {
        self.ranked.get().map(Vec::as_slice)
    }
}

/// Orders generation-capable models: `flash` names first, then `pro` names,
/// skipping `vision` models, then any fallback not already listed.
pub fn rank_models(models: &[ModelInfo], fallback: &[String]) -> Vec<String> {
    let candidates: Vec<&str> = models
        .iter()
        .filter(|m| m.supports_generation())
        .map(ModelInfo::id)
        .filter(|id| !id.contains("vision"))
        .collect();

    let flash = candidates.iter().filter(|id| id.contains("flash"));
    let pro = candidates
        .iter()
        .filter(|id| id.contains("pro") && !id.contains("flash"));

    let mut ranked: Vec<String> = flash.chain(pro).map(|id| id.to_string()).collect();
    for model in fallback {
        if !ranked.contains(model) {
            ranked.push(model.clone());
        }
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, methods: &[&str]) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            description: String::new(),
            display_name: String::new(),
            input_token_limit: 0,
            output_token_limit: 0,
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn fallback() -> Vec<String> {
        vec!["gemini-1.5-flash".into(), "gemini-pro".into()]
    }

    #[test]
    fn flash_before_pro_then_missing_fallbacks() {
        let models = vec![
            info("models/gemini-1.5-pro", &["generateContent"]),
            info("models/gemini-2.0-flash", &["generateContent", "countTokens"]),
            info("models/gemini-1.5-flash", &["generateContent"]),
        ];
        assert_eq!(
            rank_models(&models, &fallback()),
            vec!["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro", "gemini-pro"]
        );
    }

    #[test]
    fn skips_vision_and_non_generating_models() {
        let models = vec![
            info("models/gemini-pro-vision", &["generateContent"]),
            info("models/text-embedding-004", &["embedContent"]),
            info("models/gemini-flash-embed", &["embedContent"]),
            info("models/aqa", &["generateAnswer"]),
        ];
        assert_eq!(rank_models(&models, &fallback()), fallback());
    }

    #[test]
    fn flash_pro_hybrid_is_listed_once() {
        let models = vec![info("models/gemini-flash-pro-exp", &["generateContent"])];
        assert_eq!(
            rank_models(&models, &[]),
            vec!["gemini-flash-pro-exp".to_string()]
        );
    }

    #[test]
    fn empty_fallback_uses_defaults() {
        assert_eq!(ModelRegistry::new(Vec::new()).fallback(), &fallback()[..]);
    }
}
