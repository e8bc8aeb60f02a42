use serde::{Deserialize, Serialize};

/// Information about a Gemini model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// The resource name of the model, e.g. `models/gemini-1.5-flash`.
    pub name: String,
    /// A description of what the model does.
    #[serde(default)]
    pub description: String,
    /// The display name of the model.
    #[serde(default)]
    pub display_name: String,
    /// Maximum number of tokens allowed for input.
    #[serde(default)]
    pub input_token_limit: i32,
    /// Maximum number of tokens allowed for output.
    #[serde(default)]
    pub output_token_limit: i32,
    /// List of supported generation methods (e.g., generateContent, countTokens).
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// The model identifier without the `models/` resource prefix.
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    /// Whether the model can serve `generateContent` calls.
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|method| method == "generateContent")
    }
}

/// Response from listing available models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListModelsResponse {
    /// List of available models and their details.
    #[serde(default)]
    pub models: Vec<ModelInfo>,
    /// Token for retrieving the next page of results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}
