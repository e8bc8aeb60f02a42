//! Response models for the Gemini AI API.

use serde::Deserialize;

use super::{Content, Part};

/// A response from the Gemini AI API.
///
/// In streaming mode every element of the returned array is one of these,
/// each carrying a fragment of the answer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// The generated candidates from the model.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Metadata about token usage.
    pub usage_metadata: Option<UsageMetadata>,
    /// The version of the model used.
    pub model_version: Option<String>,
}

impl Response {
    /// Concatenates the text parts of every candidate.
    ///
    /// The result may be empty, e.g. for a final chunk that only carries a
    /// finish reason.
    pub fn text(&self) -> String {
        self.candidates
            .iter()
            .flat_map(|candidate| candidate.content.parts.iter().filter_map(Part::as_text))
            .collect()
    }
}

/// A candidate response from the model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of the candidate response.
    #[serde(default = "empty_content")]
    pub content: Content,
    /// The reason why the generation finished.
    pub finish_reason: Option<FinishReason>,
}

fn empty_content() -> Content {
    Content {
        role: None,
        parts: Vec::new(),
    }
}

/// Reason why the generation finished.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// Natural stop point of the model or provided stop sequence.
    Stop,
    /// The maximum number of tokens as specified in the request was reached.
    MaxTokens,
    /// The response candidate content was flagged for safety reasons.
    Safety,
    /// The response candidate content was flagged for recitation reasons.
    Recitation,
    /// Any other reason.
    #[serde(other)]
    Other,
}

/// Metadata about token usage in the request and response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Number of tokens in the prompt.
    pub prompt_token_count: Option<i32>,
    /// Number of tokens in the generated candidates.
    pub candidates_token_count: Option<i32>,
    /// Total number of tokens used.
    pub total_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_joins_fragments_without_separator() {
        let response: Response = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hola" }, { "text": ", mundo" }] }
                }],
                "modelVersion": "gemini-1.5-flash"
            }"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Hola, mundo");
    }

    #[test]
    fn finish_only_chunk_has_empty_text() {
        let response: Response = serde_json::from_str(
            r#"{ "candidates": [{ "finishReason": "BLOCKLIST" }] }"#,
        )
        .unwrap();
        assert_eq!(response.text(), "");
        assert_eq!(
            response.candidates[0].finish_reason,
            Some(FinishReason::Other)
        );
    }
}
