//! Request models for the Gemini AI API.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::Part;

/// Author of a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Content written by the user
    User,
    /// Content produced by the model
    Model,
}

/// A request to the Gemini AI API.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Optional system instruction for the model
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// The contents of the request, including the prompt text.
    pub contents: Vec<Content>,
}

/// A content object containing parts of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// The parts that make up the content.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Request {
    /// Creates a new request with the given text prompt.
    ///
    /// # Arguments
    ///
    /// * `text` - The text prompt to generate content from
    pub fn with_prompt(text: impl Into<String>) -> Self {
        Self::builder()
            .contents(vec![Content {
                role: Some(Role::User),
                parts: vec![Part::text(text)],
            }])
            .build()
    }
}

impl From<&str> for Request {
    fn from(prompt: &str) -> Self {
        Self::with_prompt(prompt)
    }
}

impl From<String> for Request {
    fn from(prompt: String) -> Self {
        Self::with_prompt(prompt)
    }
}
