//! Data structures for the Gemini AI API requests and responses.

mod info;
mod part;
mod request;
mod response;
mod stream;

pub use info::{ListModelsResponse, ModelInfo};
pub use part::Part;
pub use request::{Content, Request, Role};
pub use response::{Candidate, FinishReason, Response, UsageMetadata};
pub use stream::TextStream;
