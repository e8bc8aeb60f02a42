#![deny(missing_docs)]

//! Chat with PDF study materials through the Google Gemini AI API.
//!
//! The crate wraps the streaming Gemini endpoint with model discovery,
//! fallback across models and backoff on quota errors, and keeps chat
//! sessions on disk.

pub mod chat;
pub mod client;
pub mod config;
pub mod documents;
pub mod error;
pub mod export;
pub mod generator;
pub mod history;
pub mod models;
pub mod prompt;
pub mod registry;

pub use client::{ContentGenerator, GenerativeModel};
pub use generator::{GenerationFailure, ModelStream, ResponseGenerator};
