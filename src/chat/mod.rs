//! Chat session management over the study documents.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    client::ContentGenerator,
    config::AppConfig,
    documents::{DocumentError, DocumentLibrary},
    generator::{
        BackoffPolicy, GenerationFailure, LinearBackoff, ModelStream, ResponseGenerator, Sleeper,
        TokioSleeper,
    },
    history::{HistoryError, HistoryStore, Transcript},
    prompt::{build_prompt, StudyMode},
    registry::ModelRegistry,
};

/// Errors from the session's on-disk stores.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Document library failure
    #[error(transparent)]
    Documents(#[from] DocumentError),
    /// Session history failure
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Result of one question.
#[derive(Debug)]
pub enum ChatOutcome {
    /// No documents were selected, so nothing was sent to the model.
    NoDocuments,
    /// A model accepted the request; the answer is streaming in.
    Streaming(ModelStream),
    /// Every model rejected the request.
    Failed(GenerationFailure),
}

/// A chat session with the Gemini AI model.
#[derive(Debug)]
pub struct ChatSession<G, B = LinearBackoff, S = TokioSleeper> {
    /// The model client
    client: G,
    registry: ModelRegistry,
    generator: ResponseGenerator<B, S>,
    documents: DocumentLibrary,
    history: HistoryStore,
    /// Chat history
    transcript: Transcript,
    max_context_chars: usize,
}

impl<G: ContentGenerator> ChatSession<G> {
    /// Creates a session from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the document or history folder cannot be created.
    pub fn new(client: G, config: &AppConfig) -> Result<Self, ChatError> {
        Ok(Self::from_parts(
            client,
            ModelRegistry::from_config(config),
            ResponseGenerator::new(config.max_attempts, config.backoff()),
            DocumentLibrary::open(&config.docs_dir)?,
            HistoryStore::open(&config.history_dir)?,
            config.max_context_chars,
        ))
    }
}

impl<G, B, S> ChatSession<G, B, S>
where
    G: ContentGenerator,
    B: BackoffPolicy,
    S: Sleeper,
{
    /// Assembles a session from already constructed components.
    pub fn from_parts(
        client: G,
        registry: ModelRegistry,
        generator: ResponseGenerator<B, S>,
        documents: DocumentLibrary,
        history: HistoryStore,
        max_context_chars: usize,
    ) -> Self {
        Self {
            client,
            registry,
            generator,
            documents,
            history,
            transcript: Transcript::new(),
            max_context_chars,
        }
    }

    /// Records the question and asks the model about the selected documents.
    ///
    /// The answer is not recorded until [`record_answer`](Self::record_answer)
    /// is called with the collected stream text.
    pub async fn ask(
        &mut self,
        question: impl Into<String>,
        mode: StudyMode,
        selection: &[String],
    ) -> ChatOutcome {
        let question = question.into();
        self.transcript.push_user(question.clone());

        if selection.is_empty() {
            return ChatOutcome::NoDocuments;
        }

        let documents = self.documents.extract_text(selection);
        let prompt = build_prompt(mode, &documents, &question, self.max_context_chars);
        tracing::debug!(%mode, documents = selection.len(), prompt_chars = prompt.len(), "asking");

        match self
            .generator
            .generate(&self.client, &self.registry, &prompt)
            .await
        {
            Ok(stream) => ChatOutcome::Streaming(stream),
            Err(failure) => ChatOutcome::Failed(failure),
        }
    }

    /// Appends a completed answer to the transcript.
    pub fn record_answer(&mut self, answer: impl Into<String>) {
        self.transcript.push_assistant(answer);
    }

    /// Saves the transcript; `None` when there was nothing to save.
    pub fn save(&self) -> Result<Option<PathBuf>, ChatError> {
        Ok(self.history.save(&self.transcript)?)
    }

    /// Replaces the transcript with a saved session.
    pub fn load(&mut self, name: &str) -> Result<(), ChatError> {
        let transcript = self.history.load(name)?;
        self.transcript.replace(transcript);
        Ok(())
    }

    /// Clears the chat history.
    pub fn reset(&mut self) {
        self.transcript.clear();
    }

    /// Returns the current chat history.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The uploaded documents.
    pub fn documents(&self) -> &DocumentLibrary {
        &self.documents
    }

    /// The saved sessions.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The model ranking used by this session.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// The API client.
    pub fn client(&self) -> &G {
        &self.client
    }
}
