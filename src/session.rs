//! Question-answering session
//!
//! Owns the active document, the conversation and the suggested questions
//! for the lifetime of one client. All state lives in memory.
//!
//! Phases: `Empty -> Processing -> Ready -> Answering -> Ready`, with
//! `reset` returning to `Empty` from anywhere. While `Processing` or
//! `Answering`, new uploads and questions are ignored rather than queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::chunking::{join_context, Chunk, PdfChunker, Upload};
use crate::config::Config;
use crate::error::UploadError;
use crate::generate::{generate_answer_stream, generate_sample_questions};
use crate::llm::{LLMProvider, Message, Role};
use crate::sample::{sample_chunks, SAMPLE_NAME};
use crate::search::{SearchEngine, DEFAULT_COUNT};

/// Shown in place of a failed answer
pub const GENERATION_FAILED_MESSAGE: &str =
    "Sorry, I encountered an error while generating a response. Please try again.";

/// Shown on the upload screen when a document cannot be loaded
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to process PDF. Please try a different file.";

pub const STATUS_PROCESSING: &str = "Processing PDF... this may take a moment.";
pub const STATUS_LOADING_SAMPLE: &str = "Loading sample document...";
pub const STATUS_SUGGESTING: &str = "Generating question suggestions...";
pub const STATUS_RETRIEVING: &str = "Finding relevant information...";
pub const STATUS_GENERATING: &str = "Generating answer...";

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No document loaded
    Empty,
    /// An upload or sample load is in flight
    Processing,
    /// A document is loaded and the session is idle
    Ready,
    /// Retrieval and answer streaming are in flight
    Answering,
}

impl Phase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Processing | Self::Answering)
    }
}

/// The active document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub chunks: Vec<Chunk>,
}

/// Result of an upload or sample load that did not fail
#[derive(Debug)]
pub enum LoadOutcome {
    /// The document is active; suggestions are being generated
    Loaded(SuggestionTask),
    /// The session was busy, or was reset while loading
    Ignored,
}

/// Result of asking a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    /// The answer streamed to completion and joined the conversation
    Answered,
    /// Streaming failed; the conversation ends with an apology message
    Failed,
    /// Blank question, no document, or the session was busy
    Ignored,
    /// The session was reset while the answer was streaming
    Superseded,
}

/// Background suggestion generation for one loaded document
#[derive(Debug)]
pub struct SuggestionTask {
    handle: JoinHandle<()>,
}

impl SuggestionTask {
    /// Wait until the suggestions have been stored or discarded
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "suggestion task did not complete");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Mutable session state. Only touched with the lock held, never across an
/// await point.
#[derive(Debug)]
struct State {
    phase: Phase,
    document: Option<Arc<Document>>,
    conversation: Vec<Message>,
    /// Model text of the in-flight turn, kept apart from the conversation
    pending: Option<String>,
    suggestions: Vec<String>,
    error: Option<String>,
    status: Option<String>,
    /// Bumped whenever the active document changes or the session resets
    generation: u64,
}

impl State {
    fn new() -> Self {
        Self {
            phase: Phase::Empty,
            document: None,
            conversation: Vec::new(),
            pending: None,
            suggestions: Vec::new(),
            error: None,
            status: None,
            generation: 0,
        }
    }
}

struct Inner {
    provider: Arc<dyn LLMProvider>,
    chunker: PdfChunker,
    search: SearchEngine,
    state: Mutex<State>,
}

/// Handle to a session. Clones share the same state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Create an empty session using an already built model client
    pub fn new(provider: Arc<dyn LLMProvider>, config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                chunker: PdfChunker::with_sizes(config.chunk_size, config.chunk_overlap),
                search: SearchEngine::with_count(config.top_k),
                state: Mutex::new(State::new()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn is_busy(&self) -> bool {
        self.state().phase.is_busy()
    }

    pub fn document_name(&self) -> Option<String> {
        self.state().document.as_ref().map(|d| d.name.clone())
    }

    pub fn document(&self) -> Option<Arc<Document>> {
        self.state().document.clone()
    }

    /// The conversation, with the in-flight model message last while streaming
    pub fn messages(&self) -> Vec<Message> {
        let state = self.state();
        let mut messages = state.conversation.clone();
        if let Some(pending) = &state.pending {
            messages.push(Message::model(pending.clone()));
        }
        messages
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.state().suggestions.clone()
    }

    /// Error from the last failed upload, if any
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Transient progress line for the current operation
    pub fn status(&self) -> Option<String> {
        self.state().status.clone()
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Start a load if idle. Returns the phase to restore on failure and the
    /// generation the load belongs to.
    fn begin_load(&self, status: &str) -> Option<(Phase, u64)> {
        let mut state = self.state();
        if state.phase.is_busy() {
            debug!(phase = ?state.phase, "load ignored, session busy");
            return None;
        }
        let previous = state.phase;
        state.phase = Phase::Processing;
        state.status = Some(status.to_string());
        state.error = None;
        state.suggestions.clear();
        Some((previous, state.generation))
    }

    /// Load a PDF upload as the active document.
    ///
    /// On failure the previous document and conversation are kept, the
    /// upload error message is set and the error is returned.
    pub async fn upload(&self, upload: Upload) -> Result<LoadOutcome, UploadError> {
        let Some((previous, generation)) = self.begin_load(STATUS_PROCESSING) else {
            return Ok(LoadOutcome::Ignored);
        };

        info!(name = %upload.name, bytes = upload.bytes.len(), "processing upload");
        let chunker = self.inner.chunker.clone();
        let name = upload.name.clone();
        let result = tokio::task::spawn_blocking(move || chunker.process(&upload))
            .await
            .unwrap_or_else(|e| Err(UploadError::Unreadable(e.to_string())));

        match result {
            Ok(chunks) => {
                let greeting = format!(
                    "Successfully processed \"{name}\". You can now ask questions about its content."
                );
                Ok(self.install(generation, Document { name, chunks }, greeting))
            }
            Err(e) => {
                warn!(error = %e, name = %name, "upload failed");
                let mut state = self.state();
                if state.generation == generation {
                    state.phase = previous;
                    state.status = None;
                    state.error = Some(UPLOAD_FAILED_MESSAGE.to_string());
                }
                Err(e)
            }
        }
    }

    /// Load the built-in sample document
    pub async fn load_sample(&self) -> LoadOutcome {
        let Some((_, generation)) = self.begin_load(STATUS_LOADING_SAMPLE) else {
            return LoadOutcome::Ignored;
        };

        let greeting = format!(
            "Successfully loaded sample \"{SAMPLE_NAME}\". You can now ask questions about its content."
        );
        let document = Document {
            name: SAMPLE_NAME.to_string(),
            chunks: sample_chunks(),
        };
        self.install(generation, document, greeting)
    }

    /// Make `document` active and start suggestion generation for it.
    fn install(&self, generation: u64, document: Document, greeting: String) -> LoadOutcome {
        let document = Arc::new(document);
        let current = {
            let mut state = self.state();
            if state.generation != generation {
                debug!(name = %document.name, "discarding load superseded by reset");
                return LoadOutcome::Ignored;
            }
            state.generation += 1;
            state.document = Some(Arc::clone(&document));
            state.conversation = vec![Message::system(greeting)];
            state.pending = None;
            state.suggestions.clear();
            state.error = None;
            state.status = Some(STATUS_SUGGESTING.to_string());
            state.phase = Phase::Ready;
            state.generation
        };

        info!(name = %document.name, chunks = document.chunks.len(), "document ready");
        LoadOutcome::Loaded(self.spawn_suggestions(current, document))
    }

    fn spawn_suggestions(&self, generation: u64, document: Arc<Document>) -> SuggestionTask {
        let session = self.clone();
        let handle = tokio::spawn(async move {
            let seed = SearchEngine::with_count(DEFAULT_COUNT);
            let context = join_context(seed.search("", &document.chunks));
            let questions =
                generate_sample_questions(session.inner.provider.as_ref(), &context).await;

            let mut state = session.state();
            if state.generation != generation || state.phase != Phase::Ready {
                debug!("discarding suggestions for an inactive document");
                return;
            }
            // Only the greeting may precede suggestions; a turn clears them for good
            if state.conversation.len() != 1 || state.pending.is_some() {
                debug!("discarding suggestions, a question was already asked");
                return;
            }
            debug!(count = questions.len(), "suggestions ready");
            state.suggestions = questions;
            if state.status.as_deref() == Some(STATUS_SUGGESTING) {
                state.status = None;
            }
        });
        SuggestionTask { handle }
    }

    /// Ask a question about the active document, streaming the answer.
    ///
    /// `on_fragment` receives each piece of model text as it arrives, after
    /// it has been appended to the in-flight message.
    pub async fn ask<F>(&self, query: &str, mut on_fragment: F) -> AskOutcome
    where
        F: FnMut(&str) + Send,
    {
        if query.trim().is_empty() {
            return AskOutcome::Ignored;
        }

        let (document, generation) = {
            let mut state = self.state();
            if state.phase.is_busy() {
                debug!(phase = ?state.phase, "question ignored, session busy");
                return AskOutcome::Ignored;
            }
            let Some(document) = state.document.clone() else {
                debug!("question ignored, no document loaded");
                return AskOutcome::Ignored;
            };
            state.phase = Phase::Answering;
            state.conversation.push(Message::user(query));
            state.pending = Some(String::new());
            state.suggestions.clear();
            state.status = Some(STATUS_RETRIEVING.to_string());
            (document, state.generation)
        };

        let relevant = self.inner.search.search(query, &document.chunks);
        let context = join_context(relevant.iter().copied());

        {
            let mut state = self.state();
            if state.generation == generation {
                state.status = Some(STATUS_GENERATING.to_string());
            }
        }

        let result = generate_answer_stream(
            self.inner.provider.as_ref(),
            query,
            &context,
            |fragment| {
                {
                    let mut state = self.state();
                    if state.generation != generation {
                        return;
                    }
                    if let Some(pending) = state.pending.as_mut() {
                        pending.push_str(fragment);
                    }
                }
                on_fragment(fragment);
            },
        )
        .await;

        let mut state = self.state();
        if state.generation != generation {
            debug!("answer discarded, session was reset");
            return AskOutcome::Superseded;
        }
        state.phase = Phase::Ready;
        state.status = None;
        let pending = state.pending.take().unwrap_or_default();

        match result {
            Ok(()) => {
                state.conversation.push(Message::new(Role::Model, pending));
                AskOutcome::Answered
            }
            Err(e) => {
                error!(error = %e, "answer generation failed");
                state
                    .conversation
                    .push(Message::system(GENERATION_FAILED_MESSAGE));
                AskOutcome::Failed
            }
        }
    }

    /// Ask one of the suggested questions by position
    pub async fn ask_suggestion<F>(&self, index: usize, on_fragment: F) -> AskOutcome
    where
        F: FnMut(&str) + Send,
    {
        let Some(query) = self.state().suggestions.get(index).cloned() else {
            return AskOutcome::Ignored;
        };
        self.ask(&query, on_fragment).await
    }

    /// Drop the document, conversation and suggestions
    pub fn reset(&self) {
        let mut state = self.state();
        let generation = state.generation + 1;
        *state = State::new();
        state.generation = generation;
        info!("session reset");
    }
}
