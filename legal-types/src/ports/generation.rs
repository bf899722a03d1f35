//! Text generation port.
//!
//! The chat service only needs "history in, reply text out"; the concrete
//! LLM vendor lives behind this trait.

use crate::domain::TurnRole;

/// Error type for text generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation service unreachable: {0}")]
    Transport(String),

    #[error("Generation request timed out")]
    Timeout,

    #[error("Generation service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected generation response: {0}")]
    Decode(String),
}

impl GenerationError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Transport(_) | GenerationError::Timeout => true,
            GenerationError::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            GenerationError::Decode(_) => false,
        }
    }
}

/// One prior message given to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTurn {
    pub role: TurnRole,
    pub text: String,
}

/// Conversation history plus the system-style instruction.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub instruction: String,
    /// Oldest first
    pub history: Vec<PromptTurn>,
}

/// Port trait for text generation backends.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a reply. `Ok(None)` means the backend answered without text.
    async fn generate(&self, request: &GenerationRequest)
    -> Result<Option<String>, GenerationError>;
}
