//! Contract for the AI story assistant.
//!
//! The engine never inspects which model sits behind this trait. Every call
//! is made after the engine has decided what to do without it, so a failure
//! only costs the suggestion.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::model::{Significance, WordPair};

/// A suggested change of scene tension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensionSuggestion {
    /// `-1`, `0` or `1`.
    pub delta: i32,
    /// Explanation shown alongside the vote.
    pub rationale: String,
}

/// Text generation used by the engine.
#[async_trait]
pub trait StoryAssistant: Send + Sync {
    /// Produces three readings of an oracle question.
    async fn generate_interpretations(
        &self,
        question: &str,
        seeds: Option<&WordPair>,
        context: &str,
    ) -> Result<[String; 3], DomainError>;

    /// Judges whether a beat is minor or major.
    async fn classify_significance(&self, text: &str) -> Result<Significance, DomainError>;

    /// Folds a sequence of passages into one narrative.
    async fn synthesize(&self, passages: &[String]) -> Result<String, DomainError>;

    /// Suggests how tension should move after a scene.
    async fn suggest_tension_delta(
        &self,
        scene_summary: &str,
    ) -> Result<TensionSuggestion, DomainError>;
}
