//! Test assistants: canned and failing `StoryAssistant` implementations.

use async_trait::async_trait;
use loom_core::assistant::{StoryAssistant, TensionSuggestion};
use loom_core::error::DomainError;
use loom_core::model::{Significance, WordPair};

/// An assistant that answers every call with configured values.
#[derive(Debug, Clone)]
pub struct ScriptedAssistant {
    /// Returned by `generate_interpretations`.
    pub interpretations: [String; 3],
    /// Returned by `classify_significance`.
    pub significance: Significance,
    /// Returned by `synthesize`.
    pub synthesis: String,
    /// Returned by `suggest_tension_delta`.
    pub tension: TensionSuggestion,
}

impl Default for ScriptedAssistant {
    fn default() -> Self {
        Self {
            interpretations: [
                "An old debt comes due.".to_owned(),
                "A stranger knows more than they say.".to_owned(),
                "The storm is a warning, not an accident.".to_owned(),
            ],
            significance: Significance::Minor,
            synthesis: "The tide went out and did not return.".to_owned(),
            tension: TensionSuggestion {
                delta: 1,
                rationale: "the stakes keep rising".to_owned(),
            },
        }
    }
}

impl ScriptedAssistant {
    /// An assistant that classifies every beat as major.
    #[must_use]
    pub fn classifying_major() -> Self {
        Self {
            significance: Significance::Major,
            ..Self::default()
        }
    }
}

#[async_trait]
impl StoryAssistant for ScriptedAssistant {
    async fn generate_interpretations(
        &self,
        _question: &str,
        _seeds: Option<&WordPair>,
        _context: &str,
    ) -> Result<[String; 3], DomainError> {
        Ok(self.interpretations.clone())
    }

    async fn classify_significance(&self, _text: &str) -> Result<Significance, DomainError> {
        Ok(self.significance)
    }

    async fn synthesize(&self, _passages: &[String]) -> Result<String, DomainError> {
        Ok(self.synthesis.clone())
    }

    async fn suggest_tension_delta(
        &self,
        _scene_summary: &str,
    ) -> Result<TensionSuggestion, DomainError> {
        Ok(self.tension.clone())
    }
}

/// An assistant whose every call fails.
#[derive(Debug)]
pub struct FailingAssistant;

#[async_trait]
impl StoryAssistant for FailingAssistant {
    async fn generate_interpretations(
        &self,
        _question: &str,
        _seeds: Option<&WordPair>,
        _context: &str,
    ) -> Result<[String; 3], DomainError> {
        Err(DomainError::Infrastructure("assistant unavailable".into()))
    }

    async fn classify_significance(&self, _text: &str) -> Result<Significance, DomainError> {
        Err(DomainError::Infrastructure("assistant unavailable".into()))
    }

    async fn synthesize(&self, _passages: &[String]) -> Result<String, DomainError> {
        Err(DomainError::Infrastructure("assistant unavailable".into()))
    }

    async fn suggest_tension_delta(
        &self,
        _scene_summary: &str,
    ) -> Result<TensionSuggestion, DomainError> {
        Err(DomainError::Infrastructure("assistant unavailable".into()))
    }
}
