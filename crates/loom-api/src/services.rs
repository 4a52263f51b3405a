//! Default collaborators for a server without an AI provider or a mail
//! queue.

use async_trait::async_trait;
use loom_core::assistant::{StoryAssistant, TensionSuggestion};
use loom_core::error::DomainError;
use loom_core::model::{Significance, WordPair};
use loom_core::notification::{Notification, Notifier};
use tracing::info;

/// Canned assistant answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderAssistant;

#[async_trait]
impl StoryAssistant for PlaceholderAssistant {
    async fn generate_interpretations(
        &self,
        _question: &str,
        _seeds: Option<&WordPair>,
        _context: &str,
    ) -> Result<[String; 3], DomainError> {
        Ok([
            "The threads of fate suggest an unexpected alliance forms in shadow.".to_owned(),
            "Ancient obligations resurface, demanding a choice between duty and desire."
                .to_owned(),
            "What was lost cannot be reclaimed unchanged, but transformation awaits.".to_owned(),
        ])
    }

    async fn classify_significance(&self, _text: &str) -> Result<Significance, DomainError> {
        Ok(Significance::Minor)
    }

    async fn synthesize(&self, passages: &[String]) -> Result<String, DomainError> {
        Ok(passages.join("\n\n"))
    }

    async fn suggest_tension_delta(
        &self,
        _scene_summary: &str,
    ) -> Result<TensionSuggestion, DomainError> {
        Ok(TensionSuggestion {
            delta: 0,
            rationale: "No change suggested.".to_owned(),
        })
    }
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        if notification.recipients.is_empty() {
            return;
        }
        info!(
            game_id = %notification.game_id,
            kind = ?notification.kind,
            recipients = notification.recipients.len(),
            link = notification.link.as_deref().unwrap_or_default(),
            "{}",
            notification.message
        );
    }
}
