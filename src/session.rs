//! Conversation orchestration for the text consultation channel.
//!
//! One session owns the conversation log, the active section filters and
//! the sticky side-panel payload. A submission is rejected synchronously
//! when it is empty or another request is in flight; otherwise the user
//! message and a thinking placeholder land in the log immediately and the
//! placeholder is resolved in place when generation settles. Failures
//! resolve it with a synthetic report, so the log never carries a
//! permanently pending turn.

use crate::llm::client::GenerationClient;
use crate::llm::prompts;
use crate::messages::{Attachment, ConversationLog, GenerationMode};
use crate::report::{extract_visual, visible_sections, FilterKey, FilterSet, Section, VisualData};
use crate::{EngenheiroError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct ChatSession {
    log: ConversationLog,
    client: Arc<dyn GenerationClient>,
    filters: Mutex<FilterSet>,
    /// Latest visual payload; replaced wholesale when a response carries
    /// one, untouched otherwise
    visual: Mutex<VisualData>,
    is_loading: AtomicBool,
}

impl ChatSession {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            log: ConversationLog::with_welcome(prompts::WELCOME_REPORT),
            client,
            filters: Mutex::new(FilterSet::all()),
            visual: Mutex::new(VisualData::default()),
            is_loading: AtomicBool::new(false),
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn visual_data(&self) -> VisualData {
        self.visual.lock().clone()
    }

    /// Toggle a section filter; returns the resulting activation state
    pub fn toggle_filter(&self, key: FilterKey) -> bool {
        self.filters.lock().toggle(key)
    }

    pub fn filter_active(&self, key: FilterKey) -> bool {
        self.filters.lock().contains(key)
    }

    /// Sections of a response that survive the active filters
    pub fn visible_report(&self, text: &str) -> Vec<Section> {
        visible_sections(text, &self.filters.lock())
    }

    /// Submit a consultation. Returns the id of the bot message that will
    /// carry the report; the caller polls the log for resolution.
    pub async fn submit(
        &self,
        text: &str,
        attachments: Vec<Attachment>,
        mode: GenerationMode,
    ) -> Result<Uuid> {
        let trimmed = text.trim();
        if trimmed.is_empty() && attachments.is_empty() {
            return Err(EngenheiroError::EmptySubmission);
        }
        if self.is_loading.swap(true, Ordering::SeqCst) {
            return Err(EngenheiroError::Busy);
        }

        // From here every path must clear the loading flag
        self.log.push_user(trimmed, attachments.clone());
        let placeholder = self.log.begin_bot_turn();

        match self.client.generate(trimmed, &attachments, mode).await {
            Ok(raw) => {
                let parsed = extract_visual(&raw);
                if let Some(visual) = parsed.visual {
                    debug!(
                        has_svg = visual.svg.is_some(),
                        has_table = visual.table.is_some(),
                        "updating visual panel"
                    );
                    *self.visual.lock() = visual;
                }
                self.log.resolve(placeholder, parsed.text);
            }
            Err(e) => {
                warn!("generation failed: {}", e);
                self.log.fail(placeholder, prompts::error_report(&e.user_message()));
            }
        }

        self.is_loading.store(false, Ordering::SeqCst);
        Ok(placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockGenerationClient;

    fn session_with(client: MockGenerationClient) -> ChatSession {
        ChatSession::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_empty_submission_rejected_without_side_effects() {
        let session = session_with(MockGenerationClient::replying("ok"));
        let before = session.log().len();

        let err = session
            .submit("   ", Vec::new(), GenerationMode::Plain)
            .await
            .unwrap_err();

        assert!(matches!(err, EngenheiroError::EmptySubmission));
        assert_eq!(session.log().len(), before);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_attachment_only_submission_is_accepted() {
        let session = session_with(MockGenerationClient::replying("## 1. Interpretação Normativa\nok"));
        let att = Attachment::from_bytes("image/png", &[0x89, 0x50], None).unwrap();

        let id = session
            .submit("", vec![att], GenerationMode::Plain)
            .await
            .unwrap();
        assert!(session.log().get(id).is_some());
    }

    #[tokio::test]
    async fn test_welcome_report_is_seeded() {
        let session = session_with(MockGenerationClient::replying("ok"));
        assert_eq!(session.log().len(), 1);
        assert!(session.log().get_all()[0].text.contains("Sistema online"));
    }
}
