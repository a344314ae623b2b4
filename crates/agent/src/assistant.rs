//! The per-turn orchestrator.
//!
//! Each call to [`Assistant::ask`] walks a forward-only state machine:
//!
//! ```text
//! Idle → Routing → Retrieving → Augmenting → Generating → Answered
//!                 (skipped when                          ↘ Failed
//!                  nothing is routed)
//! ```
//!
//! Memory is only written on `Answered`: the user turn, then the assistant
//! turn. A failed generation leaves memory exactly as it was.

use crate::augmentor::{AugmentedPrompt, RetrievalAugmentor};
use ragway_core::error::Error;
use ragway_core::message::ConversationTurn;
use ragway_core::provider::LanguageModel;
use ragway_memory::ConversationMemory;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Routing,
    Retrieving,
    Augmenting,
    Generating,
    Answered,
    Failed,
}

/// Diagnostics for one turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// States visited, in order, starting at `Idle`.
    pub states: Vec<TurnState>,
    /// The prompt sent for generation.
    pub prompt: AugmentedPrompt,
}

impl TurnReport {
    pub fn final_state(&self) -> TurnState {
        self.states.last().copied().unwrap_or(TurnState::Idle)
    }
}

/// A successful turn.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub report: TurnReport,
}

pub struct Assistant {
    augmentor: RetrievalAugmentor,
    model: Arc<dyn LanguageModel>,
    memory: ConversationMemory,
    last_report: Option<TurnReport>,
}

impl Assistant {
    pub fn new(
        augmentor: RetrievalAugmentor,
        model: Arc<dyn LanguageModel>,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            augmentor,
            model,
            memory,
            last_report: None,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Report of the most recent turn, answered or failed.
    pub fn last_report(&self) -> Option<&TurnReport> {
        self.last_report.as_ref()
    }

    /// Run one turn.
    ///
    /// Returns [`Error::Generation`] if the final model call fails; routing
    /// and retrieval problems are absorbed along the way.
    pub async fn ask(&mut self, query: &str) -> Result<Answer, Error> {
        let mut states = vec![TurnState::Idle, TurnState::Routing];
        let decision = self.augmentor.route(query).await;

        let (matches, degraded) = if decision.is_empty() {
            (Vec::new(), None)
        } else {
            states.push(TurnState::Retrieving);
            self.augmentor.retrieve_or_degrade(query, &decision).await
        };

        states.push(TurnState::Augmenting);
        let prompt =
            self.augmentor
                .compose(query, &self.memory.snapshot(), decision, matches, degraded);

        states.push(TurnState::Generating);
        match self.model.complete(&prompt.text).await {
            Ok(text) => {
                states.push(TurnState::Answered);
                info!(
                    stores = ?prompt.decision.store_ids,
                    matches = prompt.matches.len(),
                    degraded = prompt.degraded.is_some(),
                    answer_len = text.len(),
                    "Turn answered"
                );

                self.memory.append(ConversationTurn::user(query));
                self.memory.append(ConversationTurn::assistant(text.clone()));

                let report = TurnReport { states, prompt };
                self.last_report = Some(report.clone());
                Ok(Answer { text, report })
            }
            Err(e) => {
                states.push(TurnState::Failed);
                warn!(error = %e, "GenerationFailure: turn aborted, memory unchanged");
                self.last_report = Some(TurnReport { states, prompt });
                Err(Error::Generation(e))
            }
        }
    }
}
