//! The retrieval-augmented turn loop for Ragway.
//!
//! Each user query goes through:
//!
//! 1. **Route**: the [`QueryRouter`] asks the model which stores apply
//! 2. **Retrieve**: selected stores are searched with the query embedding
//! 3. **Augment**: matches, memory and query are rendered into one prompt
//! 4. **Generate**: the prompt is sent once; the answer joins memory
//!
//! Routing and retrieval failures degrade to an ungrounded prompt. Only a
//! failed generation fails the turn.

pub mod assistant;
pub mod augmentor;
pub mod prompt;
pub mod router;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assistant::{Answer, Assistant, TurnReport, TurnState};
pub use augmentor::{AugmentedPrompt, RetrievalAugmentor};
pub use router::{QueryRouter, RouterDecision};
