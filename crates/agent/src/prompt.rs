//! Prompt templates and rendering.
//!
//! Rendering is deterministic: identical inputs always produce identical
//! bytes. Sections appear in a fixed order and are omitted when empty:
//!
//! 1. **System instructions**
//! 2. **Retrieved Knowledge** (only when retrieval produced matches)
//! 3. **Conversation** (remembered turns, oldest first)
//! 4. **Question** (the current query)

use ragway_core::message::ConversationTurn;
use ragway_memory::{ScoredMatch, StoreDescriptor};

/// Default system instructions for the answering call.
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are a helpful assistant. \
When retrieved knowledge is provided below, base your answer on it and say so \
if it does not contain the answer. Otherwise answer from general knowledge.";

pub const KNOWLEDGE_HEADER: &str = "[Retrieved Knowledge]";
pub const CONVERSATION_HEADER: &str = "[Conversation]";
pub const QUESTION_HEADER: &str = "[Question]";

/// Yes/no/maybe classification for the single-store router.
pub fn binary_classification(domain: &str, query: &str) -> String {
    format!(
        "Does the following query concern {domain}? \
         Answer only with 'yes', 'no' or 'maybe'.\n\nQuery: {query}"
    )
}

/// Source-selection prompt for the multi-store router. Sources are numbered
/// in catalog order.
pub fn multi_store_classification<'a>(
    stores: impl IntoIterator<Item = &'a StoreDescriptor>,
    query: &str,
) -> String {
    let sources: String = stores
        .into_iter()
        .enumerate()
        .map(|(i, store)| format!("{}. {}: {}\n", i + 1, store.id, store.description))
        .collect();

    format!(
        "Which of the following knowledge sources are relevant to the query?\n\n\
         Sources:\n{sources}\n\
         Reply with the names of every relevant source, separated by commas, \
         or 'none' if no source applies.\n\nQuery: {query}"
    )
}

/// Label shown before a fragment in the knowledge section.
fn source_label(m: &ScoredMatch) -> String {
    let origin = m
        .fragment
        .get("file_name")
        .map(|v| v.to_string())
        .unwrap_or_else(|| m.fragment.source_id().to_string());
    format!("{}/{}", m.store_id, origin)
}

/// Compose the final prompt.
pub fn render(
    system: &str,
    matches: &[ScoredMatch],
    memory: &[ConversationTurn],
    query: &str,
) -> String {
    let mut sections = vec![system.trim_end().to_string()];

    if !matches.is_empty() {
        let mut block = format!("{KNOWLEDGE_HEADER}\n");
        for m in matches {
            block.push_str(&format!("[Source: {}] {}\n", source_label(m), m.fragment.text()));
        }
        sections.push(block.trim_end().to_string());
    }

    if !memory.is_empty() {
        let mut block = format!("{CONVERSATION_HEADER}\n");
        for turn in memory {
            block.push_str(&format!("{}: {}\n", turn.role.label(), turn.text));
        }
        sections.push(block.trim_end().to_string());
    }

    sections.push(format!("{QUESTION_HEADER}\n{query}"));
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragway_core::document::Fragment;
    use std::sync::Arc;

    fn scored(store: &str, text: &str, file: &str) -> ScoredMatch {
        ScoredMatch {
            fragment: Arc::new(Fragment::new(text, file).with_metadata("file_name", file)),
            score: 0.8,
            store_id: store.into(),
        }
    }

    #[test]
    fn binary_prompt_mentions_domain_and_query() {
        let prompt = binary_classification("AI or RAG", "What is RAG?");
        assert!(prompt.contains("AI or RAG"));
        assert!(prompt.ends_with("Query: What is RAG?"));
        assert!(prompt.contains("'yes', 'no' or 'maybe'"));
    }

    #[test]
    fn multi_prompt_numbers_sources_in_order() {
        let stores = vec![
            StoreDescriptor::new("rag", "Course notes on RAG"),
            StoreDescriptor::new("cooking", "Recipes"),
        ];
        let prompt = multi_store_classification(&stores, "pasta?");
        let rag = prompt.find("1. rag: Course notes on RAG").unwrap();
        let cooking = prompt.find("2. cooking: Recipes").unwrap();
        assert!(rag < cooking);
        assert!(prompt.ends_with("Query: pasta?"));
    }

    #[test]
    fn render_without_context_or_memory() {
        let text = render("SYS", &[], &[], "hello");
        assert_eq!(text, "SYS\n\n[Question]\nhello");
        assert!(!text.contains(KNOWLEDGE_HEADER));
    }

    #[test]
    fn render_orders_sections() {
        let matches = vec![scored("rag", "RAG retrieves documents.", "rag.txt")];
        let memory = vec![
            ConversationTurn::user("Hi"),
            ConversationTurn::assistant("Hello!"),
        ];
        let text = render("SYS", &matches, &memory, "What is RAG?");

        assert_eq!(
            text,
            "SYS\n\n\
             [Retrieved Knowledge]\n[Source: rag/rag.txt] RAG retrieves documents.\n\n\
             [Conversation]\nUser: Hi\nAssistant: Hello!\n\n\
             [Question]\nWhat is RAG?"
        );
    }

    #[test]
    fn fragment_without_file_name_uses_source_id() {
        let m = ScoredMatch {
            fragment: Arc::new(Fragment::new("text", "origin-7")),
            score: 0.9,
            store_id: "ml".into(),
        };
        assert!(render("S", &[m], &[], "q").contains("[Source: ml/origin-7] text"));
    }
}
