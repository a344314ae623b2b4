//! Query routing: decides which knowledge stores a query should consult.
//!
//! Both strategies use the generative model as a classification oracle:
//! one prompt, one response. Interpreting the response is a pure function
//! of its text, so a fixed response always yields the same decision.
//!
//! - [`QueryRouter::Binary`] guards a single store. Any response containing
//!   a negative marker as a whole word skips retrieval; everything else,
//!   including "maybe", routes to the store.
//! - [`QueryRouter::MultiStore`] shows the numbered store descriptions and
//!   selects exactly the stores the model names, in catalog order. Ids may
//!   contain spaces or dots; a catalog number counts only as a whole answer
//!   item.

use crate::prompt;
use ragway_core::error::RoutingError;
use ragway_core::provider::LanguageModel;
use ragway_memory::StoreDescriptor;
use tracing::{info, warn};

/// Stores selected for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterDecision {
    /// Selected store ids, de-duplicated, in catalog order.
    pub store_ids: Vec<String>,
    /// The oracle's raw answer or the reason for a fallback. Diagnostics only.
    pub rationale: Option<String>,
}

impl RouterDecision {
    pub fn none(rationale: impl Into<String>) -> Self {
        Self {
            store_ids: Vec::new(),
            rationale: Some(rationale.into()),
        }
    }

    pub fn select(store_ids: Vec<String>, rationale: impl Into<String>) -> Self {
        Self {
            store_ids,
            rationale: Some(rationale.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.store_ids.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum QueryRouter {
    Binary {
        store_id: String,
        /// Inserted into the classification prompt ("Does the query concern {domain}?").
        domain: String,
        /// Lower-case words that mean "no".
        negative_markers: Vec<String>,
    },
    MultiStore {
        stores: Vec<StoreDescriptor>,
    },
}

impl QueryRouter {
    /// A single-store router answering to "no" and "non".
    pub fn binary(store_id: impl Into<String>, domain: impl Into<String>) -> Self {
        QueryRouter::Binary {
            store_id: store_id.into(),
            domain: domain.into(),
            negative_markers: vec!["no".into(), "non".into()],
        }
    }

    pub fn multi_store(stores: Vec<StoreDescriptor>) -> Self {
        QueryRouter::MultiStore { stores }
    }

    /// Replace the negative markers of a binary router. No-op for multi-store.
    pub fn with_negative_markers(mut self, markers: Vec<String>) -> Self {
        if let QueryRouter::Binary {
            negative_markers, ..
        } = &mut self
        {
            *negative_markers = markers.into_iter().map(|m| m.trim().to_lowercase()).collect();
        }
        self
    }

    pub fn classification_prompt(&self, query: &str) -> String {
        match self {
            QueryRouter::Binary { domain, .. } => prompt::binary_classification(domain, query),
            QueryRouter::MultiStore { stores } => prompt::multi_store_classification(stores, query),
        }
    }

    /// Ask the oracle and turn its answer into a decision.
    ///
    /// Never fails: an oracle error routes a binary router to its store and a
    /// multi-store router to nothing; an unparseable answer routes nowhere.
    pub async fn route(&self, query: &str, oracle: &dyn LanguageModel) -> RouterDecision {
        let prompt = self.classification_prompt(query);

        let decision = match oracle.complete(&prompt).await {
            Ok(response) => match self.interpret(&response) {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(error = %e, "RouterParseFailure: no store selected");
                    RouterDecision::none(response)
                }
            },
            Err(e) => {
                let err = RoutingError::from(e);
                warn!(error = %err, "Router oracle failed, using fallback decision");
                self.fallback_decision(&err)
            }
        };

        info!(
            stores = ?decision.store_ids,
            rationale = decision.rationale.as_deref().unwrap_or(""),
            "Router decision"
        );
        decision
    }

    /// Interpret a classification response.
    pub fn interpret(&self, response: &str) -> Result<RouterDecision, RoutingError> {
        let normalized = response.trim().to_lowercase();
        match self {
            QueryRouter::Binary {
                store_id,
                negative_markers,
                ..
            } => {
                let negative = words(&normalized).any(|w| negative_markers.iter().any(|m| m == w));
                if negative {
                    Ok(RouterDecision::none(normalized))
                } else {
                    Ok(RouterDecision::select(vec![store_id.clone()], normalized))
                }
            }
            QueryRouter::MultiStore { stores } => {
                let mut hits = vec![false; stores.len()];

                // Longest ids first, so "rag.notes" is consumed before "rag".
                let mut by_length: Vec<usize> = (0..stores.len()).collect();
                by_length.sort_by_key(|&i| std::cmp::Reverse(stores[i].id.len()));
                let mut remaining = normalized.clone();
                for i in by_length {
                    if take_mention(&mut remaining, &stores[i].id.to_lowercase()) {
                        hits[i] = true;
                    }
                }
                for number in answer_numbers(&normalized) {
                    if let Some(hit) = number.checked_sub(1).and_then(|i| hits.get_mut(i)) {
                        *hit = true;
                    }
                }

                let selected: Vec<String> = stores
                    .iter()
                    .zip(&hits)
                    .filter(|(_, hit)| **hit)
                    .map(|(store, _)| store.id.clone())
                    .collect();

                if !selected.is_empty() {
                    Ok(RouterDecision::select(selected, normalized))
                } else if words(&normalized).any(|w| w == "none") {
                    Ok(RouterDecision::none(normalized))
                } else {
                    Err(RoutingError::Unparseable {
                        response: response.to_string(),
                    })
                }
            }
        }
    }

    fn fallback_decision(&self, err: &RoutingError) -> RouterDecision {
        match self {
            QueryRouter::Binary { store_id, .. } => {
                RouterDecision::select(vec![store_id.clone()], err.to_string())
            }
            QueryRouter::MultiStore { .. } => RouterDecision::none(err.to_string()),
        }
    }
}

/// Alphanumeric runs; punctuation, hyphens included, separates words.
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Blank out every occurrence of `id` in `text` that is not glued to other
/// id characters. Returns whether any occurrence was found.
fn take_mention(text: &mut String, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    let mut found = false;
    let mut from = 0;
    while let Some(pos) = text[from..].find(id) {
        let start = from + pos;
        let end = start + id.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if !before.is_some_and(is_id_char) && !after.is_some_and(is_id_char) {
            text.replace_range(start..end, &" ".repeat(end - start));
            found = true;
        }
        from = end;
    }
    found
}

/// Catalog numbers given as whole answer items ("1, 3", "#2."), never
/// numbers inside prose.
fn answer_numbers(text: &str) -> Vec<usize> {
    text.split([',', ';', '\n'])
        .filter_map(|item| {
            item.trim()
                .trim_end_matches('.')
                .trim_start_matches('#')
                .trim()
                .parse()
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedModel;
    use ragway_core::error::ProviderError;

    fn binary() -> QueryRouter {
        QueryRouter::binary("rag", "AI, RAG or fine-tuning")
    }

    fn multi(ids: &[&str]) -> QueryRouter {
        QueryRouter::multi_store(
            ids.iter()
                .map(|id| StoreDescriptor::new(*id, format!("{id} documents")))
                .collect(),
        )
    }

    fn selected(router: &QueryRouter, response: &str) -> Vec<String> {
        router.interpret(response).unwrap().store_ids
    }

    #[test]
    fn binary_negative_answers_skip_retrieval() {
        let router = binary();
        for response in [
            "no",
            "Non",
            "  NO.  ",
            "non, pas du tout",
            "No - unrelated.",
            "Non-pertinent",
        ] {
            assert!(selected(&router, response).is_empty(), "{response}");
        }
    }

    #[test]
    fn binary_other_answers_select_the_store() {
        let router = binary();
        for response in ["yes", "Oui", "maybe", "peut-être", "", "not sure", "nonetheless yes"] {
            assert_eq!(selected(&router, response), vec!["rag"], "{response:?}");
        }
    }

    #[test]
    fn custom_negative_markers_are_normalized() {
        let router = binary().with_negative_markers(vec![" NEIN ".into()]);
        assert!(selected(&router, "Nein.").is_empty());
        assert_eq!(selected(&router, "no"), vec!["rag"]);
    }

    #[test]
    fn multi_selects_exactly_the_named_stores() {
        let router = multi(&["rag", "cooking", "sport"]);
        assert_eq!(selected(&router, "sport, rag"), vec!["rag", "sport"]);
        assert_eq!(selected(&router, "Cooking"), vec!["cooking"]);
    }

    #[test]
    fn multi_selection_is_independent_of_catalog_order() {
        let forward = multi(&["rag", "cooking", "sport"]);
        let reversed = multi(&["sport", "cooking", "rag"]);

        let mut a = selected(&forward, "rag and sport");
        let mut b = selected(&reversed, "rag and sport");
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert_eq!(a, vec!["rag", "sport"]);
    }

    #[test]
    fn multi_accepts_source_numbers_and_deduplicates() {
        let router = multi(&["rag", "cooking", "sport"]);
        assert_eq!(selected(&router, "1, 3, rag"), vec!["rag", "sport"]);
    }

    #[test]
    fn multi_ids_are_whole_words() {
        let router = multi(&["ml", "ml-ops"]);
        assert_eq!(selected(&router, "ml-ops"), vec!["ml-ops"]);
        assert!(router.interpret("html").is_err());
    }

    #[test]
    fn multi_ids_may_contain_dots_and_spaces() {
        let router = multi(&["rag.notes", "Machine Learning", "cooking"]);
        assert_eq!(selected(&router, "rag.notes"), vec!["rag.notes"]);
        assert_eq!(
            selected(&router, "Machine Learning and cooking."),
            vec!["Machine Learning", "cooking"]
        );
    }

    #[test]
    fn multi_prefers_the_longest_matching_id() {
        let router = multi(&["rag", "rag.notes"]);
        assert_eq!(selected(&router, "rag.notes"), vec!["rag.notes"]);
        assert_eq!(selected(&router, "rag, rag.notes"), vec!["rag", "rag.notes"]);
    }

    #[test]
    fn multi_numbers_in_prose_are_ignored() {
        let router = multi(&["rag", "cooking", "sport"]);
        assert_eq!(selected(&router, "2 sources: rag and sport"), vec!["rag", "sport"]);
        assert_eq!(selected(&router, "#2."), vec!["cooking"]);
    }

    #[test]
    fn multi_none_is_an_empty_decision() {
        let router = multi(&["rag", "cooking"]);
        assert!(selected(&router, "None.").is_empty());
    }

    #[test]
    fn multi_unknown_names_are_unparseable() {
        let router = multi(&["rag", "cooking"]);
        assert!(matches!(
            router.interpret("astronomy"),
            Err(RoutingError::Unparseable { .. })
        ));
    }

    #[tokio::test]
    async fn route_sends_the_classification_prompt() {
        let oracle = ScriptedModel::new(["yes"]);
        let decision = binary().route("What is RAG?", &oracle).await;

        assert_eq!(decision.store_ids, vec!["rag"]);
        assert_eq!(decision.rationale.as_deref(), Some("yes"));
        let prompts = oracle.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("What is RAG?"));
    }

    #[tokio::test]
    async fn unparseable_multi_answer_routes_nowhere() {
        let oracle = ScriptedModel::new(["I cannot tell"]);
        let decision = multi(&["rag", "cooking"]).route("q", &oracle).await;
        assert!(decision.is_empty());
    }

    #[tokio::test]
    async fn oracle_failure_fallbacks() {
        let oracle = ScriptedModel::from_results(vec![
            Err(ProviderError::Network("down".into())),
            Err(ProviderError::Network("down".into())),
        ]);

        let binary_decision = binary().route("q", &oracle).await;
        assert_eq!(binary_decision.store_ids, vec!["rag"]);

        let multi_decision = multi(&["rag", "cooking"]).route("q", &oracle).await;
        assert!(multi_decision.is_empty());
        assert!(multi_decision.rationale.unwrap().contains("down"));
    }
}
