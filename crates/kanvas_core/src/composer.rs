use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embed::Encoder;
use crate::error::{ChatError, Result};
use crate::model::{FaqEntry, FaqMatch, MatchDecision, SimilarityResult, Suggestion};
use crate::ranker::SimilarityRanker;
use crate::store::KnowledgeStore;

pub const GREETING_RESPONSE: &str = "Halo! Selamat datang di Kanvas Chatbot. Saya menggunakan AI untuk menjawab pertanyaan Anda. Silakan tanya apa saja!";
pub const NO_DATA_RESPONSE: &str =
    "Maaf, knowledge base masih kosong. Silakan tambahkan FAQ terlebih dahulu.";
pub const NO_MATCH_RESPONSE: &str = "Maaf, saya tidak menemukan jawaban yang tepat untuk pertanyaan Anda. Mungkin Anda bisa coba pertanyaan berikut?";

pub const DEFAULT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_HIGH_CONFIDENCE: f32 = 0.8;
/// Candidates ranked per message; suggestions are drawn from these.
pub const MATCH_TOP_K: usize = 3;

/// Thresholds and tokens that decide how a ranking becomes a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchPolicy {
    /// Minimum score for a confident match (inclusive).
    pub threshold: f32,
    /// Confident matches below this score also carry suggestions.
    pub high_confidence: f32,
    pub greeting_tokens: Vec<String>,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            high_confidence: DEFAULT_HIGH_CONFIDENCE,
            greeting_tokens: ["halo", "hai", "hello", "hi"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl MatchPolicy {
    /// Substring match against the lowercased message.
    pub fn is_greeting(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.greeting_tokens
            .iter()
            .any(|token| lower.contains(token.as_str()))
    }
}

/// Answers free-text messages from the knowledge store.
pub struct ResponseComposer {
    ranker: SimilarityRanker,
    store: Arc<KnowledgeStore>,
    policy: MatchPolicy,
}

impl ResponseComposer {
    pub fn new(encoder: Arc<dyn Encoder>, store: Arc<KnowledgeStore>, policy: MatchPolicy) -> Self {
        Self {
            ranker: SimilarityRanker::new(encoder),
            store,
            policy,
        }
    }

    pub fn ranker(&self) -> &SimilarityRanker {
        &self.ranker
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn compose_response(&self, message: &str) -> Result<MatchDecision> {
        if message.trim().is_empty() {
            return Err(ChatError::InvalidInput("message must not be empty".to_string()));
        }
        debug!(chars = message.chars().count(), "composing response");

        if self.policy.is_greeting(message) {
            return Ok(MatchDecision::Greeting {
                response: GREETING_RESPONSE.to_string(),
            });
        }

        // Questions and answers come from the same snapshot.
        let faqs = self.store.snapshot();
        if faqs.is_empty() {
            return Ok(MatchDecision::NoData {
                response: NO_DATA_RESPONSE.to_string(),
            });
        }

        let questions: Vec<&str> = faqs.iter().map(|f| f.question.as_str()).collect();
        let results = self.ranker.rank(message, &questions, MATCH_TOP_K)?;
        let Some(best) = results.first() else {
            return Ok(MatchDecision::NoData {
                response: NO_DATA_RESPONSE.to_string(),
            });
        };
        info!(matched = %best.text, score = best.score, "best match");

        if best.score >= self.policy.threshold {
            let entry = faqs.get(best.index).ok_or(ChatError::NotFound {
                index: best.index,
                len: faqs.len(),
            })?;
            Ok(MatchDecision::ConfidentMatch {
                response: entry.answer.clone(),
                faq_index: best.index,
                matched_question: best.text.clone(),
                confidence: best.score,
                suggestions: self.secondary_suggestions(&results),
            })
        } else {
            Ok(MatchDecision::NoMatch {
                response: NO_MATCH_RESPONSE.to_string(),
                confidence: best.score,
                suggestions: results.iter().take(3).map(Suggestion::from).collect(),
            })
        }
    }

    /// Runner-up questions that also cleared the threshold, offered only
    /// when the best match is not highly confident.
    fn secondary_suggestions(&self, results: &[SimilarityResult]) -> Option<Vec<Suggestion>> {
        let best = results.first()?;
        if best.score >= self.policy.high_confidence || results.len() < 2 {
            return None;
        }

        let suggestions: Vec<Suggestion> = results
            .iter()
            .skip(1)
            .take(2)
            .filter(|r| r.score >= self.policy.threshold)
            .map(Suggestion::from)
            .collect();
        (!suggestions.is_empty()).then_some(suggestions)
    }

    pub fn rank<S: AsRef<str>>(
        &self,
        query: &str,
        candidates: &[S],
        top_k: usize,
    ) -> Result<Vec<SimilarityResult>> {
        self.ranker.rank(query, candidates, top_k)
    }

    pub fn list_faqs(&self) -> Vec<FaqEntry> {
        self.store.all_entries()
    }

    /// Best-matching FAQs with their answers. An empty store yields no
    /// results rather than an error.
    pub fn search_faqs(&self, query: &str, top_k: usize) -> Result<Vec<FaqMatch>> {
        if query.trim().is_empty() {
            return Err(ChatError::InvalidInput("query must not be empty".to_string()));
        }
        let faqs = self.store.snapshot();
        if faqs.is_empty() {
            return Ok(Vec::new());
        }

        let questions: Vec<&str> = faqs.iter().map(|f| f.question.as_str()).collect();
        let results = self.ranker.rank(query, &questions, top_k.min(faqs.len()))?;
        Ok(results
            .into_iter()
            .filter_map(|r| {
                faqs.get(r.index).map(|f| FaqMatch {
                    question: f.question.clone(),
                    answer: f.answer.clone(),
                    similarity: r.score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEncoder;
    use crate::model::Embedding;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TableEncoder {
        table: Vec<(&'static str, Vec<f32>)>,
        calls: AtomicUsize,
    }

    impl TableEncoder {
        fn new(table: Vec<(&'static str, Vec<f32>)>) -> Self {
            Self {
                table,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Encoder for TableEncoder {
        fn encode(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    self.table
                        .iter()
                        .find(|(k, _)| k == t)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_else(|| vec![0.0; 4])
                })
                .collect())
        }
    }

    fn store_of(questions: &[&str]) -> Arc<KnowledgeStore> {
        let store = KnowledgeStore::new();
        for q in questions {
            store.add(*q, format!("answer to {q}")).unwrap();
        }
        Arc::new(store)
    }

    fn default_composer() -> ResponseComposer {
        ResponseComposer::new(
            Arc::new(HashEncoder::default()),
            Arc::new(KnowledgeStore::with_default_faqs()),
            MatchPolicy::default(),
        )
    }

    #[test]
    fn greeting_short_circuits_encoding() {
        let encoder = Arc::new(TableEncoder::new(vec![]));
        let composer = ResponseComposer::new(
            encoder.clone(),
            Arc::new(KnowledgeStore::with_default_faqs()),
            MatchPolicy::default(),
        );

        let decision = composer.compose_response("Halo, apa kabar?").unwrap();
        assert_eq!(decision.method(), "greeting");
        assert_eq!(decision.confidence(), 1.0);
        assert_eq!(decision.response(), GREETING_RESPONSE);
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_store_is_no_data() {
        let composer = ResponseComposer::new(
            Arc::new(HashEncoder::default()),
            Arc::new(KnowledgeStore::new()),
            MatchPolicy::default(),
        );

        let decision = composer.compose_response("Apa itu Kanvas Store?").unwrap();
        assert_eq!(decision.method(), "no_data");
        assert_eq!(decision.confidence(), 0.0);
    }

    #[test]
    fn exact_question_is_confident_match() {
        let decision = default_composer()
            .compose_response("Apa itu Kanvas Store?")
            .unwrap();

        match decision {
            MatchDecision::ConfidentMatch {
                faq_index,
                ref matched_question,
                confidence,
                ref suggestions,
                ..
            } => {
                assert_eq!(faq_index, 0);
                assert_eq!(matched_question, "Apa itu Kanvas Store?");
                assert!(confidence >= 0.5);
                assert!(suggestions.is_none());
            }
            other => panic!("expected confident match, got {other:?}"),
        }
        assert!(decision.response().starts_with("Kanvas Store adalah"));
    }

    #[test]
    fn gibberish_is_no_match_with_suggestions() {
        let decision = default_composer()
            .compose_response("asdkjaslkdjaslkd random gibberish")
            .unwrap();

        assert_eq!(decision.method(), "no_match");
        assert_eq!(decision.response(), NO_MATCH_RESPONSE);
        let suggestions = decision.suggestions().unwrap();
        assert!(!suggestions.is_empty() && suggestions.len() <= 3);
        assert_eq!(decision.confidence(), suggestions[0].similarity);
    }

    fn moderate_composer(third_score_ok: bool) -> ResponseComposer {
        let second = if third_score_ok {
            vec![0.6, 0.8, 0.0, 0.0]
        } else {
            vec![0.4, 0.9165, 0.0, 0.0]
        };
        let encoder = TableEncoder::new(vec![
            ("q", vec![1.0, 0.0, 0.0, 0.0]),
            ("best", vec![0.7, 0.7141, 0.0, 0.0]),
            ("second", second),
            ("third", vec![0.3, 0.9539, 0.0, 0.0]),
        ]);
        ResponseComposer::new(
            Arc::new(encoder),
            store_of(&["third", "best", "second"]),
            MatchPolicy::default(),
        )
    }

    fn four_candidate_composer(policy: MatchPolicy) -> ResponseComposer {
        let encoder = TableEncoder::new(vec![
            ("q", vec![1.0, 0.0, 0.0, 0.0]),
            ("best", vec![0.7, 0.71414, 0.0, 0.0]),
            ("second", vec![0.6, 0.8, 0.0, 0.0]),
            ("third", vec![0.55, 0.83516, 0.0, 0.0]),
            ("fourth", vec![0.52, 0.85417, 0.0, 0.0]),
        ]);
        ResponseComposer::new(
            Arc::new(encoder),
            store_of(&["fourth", "third", "second", "best"]),
            policy,
        )
    }

    #[test]
    fn both_runners_up_are_suggested_from_a_pool_of_three() {
        let decision = four_candidate_composer(MatchPolicy::default())
            .compose_response("q")
            .unwrap();

        assert_eq!(decision.matched_question(), Some("best"));
        let names: Vec<&str> = decision
            .suggestions()
            .unwrap()
            .iter()
            .map(|s| s.question.as_str())
            .collect();
        assert_eq!(names, vec!["second", "third"]);
    }

    #[test]
    fn no_match_offers_the_top_three() {
        let policy = MatchPolicy {
            threshold: 0.9,
            high_confidence: 0.95,
            ..MatchPolicy::default()
        };
        let decision = four_candidate_composer(policy).compose_response("q").unwrap();

        assert_eq!(decision.method(), "no_match");
        let names: Vec<&str> = decision
            .suggestions()
            .unwrap()
            .iter()
            .map(|s| s.question.as_str())
            .collect();
        assert_eq!(names, vec!["best", "second", "third"]);
    }

    #[test]
    fn moderate_match_carries_runner_up_above_threshold() {
        let decision = moderate_composer(true).compose_response("q").unwrap();

        assert_eq!(decision.method(), "semantic_similarity");
        assert_eq!(decision.matched_question(), Some("best"));
        assert_eq!(decision.response(), "answer to best");
        assert!((decision.confidence() - 0.7).abs() < 1e-3);

        let suggestions = decision.suggestions().unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].question, "second");
    }

    #[test]
    fn moderate_match_without_qualifying_runner_up_has_no_suggestions() {
        let decision = moderate_composer(false).compose_response("q").unwrap();

        assert_eq!(decision.method(), "semantic_similarity");
        assert!(decision.suggestions().is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        let encoder = TableEncoder::new(vec![
            ("q", vec![1.0, 0.0, 0.0, 0.0]),
            ("edge", vec![1.0, 1.0, 1.0, 1.0]),
        ]);
        let composer =
            ResponseComposer::new(Arc::new(encoder), store_of(&["edge"]), MatchPolicy::default());

        let decision = composer.compose_response("q").unwrap();
        assert_eq!(decision.confidence(), 0.5);
        assert_eq!(decision.method(), "semantic_similarity");
    }

    #[test]
    fn added_faq_is_matchable() {
        let composer = default_composer();
        let index = composer
            .store()
            .add("Berapa biaya pendaftaran?", "Pendaftaran gratis.")
            .unwrap();
        assert_eq!(index, 12);

        let decision = composer.compose_response("Berapa biaya pendaftaran?").unwrap();
        assert!(matches!(
            decision,
            MatchDecision::ConfidentMatch { faq_index: 12, .. }
        ));
        assert_eq!(decision.response(), "Pendaftaran gratis.");
    }

    #[test]
    fn empty_message_is_rejected() {
        assert!(matches!(
            default_composer().compose_response("  "),
            Err(ChatError::InvalidInput(_))
        ));
    }

    #[test]
    fn encoder_failure_propagates() {
        struct Broken;
        impl Encoder for Broken {
            fn encode(&self, _texts: &[&str]) -> Result<Vec<Embedding>> {
                Err(ChatError::encoder_load("broken", "no weights"))
            }
        }

        let composer = ResponseComposer::new(
            Arc::new(Broken),
            Arc::new(KnowledgeStore::with_default_faqs()),
            MatchPolicy::default(),
        );
        assert!(matches!(
            composer.compose_response("Apa itu S2B2C?"),
            Err(ChatError::EncoderLoad { .. })
        ));
    }

    #[test]
    fn search_faqs_returns_full_entries() {
        let composer = default_composer();
        let results = composer.search_faqs("Di mana lokasi Kanvas Store?", 50).unwrap();

        assert_eq!(results.len(), 12);
        assert_eq!(results[0].question, "Di mana lokasi Kanvas Store?");
        assert!(results[0].answer.contains("Jakarta"));

        let empty = ResponseComposer::new(
            Arc::new(HashEncoder::default()),
            Arc::new(KnowledgeStore::new()),
            MatchPolicy::default(),
        );
        assert!(empty.search_faqs("apa saja", 3).unwrap().is_empty());
    }

    #[test]
    fn blank_faq_search_is_rejected_whatever_the_store_holds() {
        let empty = ResponseComposer::new(
            Arc::new(HashEncoder::default()),
            Arc::new(KnowledgeStore::new()),
            MatchPolicy::default(),
        );
        assert!(matches!(
            empty.search_faqs(" ", 3),
            Err(ChatError::InvalidInput(_))
        ));
        assert!(matches!(
            default_composer().search_faqs("", 3),
            Err(ChatError::InvalidInput(_))
        ));
    }
}
