pub mod composer;
pub mod config;
pub mod embed;
pub mod error;
pub mod history;
pub mod lazy;
pub mod minilm_embed;
pub mod model;
pub mod ranker;
pub mod storage;
pub mod store;

pub use composer::{
    MatchPolicy, ResponseComposer, DEFAULT_HIGH_CONFIDENCE, DEFAULT_THRESHOLD, MATCH_TOP_K,
};
pub use config::{ModelSettings, Settings, DEFAULT_MODEL_NAME};
pub use embed::{Encoder, HashEncoder};
pub use error::{ChatError, Result};
pub use history::{ChatHistory, ChatTurn, NoopHistory};
pub use lazy::LazyEncoder;
pub use minilm_embed::{MiniLmEncoder, MAX_TOKENS, MINILM_DIM};
pub use model::{Embedding, FaqEntry, FaqMatch, MatchDecision, SimilarityResult, Suggestion};
pub use ranker::{cosine_similarity, top_k, SimilarityRanker};
pub use storage::{load_faqs_jsonl, save_faqs_jsonl};
pub use store::{KnowledgeStore, DEFAULT_FAQS};
