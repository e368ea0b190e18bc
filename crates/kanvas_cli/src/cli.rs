use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub const MAX_SEARCH_TOP_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncoderKind {
    /// all-MiniLM-L6-v2, loaded on first use
    Minilm,
    /// Token-hashing encoder, no model files needed
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "kanvas", version, about = "Kanvas Store FAQ chatbot")]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = EncoderKind::Minilm)]
    pub encoder: EncoderKind,

    /// Directory holding model.safetensors and tokenizer.json.
    #[arg(long, global = true)]
    pub model_dir: Option<PathBuf>,

    /// JSONL file of {question, answer} objects replacing the built-in FAQs.
    #[arg(long, global = true)]
    pub faq_file: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Answer a message from the FAQ knowledge base.
    Chat {
        #[arg(long)]
        message: String,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Rank arbitrary candidate texts against a query.
    Search {
        #[arg(long)]
        query: String,
        #[arg(long = "candidate", required = true)]
        candidates: Vec<String>,
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },
    /// List every FAQ.
    Faqs,
    /// Find the FAQs closest to a query.
    FaqSearch {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },
    /// Append a FAQ to the FAQ file.
    AddFaq {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
    },
    /// Show which embedding model is in use.
    ModelInfo,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Commands::Chat { message, .. } if message.trim().is_empty() => {
                Err("message must not be empty".to_string())
            }
            Commands::Search { query, top_k, .. } => {
                if query.trim().is_empty() {
                    return Err("query must not be empty".to_string());
                }
                if !(1..=MAX_SEARCH_TOP_K).contains(top_k) {
                    return Err(format!("top-k must be between 1 and {MAX_SEARCH_TOP_K}"));
                }
                Ok(())
            }
            Commands::FaqSearch { query, top_k } => {
                if query.trim().is_empty() {
                    return Err("query must not be empty".to_string());
                }
                if *top_k == 0 {
                    return Err("top-k must be > 0".to_string());
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
