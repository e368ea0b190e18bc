mod cli;
mod output;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use kanvas_core::{
    load_faqs_jsonl, save_faqs_jsonl, ChatHistory, ChatTurn, Encoder, HashEncoder,
    KnowledgeStore, LazyEncoder, MiniLmEncoder, NoopHistory, ResponseComposer, Settings,
    MAX_TOKENS, MINILM_DIM,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, EncoderKind};
use crate::output::{AddedFaq, ModelInfo};

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn load_store(faq_path: Option<&Path>, allow_missing: bool) -> Result<KnowledgeStore> {
    match faq_path {
        Some(path) if path.exists() => {
            let entries = load_faqs_jsonl(path)
                .with_context(|| format!("load faqs from {}", path.display()))?;
            Ok(KnowledgeStore::from_entries(entries))
        }
        Some(path) if !allow_missing => bail!("faq file {} does not exist", path.display()),
        _ => Ok(KnowledgeStore::with_default_faqs()),
    }
}

struct App {
    composer: ResponseComposer,
    minilm: Option<Arc<LazyEncoder<MiniLmEncoder>>>,
    history: NoopHistory,
}

impl App {
    fn build(cli: &Cli, settings: &Settings, store: KnowledgeStore) -> Self {
        let (encoder, minilm): (Arc<dyn Encoder>, _) = match cli.encoder {
            EncoderKind::Hash => (Arc::new(HashEncoder::default()) as Arc<dyn Encoder>, None),
            EncoderKind::Minilm => {
                let dir = cli
                    .model_dir
                    .clone()
                    .unwrap_or_else(|| settings.model.artifact_dir());
                let lazy = Arc::new(LazyEncoder::new(settings.model.name.clone(), move || {
                    MiniLmEncoder::load(&dir)
                }));
                (lazy.clone() as Arc<dyn Encoder>, Some(lazy))
            }
        };

        Self {
            composer: ResponseComposer::new(encoder, Arc::new(store), settings.policy.clone()),
            minilm,
            history: NoopHistory,
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.validate().map_err(anyhow::Error::msg)?;

    let mut settings = Settings::load(cli.config.as_deref()).context("load settings")?;
    if let Some(path) = &cli.faq_file {
        settings.faq_path = Some(path.clone());
    }
    init_tracing(&settings.log_level);
    info!(app = %settings.app_name, version = %settings.app_version, "starting");

    let allow_missing = matches!(cli.command, Commands::AddFaq { .. });
    let store = load_store(settings.faq_path.as_deref(), allow_missing)?;
    let app = App::build(&cli, &settings, store);
    let format = cli.output;

    match &cli.command {
        Commands::Chat {
            message,
            user_id,
            session_id,
        } => {
            let decision = app
                .composer
                .compose_response(message)
                .context("process chat message")?;

            if let Some(user_id) = user_id {
                app.history.record(&ChatTurn {
                    user_id: user_id.clone(),
                    session_id: session_id.clone(),
                    message: message.clone(),
                    response: decision.response().to_string(),
                })?;
            }
            output::print_chat(format, &decision)?;
        }
        Commands::Search {
            query,
            candidates,
            top_k,
        } => {
            let results = app
                .composer
                .rank(query, candidates.as_slice(), *top_k)
                .context("similarity search")?;
            output::print_search(format, &results)?;
        }
        Commands::Faqs => {
            output::print_faqs(format, &app.composer.list_faqs())?;
        }
        Commands::FaqSearch { query, top_k } => {
            let results = app
                .composer
                .search_faqs(query, *top_k)
                .context("search faqs")?;
            output::print_faq_search(format, &results, app.composer.store().is_empty())?;
        }
        Commands::AddFaq { question, answer } => {
            let Some(path) = settings.faq_path.as_deref() else {
                bail!("add-faq needs --faq-file or faq_path in the config");
            };
            let store = app.composer.store();
            let index = store.add(question.as_str(), answer.as_str())?;
            save_faqs_jsonl(path, &store.all_entries())
                .with_context(|| format!("save faqs to {}", path.display()))?;

            output::print_added(
                format,
                &AddedFaq {
                    index,
                    question,
                    total: store.len(),
                    path: path.display().to_string(),
                },
            )?;
        }
        Commands::ModelInfo => {
            let info = match &app.minilm {
                Some(lazy) => ModelInfo {
                    model_name: lazy.name().to_string(),
                    model_type: "sentence-transformers",
                    description: "all-MiniLM-L6-v2 maps sentences to a 384 dimensional vector space for semantic similarity",
                    encoder: "minilm",
                    embedding_dimension: MINILM_DIM,
                    max_sequence_length: Some(MAX_TOKENS),
                    loaded: lazy.is_loaded(),
                },
                None => ModelInfo {
                    model_name: "token-hash".to_string(),
                    model_type: "hash",
                    description: "FNV-1a token hashing, deterministic and model-free",
                    encoder: "hash",
                    embedding_dimension: HashEncoder::default().dimension(),
                    max_sequence_length: None,
                    loaded: true,
                },
            };
            output::print_model_info(format, &info)?;
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
